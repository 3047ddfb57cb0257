//! Violet demo.
//!
//! Usage: `violet-demo [MAP SHEET TILES_PNG] [MUSIC_OGG]`
//!
//! Without arguments a generated square is steered with the arrow keys. With a
//! map, its sheet and tile texture, layer 0 scrolls with the arrows instead.
//! Z plays the music (looping, respecting LOOPSTART/LOOPEND tags), X pushes it
//! again on top of itself, S pops. F1-F4 toggle vsync, fullscreen and the view
//! resize axes.

use std::path::PathBuf;

use anyhow::Result;

use violet_engine::audio::MusicOptions;
use violet_engine::coords::{ColorRgba, Vec2};
use violet_engine::core::{Actor, ActorControl, App, Context, Scene};
use violet_engine::device::GpuInit;
use violet_engine::graphics::{RgbaImage, SpriteParams, Texture, TextureFilter, TextureWrap};
use violet_engine::input::Button;
use violet_engine::logging::{LoggingConfig, init_logging};
use violet_engine::map::TileMap;
use violet_engine::time::Stopwatch;
use violet_engine::window::{Runtime, RuntimeConfig};

const SPEED: f32 = 2.0;

#[derive(Debug, Clone, Default)]
struct Assets {
    map: Option<(PathBuf, PathBuf, PathBuf)>,
    music: Option<PathBuf>,
}

impl Assets {
    fn from_args(args: &[String]) -> Self {
        let mut assets = Self::default();
        let mut rest = args;
        if let [map, sheet, tiles, tail @ ..] = rest {
            if map.ends_with(".violmap") {
                assets.map = Some((map.into(), sheet.into(), tiles.into()));
                rest = tail;
            }
        }
        assets.music = rest.first().map(PathBuf::from);
        assets
    }
}

struct DemoApp {
    assets: Assets,
}

impl App for DemoApp {
    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        log::info!("{} starting", ctx.app_name());
        ctx.set_scene(PlayScene::new(self.assets.clone()));
        Ok(())
    }

    fn on_close(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.audio().stop_music(false);
        Ok(())
    }
}

struct PlayScene {
    assets: Assets,
    map: Option<TileMap>,
    watch: Stopwatch,
    last_report: u64,
}

impl PlayScene {
    fn new(assets: Assets) -> Self {
        Self {
            assets,
            map: None,
            watch: Stopwatch::new(),
            last_report: 0,
        }
    }
}

impl Scene for PlayScene {
    fn name(&self) -> &str {
        "play"
    }

    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        self.watch = ctx.start_stopwatch();

        if let Some((map, sheet, tiles)) = &self.assets.map {
            let mut tilemap = ctx.open_map(map)?;
            tilemap.set_sheet(0, ctx.open_sheet(sheet)?);
            tilemap.set_texture(0, ctx.open_texture(tiles)?);
            log::info!("map {} ({}x{})", tilemap.name(), tilemap.width(), tilemap.height());
            self.map = Some(tilemap);
            return Ok(());
        }

        let texture = ctx.create_texture("square", &square(16), TextureWrap::Clamp)?;
        let center = ctx.graphics().view_size();
        ctx.spawn(Player {
            texture,
            position: Vec2::new(center.width / 2.0 - 8.0, center.height / 2.0 - 8.0),
        })
    }

    fn on_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(music) = &self.assets.music {
            if ctx.tapped(Button::A) {
                ctx.audio().play_music(music, MusicOptions::default().looping(true))?;
            }
            if ctx.tapped(Button::B) {
                ctx.audio().push_music(music, MusicOptions::default().fades(true, true))?;
            }
        }
        if ctx.tapped(Button::Y) {
            ctx.audio().pop_music(true, true);
        }

        if let Some(map) = self.map.as_mut() {
            let step = SPEED * ctx.update_delta();
            map.add_scroll(0, direction(ctx) * step);
        }
        Ok(())
    }

    fn on_draw_start(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(map) = &self.map {
            map.draw(ctx.gfx());
        }
        Ok(())
    }

    fn on_draw_end(&mut self, ctx: &mut Context) -> Result<()> {
        let seconds = self.watch.seconds(ctx.ticks());
        if seconds >= self.last_report + 5 {
            self.last_report = seconds;
            log::info!(
                "{} elapsed, {:.1} updates/s, draw {:.0} fps",
                ctx.format_stopwatch(&self.watch, "%M:%L2S")?,
                ctx.update_fps(),
                ctx.scheduler().measured_draw_fps(),
            );
        }
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut Context) -> Result<()> {
        self.map = None;
        Ok(())
    }
}

struct Player {
    texture: Texture,
    position: Vec2,
}

impl Actor for Player {
    fn name(&self) -> &str {
        "player"
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        self.position = self.position + direction(ctx) * (SPEED * ctx.update_delta());
        Ok(ActorControl::Keep)
    }

    fn on_draw(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        let tint = if ctx.pressed(Button::X) {
            ColorRgba::new(1.0, 0.4, 0.4, 1.0)
        } else {
            ColorRgba::white()
        };
        ctx.gfx().draw_texture(
            &self.texture,
            TextureFilter::Nearest,
            SpriteParams::new(10, self.position).color(tint),
        );
        Ok(ActorControl::Keep)
    }
}

fn direction(ctx: &Context) -> Vec2 {
    let axis = |neg: Button, pos: Button| match (ctx.pressed(neg), ctx.pressed(pos)) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    Vec2::new(axis(Button::Left, Button::Right), axis(Button::Up, Button::Down))
}

/// Opaque white square with a one-pixel grey border.
fn square(size: u32) -> RgbaImage {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let edge = x == 0 || y == 0 || x + 1 == size || y + 1 == size;
            let v = if edge { 0x80 } else { 0xff };
            pixels.extend_from_slice(&[v, v, v, 0xff]);
        }
    }
    RgbaImage {
        width: size,
        height: size,
        pixels,
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let assets = Assets::from_args(&args);

    let mut config = RuntimeConfig {
        title: "Violet Demo".to_string(),
        ..RuntimeConfig::default()
    };
    config.engine.app_name = "violet-demo".to_string();
    config.engine.background = ColorRgba::new(0.08, 0.06, 0.12, 1.0);

    Runtime::run(config, GpuInit::default(), DemoApp { assets })
}
