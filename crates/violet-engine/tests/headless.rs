//! Drives the engine without a window: manual clock, recording backend,
//! in-memory audio.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;

use violet_engine::audio::{self, AudioHandle, MemoryDecoder, Mixer, MusicOptions, StreamingSource};
use violet_engine::coords::{Rect, Vec2};
use violet_engine::core::{Actor, ActorControl, App, Context, Engine, EngineConfig, Scene};
use violet_engine::gpu::{DetachedTextures, RecordingBackend};
use violet_engine::graphics::{Sheet, SheetFrame, SpriteParams, Texture, TextureFilter};
use violet_engine::input::Button;
use violet_engine::map::{Tile, TileMap};
use violet_engine::time::ManualClock;

const BUFFER_SAMPLES: usize = audio::BUFFER_SAMPLES;

fn open(path: &Path, looping: bool) -> Result<StreamingSource> {
    let name = path.display().to_string();
    let decoder = MemoryDecoder::new(vec![1000; 200_000]);
    Ok(StreamingSource::new(name, Box::new(decoder), looping))
}

fn engine<A: App>(app: A) -> (Engine<A>, ManualClock, Mixer) {
    let clock = ManualClock::new(0.0);
    let (handle, mixer): (AudioHandle, Mixer) = audio::channel(open);
    let engine = Engine::new(
        app,
        &EngineConfig::default(),
        Box::new(clock.clone()),
        handle,
        Box::new(DetachedTextures),
    )
    .unwrap();
    (engine, clock, mixer)
}

struct Game {
    fire: Rc<Cell<u32>>,
}

impl App for Game {
    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.set_scene(Level::default());
        ctx.audio().play_music("theme", MusicOptions::default().looping(true))?;
        Ok(())
    }

    fn on_update_end(&mut self, ctx: &mut Context) -> Result<()> {
        if ctx.tapped(Button::A) {
            self.fire.set(self.fire.get() + 1);
            ctx.audio().play_sfx("shot")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Level {
    map: Option<TileMap>,
}

impl Scene for Level {
    fn name(&self) -> &str {
        "level"
    }

    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        let mut map = TileMap::new("level", 4, 2, 16, 16);
        map.set_layer_tiles(1, vec![Tile::new(0, 0); 8])?;
        map.set_texture(0, Texture::detached("tiles", 16, 16));
        map.set_sheet(
            0,
            Arc::new(Sheet::new(
                "tiles",
                vec![SheetFrame {
                    source: Rect::new(0.0, 0.0, 16.0, 16.0),
                    origin: Vec2::zero(),
                }],
            )),
        );
        self.map = Some(map);

        ctx.spawn(Ship {
            texture: Texture::detached("ship", 8, 8),
            position: Vec2::new(100.0, 10.0),
        })
    }

    fn on_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(map) = self.map.as_mut() {
            map.add_scroll_x(1, ctx.update_delta());
        }
        Ok(())
    }

    fn on_draw_start(&mut self, ctx: &mut Context) -> Result<()> {
        if let Some(map) = &self.map {
            map.draw(ctx.gfx());
        }
        Ok(())
    }
}

struct Ship {
    texture: Texture,
    position: Vec2,
}

impl Actor for Ship {
    fn name(&self) -> &str {
        "ship"
    }

    fn on_draw(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        ctx.gfx().draw_texture(
            &self.texture,
            TextureFilter::Nearest,
            SpriteParams::new(1, self.position),
        );
        Ok(ActorControl::Keep)
    }
}

#[test]
fn map_and_actor_share_a_layer_in_phase_order() {
    let (mut engine, clock, _mixer) = engine(Game {
        fire: Rc::default(),
    });
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    // First frame starts the scene; the map is drawn from then on.
    let report = engine.frame(&mut gpu).unwrap();
    let stats = report.flush.unwrap();
    assert_eq!(stats.sprites, 9);
    assert_eq!(stats.batches, 2);

    let v = gpu.vertices();
    assert_eq!(v.len(), 9 * 6);
    // Eight map cells first, row by row, the ship last.
    assert_eq!(v[0].pos, [0.0, 0.0]);
    assert_eq!(v[6].pos, [16.0, 0.0]);
    assert_eq!(v[24].pos, [0.0, 16.0]);
    assert_eq!(v[48].pos, [100.0, 10.0]);

    // Nothing is left queued after a flush.
    assert_eq!(engine.context().graphics().queued(), 0);
    gpu.clear();
    assert_eq!(engine.context_mut().gfx().flush(&mut gpu).sprites, 0);
    assert_eq!(gpu.draw_calls(), 0);

    // Scroll follows the update delta, which reports the previous frame's
    // length: the map only moves once a frame of real time has passed.
    clock.advance(1000.0 / 60.0);
    gpu.clear();
    engine.frame(&mut gpu).unwrap();
    assert_eq!(gpu.vertices()[0].pos, [0.0, 0.0]);

    clock.advance(1000.0 / 60.0);
    gpu.clear();
    engine.frame(&mut gpu).unwrap();
    assert!(gpu.vertices()[0].pos[0] < 0.0);
}

#[test]
fn game_code_reaches_the_mixer() {
    let fire = Rc::new(Cell::new(0));
    let (mut engine, clock, mut mixer) = engine(Game { fire: fire.clone() });
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    let mut out = vec![0i16; BUFFER_SAMPLES];
    mixer.mix(&mut out);
    assert_eq!(mixer.current_name(), Some("theme"));

    engine.context_mut().input_mut().set(Button::A, true);
    engine.frame(&mut gpu).unwrap();
    clock.advance(16.0);
    engine.frame(&mut gpu).unwrap();
    assert_eq!(fire.get(), 1);

    out.fill(0);
    mixer.mix(&mut out);
    assert_eq!(mixer.sfx_count(), 1);
    // Music at full volume plus the effect.
    assert!(out.iter().all(|&s| s == 2000));
}
