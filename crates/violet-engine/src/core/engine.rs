use anyhow::Result;

use crate::audio::AudioHandle;
use crate::coords::{ColorRgba, Size};
use crate::gpu::{GpuBackend, TextureFactory};
use crate::graphics::{FlushStats, LayerPhase, ViewConfig, ViewResize};
use crate::time::{ClockSource, FramePlan};

use super::{ActorPool, App, Context, Scene, StartupScene, UpdatePass};

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub app_name: String,
    /// Logic rate for the fixed-update pass and for delta scaling.
    pub game_fps: f32,
    pub vsync: bool,
    pub base_view_size: Size,
    /// Resize mode for the X and Y view axes.
    pub view_resize: (ViewResize, ViewResize),
    pub background: ColorRgba,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let view = ViewConfig::default();
        Self {
            app_name: "violet".to_string(),
            game_fps: 60.0,
            vsync: true,
            base_view_size: view.base,
            view_resize: (view.resize_x, view.resize_y),
            background: ColorRgba::black(),
        }
    }
}

impl EngineConfig {
    pub(crate) fn view_config(&self) -> ViewConfig {
        ViewConfig {
            base: self.base_view_size,
            resize_x: self.view_resize.0,
            resize_y: self.view_resize.1,
        }
    }
}

/// What one call to `Engine::frame` did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub plan: FramePlan,
    /// Set when the draw pass ran and the batcher was flushed.
    pub flush: Option<FlushStats>,
}

/// Drives an `App`, its scene and actors through the frame passes.
///
/// Platform-free: the window runtime feeds it input and a GPU backend, tests
/// feed it a manual clock and a `RecordingBackend`.
pub struct Engine<A: App> {
    app: A,
    scene: Option<Box<dyn Scene>>,
    actors: ActorPool,
    ctx: Context,
    started: bool,
    closed: bool,
}

impl<A: App> Engine<A> {
    pub fn new(
        app: A,
        config: &EngineConfig,
        clock: Box<dyn ClockSource>,
        audio: AudioHandle,
        textures: Box<dyn TextureFactory>,
    ) -> Result<Self> {
        let ctx = Context::new(config, clock, audio, textures)?;
        Ok(Self {
            app,
            scene: None,
            actors: ActorPool::new(),
            ctx,
            started: false,
            closed: false,
        })
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn actors(&self) -> &ActorPool {
        &self.actors
    }

    /// Name of the running scene.
    pub fn scene_name(&self) -> Option<&str> {
        self.scene.as_ref().map(|s| s.name())
    }

    /// Starts the clock and runs `App::on_start`. A `StartupScene` is queued
    /// first, so a scene set in `on_start` replaces it.
    pub fn start(&mut self) -> Result<()> {
        log::debug!("application start: {}", self.ctx.app_name());
        self.started = true;
        self.ctx.scheduler_mut().start();
        self.ctx.set_scene(StartupScene);
        self.ctx.gfx().set_phase(LayerPhase::UpdateStart);
        self.app.on_start(&mut self.ctx)?;
        self.actors.adopt(&mut self.ctx);
        Ok(())
    }

    /// Runs one frame: pending scene start, update pass, fixed pass if due,
    /// draw pass and flush if due, pending scene exit.
    pub fn frame(&mut self, gpu: &mut dyn GpuBackend) -> Result<FrameReport> {
        let plan = self.ctx.scheduler_mut().begin_frame();

        if let Some(next) = self.ctx.take_next_scene() {
            if self.scene.is_some() {
                self.exit_scene()?;
            }
            self.start_scene(next)?;
        }

        self.run_pass(UpdatePass::Update)?;
        if plan.fixed {
            self.run_pass(UpdatePass::Fixed)?;
        }
        let mut flush = None;
        if plan.draw {
            self.run_pass(UpdatePass::Draw)?;
            flush = Some(self.ctx.gfx().flush(gpu));
        }

        if self.ctx.has_next_scene() {
            self.exit_scene()?;
        }

        self.ctx.scheduler_mut().end_frame();
        self.ctx.input_mut().new_frame();
        Ok(FrameReport { plan, flush })
    }

    /// Best-effort teardown: disposes actors, exits the scene, calls
    /// `App::on_close`. Failures are logged and teardown continues. Runs once.
    pub fn shutdown(&mut self) {
        if self.closed || !self.started {
            return;
        }
        self.closed = true;

        if let Err(e) = self.actors.dispose_all(&mut self.ctx) {
            log::error!("disposing actors: {e:#}");
        }
        if let Some(mut scene) = self.scene.take() {
            log::debug!("scene exit: {}", scene.name());
            if let Err(e) = scene.on_exit(&mut self.ctx) {
                log::error!("scene {} exit: {e:#}", scene.name());
            }
        }
        if let Err(e) = self.app.on_close(&mut self.ctx) {
            log::error!("application close: {e:#}");
        }
        self.ctx.gfx().discard();
        log::debug!("application end: {}", self.ctx.app_name());
    }

    fn start_scene(&mut self, mut scene: Box<dyn Scene>) -> Result<()> {
        log::debug!("scene start: {}", scene.name());
        self.ctx.gfx().set_phase(LayerPhase::UpdateStart);
        let result = scene.on_start(&mut self.ctx);
        self.scene = Some(scene);
        self.actors.adopt(&mut self.ctx);
        result
    }

    fn exit_scene(&mut self) -> Result<()> {
        if let Some(mut scene) = self.scene.take() {
            log::debug!("scene exit: {}", scene.name());
            scene.on_exit(&mut self.ctx)?;
        }
        self.actors.dispose_all(&mut self.ctx)
    }

    fn run_pass(&mut self, pass: UpdatePass) -> Result<()> {
        let Self {
            app,
            scene,
            actors,
            ctx,
            ..
        } = self;

        ctx.gfx().set_phase(LayerPhase::UpdateStart);
        match pass {
            UpdatePass::Update => app.on_update_start(ctx)?,
            UpdatePass::Fixed => app.on_fixed_update_start(ctx)?,
            UpdatePass::Draw => app.on_draw_start(ctx)?,
        }
        if let Some(scene) = scene.as_mut() {
            match pass {
                UpdatePass::Update => scene.on_update_start(ctx)?,
                UpdatePass::Fixed => scene.on_fixed_update_start(ctx)?,
                UpdatePass::Draw => scene.on_draw_start(ctx)?,
            }
        }

        ctx.gfx().set_phase(LayerPhase::Actor);
        actors.update(pass, ctx)?;

        ctx.gfx().set_phase(LayerPhase::UpdateEnd);
        if let Some(scene) = scene.as_mut() {
            match pass {
                UpdatePass::Update => scene.on_update_end(ctx)?,
                UpdatePass::Fixed => scene.on_fixed_update_end(ctx)?,
                UpdatePass::Draw => scene.on_draw_end(ctx)?,
            }
        }
        match pass {
            UpdatePass::Update => app.on_update_end(ctx)?,
            UpdatePass::Fixed => app.on_fixed_update_end(ctx)?,
            UpdatePass::Draw => app.on_draw_end(ctx)?,
        }

        actors.adopt(ctx);
        Ok(())
    }
}

impl<A: App> Drop for Engine<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
