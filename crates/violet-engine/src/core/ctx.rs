use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::audio::AudioHandle;
use crate::error::ResourceError;
use crate::gpu::TextureFactory;
use crate::graphics::{Graphics, LayerPhase, RgbaImage, Sheet, Texture, TextureWrap};
use crate::input::{Button, InputState};
use crate::map::TileMap;
use crate::time::{ClockSource, FrameScheduler, Stopwatch};

use super::{Actor, EngineConfig, Scene};

/// Everything game code can reach from a hook: graphics, audio, input,
/// timing, resource loading, and the scene/actor/exit requests the engine
/// applies between passes.
pub struct Context {
    graphics: Graphics,
    audio: AudioHandle,
    input: InputState,
    textures: Box<dyn TextureFactory>,
    scheduler: FrameScheduler,

    spawned: Vec<Box<dyn Actor>>,
    next_scene: Option<Box<dyn Scene>>,
    exit_requested: bool,
    app_name: String,
}

impl Context {
    pub fn new(
        config: &EngineConfig,
        clock: Box<dyn ClockSource>,
        audio: AudioHandle,
        textures: Box<dyn TextureFactory>,
    ) -> Result<Self> {
        let mut scheduler = FrameScheduler::new(clock);
        scheduler.set_game_fps(config.game_fps)?;
        scheduler.set_vsync(config.vsync);

        Ok(Self {
            graphics: Graphics::new(config.view_config(), config.background),
            audio,
            input: InputState::new(),
            textures,
            scheduler,
            spawned: Vec::new(),
            next_scene: None,
            exit_requested: false,
            app_name: config.app_name.clone(),
        })
    }

    // ── subsystems ───────────────────────────────────────────────────────

    #[inline]
    pub fn graphics(&self) -> &Graphics {
        &self.graphics
    }

    #[inline]
    pub fn gfx(&mut self) -> &mut Graphics {
        &mut self.graphics
    }

    #[inline]
    pub fn audio(&self) -> &AudioHandle {
        &self.audio
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Shorthands for the input queries.
    pub fn pressed(&self, button: Button) -> bool {
        self.input.pressed(button)
    }

    pub fn tapped(&self, button: Button) -> bool {
        self.input.tapped(button)
    }

    pub fn released(&self, button: Button) -> bool {
        self.input.released(button)
    }

    #[inline]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    // ── timing ───────────────────────────────────────────────────────────

    /// Milliseconds since engine start.
    pub fn ticks(&self) -> f64 {
        self.scheduler.ticks()
    }

    /// Logic frames elapsed since the previous frame.
    pub fn update_delta(&self) -> f32 {
        self.scheduler.update_delta()
    }

    /// Logic frames elapsed since the previous drawn frame.
    pub fn draw_delta(&self) -> f32 {
        self.scheduler.draw_delta()
    }

    pub fn update_fps(&self) -> f32 {
        self.scheduler.update_fps()
    }

    pub fn game_fps(&self) -> f32 {
        self.scheduler.game_fps()
    }

    pub fn set_game_fps(&mut self, fps: f32) -> Result<(), ResourceError> {
        self.scheduler.set_game_fps(fps)
    }

    pub fn draw_fps(&self) -> f32 {
        self.scheduler.draw_fps()
    }

    pub fn vsync(&self) -> bool {
        self.scheduler.vsync()
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.scheduler.set_vsync(vsync);
    }

    /// A stopwatch already running from now.
    pub fn start_stopwatch(&self) -> Stopwatch {
        let mut watch = Stopwatch::new();
        watch.start(self.ticks());
        watch
    }

    pub fn format_stopwatch(&self, watch: &Stopwatch, format: &str) -> Result<String, ResourceError> {
        watch.format(self.ticks(), format)
    }

    // ── requests ─────────────────────────────────────────────────────────

    /// Adds an actor. `on_spawn` runs now, in the Actor phase; the actor joins
    /// the pool right after the current hook returns.
    pub fn spawn(&mut self, actor: impl Actor + 'static) -> Result<()> {
        self.spawn_boxed(Box::new(actor))
    }

    pub fn spawn_boxed(&mut self, mut actor: Box<dyn Actor>) -> Result<()> {
        log::debug!("actor spawn: {}", actor.name());
        let phase = self.graphics.phase();
        self.graphics.set_phase(LayerPhase::Actor);
        let result = actor.on_spawn(self);
        self.graphics.set_phase(phase);
        result?;
        self.spawned.push(actor);
        Ok(())
    }

    pub(crate) fn take_spawned(&mut self) -> Vec<Box<dyn Actor>> {
        std::mem::take(&mut self.spawned)
    }

    /// Switches scene: the current one exits at the end of this frame and the
    /// new one starts at the beginning of the next. The last request wins.
    pub fn set_scene(&mut self, scene: impl Scene + 'static) {
        self.next_scene = Some(Box::new(scene));
    }

    pub fn set_scene_boxed(&mut self, scene: Box<dyn Scene>) {
        self.next_scene = Some(scene);
    }

    pub(crate) fn has_next_scene(&self) -> bool {
        self.next_scene.is_some()
    }

    pub(crate) fn take_next_scene(&mut self) -> Option<Box<dyn Scene>> {
        self.next_scene.take()
    }

    /// Asks the runtime to stop after this frame.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    #[inline]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn set_app_name(&mut self, name: impl Into<String>) {
        self.app_name = name.into();
    }

    // ── resources ────────────────────────────────────────────────────────

    /// Loads a PNG with clamped addressing.
    pub fn open_texture(&self, path: impl AsRef<Path>) -> Result<Texture> {
        self.open_texture_with(path, TextureWrap::Clamp)
    }

    pub fn open_texture_with(&self, path: impl AsRef<Path>, wrap: TextureWrap) -> Result<Texture> {
        let path = path.as_ref();
        let image = RgbaImage::open(path)?;
        self.textures
            .create_texture(&path.display().to_string(), &image, wrap)
            .with_context(|| format!("creating texture for {}", path.display()))
    }

    /// Uploads pixels generated at runtime.
    pub fn create_texture(&self, label: &str, image: &RgbaImage, wrap: TextureWrap) -> Result<Texture> {
        self.textures.create_texture(label, image, wrap)
    }

    pub fn open_sheet(&self, path: impl AsRef<Path>) -> Result<Arc<Sheet>> {
        Ok(Arc::new(Sheet::open(path)?))
    }

    pub fn open_map(&self, path: impl AsRef<Path>) -> Result<TileMap> {
        TileMap::open(path)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("app_name", &self.app_name)
            .field("phase", &self.graphics.phase())
            .field("queued", &self.graphics.queued())
            .field("spawned", &self.spawned.len())
            .field("scene_pending", &self.next_scene.is_some())
            .field("exit_requested", &self.exit_requested)
            .finish_non_exhaustive()
    }
}
