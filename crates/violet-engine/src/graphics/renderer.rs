use crate::coords::{ColorRgba, Rect, Size, Vec2};
use crate::gpu::GpuBackend;

use super::{
    BindingSet, FlushStats, LayerPhase, Shader, ShaderId, ShaderRegistry, SpriteBatcher,
    SpriteParams, SpriteRecord, Texture, TextureFilter, ViewConfig, ViewResize,
};

/// Per-frame sprite front end: draw calls go in during the logic/draw passes,
/// `flush` turns them into GPU work once per drawn frame.
///
/// The engine sets the current phase around each callback, so a draw issued
/// from an actor lands in the Actor phase of its layer without the caller
/// having to say so.
pub struct Graphics {
    batcher: SpriteBatcher,
    shaders: ShaderRegistry,
    phase: LayerPhase,
    view: ViewConfig,
    window_size: Size,
    background: ColorRgba,
}

impl Graphics {
    pub fn new(view: ViewConfig, background: ColorRgba) -> Self {
        Self {
            batcher: SpriteBatcher::new(),
            shaders: ShaderRegistry::new(),
            phase: LayerPhase::UpdateStart,
            window_size: view.base,
            view,
            background,
        }
    }

    // ── draw calls ───────────────────────────────────────────────────────

    /// Queues a sprite in the current phase.
    #[inline]
    pub fn add_sprite(&mut self, bindings: BindingSet, sprite: SpriteRecord) {
        self.batcher.enqueue(self.phase, bindings, sprite);
    }

    #[inline]
    pub fn add_sprite_in(&mut self, phase: LayerPhase, bindings: BindingSet, sprite: SpriteRecord) {
        self.batcher.enqueue(phase, bindings, sprite);
    }

    /// Draws the whole texture with its top-left at `params.position`.
    pub fn draw_texture(&mut self, texture: &Texture, filter: TextureFilter, params: SpriteParams) {
        let source = Rect::from_size(texture.size());
        self.draw_texture_region(texture, filter, source, params);
    }

    /// Draws a sub-rectangle of `texture` with no pivot offset.
    pub fn draw_texture_region(
        &mut self,
        texture: &Texture,
        filter: TextureFilter,
        source: Rect,
        params: SpriteParams,
    ) {
        let record = params.into_record(source, Vec2::zero());
        self.add_sprite(BindingSet::single(texture, filter), record);
    }

    /// Draws and clears everything queued this frame.
    pub fn flush(&mut self, gpu: &mut dyn GpuBackend) -> FlushStats {
        let view = self.view_size();
        self.batcher.flush(gpu, &mut self.shaders, view)
    }

    /// Drops queued sprites without drawing (e.g. after an aborted frame).
    pub fn discard(&mut self) {
        self.batcher.clear();
    }

    #[inline]
    pub fn queued(&self) -> usize {
        self.batcher.len()
    }

    // ── shaders ──────────────────────────────────────────────────────────

    pub fn register_shader(&mut self, shader: Box<dyn Shader>) -> ShaderId {
        self.shaders.register(shader)
    }

    #[inline]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    // ── phase ────────────────────────────────────────────────────────────

    #[inline]
    pub fn phase(&self) -> LayerPhase {
        self.phase
    }

    #[inline]
    pub(crate) fn set_phase(&mut self, phase: LayerPhase) {
        self.phase = phase;
    }

    // ── view ─────────────────────────────────────────────────────────────

    /// Current logical view size derived from the window size.
    #[inline]
    pub fn view_size(&self) -> Size {
        self.view.view_size(self.window_size)
    }

    #[inline]
    pub fn window_size(&self) -> Size {
        self.window_size
    }

    #[inline]
    pub fn set_window_size(&mut self, size: Size) {
        self.window_size = size;
    }

    #[inline]
    pub fn base_view_size(&self) -> Size {
        self.view.base
    }

    #[inline]
    pub fn set_base_view_size(&mut self, size: Size) {
        self.view.base = size;
    }

    #[inline]
    pub fn view_resize(&self) -> (ViewResize, ViewResize) {
        (self.view.resize_x, self.view.resize_y)
    }

    #[inline]
    pub fn set_view_resize(&mut self, x: ViewResize, y: ViewResize) {
        self.view.resize_x = x;
        self.view.resize_y = y;
    }

    #[inline]
    pub fn background(&self) -> ColorRgba {
        self.background
    }

    #[inline]
    pub fn set_background(&mut self, color: ColorRgba) {
        self.background = color;
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new(ViewConfig::default(), ColorRgba::black())
    }
}
