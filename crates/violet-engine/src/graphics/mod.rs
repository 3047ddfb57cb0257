//! Sprite batching and draw ordering.
//!
//! Draw calls are buffered per frame and flushed in one deterministic pass:
//! - slots are walked by `(layer, phase)` key, `0..1024`
//! - within a slot, by shader (first use order), then by texture binding set
//! - each binding-set bucket gets exactly one bind/unbind sequence
//!
//! There is no depth buffer; slot order is the only ordering guarantee.

mod batch;
mod layer;
mod renderer;
mod shader;
mod sheet;
mod sprite;
mod sprite_shader;
mod texture;
mod view;

pub use batch::{FlushStats, SpriteBatcher};
pub use layer::{LayerKey, LayerPhase, LAYER_COUNT, PHASE_COUNT, TOTAL_LAYER_SLOTS};
pub use renderer::Graphics;
pub use shader::{Shader, ShaderId, ShaderRegistry};
pub use sheet::{Sheet, SheetFrame, SHEET_MAGIC, SHEET_VERSION};
pub use sprite::{SpriteParams, SpriteRecord, UserData};
pub use sprite_shader::{
    sprite_quad, SpriteShader, SpriteVertex, PROJECTION_UNIFORM, SPRITE_BUFFER_SPRITES,
    SPRITE_BUFFER_VERTICES, VERTICES_PER_SPRITE,
};
pub use texture::{
    BindingSet, RgbaImage, Texture, TextureBind, TextureFilter, TextureId, TextureWrap,
    TEXTURE_UNITS,
};
pub(crate) use texture::GpuImage;
pub use view::{ViewConfig, ViewResize};
