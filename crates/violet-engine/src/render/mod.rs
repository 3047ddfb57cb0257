//! wgpu rendering.
//!
//! `WgpuBackend` implements `GpuBackend` by recording the batcher's calls and
//! replaying them into one render pass per frame.
//!
//! Convention:
//! - CPU geometry is in logical view pixels (top-left origin, +Y down)
//! - the vertex shader converts to clip space with the uploaded projection

mod backend;
mod ctx;
mod texture;

pub use backend::WgpuBackend;
pub use ctx::{RenderCtx, RenderTarget};
pub use texture::WgpuTextureFactory;
