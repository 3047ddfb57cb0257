//! GPU seam.
//!
//! - `GpuBackend`: the calls the batcher and shaders make
//! - `TextureFactory`: texture creation from decoded pixels
//! - `RecordingBackend`: in-memory command log for headless runs and tests
//!
//! The wgpu implementation lives in `render`.

mod backend;
mod recording;

pub use backend::{DetachedTextures, GpuBackend, TextureFactory};
pub use recording::{GpuCommand, RecordingBackend};
