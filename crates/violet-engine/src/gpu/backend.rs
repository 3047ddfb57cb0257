use anyhow::Result;

use crate::coords::Mat4;
use crate::graphics::{RgbaImage, ShaderId, Texture, TextureFilter, TextureWrap};

/// Immediate-mode GPU interface driven by the batcher and the shaders.
///
/// Calls arrive in submission order for one frame. Backends are free to record
/// them and replay later (the wgpu backend does), but must preserve that order.
pub trait GpuBackend {
    fn activate_shader(&mut self, shader: ShaderId);

    fn bind_texture(&mut self, unit: u8, texture: &Texture, filter: TextureFilter);

    fn unbind_texture(&mut self, unit: u8);

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4);

    /// Replaces the vertex range consumed by the next `draw`.
    fn upload_vertices(&mut self, bytes: &[u8]);

    /// Draws `vertex_count` vertices from the last upload as a triangle list.
    fn draw(&mut self, vertex_count: u32);
}

/// Creates textures from decoded pixels.
pub trait TextureFactory {
    fn create_texture(&self, label: &str, image: &RgbaImage, wrap: TextureWrap) -> Result<Texture>;
}

/// Factory producing textures without GPU storage (headless runs, tests).
#[derive(Debug, Copy, Clone, Default)]
pub struct DetachedTextures;

impl TextureFactory for DetachedTextures {
    fn create_texture(&self, label: &str, image: &RgbaImage, _wrap: TextureWrap) -> Result<Texture> {
        Ok(Texture::detached(label, image.width, image.height))
    }
}
