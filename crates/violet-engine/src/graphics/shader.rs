use crate::coords::Size;
use crate::gpu::GpuBackend;

use super::{BindingSet, SpriteRecord, SpriteShader};

/// Handle of a shader registered with `Graphics`.
///
/// Bucket identity within a layer slot is handle equality.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u16);

impl ShaderId {
    /// The built-in textured-quad shader, always registered.
    pub const SPRITE: ShaderId = ShaderId(0);

    #[inline]
    pub const fn from_index(index: u16) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Turns batched sprite records into GPU work.
///
/// The batcher activates the shader and binds textures before `begin_batch`,
/// then streams every record of one bucket through `append_sprite` and closes
/// the bucket with `end_batch`. Implementations may draw early (for instance
/// when a vertex buffer fills) but must have drawn everything by the end of
/// `end_batch`.
pub trait Shader {
    fn name(&self) -> &str;

    fn begin_batch(&mut self, gpu: &mut dyn GpuBackend, view: Size);

    fn append_sprite(&mut self, gpu: &mut dyn GpuBackend, bindings: &BindingSet, sprite: &SpriteRecord);

    fn end_batch(&mut self, gpu: &mut dyn GpuBackend);
}

/// Owns every shader; `ShaderId` indexes into it.
pub struct ShaderRegistry {
    shaders: Vec<Box<dyn Shader>>,
}

impl ShaderRegistry {
    /// Registry holding only the built-in sprite shader.
    pub fn new() -> Self {
        Self {
            shaders: vec![Box::new(SpriteShader::new())],
        }
    }

    pub fn register(&mut self, shader: Box<dyn Shader>) -> ShaderId {
        let id = ShaderId(self.shaders.len() as u16);
        log::debug!("shader registered: {} ({id:?})", shader.name());
        self.shaders.push(shader);
        id
    }

    #[inline]
    pub fn get_mut(&mut self, id: ShaderId) -> Option<&mut (dyn Shader + 'static)> {
        self.shaders.get_mut(id.index()).map(|s| s.as_mut())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
