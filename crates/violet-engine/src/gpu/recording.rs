use crate::coords::Mat4;
use crate::graphics::{ShaderId, SpriteVertex, Texture, TextureFilter, TextureId};

use super::GpuBackend;

/// One call received by `RecordingBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    ActivateShader(ShaderId),
    BindTexture {
        unit: u8,
        texture: TextureId,
        filter: TextureFilter,
    },
    UnbindTexture {
        unit: u8,
    },
    SetUniformMat4 {
        name: String,
        value: Mat4,
    },
    UploadVertices {
        bytes: Vec<u8>,
    },
    Draw {
        vertex_count: u32,
    },
}

/// Backend that draws nothing and remembers every call.
///
/// Used for headless runs and as the assertion surface in tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<GpuCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GpuCommand::Draw { .. }))
            .count()
    }

    /// Vertex count of every draw, in order.
    pub fn draw_counts(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::Draw { vertex_count } => Some(*vertex_count),
                _ => None,
            })
            .collect()
    }

    /// Every uploaded vertex, decoded as `SpriteVertex`, in upload order.
    pub fn vertices(&self) -> Vec<SpriteVertex> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::UploadVertices { bytes } => Some(bytes),
                _ => None,
            })
            .flat_map(|bytes| bytes.chunks_exact(size_of::<SpriteVertex>()))
            .map(bytemuck::pod_read_unaligned::<SpriteVertex>)
            .collect()
    }
}

impl GpuBackend for RecordingBackend {
    fn activate_shader(&mut self, shader: ShaderId) {
        self.commands.push(GpuCommand::ActivateShader(shader));
    }

    fn bind_texture(&mut self, unit: u8, texture: &Texture, filter: TextureFilter) {
        self.commands.push(GpuCommand::BindTexture {
            unit,
            texture: texture.id(),
            filter,
        });
    }

    fn unbind_texture(&mut self, unit: u8) {
        self.commands.push(GpuCommand::UnbindTexture { unit });
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) {
        self.commands.push(GpuCommand::SetUniformMat4 {
            name: name.to_string(),
            value: *value,
        });
    }

    fn upload_vertices(&mut self, bytes: &[u8]) {
        self.commands.push(GpuCommand::UploadVertices {
            bytes: bytes.to_vec(),
        });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.commands.push(GpuCommand::Draw { vertex_count });
    }
}
