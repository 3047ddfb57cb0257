use bytemuck::{Pod, Zeroable};

use crate::coords::{Mat4, Rect, Size, Vec2};
use crate::gpu::GpuBackend;

use super::{BindingSet, Shader, SpriteRecord};

/// Sprites buffered before a forced draw.
pub const SPRITE_BUFFER_SPRITES: usize = 1024;

pub const VERTICES_PER_SPRITE: usize = 6;

pub const SPRITE_BUFFER_VERTICES: usize = SPRITE_BUFFER_SPRITES * VERTICES_PER_SPRITE;

/// Uniform carrying the view projection.
pub const PROJECTION_UNIFORM: &str = "projection";

/// Vertex layout shared by every sprite program (`@location(0..=2)`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub pos: [f32; 2],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

/// Built-in textured-quad emitter.
///
/// Each record becomes two triangles (6 vertices). The buffer holds
/// `SPRITE_BUFFER_SPRITES` quads; filling it issues a draw immediately so no
/// sprite is ever dropped or split.
pub struct SpriteShader {
    vertices: Vec<SpriteVertex>,
}

impl SpriteShader {
    pub fn new() -> Self {
        Self {
            vertices: Vec::with_capacity(SPRITE_BUFFER_VERTICES),
        }
    }

    /// Vertices buffered since the last draw.
    #[inline]
    pub fn pending_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn flush(&mut self, gpu: &mut dyn GpuBackend) {
        if self.vertices.is_empty() {
            return;
        }
        gpu.upload_vertices(bytemuck::cast_slice(&self.vertices));
        gpu.draw(self.vertices.len() as u32);
        self.vertices.clear();
    }
}

impl Default for SpriteShader {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the 6 vertices of one sprite quad.
///
/// Corners are the source size offset by `-origin`, transformed by
/// translate(position) · rotate(angle) · scale. Order: top-left, bottom-left,
/// top-right, bottom-left, bottom-right, top-right.
pub fn sprite_quad(sprite: &SpriteRecord, texture_size: Size) -> [SpriteVertex; VERTICES_PER_SPRITE] {
    let m = Mat4::transform_2d(sprite.position, sprite.scale, sprite.angle);
    let Rect { w, h, .. } = sprite.source;
    let o = sprite.origin;

    let p0 = m.transform_point(Vec2::new(-o.x, -o.y));
    let p1 = m.transform_point(Vec2::new(-o.x, -o.y + h));
    let p2 = m.transform_point(Vec2::new(-o.x + w, -o.y));
    let p3 = m.transform_point(Vec2::new(-o.x + w, -o.y + h));

    let (u0, v0, u1, v1) = sprite.source.uv(texture_size);
    let color = sprite.color.to_array();

    let vert = |p: Vec2, u: f32, v: f32| SpriteVertex {
        pos: [p.x, p.y],
        color,
        uv: [u, v],
    };

    let tl = vert(p0, u0, v0);
    let bl = vert(p1, u0, v1);
    let tr = vert(p2, u1, v0);
    let br = vert(p3, u1, v1);

    [tl, bl, tr, bl, br, tr]
}

impl Shader for SpriteShader {
    fn name(&self) -> &str {
        "sprite"
    }

    fn begin_batch(&mut self, gpu: &mut dyn GpuBackend, view: Size) {
        gpu.set_uniform_mat4(PROJECTION_UNIFORM, &Mat4::view_projection(view.width, view.height));
    }

    fn append_sprite(&mut self, gpu: &mut dyn GpuBackend, bindings: &BindingSet, sprite: &SpriteRecord) {
        // Untextured draws normalise against a 1x1 texture.
        let texture_size = bindings
            .primary()
            .map(|t| t.size())
            .unwrap_or(Size::new(1.0, 1.0));

        self.vertices.extend_from_slice(&sprite_quad(sprite, texture_size));

        if self.vertices.len() >= SPRITE_BUFFER_VERTICES {
            self.flush(gpu);
        }
    }

    fn end_batch(&mut self, gpu: &mut dyn GpuBackend) {
        self.flush(gpu);
    }
}
