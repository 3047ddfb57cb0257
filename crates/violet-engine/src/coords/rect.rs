use super::{Size, Vec2};

/// Source rectangle into a texture, in texels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle anchored at the origin covering `size`.
    #[inline]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    #[inline]
    pub fn origin(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Normalises the rectangle against a texture size, yielding
    /// `(u0, v0, u1, v1)` texture coordinates.
    ///
    /// A zero texture dimension is treated as 1 so that untextured draws keep
    /// finite coordinates.
    #[inline]
    pub fn uv(self, texture: Size) -> (f32, f32, f32, f32) {
        let tw = if texture.width > 0.0 { texture.width } else { 1.0 };
        let th = if texture.height > 0.0 { texture.height } else { 1.0 };
        (self.x / tw, self.y / th, self.right() / tw, self.bottom() / th)
    }
}
