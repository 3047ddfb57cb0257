use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::coords::{ColorRgba, Rect, Vec2};

use super::ShaderId;

/// Opaque payload forwarded to a custom shader's `append_sprite`.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Caller-facing draw parameters.
///
/// ```ignore
/// let p = SpriteParams::new(2, Vec2::new(40.0, 16.0))
///     .scale(Vec2::new(2.0, 2.0))
///     .alpha(0.5);
/// ```
#[derive(Clone)]
pub struct SpriteParams {
    pub layer: u8,
    pub position: Vec2,
    pub scale: Vec2,
    /// Degrees, clockwise on screen.
    pub angle: f32,
    pub color: ColorRgba,
    pub shader: Option<ShaderId>,
    pub user_data: Option<UserData>,
}

impl SpriteParams {
    pub fn new(layer: u8, position: Vec2) -> Self {
        Self {
            layer,
            position,
            scale: Vec2::one(),
            angle: 0.0,
            color: ColorRgba::white(),
            shader: None,
            user_data: None,
        }
    }

    pub fn scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn color(mut self, color: ColorRgba) -> Self {
        self.color = color;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.color.a = alpha;
        self
    }

    pub fn shader(mut self, shader: ShaderId) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn user_data(mut self, data: UserData) -> Self {
        self.user_data = Some(data);
        self
    }

    /// Resolves the parameters against a source rectangle and pivot.
    /// An unset shader resolves to the built-in sprite shader.
    pub fn into_record(self, source: Rect, origin: Vec2) -> SpriteRecord {
        SpriteRecord {
            source,
            layer: self.layer,
            position: self.position,
            origin,
            scale: self.scale,
            angle: self.angle,
            color: self.color,
            shader: self.shader.unwrap_or(ShaderId::SPRITE),
            user_data: self.user_data,
        }
    }
}

impl fmt::Debug for SpriteParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteParams")
            .field("layer", &self.layer)
            .field("position", &self.position)
            .field("scale", &self.scale)
            .field("angle", &self.angle)
            .field("color", &self.color)
            .field("shader", &self.shader)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

/// One queued sprite draw. Lives until the next flush.
#[derive(Clone)]
pub struct SpriteRecord {
    /// Source rectangle in texels of the unit-0 texture.
    pub source: Rect,
    pub layer: u8,
    pub position: Vec2,
    /// Pivot, relative to the source rectangle's top-left.
    pub origin: Vec2,
    pub scale: Vec2,
    pub angle: f32,
    pub color: ColorRgba,
    pub shader: ShaderId,
    pub user_data: Option<UserData>,
}

impl SpriteRecord {
    /// Untransformed quad with no pivot, for tests and simple draws.
    pub fn simple(layer: u8, position: Vec2, source: Rect) -> Self {
        SpriteParams::new(layer, position).into_record(source, Vec2::zero())
    }
}

impl fmt::Debug for SpriteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteRecord")
            .field("source", &self.source)
            .field("layer", &self.layer)
            .field("position", &self.position)
            .field("origin", &self.origin)
            .field("scale", &self.scale)
            .field("angle", &self.angle)
            .field("color", &self.color)
            .field("shader", &self.shader)
            .finish_non_exhaustive()
    }
}
