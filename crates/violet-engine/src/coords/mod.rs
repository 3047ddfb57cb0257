//! Coordinate and geometry types shared by the batcher, the tilemap and the GPU backends.
//!
//! Canonical CPU space:
//! - logical view pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! The sprite shader converts to clip space with the view projection uploaded each flush.

mod color;
mod mat4;
mod rect;
mod size;
mod vec2;

pub use color::ColorRgba;
pub use mat4::Mat4;
pub use rect::Rect;
pub use size::Size;
pub use vec2::Vec2;
