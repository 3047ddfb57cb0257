//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, wires keyboard input into the
//! engine, and presents each drawn frame through the wgpu backend.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
