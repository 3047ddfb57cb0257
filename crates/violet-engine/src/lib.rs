//! Violet engine crate.
//!
//! A small real-time 2D engine: a frame scheduler with decoupled update and
//! draw rates, a layered sprite batcher, VIOLMAP tilemaps and VIOLSPR sprite
//! sheets, a streaming music mixer, and a winit/wgpu runtime to host it all.

pub mod core;
pub mod device;
pub mod input;
pub mod time;
pub mod window;

pub mod audio;
pub mod coords;
pub mod error;
pub mod gpu;
pub mod graphics;
pub mod io;
pub mod logging;
pub mod map;
pub mod render;
