//! Virtual gamepad input.
//!
//! The engine only sees `Button`s. The winit layer maps keys onto them and
//! peels off the runtime's function-key shortcuts.

mod button;
pub mod platform;
mod state;

pub use button::{Button, HotKey};
pub use state::InputState;
