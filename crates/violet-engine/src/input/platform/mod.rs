//! winit key translation.

mod keys;

pub use keys::{KeyAction, button_for_key, hot_key, translate_key_event};
