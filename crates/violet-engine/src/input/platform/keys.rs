use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{Button, HotKey};

/// What a keyboard event means to the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyAction {
    Button { button: Button, down: bool },
    HotKey(HotKey),
}

/// Translates a winit key event. Key repeats only matter for buttons, which
/// ignore them; hot keys fire on the initial press.
pub fn translate_key_event(event: &KeyEvent) -> Option<KeyAction> {
    let PhysicalKey::Code(code) = event.physical_key else {
        return None;
    };
    let down = event.state == ElementState::Pressed;

    if let Some(button) = button_for_key(code) {
        return Some(KeyAction::Button { button, down });
    }
    if down && !event.repeat {
        return hot_key(code).map(KeyAction::HotKey);
    }
    None
}

/// Keyboard layout for the virtual pad: arrows, Z/X/A/S for A/B/X/Y, Q/W for the bumpers.
pub fn button_for_key(code: KeyCode) -> Option<Button> {
    let button = match code {
        KeyCode::ArrowLeft => Button::Left,
        KeyCode::ArrowRight => Button::Right,
        KeyCode::ArrowUp => Button::Up,
        KeyCode::ArrowDown => Button::Down,
        KeyCode::KeyZ => Button::A,
        KeyCode::KeyX => Button::B,
        KeyCode::KeyA => Button::X,
        KeyCode::KeyS => Button::Y,
        KeyCode::KeyQ => Button::LeftBumper,
        KeyCode::KeyW => Button::RightBumper,
        _ => return None,
    };
    Some(button)
}

pub fn hot_key(code: KeyCode) -> Option<HotKey> {
    match code {
        KeyCode::F1 => Some(HotKey::ToggleVsync),
        KeyCode::F2 => Some(HotKey::ToggleFullscreen),
        KeyCode::F3 => Some(HotKey::ToggleResizeX),
        KeyCode::F4 => Some(HotKey::ToggleResizeY),
        _ => None,
    }
}
