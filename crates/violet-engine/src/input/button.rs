/// Virtual gamepad button.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Left,
    Right,
    Up,
    Down,
    LeftBumper,
    LeftStick,
    RightBumper,
    RightStick,
}

impl Button {
    pub const COUNT: usize = 12;

    pub const ALL: [Button; Button::COUNT] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Left,
        Button::Right,
        Button::Up,
        Button::Down,
        Button::LeftBumper,
        Button::LeftStick,
        Button::RightBumper,
        Button::RightStick,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Runtime shortcuts handled by the window layer, not the game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HotKey {
    ToggleVsync,
    ToggleFullscreen,
    ToggleResizeX,
    ToggleResizeY,
}
