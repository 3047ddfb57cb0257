use super::Button;

/// Button state for the current and the previous frame.
///
/// The platform layer calls `set` as events arrive; the engine calls
/// `new_frame` once at the top of every frame.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    down: [bool; Button::COUNT],
    previous: [bool; Button::COUNT],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the current state as "previous".
    pub fn new_frame(&mut self) {
        self.previous = self.down;
    }

    pub fn set(&mut self, button: Button, down: bool) {
        self.down[button.index()] = down;
    }

    /// Releases everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.down = [false; Button::COUNT];
    }

    /// Held this frame.
    #[inline]
    pub fn pressed(&self, button: Button) -> bool {
        self.down[button.index()]
    }

    /// Went down this frame.
    #[inline]
    pub fn tapped(&self, button: Button) -> bool {
        self.down[button.index()] && !self.previous[button.index()]
    }

    /// Went up this frame.
    #[inline]
    pub fn released(&self, button: Button) -> bool {
        !self.down[button.index()] && self.previous[button.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_lasts_one_frame() {
        let mut input = InputState::new();
        input.new_frame();
        input.set(Button::A, true);
        assert!(input.pressed(Button::A));
        assert!(input.tapped(Button::A));

        input.new_frame();
        assert!(input.pressed(Button::A));
        assert!(!input.tapped(Button::A));
    }

    #[test]
    fn release_is_reported_once() {
        let mut input = InputState::new();
        input.set(Button::Left, true);
        input.new_frame();
        input.set(Button::Left, false);
        assert!(input.released(Button::Left));
        assert!(!input.pressed(Button::Left));

        input.new_frame();
        assert!(!input.released(Button::Left));
    }

    #[test]
    fn press_and_release_within_a_frame_is_invisible() {
        let mut input = InputState::new();
        input.new_frame();
        input.set(Button::B, true);
        input.set(Button::B, false);
        assert!(!input.tapped(Button::B));
        assert!(!input.released(Button::B));
    }

    #[test]
    fn release_all_clears_current_only() {
        let mut input = InputState::new();
        for b in Button::ALL {
            input.set(b, true);
        }
        input.new_frame();
        input.release_all();
        assert!(Button::ALL.iter().all(|&b| input.released(b)));
    }
}
