use crate::coords::Size;

/// How one view axis reacts to the window size.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ViewResize {
    /// Keep the base size; the image is stretched to the window.
    #[default]
    Scale,
    /// Grow or shrink the axis to follow the window's aspect ratio.
    Expand,
}

impl ViewResize {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            ViewResize::Scale => ViewResize::Expand,
            ViewResize::Expand => ViewResize::Scale,
        }
    }
}

/// Logical view sizing: a base size plus a resize mode per axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewConfig {
    pub base: Size,
    pub resize_x: ViewResize,
    pub resize_y: ViewResize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            base: Size::new(448.0, 256.0),
            resize_x: ViewResize::Expand,
            resize_y: ViewResize::Scale,
        }
    }
}

impl ViewConfig {
    /// Logical view size for a window of `window` pixels, in whole pixels.
    ///
    /// `Expand` on one axis derives it from the other axis's base size and the
    /// window aspect ratio; `Expand` on both axes uses the window size as is.
    pub fn view_size(&self, window: Size) -> Size {
        let both = self.resize_x == ViewResize::Expand && self.resize_y == ViewResize::Expand;

        let width = match self.resize_x {
            ViewResize::Scale => self.base.width,
            ViewResize::Expand if both => window.width,
            ViewResize::Expand => self.base.height * ratio(window.width, window.height),
        };
        let height = match self.resize_y {
            ViewResize::Scale => self.base.height,
            ViewResize::Expand if both => window.height,
            ViewResize::Expand => self.base.width * ratio(window.height, window.width),
        };

        Size::new(width.floor(), height.floor())
    }
}

// A minimised window reports 0; keep the base aspect in that case.
#[inline]
fn ratio(num: f32, den: f32) -> f32 {
    if num > 0.0 && den > 0.0 { num / den } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_expands_width_from_height() {
        let v = ViewConfig::default();
        assert_eq!(v.view_size(Size::new(1280.0, 720.0)), Size::new(455.0, 256.0));
    }

    #[test]
    fn scale_both_keeps_base() {
        let v = ViewConfig {
            resize_x: ViewResize::Scale,
            ..ViewConfig::default()
        };
        assert_eq!(v.view_size(Size::new(1920.0, 1080.0)), Size::new(448.0, 256.0));
    }

    #[test]
    fn expand_y_from_width() {
        let v = ViewConfig {
            resize_x: ViewResize::Scale,
            resize_y: ViewResize::Expand,
            ..ViewConfig::default()
        };
        assert_eq!(v.view_size(Size::new(800.0, 600.0)), Size::new(448.0, 336.0));
    }

    #[test]
    fn expand_both_uses_window() {
        let v = ViewConfig {
            resize_x: ViewResize::Expand,
            resize_y: ViewResize::Expand,
            ..ViewConfig::default()
        };
        assert_eq!(v.view_size(Size::new(640.0, 480.0)), Size::new(640.0, 480.0));
    }

    #[test]
    fn zero_window_does_not_divide_by_zero() {
        let v = ViewConfig::default();
        assert_eq!(v.view_size(Size::new(0.0, 0.0)), Size::new(256.0, 256.0));
    }

    #[test]
    fn toggle() {
        assert_eq!(ViewResize::Scale.toggled(), ViewResize::Expand);
        assert_eq!(ViewResize::Expand.toggled(), ViewResize::Scale);
    }
}
