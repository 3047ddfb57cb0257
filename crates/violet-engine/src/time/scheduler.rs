use crate::error::ResourceError;

use super::ClockSource;

/// Which optional passes are due this frame.
///
/// The logic pass always runs; fixed runs before draw when both are due.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FramePlan {
    pub fixed: bool,
    pub draw: bool,
}

/// Derives the update/fixed/draw cadences from a single clock.
///
/// Ticks are milliseconds since `start()`. Deltas are expressed in logic frames
/// (`elapsed_ms * game_fps / 1000`), so a frame that took exactly one logic
/// period has a delta of 1.0.
pub struct FrameScheduler {
    clock: Box<dyn ClockSource>,
    start_tick: f64,

    current_tick: f64,
    update_tick: f64,
    fixed_tick: f64,
    draw_tick: f64,

    game_fps: f32,
    draw_fps: f32,
    vsync: bool,

    plan: FramePlan,

    update_freq: f32,
    update_fps: f32,
    update_delta: f32,

    draw_freq: f32,
    measured_draw_fps: f32,
    draw_delta: f32,
}

impl FrameScheduler {
    pub const DEFAULT_FPS: f32 = 60.0;

    pub fn new(clock: Box<dyn ClockSource>) -> Self {
        Self {
            clock,
            start_tick: 0.0,
            current_tick: 0.0,
            update_tick: 0.0,
            fixed_tick: 0.0,
            draw_tick: 0.0,
            game_fps: Self::DEFAULT_FPS,
            draw_fps: Self::DEFAULT_FPS,
            vsync: true,
            plan: FramePlan::default(),
            update_freq: 0.0,
            update_fps: 0.0,
            update_delta: 0.0,
            draw_freq: 0.0,
            measured_draw_fps: 0.0,
            draw_delta: 0.0,
        }
    }

    /// Resets the epoch to "now" and aligns every reference tick to it.
    pub fn start(&mut self) {
        self.start_tick = self.clock.now_ms();
        self.current_tick = 0.0;
        self.update_tick = 0.0;
        self.fixed_tick = 0.0;
        self.draw_tick = 0.0;
        self.plan = FramePlan::default();
    }

    /// Milliseconds since `start()`.
    #[inline]
    pub fn ticks(&self) -> f64 {
        self.clock.now_ms() - self.start_tick
    }

    /// Samples the clock and decides which gated passes run this frame.
    pub fn begin_frame(&mut self) -> FramePlan {
        self.current_tick = self.ticks();

        let fixed = self.current_tick - self.fixed_tick >= period_ms(self.game_fps);
        let draw = self.vsync || self.current_tick - self.draw_tick >= period_ms(self.draw_fps);

        self.plan = FramePlan { fixed, draw };
        self.plan
    }

    /// Updates deltas from the tick sampled in `begin_frame` and resets the
    /// reference tick of every pass that fired.
    pub fn end_frame(&mut self) {
        let logic_per_ms = self.game_fps / 1000.0;

        self.update_freq = (self.current_tick - self.update_tick) as f32;
        self.update_fps = rate_from_period(self.update_freq);
        self.update_delta = self.update_freq * logic_per_ms;
        self.update_tick = self.current_tick;

        if self.plan.fixed {
            self.fixed_tick = self.current_tick;
        }

        if self.plan.draw {
            self.draw_freq = (self.current_tick - self.draw_tick) as f32;
            self.measured_draw_fps = rate_from_period(self.draw_freq);
            self.draw_delta = self.draw_freq * logic_per_ms;
            self.draw_tick = self.current_tick;
        }
    }

    /// Sets the logic rate. Non-positive (or NaN) rates are rejected and the
    /// previous rate is kept.
    pub fn set_game_fps(&mut self, fps: f32) -> Result<(), ResourceError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ResourceError::InvalidFps(fps));
        }
        self.game_fps = fps;
        Ok(())
    }

    /// Sets the display rate used when vsync is off. Unknown (non-positive)
    /// rates fall back to 60.
    pub fn set_draw_fps(&mut self, fps: f32) {
        self.draw_fps = if fps > 0.0 && fps.is_finite() {
            fps
        } else {
            Self::DEFAULT_FPS
        };
    }

    #[inline]
    pub fn set_vsync(&mut self, vsync: bool) {
        self.vsync = vsync;
    }

    #[inline]
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    #[inline]
    pub fn plan(&self) -> FramePlan {
        self.plan
    }

    #[inline]
    pub fn current_tick(&self) -> f64 {
        self.current_tick
    }

    #[inline]
    pub fn game_fps(&self) -> f32 {
        self.game_fps
    }

    /// Target display rate.
    #[inline]
    pub fn draw_fps(&self) -> f32 {
        self.draw_fps
    }

    /// Instantaneous logic-pass rate measured over the last frame.
    #[inline]
    pub fn update_fps(&self) -> f32 {
        self.update_fps
    }

    #[inline]
    pub fn update_delta(&self) -> f32 {
        self.update_delta
    }

    /// Instantaneous draw rate measured between the last two draw passes.
    #[inline]
    pub fn measured_draw_fps(&self) -> f32 {
        self.measured_draw_fps
    }

    #[inline]
    pub fn draw_delta(&self) -> f32 {
        self.draw_delta
    }

    #[inline]
    pub fn update_freq_ms(&self) -> f32 {
        self.update_freq
    }

    #[inline]
    pub fn draw_freq_ms(&self) -> f32 {
        self.draw_freq
    }
}

#[inline]
fn period_ms(fps: f32) -> f64 {
    1000.0 / f64::from(fps)
}

// A zero-length frame reports 0 instead of infinity.
#[inline]
fn rate_from_period(freq_ms: f32) -> f32 {
    if freq_ms > 0.0 { 1000.0 / freq_ms } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn scheduler(start_ms: f64) -> (FrameScheduler, ManualClock) {
        let clock = ManualClock::new(start_ms);
        let mut s = FrameScheduler::new(Box::new(clock.clone()));
        s.start();
        (s, clock)
    }

    // ── epoch ────────────────────────────────────────────────────────────

    #[test]
    fn ticks_are_relative_to_start() {
        let (s, clock) = scheduler(5_000.0);
        assert_eq!(s.ticks(), 0.0);
        clock.advance(12.5);
        assert_eq!(s.ticks(), 12.5);
    }

    // ── gating ───────────────────────────────────────────────────────────

    #[test]
    fn fixed_not_due_before_one_period() {
        let (mut s, clock) = scheduler(0.0);
        clock.advance(10.0);
        assert!(!s.begin_frame().fixed);
        s.end_frame();
        clock.advance(7.0);
        assert!(s.begin_frame().fixed);
    }

    #[test]
    fn draw_without_vsync_follows_draw_rate() {
        let (mut s, clock) = scheduler(0.0);
        s.set_vsync(false);
        s.set_draw_fps(50.0);

        clock.advance(19.0);
        assert!(!s.begin_frame().draw);
        s.end_frame();

        clock.advance(1.0);
        assert!(s.begin_frame().draw);
        s.end_frame();

        clock.advance(5.0);
        assert!(!s.begin_frame().draw);
    }

    #[test]
    fn draw_always_due_with_vsync() {
        let (mut s, clock) = scheduler(0.0);
        for _ in 0..5 {
            clock.advance(1.0);
            assert!(s.begin_frame().draw);
            s.end_frame();
        }
    }

    #[test]
    fn steady_60hz_with_vsync_runs_one_fixed_and_one_draw_per_frame() {
        let (mut s, clock) = scheduler(250.0);
        let mut fixed = 0;
        let mut drawn = 0;

        for frame in 1..=600 {
            clock.advance(16.667);
            let plan = s.begin_frame();
            assert!(plan.fixed, "frame {frame} skipped its fixed tick");
            assert!(plan.draw, "frame {frame} skipped its draw");
            fixed += usize::from(plan.fixed);
            drawn += usize::from(plan.draw);
            s.end_frame();

            assert!((s.update_delta() - 1.0).abs() < 1e-3, "frame {frame}: {}", s.update_delta());
            assert!((s.draw_delta() - 1.0).abs() < 1e-3, "frame {frame}: {}", s.draw_delta());
        }

        assert_eq!((fixed, drawn), (600, 600));
        assert!((s.update_fps() - 60.0).abs() < 0.01);
    }

    // ── deltas ───────────────────────────────────────────────────────────

    #[test]
    fn update_delta_is_in_logic_frames() {
        let (mut s, clock) = scheduler(0.0);
        clock.advance(1000.0 / 30.0);
        s.begin_frame();
        s.end_frame();
        assert!((s.update_delta() - 2.0).abs() < 1e-3);
        assert!((s.update_fps() - 30.0).abs() < 1e-2);
    }

    #[test]
    fn draw_delta_only_updates_when_drawn() {
        let (mut s, clock) = scheduler(0.0);
        s.set_vsync(false);

        clock.advance(20.0);
        s.begin_frame();
        s.end_frame();
        assert!(s.draw_delta() > 0.0);
        let previous = s.draw_delta();

        clock.advance(1.0);
        assert!(!s.begin_frame().draw);
        s.end_frame();
        assert_eq!(s.draw_delta(), previous);
    }

    #[test]
    fn zero_length_frame_reports_zero_fps() {
        let (mut s, _clock) = scheduler(0.0);
        s.begin_frame();
        s.end_frame();
        assert_eq!(s.update_fps(), 0.0);
        assert_eq!(s.update_delta(), 0.0);
    }

    // ── configuration ────────────────────────────────────────────────────

    #[test]
    fn non_positive_game_fps_is_rejected() {
        let (mut s, _clock) = scheduler(0.0);
        assert!(matches!(s.set_game_fps(0.0), Err(ResourceError::InvalidFps(_))));
        assert!(s.set_game_fps(-1.0).is_err());
        assert!(s.set_game_fps(f32::NAN).is_err());
        assert_eq!(s.game_fps(), 60.0);
        assert!(s.set_game_fps(120.0).is_ok());
        assert_eq!(s.game_fps(), 120.0);
    }

    #[test]
    fn unknown_draw_fps_falls_back_to_60() {
        let (mut s, _clock) = scheduler(0.0);
        s.set_draw_fps(0.0);
        assert_eq!(s.draw_fps(), 60.0);
        s.set_draw_fps(144.0);
        assert_eq!(s.draw_fps(), 144.0);
    }
}
