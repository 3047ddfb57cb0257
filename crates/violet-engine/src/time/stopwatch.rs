use std::fmt::Write as _;

use crate::error::ResourceError;

/// Start/stop timer measured against engine ticks (milliseconds).
///
/// Tick arguments come from `FrameScheduler::ticks()`; passing them in keeps the
/// stopwatch independent of any particular clock.
#[derive(Debug, Copy, Clone)]
pub struct Stopwatch {
    start_tick: f64,
    end_tick: f64,
    stopped: bool,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self {
            start_tick: 0.0,
            end_tick: 0.0,
            stopped: true,
        }
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: f64) {
        self.stopped = false;
        self.start_tick = now_ms;
    }

    pub fn stop(&mut self, now_ms: f64) {
        self.stopped = true;
        self.end_tick = now_ms;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Elapsed time in hundredths of a second, rounded.
    pub fn centiseconds(&self, now_ms: f64) -> u64 {
        let end = if self.stopped { self.end_tick } else { now_ms };
        let elapsed = (end - self.start_tick).max(0.0);
        (elapsed / 10.0).round() as u64
    }

    pub fn seconds(&self, now_ms: f64) -> u64 {
        self.centiseconds(now_ms) / 100
    }

    pub fn minutes(&self, now_ms: f64) -> u64 {
        self.centiseconds(now_ms) / 6_000
    }

    pub fn hours(&self, now_ms: f64) -> u64 {
        self.minutes(now_ms) / 60
    }

    /// Formats the elapsed time.
    ///
    /// Tokens: `%C` centiseconds, `%S` seconds, `%M` minutes, `%H` hours,
    /// `%D` days. `%L` wraps the following unit to its natural range
    /// (`%L%S` is 0..59) and `%1`..`%9` zero-pads it to that width.
    /// Anything else after `%` is an error.
    pub fn format(&self, now_ms: f64, format: &str) -> Result<String, ResourceError> {
        let centiseconds = self.centiseconds(now_ms);
        let seconds = centiseconds / 100;
        let minutes = seconds / 60;
        let hours = minutes / 60;
        let days = hours / 24;

        let mut out = String::with_capacity(format.len() + 8);
        let mut in_token = false;
        let mut limit = false;
        let mut width = 0usize;

        for ch in format.chars() {
            if !in_token {
                if ch == '%' {
                    in_token = true;
                } else {
                    out.push(ch);
                }
                continue;
            }

            let value = match ch {
                '1'..='9' => {
                    width = ch as usize - '0' as usize;
                    continue;
                }
                'L' => {
                    limit = true;
                    continue;
                }
                'C' => wrap(centiseconds, 100, limit),
                'S' => wrap(seconds, 60, limit),
                'M' => wrap(minutes, 60, limit),
                'H' => wrap(hours, 24, limit),
                'D' => days,
                token => {
                    return Err(ResourceError::InvalidTimerFormat {
                        format: format.to_string(),
                        token,
                    });
                }
            };

            // Writing to a String cannot fail.
            let _ = write!(out, "{value:0width$}");
            in_token = false;
            limit = false;
            width = 0;
        }

        Ok(out)
    }
}

#[inline]
fn wrap(value: u64, range: u64, limit: bool) -> u64 {
    if limit { value % range } else { value }
}
