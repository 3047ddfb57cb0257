//! Time subsystem.
//!
//! - `ClockSource` abstracts the millisecond tick provider (`SystemClock` in
//!   the runtime, `ManualClock` in tests)
//! - `FrameScheduler` derives the logic/fixed/draw cadences from one clock
//! - `Stopwatch` measures and formats spans of engine ticks

mod clock;
mod scheduler;
mod stopwatch;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use scheduler::{FramePlan, FrameScheduler};
pub use stopwatch::Stopwatch;
