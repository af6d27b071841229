//! Fixed-timestep tick scheduling.
//!
//! The scheduler advances the simulation at a nominal cadence (20 ticks per
//! second by default), sleeps instead of spinning when ahead of schedule, and
//! resets its deadline after long stalls rather than replaying a backlog.
//! Each tick feeds two 20-sample rolling windows (tick rate and load) that are
//! published as copy-on-read snapshots for other threads.

mod clock;
mod scheduler;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{SchedulerState, TickScheduler, REPORT_INTERVAL};
pub use stats::{RollingWindow, TickStats, TickStatsCell, WINDOW_SIZE};
