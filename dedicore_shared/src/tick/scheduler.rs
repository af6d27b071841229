//! Tick scheduler.
//!
//! Loop outline, per iteration:
//! - more than `early_tolerance` ahead of the deadline: sleep, re-check, and
//!   skip the iteration if still early;
//! - otherwise run the tick callback once and time it;
//! - every [`REPORT_INTERVAL`] ticks call the report hook, then reset the
//!   running extremes;
//! - record tick rate and load, then advance the deadline by one period, or
//!   reset it to "now" when more than `max_backlog` behind.
//!
//! Callback errors and panics are logged and the loop continues. A panic
//! anywhere else in an iteration (the report hook, for instance) ends the loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracing::{error, info, warn};

use super::{Clock, SystemClock, TickStats, TickStatsCell};
use crate::config::TickConfig;
use crate::context::ShutdownToken;
use crate::panic::panic_message;

/// Ticks between report hook invocations.
pub const REPORT_INTERVAL: u64 = 16;

/// Shortest sleep taken when ahead of schedule.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Wake-up margin left before the deadline when sleeping ahead of schedule.
const SLEEP_MARGIN: Duration = Duration::from_millis(1);

/// Durations shorter than this are clamped before computing a tick rate.
const MIN_MEASURED: Duration = Duration::from_millis(1);

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a [`TickScheduler`]. Transitions only go forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Running,
    Stopped,
}

/// Fixed-timestep loop driver.
///
/// Shared between the tick thread (which runs the loop) and any thread that
/// wants to stop it. Stopping is cooperative and observed once per iteration;
/// an in-flight tick is never interrupted.
pub struct TickScheduler<C = SystemClock> {
    config: TickConfig,
    clock: C,
    state: AtomicU8,
    token: ShutdownToken,
    stats: Arc<TickStatsCell>,
}

impl TickScheduler<SystemClock> {
    pub fn new(config: TickConfig, token: ShutdownToken) -> Self {
        let stats = Arc::new(TickStatsCell::new(config.nominal_rate()));
        Self {
            config,
            clock: SystemClock,
            state: AtomicU8::new(CREATED),
            token,
            stats,
        }
    }
}

impl<C: Clock> TickScheduler<C> {
    /// Replaces the time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> TickScheduler<C2> {
        TickScheduler {
            config: self.config,
            clock,
            state: self.state,
            token: self.token,
            stats: self.stats,
        }
    }

    /// Publishes statistics into `stats` instead of a private cell.
    pub fn with_stats(mut self, stats: Arc<TickStatsCell>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::Acquire) {
            CREATED => SchedulerState::Created,
            RUNNING => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    /// Copy of the statistics published after the last tick.
    pub fn stats(&self) -> TickStats {
        self.stats.snapshot()
    }

    /// Requests the loop to exit. Idempotent; stopping before start makes the
    /// scheduler unusable.
    pub fn stop(&self) {
        let previous = self.state.swap(STOPPED, Ordering::AcqRel);
        if previous == RUNNING {
            info!("Tick loop stop requested");
        }
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING && !self.token.is_cancelled()
    }

    fn begin(&self) -> anyhow::Result<()> {
        match self
            .state
            .compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(RUNNING) => bail!("tick scheduler is already running"),
            Err(_) => bail!("tick scheduler was stopped and cannot be restarted"),
        }
    }

    /// Runs the loop on the calling thread until stopped.
    ///
    /// Fails immediately if the scheduler was already started or stopped.
    pub fn run<F, R>(&self, on_tick: F, on_report: R) -> anyhow::Result<()>
    where
        F: FnMut() -> anyhow::Result<()>,
        R: FnMut(&TickStats),
    {
        self.begin()?;
        self.run_loop(on_tick, on_report)
    }

    /// Runs the loop on a dedicated thread named `server-tick`.
    pub fn spawn<F, R>(
        self: &Arc<Self>,
        on_tick: F,
        on_report: R,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>>
    where
        C: 'static,
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
        R: FnMut(&TickStats) + Send + 'static,
    {
        self.begin()?;
        let scheduler = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("server-tick".to_string())
            .spawn(move || scheduler.run_loop(on_tick, on_report));
        match spawned {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.state.store(STOPPED, Ordering::Release);
                Err(e).context("spawn tick thread")
            }
        }
    }

    fn run_loop<F, R>(&self, mut on_tick: F, mut on_report: R) -> anyhow::Result<()>
    where
        F: FnMut() -> anyhow::Result<()>,
        R: FnMut(&TickStats),
    {
        let mut tick_loop = TickLoop::new(&self.config, self.clock.now());
        info!(
            period_ms = self.config.period_ms,
            nominal_rate = self.config.nominal_rate(),
            "Tick loop started"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            while self.is_running() {
                if tick_loop.iterate(&self.clock, &mut on_tick, &mut on_report) == Iteration::Ticked {
                    self.stats.publish(&tick_loop.stats);
                }
            }
        }));
        self.state.store(STOPPED, Ordering::Release);

        match outcome {
            Ok(()) => {
                info!(ticks = tick_loop.stats.tick(), "Tick loop stopped");
                Ok(())
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(
                    ticks = tick_loop.stats.tick(),
                    panic = %message,
                    "Tick loop terminated by an unrecoverable failure"
                );
                bail!("tick loop terminated: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Iteration {
    Skipped,
    Ticked,
}

/// State owned by the tick thread.
struct TickLoop {
    period: Duration,
    early_tolerance: Duration,
    max_backlog: Duration,
    deadline: Instant,
    stats: TickStats,
}

impl TickLoop {
    fn new(config: &TickConfig, now: Instant) -> Self {
        Self {
            period: config.period(),
            early_tolerance: config.early_tolerance(),
            max_backlog: config.max_backlog(),
            deadline: now,
            stats: TickStats::new(config.nominal_rate()),
        }
    }

    fn is_early(&self, now: Instant) -> bool {
        self.deadline.saturating_duration_since(now) > self.early_tolerance
    }

    fn iterate<C, F, R>(&mut self, clock: &C, on_tick: &mut F, on_report: &mut R) -> Iteration
    where
        C: Clock,
        F: FnMut() -> anyhow::Result<()>,
        R: FnMut(&TickStats),
    {
        let mut now = clock.now();
        if self.is_early(now) {
            let remaining = self.deadline.saturating_duration_since(now);
            clock.sleep(remaining.saturating_sub(SLEEP_MARGIN).max(MIN_SLEEP));
            now = clock.now();
            if self.is_early(now) {
                return Iteration::Skipped;
            }
        }

        let started = clock.now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| on_tick()));
        let elapsed = clock.now().saturating_duration_since(started);

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(tick = self.stats.tick() + 1, error = ?e, "Tick callback failed");
            }
            Err(payload) => {
                error!(
                    tick = self.stats.tick() + 1,
                    panic = %panic_message(&*payload),
                    "Tick callback panicked"
                );
            }
        }

        if self.stats.advance_tick() % REPORT_INTERVAL == 0 {
            on_report(&self.stats);
            self.stats.reset_extremes();
        }

        let measured = elapsed.max(MIN_MEASURED);
        let tick_rate = (1e9 / measured.as_nanos() as f64).min(self.stats.nominal_rate());
        let load = (elapsed.as_secs_f64() / self.period.as_secs_f64()).min(1.0);
        self.stats.record(tick_rate, load);

        let behind = now.saturating_duration_since(self.deadline);
        if behind > self.max_backlog {
            warn!(
                behind_ms = behind.as_millis() as u64,
                tick = self.stats.tick(),
                "Tick loop fell behind, resetting schedule"
            );
            self.deadline = now;
        } else {
            self.deadline += self.period;
        }

        Iteration::Ticked
    }
}
