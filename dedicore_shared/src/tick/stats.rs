use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

/// Number of samples kept per rolling window.
pub const WINDOW_SIZE: usize = 20;

/// Fixed-size FIFO of the most recent samples.
///
/// The window starts full of a neutral value, so it always holds exactly
/// [`WINDOW_SIZE`] samples; each push evicts the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
}

impl RollingWindow {
    pub fn filled(value: f64) -> Self {
        Self {
            samples: std::iter::repeat(value).take(WINDOW_SIZE).collect(),
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples.pop_front();
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

/// Tick loop health.
#[derive(Debug, Clone, PartialEq)]
pub struct TickStats {
    tick: u64,
    nominal_rate: f64,
    tick_rates: RollingWindow,
    loads: RollingWindow,
    min_tick_rate: f64,
    max_load: f64,
}

impl TickStats {
    pub fn new(nominal_rate: f64) -> Self {
        Self {
            tick: 0,
            nominal_rate,
            tick_rates: RollingWindow::filled(nominal_rate),
            loads: RollingWindow::filled(0.0),
            min_tick_rate: nominal_rate,
            max_load: 0.0,
        }
    }

    /// Ticks executed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn nominal_rate(&self) -> f64 {
        self.nominal_rate
    }

    pub fn tick_rates(&self) -> &RollingWindow {
        &self.tick_rates
    }

    pub fn loads(&self) -> &RollingWindow {
        &self.loads
    }

    /// Lowest tick rate since the last report.
    pub fn min_tick_rate(&self) -> f64 {
        self.min_tick_rate
    }

    /// Highest load since the last report.
    pub fn max_load(&self) -> f64 {
        self.max_load
    }

    pub fn average_tick_rate(&self) -> f64 {
        self.tick_rates.average()
    }

    pub fn average_load(&self) -> f64 {
        self.loads.average()
    }

    pub(crate) fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub(crate) fn record(&mut self, tick_rate: f64, load: f64) {
        self.tick_rates.push(tick_rate);
        self.loads.push(load);
        if tick_rate < self.min_tick_rate {
            self.min_tick_rate = tick_rate;
        }
        if load > self.max_load {
            self.max_load = load;
        }
    }

    pub(crate) fn reset_extremes(&mut self) {
        self.min_tick_rate = self.nominal_rate;
        self.max_load = 0.0;
    }
}

/// Copy-on-read holder for the latest [`TickStats`].
///
/// The tick thread publishes after every tick; readers on other threads get
/// an owned snapshot and never observe a half-written window.
#[derive(Debug)]
pub struct TickStatsCell {
    current: RwLock<TickStats>,
}

impl TickStatsCell {
    pub fn new(nominal_rate: f64) -> Self {
        Self {
            current: RwLock::new(TickStats::new(nominal_rate)),
        }
    }

    pub fn publish(&self, stats: &TickStats) {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(stats);
    }

    pub fn snapshot(&self) -> TickStats {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_always_full_and_fifo() {
        let mut window = RollingWindow::filled(20.0);
        assert_eq!(window.len(), WINDOW_SIZE);

        for i in 0..25 {
            window.push(i as f64);
            assert_eq!(window.len(), WINDOW_SIZE);
        }

        let expected: Vec<f64> = (5..25).map(|i| i as f64).collect();
        assert_eq!(window.to_vec(), expected);
        assert_eq!(window.iter().next(), Some(5.0));
        assert_eq!(window.latest(), Some(24.0));
        assert_eq!(window.average(), 14.5);
    }

    #[test]
    fn extremes_track_and_reset() {
        let mut stats = TickStats::new(20.0);
        stats.record(12.5, 0.4);
        stats.record(18.0, 1.0);
        stats.record(20.0, 0.1);
        assert_eq!(stats.min_tick_rate(), 12.5);
        assert_eq!(stats.max_load(), 1.0);

        stats.reset_extremes();
        assert_eq!(stats.min_tick_rate(), 20.0);
        assert_eq!(stats.max_load(), 0.0);
        // Windows are untouched by a reset.
        assert_eq!(stats.loads().latest(), Some(0.1));
    }

    #[test]
    fn cell_snapshot_is_a_copy() {
        let cell = TickStatsCell::new(20.0);
        let mut stats = TickStats::new(20.0);
        stats.advance_tick();
        stats.record(10.0, 1.0);
        cell.publish(&stats);

        let snapshot = cell.snapshot();
        stats.advance_tick();
        assert_eq!(snapshot.tick(), 1);
        assert_eq!(cell.snapshot().tick(), 1);
        assert_eq!(snapshot.tick_rates().latest(), Some(10.0));
    }
}
