//! Configuration system.
//!
//! Loads server configuration from JSON strings/files. Every field has a
//! default, so an empty object `{}` is a valid configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Root server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Prefix that marks a chat line as a command, e.g. `/`.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Capacity of the console input queue.
    #[serde(default = "default_console_queue")]
    pub console_queue: usize,
    /// Tick scheduler timing.
    #[serde(default)]
    pub tick: TickConfig,
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_console_queue() -> usize {
    32
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            log_filter: default_log_filter(),
            console_queue: default_console_queue(),
            tick: TickConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.console_queue == 0 {
            bail!("console_queue must be at least 1");
        }
        self.tick.validate()
    }
}

/// Fixed-timestep timing, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Nominal time between ticks.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// How early a tick may run before the loop sleeps or skips instead.
    #[serde(default = "default_early_tolerance_ms")]
    pub early_tolerance_ms: u64,
    /// Backlog after which the deadline is reset instead of caught up.
    #[serde(default = "default_max_backlog_ms")]
    pub max_backlog_ms: u64,
}

fn default_period_ms() -> u64 {
    50
}

fn default_early_tolerance_ms() -> u64 {
    25
}

fn default_max_backlog_ms() -> u64 {
    1000
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            early_tolerance_ms: default_early_tolerance_ms(),
            max_backlog_ms: default_max_backlog_ms(),
        }
    }
}

impl TickConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn early_tolerance(&self) -> Duration {
        Duration::from_millis(self.early_tolerance_ms)
    }

    pub fn max_backlog(&self) -> Duration {
        Duration::from_millis(self.max_backlog_ms)
    }

    /// Ticks per second at the nominal period (20 for the default 50 ms).
    pub fn nominal_rate(&self) -> f64 {
        1000.0 / self.period_ms as f64
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.period_ms == 0 {
            bail!("tick.period_ms must be greater than zero");
        }
        if self.early_tolerance_ms >= self.period_ms {
            bail!(
                "tick.early_tolerance_ms ({}) must be below tick.period_ms ({})",
                self.early_tolerance_ms,
                self.period_ms
            );
        }
        Ok(())
    }
}
