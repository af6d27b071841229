//! Server context.
//!
//! One [`ServerContext`] exists per running server. It is constructed
//! explicitly and shared through an `Arc`: the dispatcher hands it to command
//! handlers through [`CommandSender::server`], the tick scheduler publishes its
//! statistics into it, and anyone holding it can request shutdown.
//!
//! [`CommandSender::server`]: crate::command::CommandSender::server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::command::CommandDispatcher;
use crate::config::ServerConfig;
use crate::tick::{TickStats, TickStatsCell};

/// Cooperative cancellation flag shared between threads.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled. Returns `true` only for the call that
    /// performed the transition.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Shared state of one server instance.
pub struct ServerContext {
    config: ServerConfig,
    commands: CommandDispatcher,
    shutdown: ShutdownToken,
    stats: Arc<TickStatsCell>,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let commands = CommandDispatcher::new(config.command_prefix.clone());
        let stats = Arc::new(TickStatsCell::new(config.tick.nominal_rate()));
        Arc::new(Self {
            config,
            commands,
            shutdown: ShutdownToken::new(),
            stats,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Requests a cooperative shutdown. Returns `false` if one was already
    /// requested.
    pub fn request_shutdown(&self) -> bool {
        let first = self.shutdown.cancel();
        if first {
            info!("Shutdown requested");
        }
        first
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    pub fn stats_cell(&self) -> &Arc<TickStatsCell> {
        &self.stats
    }

    /// Copy of the most recently published tick statistics.
    pub fn tick_stats(&self) -> TickStats {
        self.stats.snapshot()
    }
}
