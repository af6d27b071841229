//! Server implementation.
//!
//! The [`Server`] is the composition root: it owns the [`ServerContext`]
//! (command dispatcher, shutdown token, published tick statistics), the tick
//! scheduler, and the console input queue.
//!
//! Console lines are queued by the stdin reader and drained at the start of
//! every tick, so commands run on the tick thread. A slow command handler
//! therefore delays that tick and shows up in the tick statistics.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::Context;
use dedicore_shared::command::{CommandDispatcher, CommandSender};
use dedicore_shared::config::ServerConfig;
use dedicore_shared::context::ServerContext;
use dedicore_shared::tick::{TickScheduler, TickStats};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::register_builtin_commands;
use crate::console::ConsoleSender;

/// Dedicated server.
pub struct Server {
    context: Arc<ServerContext>,
    console: ConsoleSender,
    scheduler: Arc<TickScheduler>,
    console_tx: mpsc::Sender<String>,
    /// Taken by the tick loop when the server starts.
    console_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl Server {
    /// Creates a server with the built-in commands registered.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid server config")?;

        let (console_tx, console_rx) = mpsc::channel(config.console_queue);
        let context = ServerContext::new(config);
        register_builtin_commands(context.commands()).context("register built-in commands")?;

        let scheduler = TickScheduler::new(
            context.config().tick.clone(),
            context.shutdown_token().clone(),
        )
        .with_stats(Arc::clone(context.stats_cell()));

        Ok(Self {
            console: ConsoleSender::new(Arc::clone(&context)),
            context,
            scheduler: Arc::new(scheduler),
            console_tx,
            console_rx: Mutex::new(Some(console_rx)),
        })
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn config(&self) -> &ServerConfig {
        self.context.config()
    }

    pub fn commands(&self) -> &CommandDispatcher {
        self.context.commands()
    }

    pub fn console_sender(&self) -> &ConsoleSender {
        &self.console
    }

    /// Sender half of the console queue, for the stdin reader or tests.
    pub fn console_input(&self) -> mpsc::Sender<String> {
        self.console_tx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    /// Stops the server. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.context.request_shutdown() {
            info!("Shutting down server");
        }
        self.scheduler.stop();
    }

    /// Dispatches a line on behalf of `sender` on the calling thread.
    ///
    /// Returns `true` when a command was found and executed, whatever the
    /// outcome; see [`CommandDispatcher::dispatch`].
    pub fn dispatch_command(&self, sender: &dyn CommandSender, line: &str) -> bool {
        self.context.commands().dispatch(sender, line)
    }

    pub fn tick_stats(&self) -> TickStats {
        self.context.tick_stats()
    }

    /// Runs the tick loop on the calling thread until shutdown.
    pub fn run<F>(&self, world_tick: F) -> anyhow::Result<()>
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        let tick = self.tick_callback(world_tick)?;
        self.scheduler.run(tick, report)
    }

    /// Runs the tick loop on a dedicated thread.
    pub fn spawn<F>(&self, world_tick: F) -> anyhow::Result<JoinHandle<anyhow::Result<()>>>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        let tick = self.tick_callback(world_tick)?;
        self.scheduler.spawn(tick, report)
    }

    fn tick_callback<F>(&self, mut world_tick: F) -> anyhow::Result<impl FnMut() -> anyhow::Result<()>>
    where
        F: FnMut() -> anyhow::Result<()>,
    {
        let mut console_rx = self
            .console_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .context("server was already started")?;
        let console = self.console.clone();

        Ok(move || {
            while let Ok(line) = console_rx.try_recv() {
                if !console.server().commands().dispatch(&console, &line) {
                    console.send_message(&format!(
                        "Unknown command: {line}. Type \"help\" for help."
                    ));
                }
            }
            world_tick()
        })
    }
}

fn report(stats: &TickStats) {
    debug!(
        tick = stats.tick(),
        tps = stats.average_tick_rate(),
        min_tps = stats.min_tick_rate(),
        load = stats.average_load(),
        max_load = stats.max_load(),
        "Tick report"
    );
}
