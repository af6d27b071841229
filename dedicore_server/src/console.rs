//! Operator console.
//!
//! The console sender is always authorized. Its output goes through `tracing`
//! under the `console` target so it lands wherever the server logs.

use std::borrow::Cow;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use dedicore_shared::command::CommandSender;
use dedicore_shared::context::ServerContext;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Command sender representing the server operator at the terminal.
#[derive(Clone)]
pub struct ConsoleSender {
    context: Arc<ServerContext>,
}

impl ConsoleSender {
    pub const NAME: &'static str = "CONSOLE";

    pub fn new(context: Arc<ServerContext>) -> Self {
        Self { context }
    }
}

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_player(&self) -> bool {
        false
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        info!(target: "console", "{message}");
    }

    fn server(&self) -> &ServerContext {
        &self.context
    }
}

/// Spawns the stdin reader thread. Each non-empty line is queued for the tick
/// thread; the reader exits on EOF or once the queue is closed.
pub fn spawn_stdin_reader(console_tx: mpsc::Sender<String>) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-reader".to_string())
        .spawn(move || {
            let mut stdout = std::io::stdout();
            read_console_lines(std::io::stdin().lock(), &console_tx, || {
                print!("> ");
                let _ = stdout.flush();
            });
            debug!("Console reader finished");
        })
        .context("spawn console reader")
}

/// Queues trimmed, non-empty lines from `reader` until EOF, a read error, or
/// a closed queue. Bytes that are not UTF-8 are replaced rather than ending
/// the console.
pub fn read_console_lines<R: BufRead>(
    mut reader: R,
    console_tx: &mpsc::Sender<String>,
    mut prompt: impl FnMut(),
) {
    let mut buf = Vec::new();
    loop {
        prompt();
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Console input failed");
                break;
            }
        }

        let line = match String::from_utf8_lossy(&buf) {
            Cow::Borrowed(line) => line.trim().to_string(),
            Cow::Owned(line) => {
                warn!("Console line is not valid UTF-8");
                line.trim().to_string()
            }
        };
        if !line.is_empty() && console_tx.blocking_send(line).is_err() {
            break;
        }
    }
}
