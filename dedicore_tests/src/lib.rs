//! Helpers shared by the integration tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dedicore_shared::command::CommandSender;
use dedicore_shared::config::{ServerConfig, TickConfig};
use dedicore_shared::context::ServerContext;

/// Installs a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Config with a 10 ms tick so tests finish quickly.
pub fn fast_config() -> ServerConfig {
    ServerConfig {
        tick: TickConfig {
            period_ms: 10,
            early_tolerance_ms: 5,
            max_backlog_ms: 1000,
        },
        ..Default::default()
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// A player-like sender that records what it is told.
pub struct RecordingSender {
    name: String,
    permissions: Vec<String>,
    messages: Mutex<Vec<String>>,
    context: Arc<ServerContext>,
}

impl RecordingSender {
    pub fn new(context: &Arc<ServerContext>, name: &str, permissions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            messages: Mutex::new(Vec::new()),
            context: Arc::clone(context),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_player(&self) -> bool {
        true
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn server(&self) -> &ServerContext {
        &self.context
    }
}
