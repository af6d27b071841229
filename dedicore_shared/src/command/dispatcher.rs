use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error};

use super::{parse_arguments, Command, CommandRegistry, CommandSender};
use crate::panic::panic_message;

/// Prefix used to tell commands apart from chat when none is configured.
pub const DEFAULT_PREFIX: &str = "/";

/// Routes input lines to registered commands.
///
/// The registry sits behind an `RwLock`, so lines may be dispatched from any
/// thread. The lock is released before a handler runs, which lets handlers
/// register or unregister commands themselves.
#[derive(Debug)]
pub struct CommandDispatcher {
    registry: RwLock<CommandRegistry>,
    prefix: String,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl CommandDispatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_registry(CommandRegistry::new(), prefix)
    }

    pub fn with_registry(registry: CommandRegistry, prefix: impl Into<String>) -> Self {
        Self {
            registry: RwLock::new(registry),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Read access to the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, CommandRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, CommandRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, command: impl Into<Arc<Command>>) -> bool {
        self.registry_mut().register(command)
    }

    pub fn register_alias(&self, alias: &str, command: &Arc<Command>) -> bool {
        self.registry_mut().register_alias(alias, command)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.registry_mut().unregister(name)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<Command>> {
        self.registry().resolve(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry().is_registered(name)
    }

    /// Whether a chat line should be treated as a command.
    pub fn handles_message(&self, line: &str) -> bool {
        let line = line.trim();
        !line.is_empty() && line.starts_with(self.prefix.as_str())
    }

    /// Dispatches one input line on behalf of `sender`.
    ///
    /// A leading command prefix is optional and stripped once.
    ///
    /// # Return value
    ///
    /// Returns `true` when a matching command was found and **an execution
    /// attempt was made**, even if the sender lacked permission, the handler
    /// reported bad usage, returned an error, or panicked. It does not mean the
    /// command succeeded. `false` means the line was empty or named no known
    /// command; callers decide whether to tell the sender.
    pub fn dispatch(&self, sender: &dyn CommandSender, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        let line = line.strip_prefix(self.prefix.as_str()).unwrap_or(line);

        let mut tokens = line.split_whitespace();
        let Some(label) = tokens.next() else {
            return false;
        };

        let Some(command) = self.resolve(label) else {
            debug!(sender = %sender.name(), command = %label, "Unknown command");
            return false;
        };

        let args: Vec<String> = if command.descriptor().is_quote_aware() {
            parse_arguments(line).into_iter().skip(1).collect()
        } else {
            tokens.map(str::to_string).collect()
        };

        let alias = (label.to_lowercase() != command.name().to_lowercase()).then_some(label);
        self.execute(&command, sender, alias, &args);
        true
    }

    fn execute(
        &self,
        command: &Command,
        sender: &dyn CommandSender,
        alias: Option<&str>,
        args: &[String],
    ) {
        let descriptor = command.descriptor();
        let permission = descriptor.permission();
        if !permission.is_empty() && !sender.has_permission(permission) {
            debug!(
                sender = %sender.name(),
                command = %descriptor.name(),
                permission,
                "Permission denied"
            );
            sender.send_text(&descriptor.permission_denied_text());
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| command.invoke(sender, alias, args)));
        match outcome {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                sender.send_message(&format!("Command usage: {}", descriptor.usage()));
            }
            Ok(Err(e)) => {
                error!(
                    sender = %sender.name(),
                    command = %descriptor.name(),
                    ?args,
                    error = ?e,
                    "Error appeared while processing command"
                );
            }
            Err(payload) => {
                error!(
                    sender = %sender.name(),
                    command = %descriptor.name(),
                    ?args,
                    panic = %panic_message(&*payload),
                    "Command handler panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::bail;

    use super::*;
    use crate::command::test_support::RecordingSender;
    use crate::command::CommandDescriptor;

    type Calls = Arc<Mutex<Vec<(Option<String>, Vec<String>)>>>;

    fn recording_command(name: &str, aliases: &[&str], quote_aware: bool) -> (Command, Calls) {
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let descriptor = CommandDescriptor::builder(name)
            .aliases(aliases.iter().copied())
            .quote_aware(quote_aware)
            .build()
            .unwrap();
        let command = Command::new(descriptor, move |_, alias, args| {
            sink.lock()
                .unwrap()
                .push((alias.map(str::to_string), args.to_vec()));
            Ok(true)
        });
        (command, calls)
    }

    // =========================================================================
    // Line handling
    // =========================================================================

    #[test]
    fn blank_lines_are_not_handled() {
        let dispatcher = CommandDispatcher::default();
        let (command, calls) = recording_command("say", &[], false);
        dispatcher.register(command);
        let sender = RecordingSender::new("alice", &[]);

        for line in ["", "   ", "/", "  /  ", "\t"] {
            assert!(!dispatcher.dispatch(&sender, line), "line {line:?}");
        }
        assert!(calls.lock().unwrap().is_empty());
        assert!(sender.messages().is_empty());
    }

    #[test]
    fn unknown_command_is_not_handled() {
        let dispatcher = CommandDispatcher::default();
        let sender = RecordingSender::new("alice", &[]);
        assert!(!dispatcher.dispatch(&sender, "/nope a b"));
        assert!(sender.messages().is_empty());
    }

    #[test]
    fn prefix_is_optional() {
        let dispatcher = CommandDispatcher::new("!");
        let (command, calls) = recording_command("ping", &[], false);
        dispatcher.register(command);
        let sender = RecordingSender::new("alice", &[]);

        assert!(dispatcher.dispatch(&sender, "!ping"));
        assert!(dispatcher.dispatch(&sender, "ping"));
        assert_eq!(calls.lock().unwrap().len(), 2);

        assert!(dispatcher.handles_message("  !ping"));
        assert!(!dispatcher.handles_message("ping"));
        assert!(!dispatcher.handles_message("   "));
    }

    #[test]
    fn plain_command_gets_whitespace_split_args() {
        let dispatcher = CommandDispatcher::default();
        let (command, calls) = recording_command("cmd", &[], false);
        dispatcher.register(command);
        let sender = RecordingSender::new("alice", &[]);

        assert!(dispatcher.dispatch(&sender, "cmd a  b c"));
        assert!(dispatcher.dispatch(&sender, r#"cmd "x y" z"#));

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1, ["a", "b", "c"]);
        assert_eq!(calls[1].1, [r#""x"#, r#"y""#, "z"]);
    }

    #[test]
    fn quote_aware_command_gets_quoted_args() {
        let dispatcher = CommandDispatcher::default();
        let (command, calls) = recording_command("say", &[], true);
        dispatcher.register(command);
        let sender = RecordingSender::new("alice", &[]);

        assert!(dispatcher.dispatch(&sender, r#"/say "bar baz" qux"#));
        assert!(dispatcher.dispatch(&sender, r#"say "unterminated   tail"#));
        assert!(dispatcher.dispatch(&sender, "say"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1, ["bar baz", "qux"]);
        assert_eq!(calls[1].1, ["unterminated   tail"]);
        assert!(calls[2].1.is_empty());
    }

    #[test]
    fn alias_is_passed_through_literally() {
        let dispatcher = CommandDispatcher::default();
        let (command, calls) = recording_command("teleport", &["tp"], false);
        dispatcher.register(command);
        let sender = RecordingSender::new("alice", &[]);

        dispatcher.dispatch(&sender, "teleport");
        dispatcher.dispatch(&sender, "TELEPORT");
        dispatcher.dispatch(&sender, "Tp home");

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, None);
        assert_eq!(calls[1].0, None);
        assert_eq!(calls[2].0.as_deref(), Some("Tp"));
        assert_eq!(calls[2].1, ["home"]);
    }

    // =========================================================================
    // Execution outcomes
    // =========================================================================

    #[test]
    fn handled_regardless_of_outcome() {
        let dispatcher = CommandDispatcher::default();
        let ok = CommandDescriptor::builder("ok").build().unwrap();
        let usage = CommandDescriptor::builder("usage").usage("usage <n>").build().unwrap();
        let fails = CommandDescriptor::builder("fails").build().unwrap();
        let panics = CommandDescriptor::builder("panics").build().unwrap();
        dispatcher.register(Command::new(ok, |_, _, _| Ok(true)));
        dispatcher.register(Command::new(usage, |_, _, _| Ok(false)));
        dispatcher.register(Command::new(fails, |_, _, _| bail!("handler exploded")));
        dispatcher.register(Command::new(panics, |_, _, _| panic!("handler panicked")));
        let sender = RecordingSender::new("alice", &[]);

        assert!(dispatcher.dispatch(&sender, "ok"));
        assert!(sender.messages().is_empty());

        assert!(dispatcher.dispatch(&sender, "usage"));
        assert_eq!(sender.messages(), ["Command usage: usage <n>"]);

        assert!(dispatcher.dispatch(&sender, "fails"));
        assert!(dispatcher.dispatch(&sender, "panics"));
        assert_eq!(sender.messages().len(), 1);

        // The dispatcher keeps working after a panic.
        assert!(dispatcher.dispatch(&sender, "ok"));
    }

    #[test]
    fn permission_denied_skips_handler() {
        let dispatcher = CommandDispatcher::default();
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let descriptor = CommandDescriptor::builder("stop")
            .permission("server.stop")
            .build()
            .unwrap();
        dispatcher.register(Command::new(descriptor, move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }));

        let guest = RecordingSender::new("guest", &[]);
        assert!(dispatcher.dispatch(&guest, "stop"));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(
            guest.messages(),
            ["You do not have permission to use the command stop (requires server.stop)"]
        );

        let op = RecordingSender::new("op", &["server.stop"]);
        assert!(dispatcher.dispatch(&op, "stop"));
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
        assert!(op.messages().is_empty());
    }

    #[test]
    fn handler_may_mutate_registry() {
        let dispatcher = Arc::new(CommandDispatcher::default());
        let weak = Arc::downgrade(&dispatcher);
        let descriptor = CommandDescriptor::builder("once").build().unwrap();
        dispatcher.register(Command::new(descriptor, move |_, _, _| {
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.unregister("once");
            }
            Ok(true)
        }));
        let sender = RecordingSender::new("alice", &[]);

        assert!(dispatcher.dispatch(&sender, "once"));
        assert!(!dispatcher.is_registered("once"));
        assert!(!dispatcher.dispatch(&sender, "once"));
    }
}
