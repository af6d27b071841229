//! Built-in server commands.
//!
//! | command | aliases | permission |
//! |---|---|---|
//! | `help [command]` | `?` | none |
//! | `status` | `tps` | none |
//! | `say <message>` | `broadcast` | none |
//! | `stop` | `shutdown` | `server.stop` |

use dedicore_shared::command::{Command, CommandDescriptor, CommandDispatcher, CommandSender};
use tracing::{info, warn};

/// Permission required by `stop`.
pub const STOP_PERMISSION: &str = "server.stop";

/// Registers the built-in commands. Names that are already taken are left to
/// their current owner.
pub fn register_builtin_commands(commands: &CommandDispatcher) -> anyhow::Result<()> {
    let builtins = [
        Command::new(
            CommandDescriptor::builder("help")
                .alias("?")
                .usage("help [command]")
                .description("Lists commands or describes one")
                .build()?,
            help,
        ),
        Command::new(
            CommandDescriptor::builder("status")
                .alias("tps")
                .description("Shows tick rate and load")
                .build()?,
            status,
        ),
        Command::new(
            CommandDescriptor::builder("say")
                .alias("broadcast")
                .usage("say <message>")
                .description("Repeats a message")
                .quote_aware(true)
                .build()?,
            say,
        ),
        Command::new(
            CommandDescriptor::builder("stop")
                .alias("shutdown")
                .permission(STOP_PERMISSION)
                .description("Stops the server")
                .build()?,
            stop,
        ),
    ];

    for command in builtins {
        let name = command.name().to_string();
        if !commands.register(command) {
            warn!(command = %name, "Built-in command name already taken, skipping");
        }
    }
    Ok(())
}

fn help(sender: &dyn CommandSender, _alias: Option<&str>, args: &[String]) -> anyhow::Result<bool> {
    let commands = sender.server().commands();
    let prefix = commands.prefix().to_string();

    if let Some(name) = args.first() {
        let Some(command) = commands.resolve(name) else {
            sender.send_message(&format!("Unknown command: {name}"));
            return Ok(true);
        };
        let descriptor = command.descriptor();
        sender.send_message(&format!("{prefix}{}: {}", descriptor.name(), descriptor.description()));
        sender.send_message(&format!("Usage: {prefix}{}", descriptor.usage()));
        if !descriptor.aliases().is_empty() {
            sender.send_message(&format!("Aliases: {}", descriptor.aliases().join(", ")));
        }
        return Ok(true);
    }

    // Collect first so the registry lock is not held while messaging.
    let visible: Vec<_> = commands
        .registry()
        .commands()
        .into_iter()
        .filter(|command| {
            let permission = command.descriptor().permission();
            permission.is_empty() || sender.has_permission(permission)
        })
        .collect();

    sender.send_message("Available commands:");
    for command in visible {
        let descriptor = command.descriptor();
        sender.send_message(&format!("{prefix}{} - {}", descriptor.name(), descriptor.description()));
    }
    Ok(true)
}

fn status(sender: &dyn CommandSender, _alias: Option<&str>, _args: &[String]) -> anyhow::Result<bool> {
    let stats = sender.server().tick_stats();
    sender.send_message(&format!("Tick: {}", stats.tick()));
    sender.send_message(&format!(
        "TPS: {:.2} (min {:.2})",
        stats.average_tick_rate(),
        stats.min_tick_rate()
    ));
    sender.send_message(&format!(
        "Load: {:.1}% (max {:.1}%)",
        stats.average_load() * 100.0,
        stats.max_load() * 100.0
    ));
    Ok(true)
}

fn say(sender: &dyn CommandSender, _alias: Option<&str>, args: &[String]) -> anyhow::Result<bool> {
    if args.is_empty() {
        return Ok(false);
    }
    let message = args.join(" ");
    info!(target: "chat", sender = %sender.name(), "{message}");
    sender.send_message(&format!("[{}] {message}", sender.name()));
    Ok(true)
}

fn stop(sender: &dyn CommandSender, _alias: Option<&str>, _args: &[String]) -> anyhow::Result<bool> {
    if sender.server().request_shutdown() {
        info!(sender = %sender.name(), "Stop requested from command");
        sender.send_message("Stopping the server...");
    } else {
        sender.send_message("The server is already stopping");
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use dedicore_shared::config::ServerConfig;
    use dedicore_shared::context::ServerContext;

    use super::*;

    struct Player {
        context: Arc<ServerContext>,
        permissions: Vec<&'static str>,
        inbox: Mutex<Vec<String>>,
    }

    impl Player {
        fn new(context: &Arc<ServerContext>, permissions: &[&'static str]) -> Self {
            Self {
                context: Arc::clone(context),
                permissions: permissions.to_vec(),
                inbox: Mutex::new(Vec::new()),
            }
        }

        fn inbox(&self) -> Vec<String> {
            self.inbox.lock().unwrap().clone()
        }
    }

    impl CommandSender for Player {
        fn name(&self) -> &str {
            "steve"
        }

        fn is_player(&self) -> bool {
            true
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.permissions.iter().any(|p| *p == permission)
        }

        fn send_message(&self, message: &str) {
            self.inbox.lock().unwrap().push(message.to_string());
        }

        fn server(&self) -> &ServerContext {
            &self.context
        }
    }

    fn context() -> Arc<ServerContext> {
        let ctx = ServerContext::new(ServerConfig::default());
        register_builtin_commands(ctx.commands()).unwrap();
        ctx
    }

    #[test]
    fn registers_all_builtins() {
        let ctx = context();
        for name in ["help", "status", "say", "stop"] {
            assert!(ctx.commands().is_registered(name), "{name}");
        }
        for alias in ["?", "tps", "broadcast", "shutdown"] {
            assert!(ctx.commands().resolve(alias).is_some(), "{alias}");
        }
        // A second registration leaves the first set in place.
        register_builtin_commands(ctx.commands()).unwrap();
        assert_eq!(ctx.commands().registry().len(), 4);
    }

    #[test]
    fn help_hides_commands_without_permission() {
        let ctx = context();
        let player = Player::new(&ctx, &[]);

        assert!(ctx.commands().dispatch(&player, "/help"));
        let inbox = player.inbox();
        assert_eq!(inbox[0], "Available commands:");
        assert!(inbox.iter().any(|line| line.starts_with("/say - ")));
        assert!(!inbox.iter().any(|line| line.starts_with("/stop")));

        let op = Player::new(&ctx, &[STOP_PERMISSION]);
        ctx.commands().dispatch(&op, "?");
        assert!(op.inbox().iter().any(|line| line.starts_with("/stop - ")));
    }

    #[test]
    fn help_describes_one_command() {
        let ctx = context();
        let player = Player::new(&ctx, &[]);

        ctx.commands().dispatch(&player, "help SAY");
        assert_eq!(
            player.inbox(),
            [
                "/say: Repeats a message",
                "Usage: /say <message>",
                "Aliases: broadcast"
            ]
        );

        ctx.commands().dispatch(&player, "help nothing");
        assert_eq!(player.inbox().last().unwrap(), "Unknown command: nothing");
    }

    #[test]
    fn say_keeps_quoted_text() {
        let ctx = context();
        let player = Player::new(&ctx, &[]);

        assert!(ctx.commands().dispatch(&player, r#"/broadcast "hello   world" again"#));
        assert!(ctx.commands().dispatch(&player, "/say"));
        assert_eq!(
            player.inbox(),
            ["[steve] hello   world again", "Command usage: say <message>"]
        );
    }

    #[test]
    fn stop_requires_permission() {
        let ctx = context();
        let guest = Player::new(&ctx, &[]);
        assert!(ctx.commands().dispatch(&guest, "stop"));
        assert!(ctx.is_running());
        assert_eq!(guest.inbox().len(), 1);

        let op = Player::new(&ctx, &[STOP_PERMISSION]);
        assert!(ctx.commands().dispatch(&op, "shutdown"));
        assert!(!ctx.is_running());
        assert!(ctx.commands().dispatch(&op, "stop"));
        assert_eq!(
            op.inbox(),
            ["Stopping the server...", "The server is already stopping"]
        );
    }

    #[test]
    fn status_reports_stats() {
        let ctx = context();
        let player = Player::new(&ctx, &[]);
        ctx.commands().dispatch(&player, "tps");
        assert_eq!(
            player.inbox(),
            ["Tick: 0", "TPS: 20.00 (min 20.00)", "Load: 0.0% (max 0.0%)"]
        );
    }
}
