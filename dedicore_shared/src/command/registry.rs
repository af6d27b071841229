use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{CommandDescriptor, CommandSender};

/// Command handler function type.
///
/// Receives the sender, the alias the command was invoked through (`None`
/// when the canonical name was typed) and the argument tokens. `Ok(false)`
/// means "wrong usage"; the dispatcher answers with the usage message.
pub type CommandHandler =
    Box<dyn Fn(&dyn CommandSender, Option<&str>, &[String]) -> anyhow::Result<bool> + Send + Sync>;

/// A descriptor paired with its handler.
pub struct Command {
    descriptor: CommandDescriptor,
    handler: CommandHandler,
}

impl Command {
    pub fn new<F>(descriptor: CommandDescriptor, handler: F) -> Self
    where
        F: Fn(&dyn CommandSender, Option<&str>, &[String]) -> anyhow::Result<bool>
            + Send
            + Sync
            + 'static,
    {
        Self {
            descriptor,
            handler: Box::new(handler),
        }
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub(crate) fn invoke(
        &self,
        sender: &dyn CommandSender,
        alias: Option<&str>,
        args: &[String],
    ) -> anyhow::Result<bool> {
        (self.handler)(sender, alias, args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Name and alias tables, both keyed by lower-cased strings.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under its name, then each of its aliases.
    ///
    /// Returns `false` without touching the registry if the name is taken.
    /// Alias collisions are skipped one by one; they never fail the command.
    pub fn register(&mut self, command: impl Into<Arc<Command>>) -> bool {
        let command = command.into();
        let key = command.name().to_lowercase();
        if self.commands.contains_key(&key) {
            return false;
        }
        self.commands.insert(key, Arc::clone(&command));

        for alias in command.descriptor().aliases() {
            self.register_alias(alias, &command);
        }
        true
    }

    /// Adds an alias for `command`. Returns `false` if the lower-cased alias is
    /// already a command name or an alias.
    pub fn register_alias(&mut self, alias: &str, command: &Arc<Command>) -> bool {
        let key = alias.to_lowercase();
        if self.commands.contains_key(&key) || self.aliases.contains_key(&key) {
            return false;
        }
        self.aliases.insert(key, Arc::clone(command));
        true
    }

    /// Removes a command and every alias pointing at it.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(removed) = self.commands.remove(&name.to_lowercase()) else {
            return false;
        };
        self.aliases
            .retain(|_, command| !Arc::ptr_eq(command, &removed));
        true
    }

    /// Looks up a command name first, then an alias.
    pub fn resolve(&self, name: &str) -> Option<Arc<Command>> {
        let key = name.to_lowercase();
        self.commands
            .get(&key)
            .or_else(|| self.aliases.get(&key))
            .cloned()
    }

    /// True only for canonical command names, never for aliases.
    pub fn is_registered(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// Registered commands sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<_> = self.commands.values().cloned().collect();
        commands.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
