use anyhow::bail;

use crate::text::TextContainer;

/// Default permission-denied template. `{%0}` is the command name, `{%1}` the
/// required permission.
pub const DEFAULT_PERMISSION_MESSAGE: &str =
    "You do not have permission to use the command {%0} (requires {%1})";

bitflags::bitflags! {
    /// Command behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u32 {
        /// Arguments are re-tokenized with quote-aware parsing.
        const QUOTE_AWARE = 1 << 0;
    }
}

impl Default for CommandFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Immutable metadata for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    name: String,
    aliases: Vec<String>,
    permission: String,
    usage: String,
    description: String,
    permission_message: String,
    flags: CommandFlags,
}

impl CommandDescriptor {
    pub fn builder(name: impl Into<String>) -> CommandDescriptorBuilder {
        CommandDescriptorBuilder {
            name: name.into(),
            aliases: Vec::new(),
            permission: String::new(),
            usage: None,
            description: String::new(),
            permission_message: None,
            flags: CommandFlags::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Required permission; empty when the command is unrestricted.
    pub fn permission(&self) -> &str {
        &self.permission
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permission_message(&self) -> &str {
        &self.permission_message
    }

    pub fn flags(&self) -> CommandFlags {
        self.flags
    }

    pub fn is_quote_aware(&self) -> bool {
        self.flags.contains(CommandFlags::QUOTE_AWARE)
    }

    /// Permission-denied message filled with name and permission.
    pub fn permission_denied_text(&self) -> TextContainer {
        TextContainer::with_params(
            self.permission_message.as_str(),
            [self.name.as_str(), self.permission.as_str()],
        )
    }
}

/// Builder for [`CommandDescriptor`].
#[derive(Debug, Clone)]
pub struct CommandDescriptorBuilder {
    name: String,
    aliases: Vec<String>,
    permission: String,
    usage: Option<String>,
    description: String,
    permission_message: Option<String>,
    flags: CommandFlags,
}

impl CommandDescriptorBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn permission_message(mut self, message: impl Into<String>) -> Self {
        self.permission_message = Some(message.into());
        self
    }

    pub fn quote_aware(mut self, quote_aware: bool) -> Self {
        self.flags.set(CommandFlags::QUOTE_AWARE, quote_aware);
        self
    }

    pub fn build(self) -> anyhow::Result<CommandDescriptor> {
        if self.name.trim().is_empty() {
            bail!("command name must not be empty");
        }
        if self.name.chars().any(char::is_whitespace) {
            bail!("command name {:?} must not contain whitespace", self.name);
        }

        let usage = self.usage.unwrap_or_else(|| self.name.clone());
        Ok(CommandDescriptor {
            name: self.name,
            aliases: self.aliases,
            permission: self.permission,
            usage,
            description: self.description,
            permission_message: self
                .permission_message
                .unwrap_or_else(|| DEFAULT_PERMISSION_MESSAGE.to_string()),
            flags: self.flags,
        })
    }
}
