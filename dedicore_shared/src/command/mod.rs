//! Command routing.
//!
//! Provides:
//! - Command metadata ([`CommandDescriptor`]) and handlers ([`Command`])
//! - A case-insensitive name/alias registry ([`CommandRegistry`])
//! - Line dispatch with authorization ([`CommandDispatcher`])
//! - Quote-aware argument parsing ([`parse_arguments`])
//!
//! # Usage
//! ```ignore
//! let dispatcher = CommandDispatcher::new("/");
//! let descriptor = CommandDescriptor::builder("say").alias("broadcast").quote_aware(true).build()?;
//! dispatcher.register(Command::new(descriptor, |sender, _alias, args| {
//!     sender.send_message(&args.join(" "));
//!     Ok(true)
//! }));
//! dispatcher.dispatch(&console, r#"/say "hello world""#);
//! ```

mod descriptor;
mod dispatcher;
mod parse;
mod registry;
mod sender;

pub use descriptor::{CommandDescriptor, CommandDescriptorBuilder, CommandFlags};
pub use dispatcher::{CommandDispatcher, DEFAULT_PREFIX};
pub use parse::parse_arguments;
pub use registry::{Command, CommandHandler, CommandRegistry};
pub use sender::CommandSender;
