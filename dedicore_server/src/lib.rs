//! `dedicore_server`
//!
//! Server-side composition:
//! - Fixed timestep tick loop on a dedicated thread
//! - Console input read from stdin and dispatched on the tick thread
//! - Built-in operator commands (help, status, say, stop)
//!
//! World simulation is supplied by the caller as an opaque tick callback.

pub mod commands;
pub mod console;
pub mod server;

pub use console::ConsoleSender;
pub use server::Server;
