//! `dedicore_shared`
//!
//! Runtime core shared by the dedicated server and its collaborators.
//!
//! Design goals:
//! - Fixed-timestep ticking with drift compensation and health statistics.
//! - Case-insensitive command routing with aliases and permissions.
//! - No process-wide singletons: everything hangs off an explicit [`ServerContext`].
//! - No `unsafe`.
//!
//! [`ServerContext`]: context::ServerContext

pub mod command;
pub mod config;
pub mod context;
mod panic;
pub mod text;
pub mod tick;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::command::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::text::*;
    pub use crate::tick::*;
}
