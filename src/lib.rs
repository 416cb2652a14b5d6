//! Bootstrap and update manager for the rust-analyzer language server
//!
//! Resolves a usable server executable at editor startup: honours explicit
//! overrides, falls back to the system binary when no release is pinned, and
//! otherwise keeps a platform-specific release asset up to date in per-user
//! storage. Nightly builds of the editor extension itself are offered at most
//! once per check interval.

pub mod bootstrap;
pub mod config;
pub mod download;
pub mod error;
pub mod host;
pub mod patch;
pub mod project_root;
pub mod session;
pub mod state;

pub use bootstrap::{Bootstrap, Environment};
pub use error::BootstrapError;
pub use session::{CommandId, CommandRegistry, Session};
