//! Startup bootstrap: server binary resolution and nightly self-update
//!
//! [`Bootstrap::get_server`] guarantees an executable path before the editor
//! integration starts. [`Bootstrap::bootstrap_extension`] is the optional
//! nightly extension update; its failures never block startup.

mod nightly;
mod server;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::BootstrapConfig;
use crate::download::{ReleaseClient, needs_interpreter_patch};
use crate::host::Host;
use crate::patch::Patcher;

pub use server::SYSTEM_SERVER;

/// Facts about the running system, captured once at startup
#[derive(Debug, Clone)]
pub struct Environment {
    /// Explicit server override from the environment or config
    pub server_path: Option<String>,
    pub home: Option<PathBuf>,
    pub arch: String,
    pub os: String,
    pub storage_dir: PathBuf,
    /// Downloaded binaries must go through [`Patcher`]
    pub patch_interpreter: bool,
    pub now: DateTime<Utc>,
}

impl Environment {
    pub fn detect(config: &BootstrapConfig) -> Self {
        Self {
            server_path: config.server_path_override(),
            home: dirs::home_dir(),
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            storage_dir: config.storage_dir(),
            patch_interpreter: needs_interpreter_patch(),
            now: Utc::now(),
        }
    }
}

/// One startup's worth of bootstrap work
pub struct Bootstrap<'a, C, H> {
    config: &'a BootstrapConfig,
    env: &'a Environment,
    client: &'a C,
    host: &'a H,
    patcher: Patcher,
}

impl<'a, C: ReleaseClient, H: Host> Bootstrap<'a, C, H> {
    pub fn new(config: &'a BootstrapConfig, env: &'a Environment, client: &'a C, host: &'a H) -> Self {
        Self {
            config,
            env,
            client,
            host,
            patcher: Patcher::default(),
        }
    }

    pub fn with_patcher(mut self, patcher: Patcher) -> Self {
        self.patcher = patcher;
        self
    }

    fn check_interval(&self) -> Duration {
        self.config.check_interval()
    }
}
