//! Activated editor session and its command table
//!
//! The entry point owns the [`Session`]; commands receive it by reference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use futures::future::BoxFuture;
use log::{debug, error, info};
use tokio::process::Command;

use crate::bootstrap::{Bootstrap, Environment};
use crate::config::BootstrapConfig;
use crate::download::ReleaseClient;
use crate::host::Host;
use crate::state::{PersistentState, STATE_FILE};

/// Where users are sent when the server cannot be made available
pub const INSTALL_DOCS: &str = "https://rust-analyzer.github.io/manual.html#installation";

/// A successfully bootstrapped session
#[derive(Debug)]
pub struct Session {
    state: PersistentState,
    server: PathBuf,
}

impl Session {
    /// Run the startup sequence: optional nightly update, mandatory server
    /// resolution, then an executable probe of the result.
    pub async fn activate<C: ReleaseClient, H: Host>(
        config: BootstrapConfig,
        env: Environment,
        client: &C,
        host: &H,
        check_nightly: bool,
    ) -> Result<Self> {
        let state_path = env.storage_dir.join(STATE_FILE);
        let mut state = PersistentState::load(&state_path)
            .with_context(|| format!("failed to load {}", state_path.display()))?;

        let resolved = {
            let bootstrap = Bootstrap::new(&config, &env, client, host);
            if check_nightly
                && let Err(e) = bootstrap.bootstrap_extension(&mut state).await
            {
                error!("Nightly extension update failed: {}", e);
            }
            bootstrap.get_server(&mut state).await
        };

        let server = match resolved {
            Ok(server) => server,
            Err(e) => {
                let message = format!(
                    "rust-analyzer failed to load: {e}. Please ensure its proper installation: {INSTALL_DOCS}"
                );
                host.show_error(&message);
                return Err(anyhow!(message));
            }
        };

        if !probe_executable(&server).await {
            let message = format!(
                "rust-analyzer language server is not available at {}. \
                 Please ensure its proper installation: {INSTALL_DOCS}",
                server.display()
            );
            host.show_error(&message);
            bail!(message);
        }

        info!("Using server {}", server.display());
        Ok(Self { state, server })
    }

    pub fn server(&self) -> &Path {
        &self.server
    }

    pub fn state(&self) -> &PersistentState {
        &self.state
    }
}

/// `true` when `<server> --version` runs and exits successfully
pub async fn probe_executable(server: &Path) -> bool {
    match Command::new(server).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            debug!(
                "{} --version: {}",
                server.display(),
                String::from_utf8_lossy(&output.stdout).trim()
            );
            true
        }
        Ok(output) => {
            debug!(
                "{} --version exited with {}: {}",
                server.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            debug!("Failed to spawn {}: {}", server.display(), e);
            false
        }
    }
}

/// Commands the host can dispatch against a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CommandId {
    /// Print the running server's version
    ServerVersion,
    /// Print the resolved server path
    ServerPath,
    /// Print the persisted installation state
    State,
}

impl CommandId {
    pub const ALL: &'static [CommandId] =
        &[CommandId::ServerVersion, CommandId::ServerPath, CommandId::State];

    /// Identifier as registered with the editor
    pub fn name(&self) -> &'static str {
        match self {
            CommandId::ServerVersion => "rust-analyzer.serverVersion",
            CommandId::ServerPath => "rust-analyzer.serverPath",
            CommandId::State => "rust-analyzer.installationState",
        }
    }
}

pub type Handler = for<'a> fn(&'a Session) -> BoxFuture<'a, Result<String>>;

/// Command identifier → handler table, built once per process
pub struct CommandRegistry {
    handlers: HashMap<CommandId, Handler>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<CommandId, Handler> = HashMap::new();
        handlers.insert(CommandId::ServerVersion, server_version);
        handlers.insert(CommandId::ServerPath, server_path);
        handlers.insert(CommandId::State, installation_state);
        Self { handlers }
    }

    pub async fn dispatch(&self, id: CommandId, session: &Session) -> Result<String> {
        let handler = self
            .handlers
            .get(&id)
            .ok_or_else(|| anyhow!("command {} is not registered", id.name()))?;
        debug!("Dispatching {}", id.name());
        handler(session).await
    }

    pub fn is_registered(&self, id: CommandId) -> bool {
        self.handlers.contains_key(&id)
    }
}

fn server_version(session: &Session) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        let output = Command::new(session.server())
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("failed to run {}", session.server().display()))?;
        if !output.status.success() {
            bail!(
                "{} --version failed: {}",
                session.server().display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(format!("rust-analyzer version: {version}"))
    })
}

fn server_path(session: &Session) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move { Ok(session.server().display().to_string()) })
}

fn installation_state(session: &Session) -> BoxFuture<'_, Result<String>> {
    Box::pin(async move {
        serde_json::to_string_pretty(session.state().snapshot())
            .context("failed to serialize installation state")
    })
}
