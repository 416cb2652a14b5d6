//! Server binary resolution and download

use std::path::PathBuf;

use log::{debug, info};

use super::Bootstrap;
use crate::config::expand_home;
use crate::download::{Platform, ReleaseClient, remove_stale};
use crate::error::{BootstrapError, Result};
use crate::host::Host;
use crate::state::PersistentState;

/// Command name handed to the process launcher when no release is pinned
pub const SYSTEM_SERVER: &str = "rust-analyzer";

const EXECUTABLE_MODE: u32 = 0o755;

impl<C: ReleaseClient, H: Host> Bootstrap<'_, C, H> {
    /// Resolve the server executable, downloading it when the stored
    /// version does not match the configured one.
    ///
    /// Resolution order: explicit override, then system binary when no
    /// release tag is configured, then `<storage>/<platform binary>`.
    pub async fn get_server(&self, state: &mut PersistentState) -> Result<PathBuf> {
        if let Some(explicit) = &self.env.server_path {
            debug!("Using explicit server path {}", explicit);
            return Ok(expand_home(explicit, self.env.home.as_deref()));
        }

        let Some(release_tag) = self.config.package.release_tag.as_deref() else {
            debug!("No release tag configured, using {} from PATH", SYSTEM_SERVER);
            return Ok(PathBuf::from(SYSTEM_SERVER));
        };

        let platform = Platform::from_parts(&self.env.arch, &self.env.os)?;
        let binary_name = platform.binary_name();
        let dest = self.env.storage_dir.join(binary_name);

        if tokio::fs::metadata(&dest).await.is_err() && state.server_version().is_some() {
            debug!("{} is gone, forgetting installed version", dest.display());
            state.update_server_version(None)?;
        }

        let target_version = &self.config.package.version;
        if state.server_version() == Some(target_version.as_str()) {
            debug!("Server {} is up to date at {}", target_version, dest.display());
            return Ok(dest);
        }

        if self.config.updates.ask_before_download {
            let message = format!(
                "Language server version {target_version} for rust-analyzer is not installed."
            );
            if !self.host.confirm(&message, "Download now") {
                info!("Server download declined, keeping {}", dest.display());
                return Ok(dest);
            }
        }

        let release = self.client.fetch_release(release_tag).await?;
        let asset = release
            .asset(binary_name)
            .ok_or_else(|| BootstrapError::MalformedRelease {
                tag: release_tag.to_string(),
                asset: binary_name.to_string(),
            })?;

        remove_stale(&dest)
            .map_err(|e| BootstrapError::io(format!("failed to remove {}", dest.display()), e))?;

        self.client
            .download(
                &asset.browser_download_url,
                &dest,
                Some(EXECUTABLE_MODE),
                "Downloading rust-analyzer server",
            )
            .await?;

        if self.env.patch_interpreter {
            self.patcher.patch(&dest).await?;
        }

        state.update_server_version(Some(target_version.clone()))?;
        state.update_last_check(self.env.now)?;
        info!("Installed rust-analyzer {} at {}", target_version, dest.display());
        Ok(dest)
    }
}
