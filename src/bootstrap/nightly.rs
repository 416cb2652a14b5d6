//! Nightly self-update of the editor extension

use log::{debug, error, info};

use super::Bootstrap;
use crate::config::{NIGHTLY_TAG, UpdatesChannel};
use crate::download::{ReleaseClient, remove_stale};
use crate::error::{BootstrapError, Result};
use crate::host::Host;
use crate::state::PersistentState;

/// Extension package attached to every nightly release
pub const EXTENSION_ASSET: &str = "rust-analyzer.vsix";

impl<C: ReleaseClient, H: Host> Bootstrap<'_, C, H> {
    /// Offer the latest nightly extension build, at most once per check
    /// interval. Network failures are logged and retried next interval.
    pub async fn bootstrap_extension(&self, state: &mut PersistentState) -> Result<()> {
        let Some(release_tag) = self.config.package.release_tag.as_deref() else {
            return Ok(());
        };

        if self.config.updates.channel == UpdatesChannel::Stable {
            if release_tag == NIGHTLY_TAG {
                self.host.show_warning(
                    "You are running a nightly version of rust-analyzer extension. \
                     To switch to stable, uninstall the extension and re-install it from the marketplace",
                );
            }
            return Ok(());
        }

        let now = self.env.now;
        let due = match (state.release_id(), state.last_check()) {
            (Some(_), Some(last)) => now
                .signed_duration_since(last)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.check_interval()),
            _ => true,
        };
        if !due {
            debug!("Nightly checked recently, skipping");
            return Ok(());
        }

        let release = match self.client.fetch_release(NIGHTLY_TAG).await {
            Ok(release) => release,
            Err(e) => {
                error!("Failed to fetch nightly release: {}", e);
                if state.release_id().is_none() {
                    self.host
                        .show_error(&format!("Failed to download rust-analyzer nightly {e}"));
                }
                return Ok(());
            }
        };

        if state.release_id() == Some(release.id) {
            debug!("Nightly {} already installed", release.id);
            return state.update_last_check(now);
        }

        if !self.host.confirm(
            "New version of rust-analyzer (nightly) is available (requires reload).",
            "Update",
        ) {
            return Ok(());
        }

        let asset = release
            .asset(EXTENSION_ASSET)
            .ok_or_else(|| BootstrapError::MalformedRelease {
                tag: NIGHTLY_TAG.to_string(),
                asset: EXTENSION_ASSET.to_string(),
            })?;

        let dest = self.env.storage_dir.join(EXTENSION_ASSET);
        self.client
            .download(
                &asset.browser_download_url,
                &dest,
                None,
                "Downloading rust-analyzer extension",
            )
            .await?;

        let installed = self.host.install_extension(&dest).await;
        remove_stale(&dest)
            .map_err(|e| BootstrapError::io(format!("failed to remove {}", dest.display()), e))?;
        installed.map_err(BootstrapError::ExtensionInstall)?;

        state.update_release_id(release.id)?;
        state.update_last_check(now)?;
        info!("Installed nightly extension build {}", release.id);
        self.host.reload();
        Ok(())
    }
}
