//! Host application seam
//!
//! Everything the bootstrap flow needs from the editor it runs for: user
//! prompts, notifications, and installing a downloaded extension package.

use std::path::Path;

use anyhow::{Context, Result, bail};
use inquire::Confirm;
use log::{error, info, warn};
use tokio::process::Command;

/// Capabilities provided by the host integration
#[allow(async_fn_in_trait)]
pub trait Host {
    /// Ask the user to acknowledge `message` by choosing `action`.
    /// Returns `false` when declined or dismissed.
    fn confirm(&self, message: &str, action: &str) -> bool;

    fn show_warning(&self, message: &str);

    fn show_error(&self, message: &str);

    /// Install an extension package (`.vsix`) into the editor
    async fn install_extension(&self, package: &Path) -> Result<()>;

    /// Ask the editor to reload so a freshly installed extension takes effect
    fn reload(&self);
}

/// Editor CLIs that understand `--install-extension`
const EDITOR_CLIS: &[&str] = &["code", "code-insiders", "codium"];

/// Terminal-backed host: prompts via `inquire`, notifications via the logger
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    /// Answer every confirmation with "yes" without prompting
    pub assume_yes: bool,
}

impl TerminalHost {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Host for TerminalHost {
    fn confirm(&self, message: &str, action: &str) -> bool {
        if self.assume_yes {
            info!("{} ({}: yes)", message, action);
            return true;
        }

        match Confirm::new(&format!("{message} {action}?"))
            .with_default(false)
            .prompt()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Prompt cancelled: {}", e);
                false
            }
        }
    }

    fn show_warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn show_error(&self, message: &str) {
        error!("{}", message);
    }

    async fn install_extension(&self, package: &Path) -> Result<()> {
        let editor = EDITOR_CLIS
            .iter()
            .find_map(|name| which::which(name).ok())
            .context("no editor CLI (code, code-insiders, codium) found on PATH")?;

        info!(
            "Installing {} with {}",
            package.display(),
            editor.display()
        );
        let output = Command::new(&editor)
            .arg("--install-extension")
            .arg(package)
            .arg("--force")
            .output()
            .await
            .with_context(|| format!("failed to run {}", editor.display()))?;

        if !output.status.success() {
            bail!(
                "{} --install-extension failed: {}",
                editor.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn reload(&self) {
        info!("Extension updated, reload your editor window to use it");
    }
}
