//! ELF interpreter patching for NixOS
//!
//! The downloaded binary is moved aside and rebuilt through `nix-build`,
//! which runs `patchelf --set-interpreter` against the toolchain's dynamic
//! linker and leaves the result at the original destination.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{BootstrapError, Result};

/// Nix expression fed to `nix-build -E -`
const PATCH_EXPRESSION: &str = r#"
{src, pkgs ? import <nixpkgs> {}}:
    pkgs.stdenv.mkDerivation {
        name = "rust-analyzer";
        inherit src;
        phases = [ "installPhase" "fixupPhase" ];
        installPhase = "cp $src $out";
        fixupPhase = ''
        chmod 755 $out
        patchelf --set-interpreter "$(cat $NIX_CC/nix-support/dynamic-linker)" $out
        '';
    }
"#;

/// Runs the build tool that rewrites a binary's interpreter
#[derive(Debug, Clone)]
pub struct Patcher {
    program: PathBuf,
}

impl Default for Patcher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("nix-build"),
        }
    }
}

impl Patcher {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Patch `dest` in place. Failure of the subprocess is fatal and carries
    /// its stderr.
    pub async fn patch(&self, dest: &Path) -> Result<()> {
        let orig = orig_path(dest);
        tokio::fs::rename(dest, &orig)
            .await
            .map_err(|e| BootstrapError::io(format!("failed to move {} aside", dest.display()), e))?;

        info!("Patching executable {}", dest.display());
        let result = self.run(&orig, dest).await;

        if result.is_err() {
            // Put the unpatched binary back so the next run can retry
            if let Err(e) = tokio::fs::rename(&orig, dest).await {
                warn!(
                    "Failed to restore {} from {}: {}",
                    dest.display(),
                    orig.display(),
                    e
                );
            }
            return result;
        }

        tokio::fs::remove_file(&orig)
            .await
            .map_err(|e| BootstrapError::io(format!("failed to remove {}", orig.display()), e))
    }

    async fn run(&self, src: &Path, out: &Path) -> Result<()> {
        debug!(
            "Running {} -E - --arg src {} -o {}",
            self.program.display(),
            src.display(),
            out.display()
        );

        let mut child = Command::new(&self.program)
            .arg("-E")
            .arg("-")
            .arg("--arg")
            .arg("src")
            .arg(src)
            .arg("-o")
            .arg(out)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BootstrapError::Patch {
                path: out.to_path_buf(),
                stderr: format!("failed to spawn {}: {}", self.program.display(), e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A tool that exits without reading stdin is reported through its status
            let _ = stdin.write_all(PATCH_EXPRESSION.as_bytes()).await;
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BootstrapError::io("failed to wait for patch process", e))?;

        if !output.status.success() {
            return Err(BootstrapError::Patch {
                path: out.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn orig_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push("-orig");
    PathBuf::from(name)
}
