//! Platform detection for release asset selection

use std::path::Path;

use crate::error::{BootstrapError, Result};

/// Platforms we ship prebuilt server binaries for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,   // x86_64
    MacOs,   // x86_64
    Windows, // x86_64 / x86
}

impl Platform {
    /// Fixed (arch, os) lookup table. Anything not listed is unsupported.
    pub fn from_parts(arch: &str, os: &str) -> Result<Self> {
        match (arch, os) {
            ("x86_64", "linux") => Ok(Platform::Linux),
            ("x86_64", "macos") => Ok(Platform::MacOs),
            ("x86_64" | "x86", "windows") => Ok(Platform::Windows),
            (arch, os) => Err(BootstrapError::UnsupportedPlatform {
                arch: arch.to_string(),
                os: os.to_string(),
            }),
        }
    }

    /// Release asset name, also used as the on-disk file name
    pub fn binary_name(&self) -> &'static str {
        match self {
            Platform::Linux => "rust-analyzer-linux",
            Platform::MacOs => "rust-analyzer-mac",
            Platform::Windows => "rust-analyzer-windows.exe",
        }
    }
}

/// NixOS has no `/lib64/ld-linux*`, so downloaded binaries need their
/// interpreter rewritten before they can run.
pub fn needs_interpreter_patch() -> bool {
    cfg!(target_os = "linux") && Path::new("/etc/nixos").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_pairs() {
        assert_eq!(
            Platform::from_parts("x86_64", "linux").unwrap().binary_name(),
            "rust-analyzer-linux"
        );
        assert_eq!(
            Platform::from_parts("x86", "windows").unwrap().binary_name(),
            "rust-analyzer-windows.exe"
        );
        assert_eq!(
            Platform::from_parts("x86_64", "macos").unwrap(),
            Platform::MacOs
        );
    }

    #[test]
    fn test_unsupported_pair_is_error() {
        let err = Platform::from_parts("aarch64", "linux").unwrap_err();
        match err {
            BootstrapError::UnsupportedPlatform { arch, os } => {
                assert_eq!(arch, "aarch64");
                assert_eq!(os, "linux");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Platform::from_parts("x86_64", "freebsd").is_err());

        // Only Windows ships a 32-bit build
        for os in ["linux", "macos"] {
            assert!(matches!(
                Platform::from_parts("x86", os),
                Err(BootstrapError::UnsupportedPlatform { .. })
            ));
        }
    }
}
