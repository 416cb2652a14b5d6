//! Error types for the bootstrap flow
//!
//! Fatal conditions (unsupported platform, malformed release, failed patch)
//! get their own variants so callers can tell them apart from plain I/O.

use std::path::PathBuf;

/// Errors that can occur while resolving or installing the server binary
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// No prebuilt binary exists for this (arch, os) pair
    #[error(
        "unfortunately we don't ship binaries for your platform yet ({arch} {os}); \
         you need to manually clone the rust-analyzer repository and build it from source"
    )]
    UnsupportedPlatform { arch: String, os: String },

    /// The release is missing the asset we expect for this platform
    #[error("bad release {tag}: no asset named {asset}")]
    MalformedRelease { tag: String, asset: String },

    /// GitHub answered with a non-success status
    #[error("got response {status} when trying to fetch release {tag}")]
    ReleaseFetch { tag: String, status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// No bytes arrived for longer than the inactivity timeout
    #[error("download stalled: no data received for {secs} seconds while downloading {url}")]
    DownloadStalled { url: String, secs: u64 },

    /// `nix-build` failed while rewriting the interpreter
    #[error("failed to patch {}: {stderr}", path.display())]
    Patch { path: PathBuf, stderr: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The editor refused the downloaded extension package
    #[error("failed to install extension: {0:#}")]
    ExtensionInstall(anyhow::Error),

    /// The persisted state file could not be read or written
    #[error("installation state error: {0}")]
    State(String),
}

impl BootstrapError {
    /// Attach a human-readable context to an I/O error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
