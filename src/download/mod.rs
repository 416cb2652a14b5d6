//! GitHub release lookup and asset download
//!
//! ## Module Organization
//!
//! - `platform` - (arch, os) lookup table and NixOS detection
//! - `github` - GitHub API interaction for release discovery
//! - `core` - streaming download and stale-file cleanup

mod core;
mod github;
mod platform;

use std::path::Path;

use crate::error::Result;

pub use self::core::{download_file, remove_stale};
pub use self::github::{GithubAsset, GithubRelease, RELEASE_REPO};
pub use self::platform::{Platform, needs_interpreter_patch};

/// Network side of the bootstrap flow.
///
/// The bootstrap logic only talks to releases through this trait, so it can
/// be driven without a network.
#[allow(async_fn_in_trait)]
pub trait ReleaseClient {
    /// Fetch the release descriptor published under `tag`
    async fn fetch_release(&self, tag: &str) -> Result<GithubRelease>;

    /// Download `url` to `dest`, applying `mode` where supported
    async fn download(&self, url: &str, dest: &Path, mode: Option<u32>, label: &str)
    -> Result<()>;
}

/// [`ReleaseClient`] backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    repo: String,
}

impl GithubClient {
    pub fn new() -> Result<Self> {
        Self::with_repo(RELEASE_REPO)
    }

    pub fn with_repo(repo: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: github::build_client()?,
            repo: repo.into(),
        })
    }
}

impl ReleaseClient for GithubClient {
    async fn fetch_release(&self, tag: &str) -> Result<GithubRelease> {
        github::fetch_release(&self.http, &self.repo, tag).await
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        mode: Option<u32>,
        label: &str,
    ) -> Result<()> {
        download_file(&self.http, url, dest, mode, label).await
    }
}
