//! In-memory stand-ins for the network and the editor

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};

use super::Environment;
use crate::download::{GithubAsset, GithubRelease, ReleaseClient};
use crate::error::{BootstrapError, Result};
use crate::host::Host;

/// Linux x86_64 environment storing everything under `storage`
pub fn env_for(storage: &Path) -> Environment {
    Environment {
        server_path: None,
        home: None,
        arch: "x86_64".to_string(),
        os: "linux".to_string(),
        storage_dir: storage.to_path_buf(),
        patch_interpreter: false,
        now: Utc.with_ymd_and_hms(2020, 7, 14, 12, 0, 0).unwrap(),
    }
}

pub fn release_with(id: u64, assets: &[&str]) -> GithubRelease {
    GithubRelease {
        id,
        name: Some("test".to_string()),
        published_at: None,
        assets: assets
            .iter()
            .map(|name| GithubAsset {
                name: name.to_string(),
                browser_download_url: format!("https://example.invalid/{name}"),
                size: 0,
            })
            .collect(),
    }
}

pub struct FakeClient {
    release: Option<GithubRelease>,
    fail_downloads: bool,
    fetches: Cell<usize>,
    downloads: RefCell<Vec<(PathBuf, Option<u32>)>>,
}

impl FakeClient {
    pub fn new(release: GithubRelease) -> Self {
        Self {
            release: Some(release),
            fail_downloads: false,
            fetches: Cell::new(0),
            downloads: RefCell::new(Vec::new()),
        }
    }

    /// Every fetch fails with a 503
    pub fn offline() -> Self {
        Self {
            release: None,
            fail_downloads: true,
            fetches: Cell::new(0),
            downloads: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }

    pub fn downloads(&self) -> Vec<(PathBuf, Option<u32>)> {
        self.downloads.borrow().clone()
    }
}

impl ReleaseClient for FakeClient {
    async fn fetch_release(&self, tag: &str) -> Result<GithubRelease> {
        self.fetches.set(self.fetches.get() + 1);
        self.release.clone().ok_or_else(|| BootstrapError::ReleaseFetch {
            tag: tag.to_string(),
            status: 503,
        })
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        mode: Option<u32>,
        _label: &str,
    ) -> Result<()> {
        self.downloads.borrow_mut().push((dest.to_path_buf(), mode));
        if self.fail_downloads {
            return Err(BootstrapError::io(
                "download interrupted",
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"),
            ));
        }
        std::fs::write(dest, url.as_bytes()).map_err(|e| BootstrapError::io("fake download", e))
    }
}

pub struct FakeHost {
    answer: bool,
    fail_install: bool,
    confirms: Cell<usize>,
    pub warnings: RefCell<Vec<String>>,
    pub errors: RefCell<Vec<String>>,
    pub installed: RefCell<Vec<PathBuf>>,
    reloads: Cell<usize>,
}

impl FakeHost {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            fail_install: false,
            confirms: Cell::new(0),
            warnings: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
            installed: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
        }
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn confirms(&self) -> usize {
        self.confirms.get()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.get()
    }
}

impl Host for FakeHost {
    fn confirm(&self, _message: &str, _action: &str) -> bool {
        self.confirms.set(self.confirms.get() + 1);
        self.answer
    }

    fn show_warning(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    async fn install_extension(&self, package: &Path) -> anyhow::Result<()> {
        // The package must still exist while the editor installs it
        anyhow::ensure!(package.exists(), "package {} missing", package.display());
        self.installed.borrow_mut().push(package.to_path_buf());
        if self.fail_install {
            anyhow::bail!("editor rejected package");
        }
        Ok(())
    }

    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }
}
