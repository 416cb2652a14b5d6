//! Persistent installation state
//!
//! A small JSON key-value file that survives restarts. Only the bootstrap
//! flow reads or writes it, once per process.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BootstrapError, Result};

/// File name of the state store inside the storage directory
pub const STATE_FILE: &str = "state.json";

/// What is installed and when we last looked for something newer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationState {
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_id: Option<u64>,
    #[serde(default)]
    pub server_version: Option<String>,
}

/// File-backed [`InstallationState`]; every update is written through
#[derive(Debug)]
pub struct PersistentState {
    path: PathBuf,
    data: InstallationState,
}

impl PersistentState {
    /// Read the state file at `path`.
    ///
    /// A missing or unparsable file yields an empty state, which makes the
    /// next check behave like a fresh install.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Ignoring corrupt state file {}: {}", path.display(), e);
                    InstallationState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => InstallationState::default(),
            Err(e) => {
                return Err(BootstrapError::io(
                    format!("failed to read state file {}", path.display()),
                    e,
                ));
            }
        };
        debug!("Loaded installation state {:?}", data);
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &InstallationState {
        &self.data
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.data.last_check
    }

    pub fn release_id(&self) -> Option<u64> {
        self.data.release_id
    }

    pub fn server_version(&self) -> Option<&str> {
        self.data.server_version.as_deref()
    }

    pub fn update_last_check(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.data.last_check = Some(at);
        self.persist()
    }

    pub fn update_release_id(&mut self, id: u64) -> Result<()> {
        self.data.release_id = Some(id);
        self.persist()
    }

    pub fn update_server_version(&mut self, version: Option<String>) -> Result<()> {
        self.data.server_version = version;
        self.persist()
    }

    /// Write to a sibling temp file, then rename over the real one
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BootstrapError::io(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let contents = serde_json::to_vec_pretty(&self.data)
            .map_err(|e| BootstrapError::State(e.to_string()))?;
        let temp_path = self.path.with_extension("tmp");

        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| BootstrapError::io("failed to create temp state file", e))?;
            file.write_all(&contents)
                .map_err(|e| BootstrapError::io("failed to write temp state file", e))?;
            file.sync_all()
                .map_err(|e| BootstrapError::io("failed to sync temp state file", e))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| BootstrapError::io("failed to rename temp state file", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = PersistentState::load(dir.path().join("state.json")).unwrap();
        assert_eq!(state.snapshot(), &InstallationState::default());
    }

    #[test]
    fn test_updates_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let now = Utc::now();

        let mut state = PersistentState::load(&path).unwrap();
        state.update_server_version(Some("0.2.400".into())).unwrap();
        state.update_release_id(42).unwrap();
        state.update_last_check(now).unwrap();

        let reloaded = PersistentState::load(&path).unwrap();
        assert_eq!(reloaded.server_version(), Some("0.2.400"));
        assert_eq!(reloaded.release_id(), Some(42));
        assert_eq!(reloaded.last_check(), Some(now));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_uses_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = PersistentState::load(&path).unwrap();
        state.update_server_version(Some("1.0".into())).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["serverVersion"], "1.0");
        assert!(raw.get("releaseId").is_some());
        assert!(raw.get("lastCheck").is_some());
    }

    #[test]
    fn test_corrupt_file_resets_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let state = PersistentState::load(&path).unwrap();
        assert!(state.server_version().is_none());
    }
}
