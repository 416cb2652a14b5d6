use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides every other server location.
pub const SERVER_PATH_ENV: &str = "__RA_LSP_SERVER_DEBUG";

/// Release tag used by nightly builds.
pub const NIGHTLY_TAG: &str = "nightly";

const APP_DIR: &str = "ra-bootstrap";
const CONFIG_FILE: &str = "config.toml";

/// Update track for the extension and the server binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatesChannel {
    #[default]
    Stable,
    Nightly,
}

/// Top‑level bootstrap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Explicit server binary; `~/` is expanded
    pub server_path: Option<String>,
    /// Per-user storage for downloaded binaries and the state file
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub updates: UpdatesConfig,
    #[serde(default)]
    pub package: PackageConfig,
}

fn default_true() -> bool {
    true
}

fn default_check_interval_secs() -> u64 {
    60 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesConfig {
    #[serde(default)]
    pub channel: UpdatesChannel,
    #[serde(default = "default_true")]
    pub ask_before_download: bool,
    /// Minimum time between two nightly checks
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            channel: UpdatesChannel::Stable,
            ask_before_download: true,
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

fn default_package_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Identity of the build whose server binary we manage.
///
/// A missing `release_tag` means "use the system-installed server".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default = "default_package_version")]
    pub version: String,
    pub release_tag: Option<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            version: default_package_version(),
            release_tag: None,
        }
    }
}

impl BootstrapConfig {
    /// Explicit server path from the environment or the config file, in that order
    pub fn server_path_override(&self) -> Option<String> {
        resolve_override(
            std::env::var(SERVER_PATH_ENV).ok(),
            self.server_path.as_deref(),
        )
    }

    /// Storage directory, falling back to the platform data dir
    pub fn storage_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage_dir {
            return expand_home(&dir.to_string_lossy(), dirs::home_dir().as_deref());
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.updates.check_interval_secs)
    }
}

/// Pick the first non-empty override, environment first
pub fn resolve_override(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    env_value
        .filter(|v| !v.is_empty())
        .or_else(|| configured.filter(|v| !v.is_empty()).map(str::to_string))
}

/// Expand a leading `~` to `home`. Other paths are returned as-is.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(path),
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file on disk, built-in defaults in use
    Defaults,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BootstrapConfig,
    pub source: ConfigSource,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `<config_dir>/ra-bootstrap/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(APP_DIR)
        .join(CONFIG_FILE))
}

/// Load configuration from `path`.
///
/// A missing file is not an error: defaults are returned with
/// [`ConfigSource::Defaults`]. An unreadable or malformed file is.
pub fn load(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(LoadedConfig {
                config: BootstrapConfig::default(),
                source: ConfigSource::Defaults,
            });
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path.to_path_buf()),
    })
}

/// Write the default configuration to `path`, creating parent directories
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let contents = toml::to_string_pretty(&BootstrapConfig::default())?;
    std::fs::write(path, contents).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(loaded.source, ConfigSource::Defaults);
        assert_eq!(loaded.config.updates.channel, UpdatesChannel::Stable);
        assert!(loaded.config.updates.ask_before_download);
        assert!(loaded.config.package.release_tag.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
server_path = "~/bin/rust-analyzer"

[updates]
channel = "nightly"

[package]
version = "0.2.400"
release_tag = "2020-07-13"
"#,
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.source, ConfigSource::File(path));
        let config = loaded.config;
        assert_eq!(config.updates.channel, UpdatesChannel::Nightly);
        assert!(config.updates.ask_before_download);
        assert_eq!(config.check_interval(), Duration::from_secs(3600));
        assert_eq!(config.package.release_tag.as_deref(), Some("2020-07-13"));
        assert_eq!(config.server_path.as_deref(), Some("~/bin/rust-analyzer"));
    }

    #[test]
    fn test_invalid_channel_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[updates]\nchannel = \"beta\"\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_default_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default(&path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.source, ConfigSource::File(path));
        assert_eq!(loaded.config.package.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_env_override_wins() {
        assert_eq!(
            resolve_override(Some("/dbg/ra".into()), Some("/cfg/ra")).as_deref(),
            Some("/dbg/ra")
        );
        assert_eq!(
            resolve_override(None, Some("/cfg/ra")).as_deref(),
            Some("/cfg/ra")
        );
        assert_eq!(
            resolve_override(Some(String::new()), Some("/cfg/ra")).as_deref(),
            Some("/cfg/ra")
        );
        assert_eq!(resolve_override(None, Some("")), None);
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/user");
        assert_eq!(
            expand_home("~/bin/ra", Some(home)),
            PathBuf::from("/home/user/bin/ra")
        );
        assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/user"));
        assert_eq!(expand_home("/usr/bin/ra", Some(home)), PathBuf::from("/usr/bin/ra"));
        assert_eq!(expand_home("~other/ra", Some(home)), PathBuf::from("~other/ra"));
        assert_eq!(expand_home("~/ra", None), PathBuf::from("~/ra"));
    }
}
