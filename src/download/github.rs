//! GitHub release API interaction

use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{BootstrapError, Result};

const GITHUB_API_URL: &str = "https://api.github.com";

/// Repository that publishes server binaries and nightly extension builds
pub const RELEASE_REPO: &str = "rust-analyzer/rust-analyzer";

const USER_AGENT: &str = concat!("ra-bootstrap/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Release metadata requests are retried on transport errors and 5xx only
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// GitHub release metadata from API
#[derive(Deserialize, Debug, Clone)]
pub struct GithubRelease {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    pub assets: Vec<GithubAsset>,
}

impl GithubRelease {
    pub fn asset(&self, name: &str) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug, Clone)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// HTTP client with the user agent and connect timeout we use everywhere
pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

pub fn release_url(repo: &str, tag: &str) -> String {
    format!("{GITHUB_API_URL}/repos/{repo}/releases/tags/{tag}")
}

/// Delay before retry number `attempt` (1-based)
fn backoff_delay(attempt: u32) -> Duration {
    INITIAL_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Fetch a specific GitHub release by tag name
pub async fn fetch_release(
    client: &reqwest::Client,
    repo: &str,
    tag: &str,
) -> Result<GithubRelease> {
    let url = release_url(repo, tag);
    let mut attempt = 1;

    loop {
        match fetch_once(client, &url, tag).await {
            Ok(release) => {
                debug!(
                    "GitHub API: release '{}' has id {} and {} assets",
                    tag,
                    release.id,
                    release.assets.len()
                );
                return Ok(release);
            }
            Err(e) if attempt < MAX_ATTEMPTS && is_retryable(&e) => {
                let delay = backoff_delay(attempt);
                warn!(
                    "Fetching release '{}' failed (attempt {}/{}): {}; retrying in {:?}",
                    tag, attempt, MAX_ATTEMPTS, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str, tag: &str) -> Result<GithubRelease> {
    debug!("GitHub API: GET {}", url);
    let mut request = client
        .get(url)
        .header("Accept", "application/vnd.github.v3+json")
        .timeout(REQUEST_TIMEOUT);

    // Use GITHUB_TOKEN if available (avoids rate limiting)
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(BootstrapError::ReleaseFetch {
            tag: tag.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.json().await?)
}

fn is_retryable(err: &BootstrapError) -> bool {
    match err {
        BootstrapError::Http(e) => !e.is_decode(),
        BootstrapError::ReleaseFetch { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        let json = r#"{
            "id": 28394021,
            "name": "nightly",
            "published_at": "2020-07-14T03:06:23Z",
            "tag_name": "nightly",
            "assets": [
                {"name": "rust-analyzer-linux", "browser_download_url": "https://example.invalid/linux", "size": 12},
                {"name": "rust-analyzer.vsix", "browser_download_url": "https://example.invalid/vsix"}
            ]
        }"#;

        let release: GithubRelease = serde_json::from_str(json).unwrap();
        assert_eq!(release.id, 28394021);
        assert_eq!(release.asset("rust-analyzer-linux").unwrap().size, 12);
        assert_eq!(
            release.asset("rust-analyzer.vsix").unwrap().browser_download_url,
            "https://example.invalid/vsix"
        );
        assert!(release.asset("rust-analyzer-mac").is_none());
    }

    #[test]
    fn test_release_url() {
        assert_eq!(
            release_url(RELEASE_REPO, "nightly"),
            "https://api.github.com/repos/rust-analyzer/rust-analyzer/releases/tags/nightly"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
    }

    #[test]
    fn test_only_server_errors_retry() {
        let server = BootstrapError::ReleaseFetch {
            tag: "nightly".into(),
            status: 502,
        };
        let missing = BootstrapError::ReleaseFetch {
            tag: "nightly".into(),
            status: 404,
        };
        assert!(is_retryable(&server));
        assert!(!is_retryable(&missing));
        assert!(!is_retryable(&BootstrapError::State("x".into())));
    }
}
