//! Asset download with progress tracking

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::error::{BootstrapError, Result};

/// No data for this long aborts the download
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Remove a previous download. A missing file is fine; anything else is
/// returned unchanged.
///
/// Unlinking before writing the replacement avoids `ETXTBSY` when the old
/// binary is still running.
pub fn remove_stale(dest: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn progress_bar(total: Option<u64>, label: &str) -> ProgressBar {
    let pb = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb.set_message(label.to_string());
    pb
}

/// Stream `url` into `dest`, applying `mode` on unix.
///
/// Bytes land in a temp file next to `dest` which is renamed into place only
/// after the body is complete, so an interrupted download leaves nothing
/// behind at `dest`.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    mode: Option<u32>,
    label: &str,
) -> Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| BootstrapError::State(format!("invalid destination: {}", dest.display())))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BootstrapError::io(format!("failed to create {}", dir.display()), e))?;

    debug!("Downloading {} to {}", url, dest.display());
    let response = client.get(url).send().await?.error_for_status()?;
    let pb = progress_bar(response.content_length(), label);

    let temp = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dir)
        .map_err(|e| BootstrapError::io("failed to create temp file", e))?;
    let (std_file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    loop {
        let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => break,
            Err(_) => {
                pb.abandon();
                return Err(BootstrapError::DownloadStalled {
                    url: url.to_string(),
                    secs: DOWNLOAD_INACTIVITY_TIMEOUT.as_secs(),
                });
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| BootstrapError::io("failed to write download", e))?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()
        .await
        .map_err(|e| BootstrapError::io("failed to flush download", e))?;
    file.sync_all()
        .await
        .map_err(|e| BootstrapError::io("failed to sync download", e))?;
    drop(file);

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| BootstrapError::io("failed to set permissions", e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    temp_path
        .persist(dest)
        .map_err(|e| BootstrapError::io(format!("failed to move download to {}", dest.display()), e.error))?;

    pb.finish_and_clear();
    info!("Downloaded {} ({} bytes)", dest.display(), downloaded);
    Ok(())
}
