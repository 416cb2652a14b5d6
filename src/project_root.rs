//! Repository root lookup
//!
//! Walks from a starting directory up through its ancestors and stops at the
//! first one containing a repository marker.

use std::path::{Path, PathBuf};

/// Markers checked when none are given
pub const DEFAULT_MARKERS: &[&str] = &[".git"];

/// Closest ancestor of `start` (inclusive) that contains any of `markers`
pub fn find_project_root<S: AsRef<str>>(start: &Path, markers: &[S]) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            markers
                .iter()
                .any(|marker| dir.join(marker.as_ref()).exists())
        })
        .map(Path::to_path_buf)
}
