//! `~` expansion for configured paths.

use std::path::{Path, PathBuf};

/// Resolve a leading `~` against the home directory.
///
/// Paths without a leading `~`, or systems without a home directory, are
/// returned unchanged.
pub fn expand_tilde_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// In-place form of [`expand_tilde_path`].
pub fn expand_tilde(path: &mut PathBuf) {
    *path = expand_tilde_path(path);
}
