//! Filesystem helpers for the assembly scratch directory.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Verify a fetched file exists and is non-empty, returning its size.
pub async fn ensure_nonempty_file(path: &Path) -> MediaResult<u64> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(MediaError::EmptyFile(path.to_path_buf()));
    }
    Ok(metadata.len())
}

/// Scratch path `<dir>/<stem>.<ext>`, taking the extension from `key`.
pub fn scratch_path(dir: &Path, stem: &str, key: &str, default_ext: &str) -> PathBuf {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(default_ext);
    dir.join(format!("{stem}.{ext}"))
}

/// Remove a directory tree, treating "already gone" as success.
pub async fn remove_dir_if_exists(dir: &Path) -> MediaResult<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
