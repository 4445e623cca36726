//! Local filesystem storage backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::{validate_key, Storage};

/// Storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a validated key.
    pub fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let root = std::path::absolute(&self.root)?;
        Ok(root.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download(&self, key: &str, dest: &Path) -> StorageResult<()> {
        let source = self.resolve(key)?;
        debug!("Downloading {} to {}", key, dest.display());

        if !tokio::fs::try_exists(&source).await? {
            return Err(StorageError::not_found(key));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| {
                    StorageError::download_failed(format!("Failed to create directory: {}", e))
                })?;
        }

        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to copy {}: {}", key, e)))?;

        info!("Downloaded {} to {}", key, dest.display());
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> StorageResult<String> {
        let dest = self.resolve(key)?;
        debug!("Uploading {} to {}", local.display(), key);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| {
                    StorageError::upload_failed(format!("Failed to create directory: {}", e))
                })?;
        }

        tokio::fs::copy(local, &dest)
            .await
            .map_err(|e| {
                StorageError::upload_failed(format!("Failed to copy {}: {}", local.display(), e))
            })?;

        info!("Uploaded {} to {}", local.display(), key);
        Ok(dest.to_string_lossy().into_owned())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_through_root() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path());

        let local = scratch.path().join("render.mp4");
        tokio::fs::write(&local, b"video").await.unwrap();

        let locator = storage.upload(&local, "renders/task-1/out.mp4").await.unwrap();
        assert!(Path::new(&locator).is_absolute());
        assert!(locator.ends_with("renders/task-1/out.mp4"));

        let fetched = scratch.path().join("nested/copy.mp4");
        storage.download("renders/task-1/out.mp4", &fetched).await.unwrap();
        assert_eq!(tokio::fs::read(&fetched).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path());

        let err = storage
            .download("clips/missing.mp4", &root.path().join("x.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_keys_refused() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path());

        let err = storage
            .download("../outside.mp4", &root.path().join("x.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = storage
            .upload(&root.path().join("x.mp4"), "/abs.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert_eq!(storage.name(), "local");
    }
}
