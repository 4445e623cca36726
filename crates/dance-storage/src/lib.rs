//! Blob storage for assembly inputs and outputs.
//!
//! This crate provides:
//! - The `Storage` trait the video assembler fetches and uploads through
//! - A local-filesystem backend rooted at one directory
//! - Key validation shared by every backend

pub mod error;
pub mod local;

use std::path::Path;

use async_trait::async_trait;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;

/// Storage backend addressed by relative keys.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Copy the object at `key` to the local file `dest`.
    async fn download(&self, key: &str, dest: &Path) -> StorageResult<()>;

    /// Store the local file `local` at `key` and return its locator.
    async fn upload(&self, local: &Path, key: &str) -> StorageResult<String>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("empty key"));
    }
    if key.contains('\0') {
        return Err(StorageError::invalid_key(format!("{key:?} contains a NUL byte")));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains("..") {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}
