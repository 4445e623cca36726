//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Blueprint file {}: {message}", path.display())]
    BlueprintFile { path: PathBuf, message: String },

    #[error("Assembly failed: {0}")]
    Assembly(#[from] dance_media::AssemblyError),

    #[error("Media error: {0}")]
    Media(#[from] dance_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn blueprint_file(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::BlueprintFile {
            path: path.into(),
            message: msg.into(),
        }
    }
}
