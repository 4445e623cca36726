//! Error types for media operations and video assembly.

use std::fmt;
use std::path::PathBuf;

use dance_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Result type for a whole assembly run.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {secs} seconds")]
    Timeout { secs: u64, stderr: Option<String> },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a timeout error.
    pub fn timeout(secs: u64, stderr: Option<String>) -> Self {
        Self::Timeout { secs, stderr }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured tool output, if the error carries any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::FfmpegFailed { stderr, .. } | Self::Timeout { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

/// Every accumulated blueprint check failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .errors.join("; "))]
pub struct BlueprintValidationError {
    pub errors: Vec<String>,
}

impl BlueprintValidationError {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// Assembly pipeline stage, used to tag failures and progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStage {
    Validating,
    Fetching,
    Normalizing,
    Concatenating,
    Muxing,
    Uploading,
    Cleanup,
}

impl AssemblyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyStage::Validating => "validating",
            AssemblyStage::Fetching => "fetching",
            AssemblyStage::Normalizing => "normalizing",
            AssemblyStage::Concatenating => "concatenating",
            AssemblyStage::Muxing => "muxing",
            AssemblyStage::Uploading => "uploading",
            AssemblyStage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure type of `VideoAssembler::assemble`.
#[derive(Debug, Clone, Error)]
#[error("[{stage}] {message}")]
pub struct AssemblyError {
    pub stage: AssemblyStage,
    pub message: String,
    /// Tail of the external tool's stderr
    pub tool_output: Option<String>,
}

impl AssemblyError {
    pub fn new(stage: AssemblyStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            tool_output: None,
        }
    }

    /// Prefix the message with what was being processed.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    /// Tag a media error with the stage it happened in.
    pub fn from_media(stage: AssemblyStage, error: MediaError, limit: usize) -> Self {
        let output = error.tool_output().map(|s| truncate_tail(s, limit).to_string());
        Self {
            stage,
            message: error.to_string(),
            tool_output: output,
        }
    }
}

/// Last `limit` bytes of `s`, cut on a char boundary.
pub fn truncate_tail(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut start = s.len() - limit;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
