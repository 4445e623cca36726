//! Assembler configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Video assembler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Parent directory for per-assembly scratch directories
    pub work_dir: PathBuf,
    /// ffmpeg program name or path
    pub ffmpeg_path: PathBuf,
    /// Frame rate every clip is normalized to
    pub target_fps: u32,
    /// x264 preset used when normalizing
    pub normalize_preset: String,
    /// Per-clip normalize timeout
    pub normalize_timeout_secs: u64,
    pub concat_timeout_secs: u64,
    pub mux_timeout_secs: u64,
    /// Maximum concurrent downloads
    pub max_parallel_downloads: usize,
    /// Bytes of tool stderr kept on failure
    pub tool_output_limit: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/dance-assembly"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            target_fps: 30,
            normalize_preset: "veryfast".to_string(),
            normalize_timeout_secs: 60,
            concat_timeout_secs: 300, // 5 minutes
            mux_timeout_secs: 600,    // 10 minutes
            max_parallel_downloads: 4,
            tool_output_limit: 2000,
        }
    }
}

impl AssemblerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("ASSEMBLY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_path: std::env::var("ASSEMBLY_FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            target_fps: env_parse("ASSEMBLY_TARGET_FPS").unwrap_or(defaults.target_fps),
            normalize_preset: std::env::var("ASSEMBLY_NORMALIZE_PRESET")
                .unwrap_or(defaults.normalize_preset),
            normalize_timeout_secs: env_parse("ASSEMBLY_NORMALIZE_TIMEOUT")
                .unwrap_or(defaults.normalize_timeout_secs),
            concat_timeout_secs: env_parse("ASSEMBLY_CONCAT_TIMEOUT")
                .unwrap_or(defaults.concat_timeout_secs),
            mux_timeout_secs: env_parse("ASSEMBLY_MUX_TIMEOUT")
                .unwrap_or(defaults.mux_timeout_secs),
            max_parallel_downloads: env_parse("ASSEMBLY_MAX_PARALLEL_DOWNLOADS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_parallel_downloads),
            tool_output_limit: defaults.tool_output_limit,
        }
    }

    pub fn normalize_timeout(&self) -> Duration {
        Duration::from_secs(self.normalize_timeout_secs)
    }

    pub fn concat_timeout(&self) -> Duration {
        Duration::from_secs(self.concat_timeout_secs)
    }

    pub fn mux_timeout(&self) -> Duration {
        Duration::from_secs(self.mux_timeout_secs)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssemblerConfig::default();
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.normalize_timeout(), Duration::from_secs(60));
        assert_eq!(config.concat_timeout(), Duration::from_secs(300));
        assert_eq!(config.mux_timeout(), Duration::from_secs(600));
        assert_eq!(config.tool_output_limit, 2000);
    }
}
