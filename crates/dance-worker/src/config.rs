//! Worker configuration.

use std::path::PathBuf;

use dance_media::AssemblerConfig;
use serde::{Deserialize, Serialize};

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Root directory of the local storage backend
    pub storage_root: PathBuf,
    /// Assembler settings
    pub assembler: AssemblerConfig,
    /// Emit JSON log lines instead of the ANSI formatter
    pub log_json: bool,
    /// Prometheus listen address; no exporter when unset
    pub metrics_addr: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./storage"),
            assembler: AssemblerConfig::default(),
            log_json: false,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            assembler: AssemblerConfig::from_env(),
            log_json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
            metrics_addr: std::env::var("METRICS_ADDR")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.storage_root, PathBuf::from("./storage"));
        assert_eq!(config.assembler.target_fps, 30);
        assert!(!config.log_json);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(WorkerConfig::default()).unwrap();
        assert_eq!(json["assembler"]["mux_timeout_secs"], 600);
        assert!(json["metrics_addr"].is_null());
    }
}
