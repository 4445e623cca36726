//! FFmpeg progress parsing and assembly stage progress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AssemblyStage;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `total_duration_ms` encoded so far, in [0, 1].
    pub fn fraction(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / total_duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Callback receiving `(stage, percent, message)`.
pub type ProgressCallback = Arc<dyn Fn(AssemblyStage, u8, &str) + Send + Sync>;

impl AssemblyStage {
    /// Overall percent range covered by this stage.
    pub fn band(&self) -> (u8, u8) {
        match self {
            AssemblyStage::Validating => (0, 5),
            AssemblyStage::Fetching => (5, 30),
            AssemblyStage::Normalizing => (30, 70),
            AssemblyStage::Concatenating => (70, 80),
            AssemblyStage::Muxing => (80, 92),
            AssemblyStage::Uploading => (92, 99),
            AssemblyStage::Cleanup => (99, 99),
        }
    }

    /// Overall percent at `fraction` of the way through this stage.
    pub fn percent_at(&self, fraction: f64) -> u8 {
        let (start, end) = self.band();
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let span = f64::from(end - start);
        start + (span * fraction).round() as u8
    }
}

/// Optional progress sink shared across one assembly.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    /// Report progress within a stage.
    pub fn report(&self, stage: AssemblyStage, fraction: f64, message: &str) {
        if let Some(callback) = &self.callback {
            callback(stage, stage.percent_at(fraction), message);
        }
    }

    /// Report the end of the whole pipeline.
    pub fn complete(&self, message: &str) {
        if let Some(callback) = &self.callback {
            callback(AssemblyStage::Cleanup, 100, message);
        }
    }
}
