//! Configuration for the pose analysis pipeline.

use dance_models::QualityThresholds;
use serde::{Deserialize, Serialize};

/// Tracker matching and eviction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Minimum IoU for an assignment to count as a match (default: 0.5)
    pub iou_threshold: f64,

    /// Frames a track may go unmatched before eviction (default: 30)
    pub max_age: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            max_age: 30,
        }
    }
}

/// Configuration for the pose analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    // === Features ===
    /// Minimum keypoint confidence for angles and centre of mass (default: 0.3)
    pub keypoint_confidence_threshold: f64,

    // === Detection ===
    /// Minimum person confidence, applied by the pose primitive (default: 0.5)
    pub detection_confidence: f64,

    /// Maximum people kept per frame (default: 10)
    pub max_detections: usize,

    // === Sampling ===
    /// Processing rate in frames per second (default: 15.0)
    pub target_fps: f64,

    pub tracker: TrackerConfig,

    pub quality: QualityThresholds,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            keypoint_confidence_threshold: 0.3,
            detection_confidence: 0.5,
            max_detections: 10,
            target_fps: 15.0,
            tracker: TrackerConfig::default(),
            quality: QualityThresholds::default(),
        }
    }
}
