//! Extraction quality report.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weight of detection rate in the quality score.
pub const DETECTION_RATE_WEIGHT: f64 = 0.6;
/// Weight of average keypoint confidence in the quality score.
pub const CONFIDENCE_WEIGHT: f64 = 0.4;

/// Default score at or above which a video is high quality.
pub const DEFAULT_HIGH_QUALITY_SCORE: f64 = 0.7;
/// Default detection rate below which a video needs review.
pub const DEFAULT_REVIEW_DETECTION_RATE: f64 = 0.5;

/// Thresholds for the derived quality flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityThresholds {
    #[serde(default = "default_high_quality_score")]
    pub high_quality_score: f64,
    #[serde(default = "default_review_detection_rate")]
    pub review_detection_rate: f64,
}

fn default_high_quality_score() -> f64 {
    DEFAULT_HIGH_QUALITY_SCORE
}
fn default_review_detection_rate() -> f64 {
    DEFAULT_REVIEW_DETECTION_RATE
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            high_quality_score: DEFAULT_HIGH_QUALITY_SCORE,
            review_detection_rate: DEFAULT_REVIEW_DETECTION_RATE,
        }
    }
}

/// Quality of one video's pose extraction. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityReport {
    pub quality_score: f64,
    pub detection_rate: f64,
    pub avg_confidence: f64,
    pub total_frames: usize,
    pub frames_with_both_dancers: usize,
    pub lead_frame_count: usize,
    pub follow_frame_count: usize,
    pub interaction_frame_count: usize,
    pub thresholds: QualityThresholds,
}

impl QualityReport {
    /// Combine the two components into the weighted score.
    pub fn score(detection_rate: f64, avg_confidence: f64) -> f64 {
        DETECTION_RATE_WEIGHT * detection_rate + CONFIDENCE_WEIGHT * avg_confidence
    }

    pub fn is_high_quality(&self) -> bool {
        self.quality_score >= self.thresholds.high_quality_score
    }

    pub fn needs_review(&self) -> bool {
        self.detection_rate < self.thresholds.review_detection_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(detection_rate: f64, avg_confidence: f64) -> QualityReport {
        QualityReport {
            quality_score: QualityReport::score(detection_rate, avg_confidence),
            detection_rate,
            avg_confidence,
            total_frames: 10,
            frames_with_both_dancers: 0,
            lead_frame_count: 0,
            follow_frame_count: 0,
            interaction_frame_count: 0,
            thresholds: QualityThresholds::default(),
        }
    }

    #[test]
    fn test_score_weights() {
        assert!((QualityReport::score(0.8, 0.5) - 0.68).abs() < 1e-12);
    }

    #[test]
    fn test_flags_respect_thresholds() {
        let good = report(0.9, 0.9);
        assert!(good.is_high_quality());
        assert!(!good.needs_review());

        let sparse = report(0.4, 0.9);
        assert!(sparse.needs_review());

        let mut strict = report(0.9, 0.9);
        strict.thresholds.high_quality_score = 0.95;
        assert!(!strict.is_high_quality());
    }
}
