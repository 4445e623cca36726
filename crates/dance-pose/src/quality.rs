//! Extraction quality scoring and batch reporting.

use std::path::Path;

use chrono::{DateTime, Utc};
use dance_models::{CoupleFrame, QualityReport, QualityThresholds};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PoseResult;
use crate::interaction::InteractionSequence;
use crate::sequence::TemporalFeatureSequence;
use crate::stats::RunningStats;

/// Histogram bins over [0, 1].
pub const HISTOGRAM_BINS: usize = 10;

const EXCELLENT_SCORE: f64 = 0.8;
const GOOD_SCORE: f64 = 0.6;

/// Computes a [`QualityReport`] for one analysed video.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityCalculator {
    thresholds: QualityThresholds,
}

impl QualityCalculator {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn calculate(
        &self,
        couple_frames: &[CoupleFrame],
        lead: &TemporalFeatureSequence,
        follow: &TemporalFeatureSequence,
        interaction: &InteractionSequence,
    ) -> QualityReport {
        let total_frames = couple_frames.len();
        let frames_with_both_dancers = couple_frames
            .iter()
            .filter(|f| f.has_both_dancers())
            .count();

        let detection_rate = if total_frames == 0 {
            0.0
        } else {
            frames_with_both_dancers as f64 / total_frames as f64
        };

        let confidences: RunningStats = lead
            .valid_confidences()
            .chain(follow.valid_confidences())
            .collect();
        let avg_confidence = confidences.mean().unwrap_or(0.0);

        let report = QualityReport {
            quality_score: QualityReport::score(detection_rate, avg_confidence),
            detection_rate,
            avg_confidence,
            total_frames,
            frames_with_both_dancers,
            lead_frame_count: lead.frame_count(),
            follow_frame_count: follow.frame_count(),
            interaction_frame_count: interaction.frame_count(),
            thresholds: self.thresholds,
        };

        log_summary(&report);
        report
    }
}

fn log_summary(report: &QualityReport) {
    let score = report.quality_score;
    if score >= EXCELLENT_SCORE {
        info!(
            quality_score = score,
            detection_rate = report.detection_rate,
            "Excellent extraction quality"
        );
    } else if score >= GOOD_SCORE {
        info!(
            quality_score = score,
            detection_rate = report.detection_rate,
            "Good extraction quality"
        );
    } else {
        warn!(
            quality_score = score,
            detection_rate = report.detection_rate,
            "Low extraction quality"
        );
    }

    if report.needs_review() {
        warn!(
            detection_rate = report.detection_rate,
            frames_with_both_dancers = report.frames_with_both_dancers,
            total_frames = report.total_frames,
            "Both dancers detected in too few frames"
        );
    }
}

/// One video's row in the batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoQuality {
    pub video_id: String,
    #[serde(flatten)]
    pub report: QualityReport,
    pub is_high_quality: bool,
    pub needs_review: bool,
}

/// Cross-video statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_videos: usize,
    pub mean_quality_score: f64,
    pub std_quality_score: f64,
    pub min_quality_score: f64,
    pub max_quality_score: f64,
    pub mean_detection_rate: f64,
    pub high_quality_count: usize,
    pub needs_review_count: usize,
}

/// Histograms of score and detection rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDistribution {
    pub quality_score_histogram: Vec<usize>,
    pub detection_rate_histogram: Vec<usize>,
    pub bin_edges: Vec<f64>,
}

/// Persisted batch report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchQualityReport {
    pub generated_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub distribution: QualityDistribution,
    pub videos: Vec<VideoQuality>,
    pub flagged_for_review: Vec<String>,
}

/// Accumulates per-video reports into a batch document.
#[derive(Debug, Clone, Default)]
pub struct QualityReportGenerator {
    videos: Vec<VideoQuality>,
}

impl QualityReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, video_id: impl Into<String>, report: QualityReport) {
        self.videos.push(VideoQuality {
            video_id: video_id.into(),
            is_high_quality: report.is_high_quality(),
            needs_review: report.needs_review(),
            report,
        });
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        if self.videos.is_empty() {
            return BatchSummary::default();
        }

        let scores: RunningStats = self.videos.iter().map(|v| v.report.quality_score).collect();
        let rates: RunningStats = self.videos.iter().map(|v| v.report.detection_rate).collect();
        let (mean_quality_score, std_quality_score) = scores.finish_or(0.0);

        let min_quality_score = self
            .videos
            .iter()
            .map(|v| v.report.quality_score)
            .fold(f64::INFINITY, f64::min);
        let max_quality_score = self
            .videos
            .iter()
            .map(|v| v.report.quality_score)
            .fold(f64::NEG_INFINITY, f64::max);

        BatchSummary {
            total_videos: self.videos.len(),
            mean_quality_score,
            std_quality_score,
            min_quality_score,
            max_quality_score,
            mean_detection_rate: rates.mean().unwrap_or(0.0),
            high_quality_count: self.videos.iter().filter(|v| v.is_high_quality).count(),
            needs_review_count: self.videos.iter().filter(|v| v.needs_review).count(),
        }
    }

    pub fn distribution(&self) -> QualityDistribution {
        QualityDistribution {
            quality_score_histogram: histogram(self.videos.iter().map(|v| v.report.quality_score)),
            detection_rate_histogram: histogram(
                self.videos.iter().map(|v| v.report.detection_rate),
            ),
            bin_edges: (0..=HISTOGRAM_BINS)
                .map(|i| i as f64 / HISTOGRAM_BINS as f64)
                .collect(),
        }
    }

    pub fn flagged_for_review(&self) -> Vec<String> {
        self.videos
            .iter()
            .filter(|v| v.needs_review)
            .map(|v| v.video_id.clone())
            .collect()
    }

    pub fn build_report(&self) -> BatchQualityReport {
        BatchQualityReport {
            generated_at: Utc::now(),
            summary: self.summary(),
            distribution: self.distribution(),
            videos: self.videos.clone(),
            flagged_for_review: self.flagged_for_review(),
        }
    }

    /// Write the batch report as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> PoseResult<BatchQualityReport> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let report = self.build_report();
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;

        info!(
            path = %path.display(),
            total_videos = report.summary.total_videos,
            flagged = report.flagged_for_review.len(),
            "Saved quality report"
        );
        Ok(report)
    }
}

/// Count values into equal-width bins over [0, 1]; 1.0 lands in the last bin.
fn histogram(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let mut bins = vec![0; HISTOGRAM_BINS];
    for value in values.filter(|v| v.is_finite()) {
        let scaled = (value.clamp(0.0, 1.0) * HISTOGRAM_BINS as f64).floor() as usize;
        bins[scaled.min(HISTOGRAM_BINS - 1)] += 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use dance_models::{BoundingBox, Keypoint, PersonDetection, NUM_KEYPOINTS};
    use tempfile::TempDir;

    fn report(quality_score: f64, detection_rate: f64) -> QualityReport {
        QualityReport {
            quality_score,
            detection_rate,
            avg_confidence: 0.8,
            total_frames: 10,
            frames_with_both_dancers: (detection_rate * 10.0) as usize,
            lead_frame_count: 10,
            follow_frame_count: 10,
            interaction_frame_count: 10,
            thresholds: QualityThresholds::default(),
        }
    }

    #[test]
    fn test_empty_frames_no_division_by_zero() {
        let calc = QualityCalculator::default();
        let empty = TemporalFeatureSequence::default();
        let report = calc.calculate(&[], &empty, &empty, &InteractionSequence::default());

        assert_eq!(report.detection_rate, 0.0);
        assert_eq!(report.avg_confidence, 0.0);
        assert_eq!(report.quality_score, 0.0);
        assert!(report.needs_review());
    }

    #[test]
    fn test_zero_confidences_are_excluded() {
        let mut keypoints = [Keypoint::new(0.0, 0.0, 0.0); NUM_KEYPOINTS];
        keypoints[0].confidence = 0.6;
        keypoints[1].confidence = 0.8;
        let detection = PersonDetection::new(keypoints, BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9);

        let mut frame = CoupleFrame::empty(0, 0.0);
        frame.lead = Some(detection);
        let frames = vec![frame];

        let extractor = crate::FeatureExtractor::default();
        let lead = extractor.build_sequence(&frames, dance_models::Role::Lead);
        let follow = extractor.build_sequence(&frames, dance_models::Role::Follow);

        let report = QualityCalculator::default().calculate(
            &frames,
            &lead,
            &follow,
            &InteractionSequence::default(),
        );
        assert!((report.avg_confidence - 0.7).abs() < 1e-12);
        assert_eq!(report.detection_rate, 0.0);
        assert_eq!(report.lead_frame_count, 1);
    }

    #[test]
    fn test_histogram_edges() {
        assert_eq!(
            histogram([0.0, 0.05, 0.1, 0.99, 1.0].into_iter()),
            vec![2, 1, 0, 0, 0, 0, 0, 0, 0, 2]
        );
    }

    #[test]
    fn test_batch_summary() {
        let mut generator = QualityReportGenerator::new();
        generator.add("a", report(0.9, 0.9));
        generator.add("b", report(0.5, 0.3));
        generator.add("c", report(0.7, 0.6));

        let summary = generator.summary();
        assert_eq!(summary.total_videos, 3);
        assert!((summary.mean_quality_score - 0.7).abs() < 1e-12);
        assert_eq!(summary.min_quality_score, 0.5);
        assert_eq!(summary.max_quality_score, 0.9);
        assert_eq!(summary.high_quality_count, 2);
        assert_eq!(summary.needs_review_count, 1);
        assert_eq!(generator.flagged_for_review(), vec!["b".to_string()]);

        let distribution = generator.distribution();
        assert_eq!(distribution.bin_edges.len(), HISTOGRAM_BINS + 1);
        assert_eq!(distribution.quality_score_histogram.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_empty_batch_summary() {
        let summary = QualityReportGenerator::new().summary();
        assert_eq!(summary.total_videos, 0);
        assert_eq!(summary.mean_quality_score, 0.0);
    }

    #[test]
    fn test_save_writes_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/batch.json");

        let mut generator = QualityReportGenerator::new();
        generator.add("video_1", report(0.8, 0.9));
        generator.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["total_videos"], 1);
        assert_eq!(json["videos"][0]["video_id"], "video_1");
        assert_eq!(json["videos"][0]["is_high_quality"], true);
        assert!(json["flagged_for_review"].as_array().unwrap().is_empty());
        assert!(json["generated_at"].is_string());
        assert_eq!(json["distribution"]["detection_rate_histogram"][9], 1);
    }
}
