//! Frame-by-frame couple analysis over one video.

use dance_models::{CoupleFrame, QualityReport, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PoseConfig;
use crate::detector::{PoseDetector, PoseEstimator};
use crate::error::{PoseError, PoseResult};
use crate::features::FeatureExtractor;
use crate::frames::{frame_skip, FrameSource};
use crate::interaction::InteractionSequence;
use crate::quality::QualityCalculator;
use crate::roles::assign_roles;
use crate::sequence::TemporalFeatureSequence;
use crate::tracker::PersonTracker;

/// Everything extracted from one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoupleAnalysis {
    pub couple_frames: Vec<CoupleFrame>,
    pub lead_sequence: TemporalFeatureSequence,
    pub follow_sequence: TemporalFeatureSequence,
    pub interaction_sequence: InteractionSequence,
    pub quality: QualityReport,
}

impl CoupleAnalysis {
    /// Lead summary, follow summary, then interaction summary.
    pub fn feature_vector(&self) -> Vec<f64> {
        let mut vector = self.lead_sequence.summary_vector();
        vector.extend(self.follow_sequence.summary_vector());
        vector.extend(self.interaction_sequence.summary_vector());
        vector
    }
}

/// Drives detection, tracking, role assignment and feature extraction.
///
/// Owns one tracker, so one analyzer processes one video at a time.
pub struct CoupleAnalyzer<E: PoseEstimator> {
    config: PoseConfig,
    detector: PoseDetector<E>,
    tracker: PersonTracker,
    extractor: FeatureExtractor,
    quality: QualityCalculator,
}

impl<E: PoseEstimator> CoupleAnalyzer<E> {
    pub fn new(estimator: E, config: PoseConfig) -> Self {
        Self {
            detector: PoseDetector::new(estimator, &config),
            tracker: PersonTracker::new(config.tracker),
            extractor: FeatureExtractor::new(config.keypoint_confidence_threshold),
            quality: QualityCalculator::new(config.quality),
            config,
        }
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Analyse one video.
    ///
    /// Tracker state is reset first. Frames that fail to decode or whose
    /// inference fails become empty couple frames.
    pub fn analyze<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> PoseResult<CoupleAnalysis> {
        let source_fps = source.fps();
        if !source_fps.is_finite() || source_fps <= 0.0 {
            return Err(PoseError::InvalidFrameRate(source_fps));
        }

        self.tracker.reset();
        let skip = frame_skip(source_fps, self.config.target_fps);
        debug!(
            estimator = self.detector.estimator().name(),
            source_fps,
            target_fps = self.config.target_fps,
            frame_skip = skip,
            "Starting couple analysis"
        );

        let mut couple_frames = Vec::new();
        let mut failed_frames = 0usize;
        let mut source_index = 0usize;

        while let Some(frame) = source.next_frame() {
            let index = source_index;
            source_index += 1;
            if index % skip != 0 {
                continue;
            }

            let timestamp = index as f64 / source_fps;
            let detected = frame.and_then(|f| self.detector.detect_frame(&f));

            let detections = match detected {
                Ok(detections) => detections,
                Err(e) => {
                    warn!(
                        frame_index = index,
                        error = %e,
                        "Frame processing failed, substituting empty frame"
                    );
                    failed_frames += 1;
                    self.tracker.update(Vec::new(), index);
                    couple_frames.push(CoupleFrame::empty(index, timestamp));
                    continue;
                }
            };

            let tracked = self.tracker.update(detections, index);
            let (lead, follow) = assign_roles(&tracked);
            couple_frames.push(CoupleFrame {
                lead,
                follow,
                frame_index: index,
                timestamp_seconds: timestamp,
            });
        }

        let lead_sequence = self.extractor.build_sequence(&couple_frames, Role::Lead);
        let follow_sequence = self.extractor.build_sequence(&couple_frames, Role::Follow);
        let interaction_sequence = InteractionSequence::build(&lead_sequence, &follow_sequence);
        let quality = self.quality.calculate(
            &couple_frames,
            &lead_sequence,
            &follow_sequence,
            &interaction_sequence,
        );

        info!(
            source_frames = source_index,
            processed_frames = couple_frames.len(),
            failed_frames,
            lead_frames = lead_sequence.frame_count(),
            follow_frames = follow_sequence.frame_count(),
            quality_score = quality.quality_score,
            "Couple analysis complete"
        );

        Ok(CoupleAnalysis {
            couple_frames,
            lead_sequence,
            follow_sequence,
            interaction_sequence,
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::RawPose;
    use crate::frames::{Frame, InMemoryFrames};
    use dance_models::NUM_KEYPOINTS;

    struct TwoDancers;

    impl PoseEstimator for TwoDancers {
        fn infer(&self, _frame: &Frame, _min_confidence: f64) -> PoseResult<Vec<RawPose>> {
            Ok([300.0, 50.0]
                .into_iter()
                .map(|x| RawPose {
                    keypoints: vec![[x + 20.0, 50.0, 0.8]; NUM_KEYPOINTS],
                    bbox: [x, 0.0, x + 40.0, 100.0],
                    confidence: 0.9,
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "two-dancers"
        }
    }

    #[test]
    fn test_frame_skip_and_timestamps() {
        let mut analyzer = CoupleAnalyzer::new(TwoDancers, PoseConfig::default());
        let mut source = InMemoryFrames::blank(30.0, 10, 8, 8);

        let analysis = analyzer.analyze(&mut source).unwrap();
        assert_eq!(analysis.couple_frames.len(), 5);
        assert_eq!(analysis.couple_frames[1].frame_index, 2);
        assert!((analysis.couple_frames[1].timestamp_seconds - 2.0 / 30.0).abs() < 1e-12);

        let first = &analysis.couple_frames[0];
        assert_eq!(first.lead.as_ref().map(|d| d.bounding_box.x1), Some(50.0));
        assert_eq!(first.follow.as_ref().map(|d| d.bounding_box.x1), Some(300.0));
        assert_eq!(analysis.quality.detection_rate, 1.0);
        assert_eq!(analysis.interaction_sequence.frame_count(), 5);
    }

    #[test]
    fn test_identities_restart_per_video() {
        let mut analyzer = CoupleAnalyzer::new(TwoDancers, PoseConfig::default());

        let first = analyzer.analyze(&mut InMemoryFrames::blank(15.0, 3, 8, 8)).unwrap();
        let second = analyzer.analyze(&mut InMemoryFrames::blank(15.0, 3, 8, 8)).unwrap();
        assert_eq!(first.lead_sequence.person_id, second.lead_sequence.person_id);
        assert_eq!(first.feature_vector().len(), second.feature_vector().len());
    }

    #[test]
    fn test_invalid_source_fps() {
        let mut analyzer = CoupleAnalyzer::new(TwoDancers, PoseConfig::default());
        let err = analyzer.analyze(&mut InMemoryFrames::blank(0.0, 3, 8, 8)).unwrap_err();
        assert!(matches!(err, PoseError::InvalidFrameRate(_)));
    }
}
