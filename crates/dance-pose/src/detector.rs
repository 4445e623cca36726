//! Pose detector adapter.
//!
//! Wraps an opaque pose-estimation primitive and converts its raw per-person
//! output into unassigned [`PersonDetection`]s. Identity and frame index are
//! filled downstream by the tracker.

use dance_models::{BoundingBox, Keypoint, PersonDetection, NUM_KEYPOINTS};
use tracing::trace;

use crate::config::PoseConfig;
use crate::error::{PoseError, PoseResult};
use crate::frames::Frame;

/// Raw output for one person from a pose model.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPose {
    /// `(x, y, confidence)` per COCO landmark
    pub keypoints: Vec<[f64; 3]>,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f64; 4],
    pub confidence: f64,
}

/// Pose-estimation primitive.
///
/// Implementations drop people below `min_confidence` themselves.
pub trait PoseEstimator: Send + Sync {
    /// Run inference on one frame.
    fn infer(&self, frame: &Frame, min_confidence: f64) -> PoseResult<Vec<RawPose>>;

    /// Estimator name for logging.
    fn name(&self) -> &'static str;
}

/// Adapter producing per-frame person detections.
pub struct PoseDetector<E: PoseEstimator> {
    estimator: E,
    min_confidence: f64,
    max_detections: usize,
}

impl<E: PoseEstimator> PoseDetector<E> {
    /// Create a new detector over the given estimator.
    pub fn new(estimator: E, config: &PoseConfig) -> Self {
        Self {
            estimator,
            min_confidence: config.detection_confidence,
            max_detections: config.max_detections,
        }
    }

    /// Detect people in one frame.
    ///
    /// Keeps at most `max_detections`, highest confidence first. Estimator
    /// failures are returned to the caller, which decides how to recover.
    pub fn detect_frame(&self, frame: &Frame) -> PoseResult<Vec<PersonDetection>> {
        let mut raw = self.estimator.infer(frame, self.min_confidence)?;

        raw.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        raw.truncate(self.max_detections);

        let detections = raw
            .into_iter()
            .map(to_detection)
            .collect::<PoseResult<Vec<_>>>()?;

        trace!(
            estimator = self.estimator.name(),
            count = detections.len(),
            "Detected people"
        );
        Ok(detections)
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

/// Convert one raw pose into an unassigned detection.
fn to_detection(raw: RawPose) -> PoseResult<PersonDetection> {
    if raw.keypoints.len() != NUM_KEYPOINTS {
        return Err(PoseError::malformed_output(format!(
            "expected {} keypoints, got {}",
            NUM_KEYPOINTS,
            raw.keypoints.len()
        )));
    }

    let mut keypoints = [Keypoint::default(); NUM_KEYPOINTS];
    for (slot, [x, y, c]) in keypoints.iter_mut().zip(raw.keypoints) {
        *slot = Keypoint::new(x, y, c);
    }

    let [x1, y1, x2, y2] = raw.bbox;
    Ok(PersonDetection::new(
        keypoints,
        BoundingBox::new(x1, y1, x2, y2),
        raw.confidence,
    ))
}
