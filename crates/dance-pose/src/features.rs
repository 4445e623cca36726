//! Per-frame kinematic features: joint angles, centre of mass, velocity.

use std::collections::BTreeMap;

use dance_models::{
    CocoKeypoint, CoupleFrame, JointName, PersonDetection, Point2, PoseFeatureRecord, Role,
    NUM_KEYPOINTS,
};

use crate::sequence::TemporalFeatureSequence;

/// Added to the vector-norm product so the cosine is always defined.
const NORM_EPSILON: f64 = 1e-8;

/// Straight down in image coordinates.
const VERTICAL: Point2 = Point2 { x: 0.0, y: 1.0 };

/// Extracts [`PoseFeatureRecord`]s from tracked detections.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    confidence_threshold: f64,
}

impl FeatureExtractor {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Extract one frame's features.
    ///
    /// `previous` must be the same identity's record from the preceding
    /// processed frame; velocity is left absent without it.
    pub fn extract(
        &self,
        detection: &PersonDetection,
        previous: Option<&PoseFeatureRecord>,
    ) -> PoseFeatureRecord {
        let joint_angles: BTreeMap<JointName, f64> = JointName::ALL
            .iter()
            .filter_map(|joint| self.joint_angle(detection, *joint).map(|a| (*joint, a)))
            .collect();

        let center_of_mass = self.center_of_mass(detection);
        let velocity = previous.map(|prev| center_of_mass - prev.center_of_mass);

        let mut keypoint_positions = [[0.0; 2]; NUM_KEYPOINTS];
        let mut keypoint_confidences = [0.0; NUM_KEYPOINTS];
        for (i, kp) in detection.keypoints.iter().enumerate() {
            keypoint_positions[i] = [kp.x, kp.y];
            keypoint_confidences[i] = kp.confidence;
        }

        PoseFeatureRecord {
            frame_index: detection.frame_index,
            person_id: detection.person_id,
            joint_angles,
            center_of_mass,
            velocity,
            keypoint_positions,
            keypoint_confidences,
        }
    }

    /// Build the temporal sequence for one role across a video's frames.
    pub fn build_sequence(&self, frames: &[CoupleFrame], role: Role) -> TemporalFeatureSequence {
        TemporalFeatureSequence::build(self, frames, role)
    }

    /// Angle of one joint in radians, `None` if any defining keypoint is
    /// below threshold.
    pub fn joint_angle(&self, detection: &PersonDetection, joint: JointName) -> Option<f64> {
        match joint.limb_triple() {
            Some((a, vertex, c)) => {
                let a = self.valid_point(detection, a)?;
                let b = self.valid_point(detection, vertex)?;
                let c = self.valid_point(detection, c)?;
                Some(angle_between(a - b, c - b))
            }
            None => {
                let ls = self.valid_point(detection, CocoKeypoint::LeftShoulder)?;
                let rs = self.valid_point(detection, CocoKeypoint::RightShoulder)?;
                let lh = self.valid_point(detection, CocoKeypoint::LeftHip)?;
                let rh = self.valid_point(detection, CocoKeypoint::RightHip)?;
                let spine = lh.midpoint(&rh) - ls.midpoint(&rs);
                Some(angle_between(spine, VERTICAL))
            }
        }
    }

    /// Confidence-weighted mean of keypoints above threshold.
    ///
    /// Falls back to the unweighted mean of all keypoints.
    pub fn center_of_mass(&self, detection: &PersonDetection) -> Point2 {
        let (mut wx, mut wy, mut total) = (0.0, 0.0, 0.0);
        for kp in detection
            .keypoints
            .iter()
            .filter(|kp| kp.confidence > self.confidence_threshold)
        {
            wx += kp.x * kp.confidence;
            wy += kp.y * kp.confidence;
            total += kp.confidence;
        }

        if total > 0.0 {
            return Point2::new(wx / total, wy / total);
        }

        let n = detection.keypoints.len() as f64;
        let (sx, sy) = detection
            .keypoints
            .iter()
            .fold((0.0, 0.0), |(sx, sy), kp| (sx + kp.x, sy + kp.y));
        Point2::new(sx / n, sy / n)
    }

    fn valid_point(&self, detection: &PersonDetection, which: CocoKeypoint) -> Option<Point2> {
        let kp = detection.keypoint(which);
        kp.is_valid(self.confidence_threshold).then(|| kp.position())
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Angle between two vectors in [0, π].
fn angle_between(v1: Point2, v2: Point2) -> f64 {
    let dot = v1.x * v2.x + v1.y * v2.y;
    let cos = dot / (v1.norm() * v2.norm() + NORM_EPSILON);
    cos.clamp(-1.0, 1.0).acos()
}
