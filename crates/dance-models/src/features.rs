//! Per-frame kinematic feature records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::{CocoKeypoint, Point2, NUM_KEYPOINTS};

/// Tracked joints, in summary-vector order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    LeftElbow,
    RightElbow,
    LeftKnee,
    RightKnee,
    Torso,
}

impl JointName {
    pub const ALL: [JointName; 5] = [
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::Torso,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::LeftElbow => "left_elbow",
            JointName::RightElbow => "right_elbow",
            JointName::LeftKnee => "left_knee",
            JointName::RightKnee => "right_knee",
            JointName::Torso => "torso",
        }
    }

    /// The (outer, vertex, outer) keypoints of a limb joint.
    ///
    /// `Torso` has no vertex: it is measured from shoulder and hip midpoints.
    pub fn limb_triple(&self) -> Option<(CocoKeypoint, CocoKeypoint, CocoKeypoint)> {
        use CocoKeypoint::*;
        match self {
            JointName::LeftElbow => Some((LeftShoulder, LeftElbow, LeftWrist)),
            JointName::RightElbow => Some((RightShoulder, RightElbow, RightWrist)),
            JointName::LeftKnee => Some((LeftHip, LeftKnee, LeftAnkle)),
            JointName::RightKnee => Some((RightHip, RightKnee, RightAnkle)),
            JointName::Torso => None,
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinematic summary of one person in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoseFeatureRecord {
    pub frame_index: Option<usize>,
    pub person_id: Option<u32>,
    /// Radians in [0, π]; a joint is absent when any defining keypoint is
    /// below the confidence threshold
    pub joint_angles: BTreeMap<JointName, f64>,
    pub center_of_mass: Point2,
    /// Raw per-frame delta of `center_of_mass`; absent on the first frame
    pub velocity: Option<Point2>,
    pub keypoint_positions: [[f64; 2]; NUM_KEYPOINTS],
    pub keypoint_confidences: [f64; NUM_KEYPOINTS],
}

impl PoseFeatureRecord {
    pub fn angle(&self, joint: JointName) -> Option<f64> {
        self.joint_angles.get(&joint).copied()
    }
}
