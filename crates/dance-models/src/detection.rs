//! Per-frame person detections and paired lead/follow frames.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{BoundingBox, CocoKeypoint, Keypoint, NUM_KEYPOINTS};

/// One detected human in one frame.
///
/// Created by the detector with `person_id` and `frame_index` unset; the
/// tracker fills both exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersonDetection {
    /// Track identity, valid only within one tracking run
    pub person_id: Option<u32>,
    /// 17 COCO landmarks
    pub keypoints: [Keypoint; NUM_KEYPOINTS],
    pub bounding_box: BoundingBox,
    pub detection_confidence: f64,
    pub frame_index: Option<usize>,
}

impl PersonDetection {
    /// Create an unassigned detection.
    pub fn new(
        keypoints: [Keypoint; NUM_KEYPOINTS],
        bounding_box: BoundingBox,
        detection_confidence: f64,
    ) -> Self {
        Self {
            person_id: None,
            keypoints,
            bounding_box,
            detection_confidence,
            frame_index: None,
        }
    }

    /// Landmark by COCO name.
    #[inline]
    pub fn keypoint(&self, which: CocoKeypoint) -> &Keypoint {
        &self.keypoints[which.index()]
    }
}

/// Spatial role of a dancer within a couple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Lead,
    Follow,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Lead => write!(f, "lead"),
            Role::Follow => write!(f, "follow"),
        }
    }
}

/// One frame's lead/follow pairing.
///
/// A single detected subject is always the lead, never the follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoupleFrame {
    pub lead: Option<PersonDetection>,
    pub follow: Option<PersonDetection>,
    pub frame_index: usize,
    pub timestamp_seconds: f64,
}

impl CoupleFrame {
    /// Frame with neither dancer present.
    pub fn empty(frame_index: usize, timestamp_seconds: f64) -> Self {
        Self {
            lead: None,
            follow: None,
            frame_index,
            timestamp_seconds,
        }
    }

    pub fn has_both_dancers(&self) -> bool {
        self.lead.is_some() && self.follow.is_some()
    }

    /// Detection for the given role, if present.
    pub fn get(&self, role: Role) -> Option<&PersonDetection> {
        match role {
            Role::Lead => self.lead.as_ref(),
            Role::Follow => self.follow.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x: f64) -> PersonDetection {
        PersonDetection::new(
            [Keypoint::new(x, 0.0, 0.9); NUM_KEYPOINTS],
            BoundingBox::new(x, 0.0, x + 50.0, 100.0),
            0.9,
        )
    }

    #[test]
    fn test_has_both_dancers() {
        let mut frame = CoupleFrame::empty(0, 0.0);
        assert!(!frame.has_both_dancers());

        frame.lead = Some(detection(10.0));
        assert!(!frame.has_both_dancers());

        frame.follow = Some(detection(200.0));
        assert!(frame.has_both_dancers());
        assert_eq!(frame.get(Role::Follow).map(|d| d.bounding_box.x1), Some(200.0));
    }

    #[test]
    fn test_detection_serializes_with_unset_ids() {
        let json = serde_json::to_value(detection(1.0)).unwrap();
        assert!(json["person_id"].is_null());
        assert_eq!(json["keypoints"].as_array().unwrap().len(), NUM_KEYPOINTS);
    }
}
