//! IoU-based tracker for maintaining person identity across frames.
//!
//! Matches detections to live tracks with an optimal (Hungarian) assignment
//! over negative IoU, then drops any pairing below the IoU threshold.
//!
//! The tracker is a sequential state machine: frames must be fed in order and
//! one instance must not be shared between videos without `reset()`.

use std::collections::BTreeMap;

use dance_models::{BoundingBox, PersonDetection};
use ndarray::Array2;
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::hungarian;

/// Track information.
#[derive(Debug, Clone)]
struct Track {
    /// Last matched bounding box
    bbox: BoundingBox,
    /// Frames since last match
    age: u32,
    /// Frame index of the last match
    last_frame: usize,
}

/// Person tracker assigning stable ids within one video.
pub struct PersonTracker {
    config: TrackerConfig,
    /// Live tracks keyed by id
    tracks: BTreeMap<u32, Track>,
    /// Next track ID to assign
    next_track_id: u32,
}

impl PersonTracker {
    /// Create a new tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_track_id: 0,
        }
    }

    /// Assign identities to one frame's detections.
    ///
    /// Returns the detections in input order with `person_id` and
    /// `frame_index` filled. An empty frame only ages the live tracks.
    pub fn update(
        &mut self,
        detections: Vec<PersonDetection>,
        frame_index: usize,
    ) -> Vec<PersonDetection> {
        let track_ids: Vec<u32> = self.tracks.keys().copied().collect();

        if detections.is_empty() {
            self.age_tracks(&track_ids);
            return Vec::new();
        }

        let assigned = self.match_detections(&detections, &track_ids);

        let mut matched_tracks = Vec::with_capacity(assigned.len());
        let mut tracked = Vec::with_capacity(detections.len());

        for (mut detection, track_id) in detections.into_iter().zip(assigned) {
            let track_id = match track_id {
                Some(id) => {
                    matched_tracks.push(id);
                    id
                }
                None => {
                    let id = self.next_track_id;
                    self.next_track_id += 1;
                    let center = detection.bounding_box.center();
                    debug!(track_id = id, frame_index, x = center.x, y = center.y, "New track");
                    id
                }
            };

            self.tracks.insert(
                track_id,
                Track {
                    bbox: detection.bounding_box,
                    age: 0,
                    last_frame: frame_index,
                },
            );

            detection.person_id = Some(track_id);
            detection.frame_index = Some(frame_index);
            tracked.push(detection);
        }

        let unmatched: Vec<u32> = track_ids
            .into_iter()
            .filter(|id| !matched_tracks.contains(id))
            .collect();
        self.age_tracks(&unmatched);

        tracked
    }

    /// Solve the detection → track assignment and apply the IoU gate.
    fn match_detections(
        &self,
        detections: &[PersonDetection],
        track_ids: &[u32],
    ) -> Vec<Option<u32>> {
        if track_ids.is_empty() {
            return vec![None; detections.len()];
        }

        let track_boxes: Vec<BoundingBox> = track_ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(|t| t.bbox))
            .collect();

        let iou = Array2::from_shape_fn((detections.len(), track_boxes.len()), |(d, t)| {
            detections[d].bounding_box.iou(&track_boxes[t])
        });
        let cost = iou.mapv(|v| -v);

        hungarian::solve(&cost)
            .into_iter()
            .enumerate()
            .map(|(d, col)| {
                col.and_then(|t| {
                    let overlap = iou[[d, t]];
                    if overlap >= self.config.iou_threshold {
                        Some(track_ids[t])
                    } else {
                        trace!(iou = overlap, "Rejected assignment below threshold");
                        None
                    }
                })
            })
            .collect()
    }

    /// Age the given tracks by one frame and evict the expired ones.
    fn age_tracks(&mut self, ids: &[u32]) {
        for id in ids {
            let expired = match self.tracks.get_mut(id) {
                Some(track) => {
                    track.age += 1;
                    track.age > self.config.max_age
                }
                None => false,
            };
            if expired {
                if let Some(track) = self.tracks.remove(id) {
                    debug!(track_id = *id, last_frame = track.last_frame, "Evicted track");
                }
            }
        }
    }

    /// Reset the tracker state for a new video.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_track_id = 0;
    }

    /// Number of live (not yet evicted) tracks.
    pub fn live_track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_track(&self, track_id: u32) -> bool {
        self.tracks.contains_key(&track_id)
    }

    /// Live track ids in ascending order.
    pub fn track_ids(&self) -> Vec<u32> {
        self.tracks.keys().copied().collect()
    }
}

impl Default for PersonTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
