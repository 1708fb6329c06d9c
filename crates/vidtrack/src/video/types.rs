// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! YTVIS-style video annotation structures.

use crate::coco::CocoCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bounding box written for frames where an instance was not observed.
pub const ZERO_BOX: [f64; 4] = [0.0; 4];

/// Top-level video dataset structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoDataset {
    /// Categories, passed through from the frame-level source.
    pub categories: Vec<CocoCategory>,
    /// One header per video.
    pub videos: Vec<VideoHeader>,
    /// One track per object instance.
    pub annotations: Vec<VideoTrack>,
}

impl VideoDataset {
    /// Look up a video by its numeric id.
    pub fn video(&self, id: u64) -> Option<&VideoHeader> {
        self.videos.iter().find(|v| v.id == id)
    }

    /// Tracks belonging to a video, in id order.
    pub fn tracks_for_video(&self, video_id: u64) -> impl Iterator<Item = &VideoTrack> {
        self.annotations
            .iter()
            .filter(move |t| t.video_id == video_id)
    }
}

/// Video header: identity, dimensions and the ordered frame list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoHeader {
    /// Sequential video id, starting at 1.
    pub id: u64,
    /// Video identifier derived from the frame storage paths.
    pub name: String,
    /// Frame width in pixels, taken from the first frame.
    pub width: u32,
    /// Frame height in pixels, taken from the first frame.
    pub height: u32,
    /// Number of frames. Optional on input; taken from `file_names` when
    /// absent.
    #[serde(default)]
    pub length: usize,
    /// Frame storage paths in frame order.
    pub file_names: Vec<String>,
}

/// Dense per-instance track spanning every frame of its video.
///
/// The three sequences are frame-aligned with the owning video's
/// `file_names`. Frames without an observation hold `None`, `0.0` and
/// [`ZERO_BOX`] respectively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Sequential track id, starting at 1.
    pub id: u64,
    /// Owning video id.
    pub video_id: u64,
    /// Category id from the source annotations.
    pub category_id: u32,
    /// Segmentation per frame; `None` serializes as `null`.
    pub segmentations: Vec<Option<Value>>,
    /// Area per frame.
    pub areas: Vec<f64>,
    /// Bounding box per frame, `[x, y, width, height]`.
    pub bboxes: Vec<[f64; 4]>,
}

impl VideoTrack {
    /// Number of frames the track spans.
    pub fn len(&self) -> usize {
        self.segmentations.len()
    }

    /// Returns true when the track spans no frames.
    pub fn is_empty(&self) -> bool {
        self.segmentations.is_empty()
    }

    /// Frame positions with an actual observation.
    pub fn observed_frames(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| {
                self.segmentations[i].is_some() || self.areas[i] != 0.0 || self.bboxes[i] != ZERO_BOX
            })
            .collect()
    }
}
