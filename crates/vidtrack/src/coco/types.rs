// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! COCO JSON data structures for the frame-level input side.
//!
//! Geometry fields on [`CocoAnnotation`] are kept as raw JSON values. Sources
//! in the wild mix polygon lists with RLE strings, strings for areas, or
//! truncated boxes; those records must reach the track builder's sanitizer
//! rather than failing the whole file at parse time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level COCO dataset structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    /// List of frame images.
    #[serde(default)]
    pub images: Vec<CocoImage>,
    /// List of per-frame annotations (one per object observation).
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    /// List of object categories, passed through to the output unchanged.
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// Frame record.
///
/// The video a frame belongs to is not stored; it is derived from the first
/// segment of `file_name` (`video/frame.png`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoImage {
    /// Unique image ID.
    pub id: u64,
    /// Storage path relative to the dataset image root.
    pub file_name: String,
    /// Image width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Image height in pixels.
    #[serde(default)]
    pub height: u32,
}

/// Category definition.
///
/// Only `id` and `name` are interpreted. Every other key (`color`,
/// `isthing`, ...) is preserved so categories round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Unique category ID.
    pub id: u32,
    /// Category name.
    #[serde(default)]
    pub name: String,
    /// Parent category name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
    /// Any additional keys found on the source category.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CocoCategory {
    /// Display color from the `color` key, when it is an `[r, g, b]` triple.
    pub fn color(&self) -> Option<[u8; 3]> {
        let rgb = self.extra.get("color")?.as_array()?;
        if rgb.len() != 3 {
            return None;
        }
        let mut out = [0u8; 3];
        for (slot, value) in out.iter_mut().zip(rgb) {
            *slot = u8::try_from(value.as_u64()?).ok()?;
        }
        Some(out)
    }
}

/// Per-frame annotation of one object observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// Unique annotation ID.
    pub id: u64,
    /// ID of the frame image containing this observation.
    pub image_id: u64,
    /// Category ID of this object.
    pub category_id: u32,
    /// Bounding box, expected `[x, y, width, height]`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub bbox: Value,
    /// Segmentation, expected as a polygon list.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub segmentation: Value,
    /// Area in pixels², expected numeric.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub area: Value,
    /// Explicit cross-frame instance identity, when the source carries one.
    #[serde(
        default,
        alias = "instance_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub track_id: Option<u64>,
}
