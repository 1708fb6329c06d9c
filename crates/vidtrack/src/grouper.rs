// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Frame grouping: partitions flat frame records into ordered videos.
//!
//! A frame's video is the first `/` segment of its storage path
//! (`video_a/00012.jpg` belongs to `video_a`). Videos are numbered from 1 in
//! the order their identifier is first seen; frames inside a video are sorted
//! by frame identifier so that input order never affects the result.

use crate::{ConversionIssue, Error, coco::CocoImage, video::VideoHeader};
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Derive the video identifier of a frame record from its storage path.
///
/// Returns [`Error::MalformedPath`] when the path has no `/` separator or an
/// empty first segment, since video membership is then undefined.
pub fn video_name(image: &CocoImage) -> Result<&str, Error> {
    match image.file_name.split_once('/') {
        Some((video, _)) if !video.is_empty() => Ok(video),
        _ => Err(Error::MalformedPath {
            image_id: image.id,
            file_name: image.file_name.clone(),
        }),
    }
}

/// Integer frame identifier parsed from the file stem (`v1/0007.png` → 7).
pub fn frame_number(file_name: &str) -> Option<u64> {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    stem.parse().ok()
}

/// Where a frame landed after grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Index into [`FrameGrouping::videos`].
    pub video: usize,
    /// Zero-based position of the frame within its sorted video.
    pub position: usize,
    /// Integer parsed from the file stem, if any.
    pub stem_index: Option<u64>,
}

/// Result of grouping frame records into videos.
#[derive(Debug, Clone, Default)]
pub struct FrameGrouping {
    /// Video headers in id order.
    pub videos: Vec<VideoHeader>,
    /// Frames that could not be grouped.
    pub issues: Vec<ConversionIssue>,
    slots: HashMap<u64, FrameSlot>,
}

impl FrameGrouping {
    /// Resolve an image id to its slot, if the frame was grouped.
    pub fn slot(&self, image_id: u64) -> Option<FrameSlot> {
        self.slots.get(&image_id).copied()
    }

    /// Number of grouped frames across all videos.
    pub fn frame_count(&self) -> usize {
        self.slots.len()
    }
}

/// Group frame records into ordered videos.
///
/// Records with malformed paths or reused image ids are skipped and reported
/// in [`FrameGrouping::issues`]; grouping itself never fails.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(images = images.len())))]
pub fn group_frames(images: &[CocoImage]) -> FrameGrouping {
    let mut issues = Vec::new();
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&CocoImage>> = HashMap::new();
    let mut seen = HashSet::new();

    for image in images {
        let name = match video_name(image) {
            Ok(name) => name,
            Err(err) => {
                warn!("{}", err);
                issues.push(ConversionIssue::MalformedPath {
                    image_id: image.id,
                    file_name: image.file_name.clone(),
                });
                continue;
            }
        };

        if !seen.insert(image.id) {
            warn!("Duplicate image id {} ({})", image.id, image.file_name);
            issues.push(ConversionIssue::DuplicateImage {
                image_id: image.id,
                file_name: image.file_name.clone(),
            });
            continue;
        }

        members
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(image);
    }

    let mut videos = Vec::with_capacity(order.len());
    let mut slots = HashMap::with_capacity(seen.len());

    for (index, name) in order.into_iter().enumerate() {
        let frames = members
            .remove(name)
            .unwrap_or_default()
            .into_iter()
            .map(|image| (frame_number(&image.file_name), image))
            .sorted_by(|(a_num, a), (b_num, b)| {
                // Numbered frames first, then lexical paths, then image id.
                (a_num.is_none(), a_num, &a.file_name, a.id).cmp(&(
                    b_num.is_none(),
                    b_num,
                    &b.file_name,
                    b.id,
                ))
            })
            .collect::<Vec<_>>();

        let (width, height) = frames
            .first()
            .map(|(_, image)| (image.width, image.height))
            .unwrap_or_default();

        for (position, (stem_index, image)) in frames.iter().enumerate() {
            slots.insert(
                image.id,
                FrameSlot {
                    video: index,
                    position,
                    stem_index: *stem_index,
                },
            );
        }

        debug!("Video {} '{}': {} frames", index + 1, name, frames.len());

        videos.push(VideoHeader {
            id: index as u64 + 1,
            name: name.to_string(),
            width,
            height,
            length: frames.len(),
            file_names: frames
                .iter()
                .map(|(_, image)| image.file_name.clone())
                .collect(),
        });
    }

    FrameGrouping {
        videos,
        issues,
        slots,
    }
}
