// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Build video headers straight from a directory of frame folders.

use crate::{
    Error,
    grouper::frame_number,
    video::{VideoDataset, VideoHeader},
};
use itertools::Itertools;
use log::{debug, warn};
use std::path::Path;
use walkdir::WalkDir;

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Scan `root` for videos.
///
/// Every sub-directory holding at least one frame becomes a video, in
/// directory name order. Frame paths are relative to `root`. Directories
/// whose first frame header cannot be read are skipped with a warning.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(root = %root.as_ref().display())))]
pub fn scan_video_directory<P: AsRef<Path>>(root: P) -> Result<Vec<VideoHeader>, Error> {
    let root = root.as_ref();
    let mut videos = Vec::new();

    let dirs = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_ok(|entry| entry.file_type().is_dir());

    for dir in dirs {
        let dir = dir?;
        let name = dir.file_name().to_string_lossy().into_owned();

        let frames: Vec<String> = WalkDir::new(dir.path())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_ok(|entry| entry.file_type().is_file() && is_frame(entry.path()))
            .map_ok(|entry| format!("{}/{}", name, entry.file_name().to_string_lossy()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sorted_by(|a, b| {
                let (a_num, b_num) = (frame_number(a), frame_number(b));
                (a_num.is_none(), a_num, a).cmp(&(b_num.is_none(), b_num, b))
            })
            .collect();

        let Some(first) = frames.first() else {
            debug!("Skipping {}: no frames", dir.path().display());
            continue;
        };

        let size = match imagesize::size(root.join(first)) {
            Ok(size) => size,
            Err(err) => {
                warn!("Skipping video {}: cannot read {}: {}", name, first, err);
                continue;
            }
        };

        debug!("Video '{}': {} frames", name, frames.len());
        videos.push(VideoHeader {
            id: videos.len() as u64 + 1,
            name,
            width: size.width as u32,
            height: size.height as u32,
            length: frames.len(),
            file_names: frames,
        });
    }

    Ok(videos)
}

/// Scan `root` into a dataset with videos and no tracks.
pub fn scan_dataset<P: AsRef<Path>>(root: P) -> Result<VideoDataset, Error> {
    Ok(VideoDataset {
        videos: scan_video_directory(root)?,
        ..Default::default()
    })
}
