// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Conversion entry points: frame-level COCO in, validated video dataset out.

use crate::{
    ConversionIssue, Error,
    coco::{CocoDataset, CocoReader},
    grouper::group_frames,
    tracks::{TrackOptions, build_tracks},
    validate::{ValidationReport, validate_dataset},
    video::{VideoDataset, VideoWriteOptions, VideoWriter},
};
use log::{info, warn};
use std::{collections::BTreeMap, path::Path};

/// Result of one conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The converted video dataset.
    pub dataset: VideoDataset,
    /// Per-record problems, in the order they were found.
    pub issues: Vec<ConversionIssue>,
    /// Structural validation of [`Conversion::dataset`].
    pub validation: ValidationReport,
}

impl Conversion {
    /// Number of issues per [`ConversionIssue::kind`], sorted by kind.
    pub fn issue_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "{} videos, {} tracks, {} issues, validation {}",
            self.dataset.videos.len(),
            self.dataset.annotations.len(),
            self.issues.len(),
            if self.validation.is_valid() {
                "passed"
            } else {
                "failed"
            }
        )
    }
}

/// Convert an in-memory frame-level dataset.
///
/// Categories pass through unchanged. Fails only for an orphan annotation
/// under [`OrphanPolicy::Fail`](crate::OrphanPolicy::Fail).
pub fn convert_dataset(coco: CocoDataset, options: &TrackOptions) -> Result<Conversion, Error> {
    let grouping = group_frames(&coco.images);
    let build = build_tracks(&coco.annotations, &grouping, options)?;

    let mut issues = grouping.issues.clone();
    issues.extend(build.issues);

    let dataset = VideoDataset {
        categories: coco.categories,
        videos: grouping.videos,
        annotations: build.tracks,
    };
    let validation = validate_dataset(&dataset)?;

    let conversion = Conversion {
        dataset,
        issues,
        validation,
    };

    for (kind, count) in conversion.issue_counts() {
        warn!("{} record(s) with {}", count, kind);
    }
    if !conversion.validation.is_valid() {
        warn!(
            "Converted dataset has {} validation violation(s)",
            conversion.validation.violations.len()
        );
    }

    Ok(conversion)
}

/// Read a frame-level annotation file (`.json` or `.zip`) and convert it.
pub fn convert_file<P: AsRef<Path>>(input: P, options: &TrackOptions) -> Result<Conversion, Error> {
    let coco = CocoReader::new().read(input.as_ref())?;
    let conversion = convert_dataset(coco, options)?;
    info!("{}: {}", input.as_ref().display(), conversion.summary());
    Ok(conversion)
}

/// Convert `input` and write the video dataset to `output`.
///
/// The output is written even when validation reports violations; callers
/// decide what to do with [`Conversion::validation`].
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(input = %input.as_ref().display()))
)]
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &TrackOptions,
    write_options: VideoWriteOptions,
) -> Result<Conversion, Error> {
    let conversion = convert_file(input, options)?;
    VideoWriter::with_options(write_options).write_json(&conversion.dataset, output.as_ref())?;
    info!("Saved video dataset to {}", output.as_ref().display());
    Ok(conversion)
}
