// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Per-record data-quality findings collected during a conversion run.

use std::fmt;

/// A non-fatal problem with one input record.
///
/// Conversion never stops on these; they are returned in aggregate so callers
/// can assert on data quality programmatically.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionIssue {
    /// Frame path has no video directory segment; the frame was skipped.
    MalformedPath { image_id: u64, file_name: String },
    /// A second frame record reused an image id; the later record was skipped.
    DuplicateImage { image_id: u64, file_name: String },
    /// Annotation points at a frame that belongs to no video; it was skipped.
    OrphanAnnotation { annotation_id: u64, image_id: u64 },
    /// Segmentation was not a polygon list and was stored as absent.
    UnsupportedSegmentation { annotation_id: u64 },
    /// Area was present but not numeric and was stored as 0.
    InvalidArea { annotation_id: u64 },
    /// Bbox was present but not four numbers and was stored as the zero box.
    InvalidBbox { annotation_id: u64 },
    /// The frame's file stem is not an integer frame index; observation dropped.
    UnparseableFrameIndex { annotation_id: u64, file_name: String },
    /// The parsed frame index lies outside the video; observation dropped.
    FrameIndexOutOfRange {
        annotation_id: u64,
        index: u64,
        length: usize,
    },
    /// The same instance was observed twice on one frame; the later one won.
    DuplicateObservation {
        annotation_id: u64,
        video: String,
        frame: usize,
    },
}

impl ConversionIssue {
    /// Short machine-friendly name of the issue kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionIssue::MalformedPath { .. } => "malformed_path",
            ConversionIssue::DuplicateImage { .. } => "duplicate_image",
            ConversionIssue::OrphanAnnotation { .. } => "orphan_annotation",
            ConversionIssue::UnsupportedSegmentation { .. } => "unsupported_segmentation",
            ConversionIssue::InvalidArea { .. } => "invalid_area",
            ConversionIssue::InvalidBbox { .. } => "invalid_bbox",
            ConversionIssue::UnparseableFrameIndex { .. } => "unparseable_frame_index",
            ConversionIssue::FrameIndexOutOfRange { .. } => "frame_index_out_of_range",
            ConversionIssue::DuplicateObservation { .. } => "duplicate_observation",
        }
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionIssue::MalformedPath {
                image_id,
                file_name,
            } => write!(
                f,
                "image {}: path {:?} has no video directory, frame skipped",
                image_id, file_name
            ),
            ConversionIssue::DuplicateImage {
                image_id,
                file_name,
            } => write!(
                f,
                "image {}: duplicate image id ({:?}), record skipped",
                image_id, file_name
            ),
            ConversionIssue::OrphanAnnotation {
                annotation_id,
                image_id,
            } => write!(
                f,
                "annotation {}: image {} belongs to no video, annotation skipped",
                annotation_id, image_id
            ),
            ConversionIssue::UnsupportedSegmentation { annotation_id } => write!(
                f,
                "annotation {}: unsupported segmentation encoding, stored as absent",
                annotation_id
            ),
            ConversionIssue::InvalidArea { annotation_id } => write!(
                f,
                "annotation {}: non-numeric area, stored as 0",
                annotation_id
            ),
            ConversionIssue::InvalidBbox { annotation_id } => write!(
                f,
                "annotation {}: bbox is not 4 numbers, stored as zero box",
                annotation_id
            ),
            ConversionIssue::UnparseableFrameIndex {
                annotation_id,
                file_name,
            } => write!(
                f,
                "annotation {}: frame {:?} has no integer index, observation dropped",
                annotation_id, file_name
            ),
            ConversionIssue::FrameIndexOutOfRange {
                annotation_id,
                index,
                length,
            } => write!(
                f,
                "annotation {}: frame index {} outside video of length {}, observation dropped",
                annotation_id, index, length
            ),
            ConversionIssue::DuplicateObservation {
                annotation_id,
                video,
                frame,
            } => write!(
                f,
                "annotation {}: instance already observed at frame {} of {}, replaced",
                annotation_id, frame, video
            ),
        }
    }
}
