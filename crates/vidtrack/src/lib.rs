// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! # vidtrack
//!
//! Converts frame-level COCO instance annotations into video-level track
//! datasets (YouTube-VIS layout) and validates the result.
//!
//! ## Features
//!
//! - **Frame grouping**: frames are grouped into videos by the first segment
//!   of their storage path and ordered by frame identifier
//! - **Track building**: per-frame annotations become fixed-length per-video
//!   tracks, with explicit sentinels for frames where an instance is absent
//! - **Validation**: structural checks on any video dataset, reported as a
//!   list of located violations
//! - **Dataset registry**: named datasets with class metadata, loaded lazily
//!   into per-video records
//! - **Directory scan**: video headers straight from folders of frames
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vidtrack::{Error, TrackOptions, VideoWriteOptions, convert};
//!
//! fn main() -> Result<(), Error> {
//!     let conversion = convert(
//!         "instances_train.json",
//!         "videos_train.json",
//!         &TrackOptions::default(),
//!         VideoWriteOptions::default(),
//!     )?;
//!
//!     for issue in &conversion.issues {
//!         println!("{}", issue);
//!     }
//!     println!("{}", conversion.validation);
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans for the conversion stages

pub mod coco;
mod convert;
mod error;
pub mod grouper;
mod issue;
mod records;
mod registry;
mod scan;
mod settings;
pub mod tracks;
mod validate;
pub mod video;

pub use crate::{
    coco::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoReader},
    convert::{Conversion, convert, convert_dataset, convert_file},
    error::Error,
    grouper::{FrameGrouping, group_frames},
    issue::ConversionIssue,
    records::{
        DatasetMetadata, RecordProblem, RecordTrack, SourceFormat, VideoRecord, check_record,
        check_records, class_indices, load_video_records, read_video_dataset, video_records,
    },
    registry::{DatasetRegistry, DatasetRegistryBuilder, Loader},
    scan::{scan_dataset, scan_video_directory},
    settings::{DatasetSettings, Settings},
    tracks::{FrameIndexing, OrphanPolicy, TrackBuild, TrackIdentity, TrackOptions, build_tracks},
    validate::{Location, Rule, ValidationReport, Violation, validate_dataset, validate_value},
    video::{VideoDataset, VideoHeader, VideoTrack, VideoWriteOptions, VideoWriter, ZERO_BOX},
};
