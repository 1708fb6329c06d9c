// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! # Frame-level COCO input
//!
//! Types and readers for the per-image annotation files that feed the
//! conversion. Only what the video conversion needs is modeled: frame
//! records, per-frame observations and passthrough categories.

mod reader;
mod types;

pub use reader::CocoReader;
pub use types::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage};
