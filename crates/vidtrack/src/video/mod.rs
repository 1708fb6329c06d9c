// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! # Video-level output
//!
//! The YTVIS-style structure produced by the conversion: one header per video
//! and one dense, frame-aligned track per object instance.

mod types;
mod writer;

pub use types::{VideoDataset, VideoHeader, VideoTrack, ZERO_BOX};
pub use writer::{VideoWriteOptions, VideoWriter};
