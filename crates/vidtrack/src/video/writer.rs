// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Video dataset JSON writer.

use super::types::VideoDataset;
use crate::Error;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Options for video dataset writing.
#[derive(Debug, Clone, Default)]
pub struct VideoWriteOptions {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

/// Writer for converted video datasets.
///
/// # Example
///
/// ```rust,no_run
/// use vidtrack::video::{VideoDataset, VideoWriter};
///
/// let writer = VideoWriter::new();
/// writer.write_json(&VideoDataset::default(), "out/videos.json")?;
/// # Ok::<(), vidtrack::Error>(())
/// ```
pub struct VideoWriter {
    options: VideoWriteOptions,
}

impl VideoWriter {
    /// Create a new writer with default options.
    pub fn new() -> Self {
        Self {
            options: VideoWriteOptions::default(),
        }
    }

    /// Create a new writer with custom options.
    pub fn with_options(options: VideoWriteOptions) -> Self {
        Self { options }
    }

    /// Serialize the dataset to a JSON string.
    pub fn to_json_string(&self, dataset: &VideoDataset) -> Result<String, Error> {
        if self.options.pretty {
            Ok(serde_json::to_string_pretty(dataset)?)
        } else {
            Ok(serde_json::to_string(dataset)?)
        }
    }

    /// Write the dataset to a JSON file, creating parent directories.
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &VideoDataset, path: P) -> Result<(), Error> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Default for VideoWriter {
    fn default() -> Self {
        Self::new()
    }
}
