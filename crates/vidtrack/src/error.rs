// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

/// Error type for vidtrack operations.
///
/// Only conditions that stop a whole run are errors. Problems with individual
/// records (malformed paths, orphan annotations, unsupported encodings) are
/// collected as [`ConversionIssue`](crate::ConversionIssue) values instead.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// ZIP archive error while reading annotation archives.
    ZipError(zip::result::ZipError),
    /// Walking a directory tree failed.
    WalkError(walkdir::Error),
    /// A frame storage path has no video-identifying first segment.
    MalformedPath {
        /// Image id of the offending frame record.
        image_id: u64,
        /// The storage path as found in the record.
        file_name: String,
    },
    /// An annotation references a frame that belongs to no video.
    OrphanAnnotation {
        /// Source annotation id.
        annotation_id: u64,
        /// Image id the annotation points at.
        image_id: u64,
    },
    /// A video dataset file failed structural validation.
    InvalidDataset(String),
    /// No dataset is registered under the requested name.
    UnknownDataset(String),
    /// Unsupported input file format.
    UnsupportedFormat(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ZipError(e) => write!(f, "ZIP error: {}", e),
            Error::WalkError(e) => write!(f, "Directory walk error: {}", e),
            Error::MalformedPath {
                image_id,
                file_name,
            } => write!(
                f,
                "Malformed frame path for image {}: {:?} has no video directory",
                image_id, file_name
            ),
            Error::OrphanAnnotation {
                annotation_id,
                image_id,
            } => write!(
                f,
                "Annotation {} references image {} which belongs to no video",
                annotation_id, image_id
            ),
            Error::InvalidDataset(s) => write!(f, "Invalid video dataset: {}", s),
            Error::UnknownDataset(s) => write!(f, "Unknown dataset: {}", s),
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ZipError(e) => Some(e),
            Error::WalkError(e) => Some(e),
            _ => None,
        }
    }
}
