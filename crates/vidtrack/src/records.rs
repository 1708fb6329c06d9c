// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Per-video records handed to training and evaluation consumers.
//!
//! A [`VideoRecord`] is a video header joined with its tracks, with frame
//! paths resolved against the dataset image root and category ids remapped to
//! dense zero-based class indices.

use crate::{
    Error,
    coco::{CocoCategory, CocoReader},
    convert::convert_dataset,
    tracks::TrackOptions,
    validate::validate_value,
    video::VideoDataset,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// Colors assigned to classes whose category carries no `color`.
const PALETTE: [[u8; 3]; 8] = [
    [220, 20, 60],
    [0, 130, 200],
    [60, 180, 75],
    [255, 225, 25],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

/// One video as consumed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Frame paths joined with the image root, in frame order.
    pub file_names: Vec<PathBuf>,
    pub height: u32,
    pub width: u32,
    pub video_id: u64,
    /// Number of frames.
    pub length: usize,
    /// Name of the dataset the record was loaded from.
    pub dataset_name: String,
    pub annotations: Vec<RecordTrack>,
}

/// A track inside a [`VideoRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTrack {
    /// Dense zero-based class index.
    pub category_id: usize,
    pub segmentations: Vec<Option<Value>>,
    pub bboxes: Vec<[f64; 4]>,
    pub areas: Vec<f64>,
}

/// Class names, colors and evaluator kind for a registered dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub thing_classes: Vec<String>,
    pub thing_colors: Vec<[u8; 3]>,
    pub evaluator_type: String,
}

impl DatasetMetadata {
    /// Build metadata from class names, filling missing colors from a fixed
    /// palette.
    pub fn new(
        thing_classes: Vec<String>,
        mut thing_colors: Vec<[u8; 3]>,
        evaluator_type: &str,
    ) -> Self {
        for i in thing_colors.len()..thing_classes.len() {
            thing_colors.push(PALETTE[i % PALETTE.len()]);
        }
        thing_colors.truncate(thing_classes.len());
        Self {
            thing_classes,
            thing_colors,
            evaluator_type: evaluator_type.to_string(),
        }
    }

    /// Derive metadata from categories, ordered by category id.
    pub fn from_categories(categories: &[CocoCategory]) -> Self {
        let mut sorted: Vec<_> = categories.iter().collect();
        sorted.sort_by_key(|c| c.id);

        Self {
            thing_classes: sorted.iter().map(|c| c.name.clone()).collect(),
            thing_colors: sorted
                .iter()
                .enumerate()
                .map(|(i, c)| c.color().unwrap_or(PALETTE[i % PALETTE.len()]))
                .collect(),
            evaluator_type: "ytvis".to_string(),
        }
    }
}

/// Map category ids to dense zero-based class indices, ordered by id.
pub fn class_indices(categories: &[CocoCategory]) -> HashMap<u32, usize> {
    let mut ids: Vec<_> = categories.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter().enumerate().map(|(i, id)| (id, i)).collect()
}

/// Build downstream records from a converted dataset.
///
/// Tracks whose category is not declared in `categories` or whose video is
/// unknown are left out with a warning.
pub fn video_records(
    dataset: &VideoDataset,
    image_root: &Path,
    dataset_name: &str,
) -> Vec<VideoRecord> {
    let classes = class_indices(&dataset.categories);
    let mut records: Vec<VideoRecord> = dataset
        .videos
        .iter()
        .map(|video| VideoRecord {
            file_names: video
                .file_names
                .iter()
                .map(|name| image_root.join(name))
                .collect(),
            height: video.height,
            width: video.width,
            video_id: video.id,
            length: video.file_names.len(),
            dataset_name: dataset_name.to_string(),
            annotations: Vec::new(),
        })
        .collect();

    let positions: HashMap<u64, usize> = dataset
        .videos
        .iter()
        .enumerate()
        .map(|(i, v)| (v.id, i))
        .collect();

    for track in &dataset.annotations {
        let Some(&position) = positions.get(&track.video_id) else {
            warn!(
                "Track {} references unknown video {}",
                track.id, track.video_id
            );
            continue;
        };
        let Some(&category_id) = classes.get(&track.category_id) else {
            warn!(
                "Track {} has undeclared category {}",
                track.id, track.category_id
            );
            continue;
        };
        records[position].annotations.push(RecordTrack {
            category_id,
            segmentations: track.segmentations.clone(),
            bboxes: track.bboxes.clone(),
            areas: track.areas.clone(),
        });
    }

    debug!("{}: built {} video records", dataset_name, records.len());
    records
}

/// Read an already converted video dataset, rejecting structurally invalid
/// files.
pub fn read_video_dataset<P: AsRef<Path>>(path: P) -> Result<VideoDataset, Error> {
    let file = File::open(path.as_ref())?;
    let value: Value = serde_json::from_reader(BufReader::with_capacity(64 * 1024, file))?;

    let report = validate_value(&value);
    if !report.is_valid() {
        let first = report
            .violations
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(Error::InvalidDataset(format!(
            "{}: {} violation(s), first: {}",
            path.as_ref().display(),
            report.violations.len(),
            first
        )));
    }

    let mut dataset: VideoDataset = serde_json::from_value(value).map_err(|err| {
        Error::InvalidDataset(format!("{}: {}", path.as_ref().display(), err))
    })?;
    for video in dataset.videos.iter_mut().filter(|v| v.length == 0) {
        video.length = video.file_names.len();
    }
    Ok(dataset)
}

/// Format of a dataset's annotation file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Frame-level COCO, converted on load.
    #[default]
    Frames,
    /// Already converted video dataset.
    Video,
}

/// Load downstream records for one dataset.
pub fn load_video_records(
    annotations: &Path,
    image_root: &Path,
    dataset_name: &str,
    format: SourceFormat,
    options: &TrackOptions,
) -> Result<Vec<VideoRecord>, Error> {
    let dataset = match format {
        SourceFormat::Video => read_video_dataset(annotations)?,
        SourceFormat::Frames => {
            let coco = CocoReader::new().read(annotations)?;
            convert_dataset(coco, options)?.dataset
        }
    };
    Ok(video_records(&dataset, image_root, dataset_name))
}

/// Something wrong with a record as found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordProblem {
    /// The record lists no frames.
    NoFrames { video_id: u64 },
    /// `length` disagrees with the number of frames.
    LengthMismatch {
        video_id: u64,
        length: usize,
        frames: usize,
    },
    /// A track does not span the video.
    TrackLength {
        video_id: u64,
        track: usize,
        found: usize,
    },
    /// A frame file does not exist.
    MissingFrame { video_id: u64, path: PathBuf },
    /// A frame file exists but its header cannot be read.
    UnreadableFrame {
        video_id: u64,
        path: PathBuf,
        reason: String,
    },
    /// A frame's dimensions differ from the video's.
    SizeMismatch {
        video_id: u64,
        path: PathBuf,
        expected: (u32, u32),
        found: (usize, usize),
    },
}

impl fmt::Display for RecordProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordProblem::NoFrames { video_id } => write!(f, "video {}: no frames", video_id),
            RecordProblem::LengthMismatch {
                video_id,
                length,
                frames,
            } => write!(
                f,
                "video {}: length {} but {} frames",
                video_id, length, frames
            ),
            RecordProblem::TrackLength {
                video_id,
                track,
                found,
            } => write!(
                f,
                "video {}: track {} spans {} frames",
                video_id, track, found
            ),
            RecordProblem::MissingFrame { video_id, path } => {
                write!(f, "video {}: missing frame {}", video_id, path.display())
            }
            RecordProblem::UnreadableFrame {
                video_id,
                path,
                reason,
            } => write!(
                f,
                "video {}: cannot read {}: {}",
                video_id,
                path.display(),
                reason
            ),
            RecordProblem::SizeMismatch {
                video_id,
                path,
                expected,
                found,
            } => write!(
                f,
                "video {}: {} is {}x{}, expected {}x{}",
                video_id,
                path.display(),
                found.0,
                found.1,
                expected.0,
                expected.1
            ),
        }
    }
}

/// Check a record's fields and its frame files on disk.
///
/// Frame sizes are read from image headers only; pixels are never decoded.
pub fn check_record(record: &VideoRecord) -> Vec<RecordProblem> {
    let video_id = record.video_id;
    let mut problems = Vec::new();

    if record.file_names.is_empty() {
        problems.push(RecordProblem::NoFrames { video_id });
    }
    if record.length != record.file_names.len() {
        problems.push(RecordProblem::LengthMismatch {
            video_id,
            length: record.length,
            frames: record.file_names.len(),
        });
    }

    for (track, ann) in record.annotations.iter().enumerate() {
        let spans = [ann.segmentations.len(), ann.bboxes.len(), ann.areas.len()];
        if let Some(&found) = spans.iter().find(|&&n| n != record.file_names.len()) {
            problems.push(RecordProblem::TrackLength {
                video_id,
                track,
                found,
            });
        }
    }

    for path in &record.file_names {
        if !path.exists() {
            problems.push(RecordProblem::MissingFrame {
                video_id,
                path: path.clone(),
            });
            continue;
        }
        let expected = (record.width as usize, record.height as usize);
        match imagesize::size(path) {
            Ok(size) if (size.width, size.height) != expected => {
                problems.push(RecordProblem::SizeMismatch {
                    video_id,
                    path: path.clone(),
                    expected: (record.width, record.height),
                    found: (size.width, size.height),
                })
            }
            Ok(_) => {}
            Err(err) => problems.push(RecordProblem::UnreadableFrame {
                video_id,
                path: path.clone(),
                reason: err.to_string(),
            }),
        }
    }

    problems
}

/// Check every record, in order.
pub fn check_records(records: &[VideoRecord]) -> Vec<RecordProblem> {
    records.iter().flat_map(check_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{VideoHeader, VideoTrack, ZERO_BOX};
    use serde_json::json;
    use tempfile::TempDir;

    fn category(id: u32, name: &str) -> CocoCategory {
        CocoCategory {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn dataset() -> VideoDataset {
        VideoDataset {
            categories: vec![category(7, "car"), category(3, "person")],
            videos: vec![VideoHeader {
                id: 1,
                name: "v1".to_string(),
                width: 2,
                height: 1,
                length: 2,
                file_names: vec!["v1/0.png".to_string(), "v1/1.png".to_string()],
            }],
            annotations: vec![
                VideoTrack {
                    id: 1,
                    video_id: 1,
                    category_id: 7,
                    segmentations: vec![None, Some(json!([[0, 0, 1, 0, 1, 1]]))],
                    areas: vec![0.0, 0.5],
                    bboxes: vec![ZERO_BOX, [0.0, 0.0, 1.0, 1.0]],
                },
                VideoTrack {
                    id: 2,
                    video_id: 1,
                    category_id: 99,
                    segmentations: vec![None, None],
                    areas: vec![0.0, 0.0],
                    bboxes: vec![ZERO_BOX, ZERO_BOX],
                },
            ],
        }
    }

    // Minimal PNG header: signature + IHDR chunk with the given dimensions.
    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 2, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_class_indices_ordered_by_id() {
        let classes = class_indices(&[category(7, "car"), category(3, "person")]);
        assert_eq!(classes[&3], 0);
        assert_eq!(classes[&7], 1);
    }

    #[test]
    fn test_metadata_from_categories() {
        let mut person = category(3, "person");
        person.extra.insert("color".to_string(), json!([1, 2, 3]));
        let metadata = DatasetMetadata::from_categories(&[category(7, "car"), person]);

        assert_eq!(metadata.thing_classes, ["person", "car"]);
        assert_eq!(metadata.thing_colors[0], [1, 2, 3]);
        assert_eq!(metadata.thing_colors[1], PALETTE[1]);
        assert_eq!(metadata.evaluator_type, "ytvis");
    }

    #[test]
    fn test_metadata_fills_missing_colors() {
        let metadata = DatasetMetadata::new(
            vec!["a".to_string(), "b".to_string()],
            vec![[255, 0, 0]],
            "vis",
        );
        assert_eq!(metadata.thing_colors, [[255, 0, 0], PALETTE[1]]);
        assert_eq!(metadata.evaluator_type, "vis");
    }

    #[test]
    fn test_video_records() {
        let records = video_records(&dataset(), Path::new("/data/frames"), "demo");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.dataset_name, "demo");
        assert_eq!(record.length, 2);
        assert_eq!(record.file_names[1], Path::new("/data/frames/v1/1.png"));
        // The track with an undeclared category is dropped.
        assert_eq!(record.annotations.len(), 1);
        assert_eq!(record.annotations[0].category_id, 1);
        assert_eq!(record.annotations[0].areas, [0.0, 0.5]);
    }

    #[test]
    fn test_read_video_dataset_rejects_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("videos.json");
        std::fs::write(&path, r#"{"videos": [], "annotations": []}"#).unwrap();

        let result = read_video_dataset(&path);
        assert!(matches!(result, Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn test_load_video_records_from_video_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("videos.json");
        std::fs::write(&path, serde_json::to_string(&dataset()).unwrap()).unwrap();

        let records = load_video_records(
            &path,
            temp_dir.path(),
            "demo",
            SourceFormat::Video,
            &TrackOptions::default(),
        )
        .unwrap();
        assert_eq!(records[0].video_id, 1);
    }

    #[test]
    fn test_load_video_file_without_length() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("videos.json");
        let mut value = serde_json::to_value(dataset()).unwrap();
        value["videos"][0].as_object_mut().unwrap().remove("length");
        std::fs::write(&path, value.to_string()).unwrap();

        let records = load_video_records(
            &path,
            temp_dir.path(),
            "demo",
            SourceFormat::Video,
            &TrackOptions::default(),
        )
        .unwrap();
        assert_eq!(records[0].length, 2);
        assert_eq!(read_video_dataset(&path).unwrap(), dataset());
    }

    #[test]
    fn test_read_video_dataset_wrong_field_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("videos.json");
        let mut value = serde_json::to_value(dataset()).unwrap();
        value["videos"][0]["width"] = json!("wide");
        std::fs::write(&path, value.to_string()).unwrap();

        let result = read_video_dataset(&path);
        assert!(matches!(result, Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn test_check_record_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let video_dir = temp_dir.path().join("v1");
        std::fs::create_dir_all(&video_dir).unwrap();
        std::fs::write(video_dir.join("0.png"), png_header(2, 1)).unwrap();

        let mut record = video_records(&dataset(), temp_dir.path(), "demo").remove(0);
        let problems = check_record(&record);
        assert_eq!(
            problems,
            vec![RecordProblem::MissingFrame {
                video_id: 1,
                path: video_dir.join("1.png")
            }]
        );

        std::fs::write(video_dir.join("1.png"), png_header(4, 4)).unwrap();
        record.annotations[0].areas.pop();
        let problems = check_records(std::slice::from_ref(&record));
        assert_eq!(problems.len(), 2);
        assert!(matches!(
            problems[0],
            RecordProblem::TrackLength {
                track: 0,
                found: 1,
                ..
            }
        ));
        assert!(matches!(
            problems[1],
            RecordProblem::SizeMismatch {
                found: (4, 4),
                ..
            }
        ));
    }
}
