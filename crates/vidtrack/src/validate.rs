// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Structural validation of video datasets.
//!
//! The validator works on raw JSON so that files produced by other tools, or
//! hand-edited ones, can be checked without first deserializing them into
//! [`VideoDataset`]. Every check runs independently and nothing is mutated;
//! the outcome is a [`ValidationReport`] listing one [`Violation`] per broken
//! rule.

use crate::{Error, video::VideoDataset};
use serde_json::{Map, Value};
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
};

const TOP_LEVEL_KEYS: [&str; 3] = ["categories", "videos", "annotations"];
const VIDEO_KEYS: [&str; 5] = ["id", "name", "width", "height", "file_names"];
const TRACK_KEYS: [&str; 6] = [
    "id",
    "video_id",
    "category_id",
    "segmentations",
    "areas",
    "bboxes",
];
const TRACK_SEQUENCES: [&str; 3] = ["segmentations", "areas", "bboxes"];

/// Where a violation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The top-level object.
    Root,
    /// A video header, by index in `videos`.
    Video(usize),
    /// An annotation track, by index in `annotations`.
    Annotation(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Root => write!(f, "root"),
            Location::Video(i) => write!(f, "videos[{}]", i),
            Location::Annotation(i) => write!(f, "annotations[{}]", i),
        }
    }
}

/// The rule a violation breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A required key is absent.
    Missing,
    /// The element is not a JSON object.
    NotAnObject,
    /// The value must be a list.
    NotAList,
    /// The list must not be empty.
    Empty,
    /// `segmentations`, `areas` and `bboxes` differ in length.
    UnequalLengths {
        segmentations: usize,
        areas: usize,
        bboxes: usize,
    },
    /// A segmentation element is neither `null` nor a list.
    InvalidSegmentation { frame: usize },
    /// A bbox element is not a list of 4 numbers.
    InvalidBbox { frame: usize },
    /// An area element is not a number.
    InvalidArea { frame: usize },
    /// The `length` key disagrees with `file_names`.
    LengthMismatch { length: Value, frames: usize },
    /// A video `id` is not a non-negative integer.
    InvalidId,
    /// Another video already uses this id.
    DuplicateId { id: u64, first: usize },
    /// `video_id` names no video in `videos`.
    UnknownVideo { video_id: u64 },
    /// The track does not span its video's frames.
    FrameCountMismatch { expected: usize, found: usize },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Missing => write!(f, "missing"),
            Rule::NotAnObject => write!(f, "not an object"),
            Rule::NotAList => write!(f, "not a list"),
            Rule::Empty => write!(f, "empty"),
            Rule::UnequalLengths {
                segmentations,
                areas,
                bboxes,
            } => write!(
                f,
                "unequal lengths (segmentations {}, areas {}, bboxes {})",
                segmentations, areas, bboxes
            ),
            Rule::InvalidSegmentation { frame } => {
                write!(f, "frame {}: segmentation is neither null nor a list", frame)
            }
            Rule::InvalidBbox { frame } => write!(f, "frame {}: bbox is not 4 numbers", frame),
            Rule::InvalidArea { frame } => write!(f, "frame {}: area is not a number", frame),
            Rule::LengthMismatch { length, frames } => {
                write!(f, "length {} but {} file names", length, frames)
            }
            Rule::InvalidId => write!(f, "not a non-negative integer"),
            Rule::DuplicateId { id, first } => {
                write!(f, "id {} already used by videos[{}]", id, first)
            }
            Rule::UnknownVideo { video_id } => write!(f, "no video with id {}", video_id),
            Rule::FrameCountMismatch { expected, found } => write!(
                f,
                "spans {} frames but its video has {}",
                found, expected
            ),
        }
    }
}

/// One broken rule at one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub location: Location,
    /// Offending key; empty when the element itself is malformed.
    pub field: String,
    pub rule: Rule,
}

impl Violation {
    fn new(location: Location, field: &str, rule: Rule) -> Self {
        Self {
            location,
            field: field.to_string(),
            rule,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}: {}", self.location, self.rule)
        } else {
            write!(f, "{}.{}: {}", self.location, self.field, self.rule)
        }
    }
}

/// Outcome of validating one video dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Number of video headers inspected.
    pub videos_checked: usize,
    /// Number of annotation tracks inspected.
    pub annotations_checked: usize,
    /// Every violation found, in check order.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns true if no rule was broken.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations reported against one location.
    pub fn violations_at(&self, location: Location) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.location == location)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                  VIDEO DATASET VALIDATION                    ║"
        )?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        writeln!(f, "║ Videos:      {}", self.videos_checked)?;
        writeln!(f, "║ Annotations: {}", self.annotations_checked)?;
        writeln!(f, "║ Violations:  {}", self.violations.len())?;
        for violation in self.violations.iter().take(10) {
            writeln!(f, "║   - {}", violation)?;
        }
        if self.violations.len() > 10 {
            writeln!(f, "║   ... and {} more", self.violations.len() - 10)?;
        }
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        let status = if self.is_valid() {
            "✓ PASSED"
        } else {
            "✗ FAILED"
        };
        writeln!(f, "║ Status: {}", status)?;
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )?;
        Ok(())
    }
}

/// Validate a typed video dataset.
pub fn validate_dataset(dataset: &VideoDataset) -> Result<ValidationReport, Error> {
    Ok(validate_value(&serde_json::to_value(dataset)?))
}

/// Validate a video dataset given as raw JSON.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn validate_value(root: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let empty = Map::new();
    let object = root.as_object().unwrap_or(&empty);

    for key in TOP_LEVEL_KEYS {
        match object.get(key) {
            None => report
                .violations
                .push(Violation::new(Location::Root, key, Rule::Missing)),
            Some(value) if !value.is_array() => {
                report
                    .violations
                    .push(Violation::new(Location::Root, key, Rule::NotAList))
            }
            Some(_) => {}
        }
    }

    let videos = object
        .get("videos")
        .and_then(Value::as_array)
        .map(|videos| index_videos(videos, &mut report));

    if let Some(tracks) = object.get("annotations").and_then(Value::as_array) {
        for (i, track) in tracks.iter().enumerate() {
            report.annotations_checked += 1;
            check_track(i, track, videos.as_ref(), &mut report.violations);
        }
    }

    report
}

/// Video ids and frame counts that tracks are checked against.
#[derive(Debug, Default)]
struct VideoIndex {
    /// `None` when the frame count is unknown or the id is ambiguous.
    frames: HashMap<u64, Option<usize>>,
    /// Some video has no usable id, so an unmatched `video_id` may refer to it.
    incomplete: bool,
}

fn index_videos(videos: &[Value], report: &mut ValidationReport) -> VideoIndex {
    let mut index = VideoIndex::default();
    let mut first_use = HashMap::new();

    for (i, video) in videos.iter().enumerate() {
        report.videos_checked += 1;
        let Some((id, frames)) = check_video(i, video, &mut report.violations) else {
            index.incomplete = true;
            continue;
        };
        match first_use.entry(id) {
            Entry::Occupied(first) => {
                report.violations.push(Violation::new(
                    Location::Video(i),
                    "id",
                    Rule::DuplicateId {
                        id,
                        first: *first.get(),
                    },
                ));
                index.frames.insert(id, None);
            }
            Entry::Vacant(slot) => {
                slot.insert(i);
                index.frames.insert(id, frames);
            }
        }
    }

    index
}

/// Check one video header; returns its id and frame count for cross checks.
fn check_video(
    index: usize,
    video: &Value,
    violations: &mut Vec<Violation>,
) -> Option<(u64, Option<usize>)> {
    let location = Location::Video(index);
    let Some(video) = video.as_object() else {
        violations.push(Violation::new(location, "", Rule::NotAnObject));
        return None;
    };

    for key in VIDEO_KEYS {
        if !video.contains_key(key) {
            violations.push(Violation::new(location, key, Rule::Missing));
        }
    }

    let frames = match video.get("file_names") {
        Some(Value::Array(names)) if names.is_empty() => {
            violations.push(Violation::new(location, "file_names", Rule::Empty));
            None
        }
        Some(Value::Array(names)) => Some(names.len()),
        Some(_) => {
            violations.push(Violation::new(location, "file_names", Rule::NotAList));
            None
        }
        None => None,
    };

    if let (Some(length), Some(frames)) = (video.get("length"), frames)
        && length.as_u64() != Some(frames as u64)
    {
        violations.push(Violation::new(
            location,
            "length",
            Rule::LengthMismatch {
                length: length.clone(),
                frames,
            },
        ));
    }

    let id = video.get("id")?;
    match id.as_u64() {
        Some(id) => Some((id, frames)),
        None => {
            violations.push(Violation::new(location, "id", Rule::InvalidId));
            None
        }
    }
}

fn check_track(
    index: usize,
    track: &Value,
    videos: Option<&VideoIndex>,
    violations: &mut Vec<Violation>,
) {
    let location = Location::Annotation(index);
    let Some(track) = track.as_object() else {
        violations.push(Violation::new(location, "", Rule::NotAnObject));
        return;
    };

    for key in TRACK_KEYS {
        if !track.contains_key(key) {
            violations.push(Violation::new(location, key, Rule::Missing));
        }
    }

    let mut lists = [None; 3];
    for (slot, key) in lists.iter_mut().zip(TRACK_SEQUENCES) {
        match track.get(key) {
            Some(Value::Array(items)) => *slot = Some(items),
            Some(_) => violations.push(Violation::new(location, key, Rule::NotAList)),
            None => {}
        }
    }
    let [segmentations, areas, bboxes] = lists;

    if let Some(segmentations) = segmentations {
        for (frame, seg) in segmentations.iter().enumerate() {
            if !(seg.is_null() || seg.is_array()) {
                violations.push(Violation::new(
                    location,
                    "segmentations",
                    Rule::InvalidSegmentation { frame },
                ));
            }
        }
    }

    if let Some(areas) = areas {
        for (frame, area) in areas.iter().enumerate() {
            if !area.is_number() {
                violations.push(Violation::new(
                    location,
                    "areas",
                    Rule::InvalidArea { frame },
                ));
            }
        }
    }

    if let Some(bboxes) = bboxes {
        for (frame, bbox) in bboxes.iter().enumerate() {
            let numeric = bbox
                .as_array()
                .is_some_and(|b| b.len() == 4 && b.iter().all(Value::is_number));
            if !numeric {
                violations.push(Violation::new(
                    location,
                    "bboxes",
                    Rule::InvalidBbox { frame },
                ));
            }
        }
    }

    let span = match (segmentations, areas, bboxes) {
        (Some(s), Some(a), Some(b)) if s.len() == a.len() && a.len() == b.len() => Some(s.len()),
        (Some(s), Some(a), Some(b)) => {
            violations.push(Violation::new(
                location,
                "",
                Rule::UnequalLengths {
                    segmentations: s.len(),
                    areas: a.len(),
                    bboxes: b.len(),
                },
            ));
            None
        }
        _ => None,
    };

    let (Some(videos), Some(video_id)) =
        (videos, track.get("video_id").and_then(Value::as_u64))
    else {
        return;
    };

    match videos.frames.get(&video_id) {
        None if videos.incomplete => {}
        None => violations.push(Violation::new(
            location,
            "video_id",
            Rule::UnknownVideo { video_id },
        )),
        Some(Some(expected)) => {
            if let Some(found) = span
                && found != *expected
            {
                violations.push(Violation::new(
                    location,
                    "",
                    Rule::FrameCountMismatch {
                        expected: *expected,
                        found,
                    },
                ));
            }
        }
        Some(None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "categories": [{"id": 1, "name": "object"}],
            "videos": [
                {"id": 1, "name": "v1", "width": 4, "height": 3, "length": 2,
                 "file_names": ["v1/0.png", "v1/1.png"]},
                {"id": 2, "name": "v2", "width": 4, "height": 3, "length": 1,
                 "file_names": ["v2/0.png"]}
            ],
            "annotations": [
                {"id": 1, "video_id": 1, "category_id": 1,
                 "segmentations": [null, [[0, 0, 1, 0, 1, 1]]],
                 "areas": [0, 0.5],
                 "bboxes": [[0, 0, 0, 0], [0, 0, 1, 1]]},
                {"id": 2, "video_id": 2, "category_id": 1,
                 "segmentations": [[[0, 0, 1, 0, 1, 1]]],
                 "areas": [0.5],
                 "bboxes": [[0, 0, 1, 1]]}
            ]
        })
    }

    fn only_violation(value: &Value) -> Violation {
        let report = validate_value(value);
        assert_eq!(report.violations.len(), 1, "{:#?}", report.violations);
        assert!(!report.is_valid());
        report.violations[0].clone()
    }

    #[test]
    fn test_valid_dataset_has_no_violations() {
        let report = validate_value(&valid());
        assert!(report.is_valid(), "{:#?}", report.violations);
        assert_eq!(report.videos_checked, 2);
        assert_eq!(report.annotations_checked, 2);
    }

    #[test]
    fn test_missing_top_level_keys() {
        let report = validate_value(&json!({"videos": []}));
        assert_eq!(report.violations.len(), 2);
        assert!(
            report
                .violations
                .iter()
                .all(|v| v.location == Location::Root && v.rule == Rule::Missing)
        );

        let report = validate_value(&json!("not an object"));
        assert_eq!(report.violations.len(), 3);
    }

    #[test]
    fn test_top_level_not_a_list() {
        let mut value = valid();
        value["categories"] = json!({"id": 1});
        let violation = only_violation(&value);
        assert_eq!(violation.field, "categories");
        assert_eq!(violation.rule, Rule::NotAList);
    }

    #[test]
    fn test_video_missing_file_names() {
        let mut value = valid();
        value["videos"][0].as_object_mut().unwrap().remove("file_names");
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Video(0));
        assert_eq!(violation.field, "file_names");
        assert_eq!(violation.rule, Rule::Missing);
    }

    #[test]
    fn test_video_missing_id_reported_once() {
        let mut value = valid();
        value["videos"][0].as_object_mut().unwrap().remove("id");
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Video(0));
        assert_eq!(violation.field, "id");
        assert_eq!(violation.rule, Rule::Missing);
    }

    #[test]
    fn test_video_string_id() {
        let mut value = valid();
        value["videos"][0]["id"] = json!("1");
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Video(0));
        assert_eq!(violation.rule, Rule::InvalidId);
    }

    #[test]
    fn test_video_not_an_object_reported_once() {
        let mut value = valid();
        value["videos"][1] = json!("v2");
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Video(1));
        assert_eq!(violation.rule, Rule::NotAnObject);
    }

    #[test]
    fn test_duplicate_video_id() {
        let mut value = valid();
        value["videos"][1]["id"] = json!(1);
        value["annotations"][1]["video_id"] = json!(1);
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Video(1));
        assert_eq!(violation.field, "id");
        assert_eq!(violation.rule, Rule::DuplicateId { id: 1, first: 0 });
        assert_eq!(
            violation.to_string(),
            "videos[1].id: id 1 already used by videos[0]"
        );
    }

    #[test]
    fn test_video_empty_file_names() {
        let mut value = valid();
        value["videos"][1]["file_names"] = json!([]);
        let violation = only_violation(&value);
        assert_eq!(violation.rule, Rule::Empty);
    }

    #[test]
    fn test_video_length_disagrees() {
        let mut value = valid();
        value["videos"][0]["length"] = json!(5);
        let violation = only_violation(&value);
        assert_eq!(violation.field, "length");
        assert!(matches!(violation.rule, Rule::LengthMismatch { frames: 2, .. }));
    }

    #[test]
    fn test_track_missing_required_key() {
        let mut value = valid();
        value["annotations"][1]
            .as_object_mut()
            .unwrap()
            .remove("category_id");
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Annotation(1));
        assert_eq!(violation.field, "category_id");
    }

    #[test]
    fn test_track_sequence_scalar() {
        let mut value = valid();
        value["annotations"][0]["areas"] = json!(3);
        let violation = only_violation(&value);
        assert_eq!(violation.field, "areas");
        assert_eq!(violation.rule, Rule::NotAList);
    }

    #[test]
    fn test_track_unequal_lengths() {
        let mut value = valid();
        value["annotations"][0]["bboxes"]
            .as_array_mut()
            .unwrap()
            .pop();
        let violation = only_violation(&value);
        assert_eq!(
            violation.rule,
            Rule::UnequalLengths {
                segmentations: 2,
                areas: 2,
                bboxes: 1
            }
        );
    }

    #[test]
    fn test_string_segmentation_element() {
        let mut value = valid();
        value["annotations"][0]["segmentations"][1] = json!("RLE");
        let violation = only_violation(&value);
        assert_eq!(violation.rule, Rule::InvalidSegmentation { frame: 1 });
    }

    #[test]
    fn test_short_bbox_element() {
        let mut value = valid();
        value["annotations"][1]["bboxes"][0] = json!([0, 0, 1]);
        let violation = only_violation(&value);
        assert_eq!(violation.rule, Rule::InvalidBbox { frame: 0 });
    }

    #[test]
    fn test_non_numeric_bbox_element() {
        let mut value = valid();
        value["annotations"][0]["bboxes"][1] = json!(["a", "b", "c", "d"]);
        let violation = only_violation(&value);
        assert_eq!(violation.location, Location::Annotation(0));
        assert_eq!(violation.rule, Rule::InvalidBbox { frame: 1 });
    }

    #[test]
    fn test_non_numeric_area_element() {
        let mut value = valid();
        value["annotations"][0]["areas"][0] = json!(null);
        let violation = only_violation(&value);
        assert_eq!(violation.rule, Rule::InvalidArea { frame: 0 });
    }

    #[test]
    fn test_unknown_video_reference() {
        let mut value = valid();
        value["annotations"][1]["video_id"] = json!(9);
        let violation = only_violation(&value);
        assert_eq!(violation.rule, Rule::UnknownVideo { video_id: 9 });
    }

    #[test]
    fn test_track_shorter_than_video() {
        let mut value = valid();
        let track = &mut value["annotations"][0];
        track["segmentations"] = json!([null]);
        track["areas"] = json!([0]);
        track["bboxes"] = json!([[0, 0, 0, 0]]);
        let violation = only_violation(&value);
        assert_eq!(
            violation.rule,
            Rule::FrameCountMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_report_display() {
        let mut value = valid();
        value["videos"][0].as_object_mut().unwrap().remove("name");
        let rendered = validate_value(&value).to_string();
        assert!(rendered.contains("videos[0].name: missing"));
        assert!(rendered.contains("✗ FAILED"));
    }
}
