// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Instance track building: sparse per-frame observations to dense tracks.
//!
//! Frame-level sources carry no persistent object identity, so observations
//! are grouped under an instance key of (video, category, identity). The
//! identity is the explicit `track_id` when the source has one and
//! [`TrackIdentity::Auto`] is selected, otherwise the source annotation id.
//! The annotation-id fallback is a heuristic: nothing in COCO guarantees that
//! ids are reused across frames for the same physical object.
//!
//! Each instance then becomes a [`VideoTrack`] spanning every frame of its
//! video, with absent sentinels (`null`, `0`, [`ZERO_BOX`]) wherever the
//! instance was not observed.

use crate::{
    ConversionIssue, Error,
    coco::CocoAnnotation,
    grouper::{FrameGrouping, FrameSlot},
    video::{VideoTrack, ZERO_BOX},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

/// What to do with annotations whose frame belongs to no video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Skip the annotation and report a [`ConversionIssue::OrphanAnnotation`].
    #[default]
    Skip,
    /// Abort the conversion with [`Error::OrphanAnnotation`].
    Fail,
}

/// How an observation's position inside its track is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameIndexing {
    /// Position of the frame within its sorted video. Always in range.
    #[default]
    Position,
    /// Integer parsed from the frame's file stem. Stems that do not parse or
    /// fall outside the video are dropped and reported.
    FileStem,
}

/// Which source field identifies one physical instance across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackIdentity {
    /// Use `track_id` when present, falling back to the annotation id.
    #[default]
    Auto,
    /// Always use the annotation id.
    AnnotationId,
}

macro_rules! impl_option_str {
    ($ty:ty, $($variant:path => $name:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($variant => f.write_str($name),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    _ => Err(Error::InvalidParameters(format!(
                        "{:?} is not one of: {}",
                        s,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

impl_option_str!(OrphanPolicy, OrphanPolicy::Skip => "skip", OrphanPolicy::Fail => "fail");
impl_option_str!(
    FrameIndexing,
    FrameIndexing::Position => "position",
    FrameIndexing::FileStem => "file_stem",
);
impl_option_str!(
    TrackIdentity,
    TrackIdentity::Auto => "auto",
    TrackIdentity::AnnotationId => "annotation_id",
);

/// Options controlling track building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    pub orphan_policy: OrphanPolicy,
    pub frame_indexing: FrameIndexing,
    pub track_identity: TrackIdentity,
}

/// Tracks produced from one set of annotations.
#[derive(Debug, Clone, Default)]
pub struct TrackBuild {
    /// Dense tracks, ids assigned from 1 in first-seen instance order.
    pub tracks: Vec<VideoTrack>,
    /// Per-annotation problems found while building.
    pub issues: Vec<ConversionIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Track(u64),
    Annotation(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InstanceKey {
    video: usize,
    category_id: u32,
    identity: Identity,
}

#[derive(Debug)]
struct Observation {
    segmentation: Option<Value>,
    area: f64,
    bbox: [f64; 4],
}

#[derive(Debug)]
struct Instance {
    key: InstanceKey,
    observations: BTreeMap<usize, Observation>,
}

/// Build dense video tracks from per-frame annotations.
///
/// Returns an error only for an orphan annotation under
/// [`OrphanPolicy::Fail`]; every other problem is collected in
/// [`TrackBuild::issues`].
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(annotations = annotations.len()))
)]
pub fn build_tracks(
    annotations: &[CocoAnnotation],
    grouping: &FrameGrouping,
    options: &TrackOptions,
) -> Result<TrackBuild, Error> {
    let mut issues = Vec::new();
    let mut index: HashMap<InstanceKey, usize> = HashMap::new();
    let mut instances: Vec<Instance> = Vec::new();

    for ann in annotations {
        let Some(slot) = grouping.slot(ann.image_id) else {
            match options.orphan_policy {
                OrphanPolicy::Fail => {
                    return Err(Error::OrphanAnnotation {
                        annotation_id: ann.id,
                        image_id: ann.image_id,
                    });
                }
                OrphanPolicy::Skip => {
                    warn!(
                        "Annotation {} references unknown frame {}, skipping",
                        ann.id, ann.image_id
                    );
                    issues.push(ConversionIssue::OrphanAnnotation {
                        annotation_id: ann.id,
                        image_id: ann.image_id,
                    });
                    continue;
                }
            }
        };

        let Some(frame) = frame_index(ann, slot, grouping, options.frame_indexing, &mut issues)
        else {
            continue;
        };

        let identity = match (options.track_identity, ann.track_id) {
            (TrackIdentity::Auto, Some(track_id)) => Identity::Track(track_id),
            _ => Identity::Annotation(ann.id),
        };
        let key = InstanceKey {
            video: slot.video,
            category_id: ann.category_id,
            identity,
        };

        let observation = Observation {
            segmentation: sanitize_segmentation(ann, &mut issues),
            area: sanitize_area(ann, &mut issues),
            bbox: sanitize_bbox(ann, &mut issues),
        };

        let slot_index = *index.entry(key).or_insert_with(|| {
            instances.push(Instance {
                key,
                observations: BTreeMap::new(),
            });
            instances.len() - 1
        });

        if instances[slot_index]
            .observations
            .insert(frame, observation)
            .is_some()
        {
            let video = grouping.videos[slot.video].name.clone();
            debug!(
                "Annotation {} replaces an earlier observation at frame {} of {}",
                ann.id, frame, video
            );
            issues.push(ConversionIssue::DuplicateObservation {
                annotation_id: ann.id,
                video,
                frame,
            });
        }
    }

    let tracks = instances
        .into_iter()
        .enumerate()
        .map(|(i, instance)| {
            let video = &grouping.videos[instance.key.video];
            materialize(i as u64 + 1, video.id, video.length, instance)
        })
        .collect::<Vec<_>>();

    debug!(
        "Built {} tracks from {} annotations",
        tracks.len(),
        annotations.len()
    );

    Ok(TrackBuild { tracks, issues })
}

fn materialize(id: u64, video_id: u64, length: usize, instance: Instance) -> VideoTrack {
    let mut segmentations = vec![None; length];
    let mut areas = vec![0.0; length];
    let mut bboxes = vec![ZERO_BOX; length];

    for (frame, observation) in instance.observations {
        segmentations[frame] = observation.segmentation;
        areas[frame] = observation.area;
        bboxes[frame] = observation.bbox;
    }

    VideoTrack {
        id,
        video_id,
        category_id: instance.key.category_id,
        segmentations,
        areas,
        bboxes,
    }
}

/// Resolve the track position of an observation, reporting drops.
fn frame_index(
    ann: &CocoAnnotation,
    slot: FrameSlot,
    grouping: &FrameGrouping,
    indexing: FrameIndexing,
    issues: &mut Vec<ConversionIssue>,
) -> Option<usize> {
    match indexing {
        FrameIndexing::Position => Some(slot.position),
        FrameIndexing::FileStem => {
            let video = &grouping.videos[slot.video];
            let Some(index) = slot.stem_index else {
                issues.push(ConversionIssue::UnparseableFrameIndex {
                    annotation_id: ann.id,
                    file_name: video.file_names[slot.position].clone(),
                });
                return None;
            };
            match usize::try_from(index) {
                Ok(frame) if frame < video.length => Some(frame),
                _ => {
                    issues.push(ConversionIssue::FrameIndexOutOfRange {
                        annotation_id: ann.id,
                        index,
                        length: video.length,
                    });
                    None
                }
            }
        }
    }
}

fn sanitize_segmentation(
    ann: &CocoAnnotation,
    issues: &mut Vec<ConversionIssue>,
) -> Option<Value> {
    match &ann.segmentation {
        Value::Array(_) => Some(ann.segmentation.clone()),
        Value::Null => None,
        _ => {
            issues.push(ConversionIssue::UnsupportedSegmentation {
                annotation_id: ann.id,
            });
            None
        }
    }
}

fn sanitize_area(ann: &CocoAnnotation, issues: &mut Vec<ConversionIssue>) -> f64 {
    match &ann.area {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Null => 0.0,
        _ => {
            issues.push(ConversionIssue::InvalidArea {
                annotation_id: ann.id,
            });
            0.0
        }
    }
}

fn sanitize_bbox(ann: &CocoAnnotation, issues: &mut Vec<ConversionIssue>) -> [f64; 4] {
    if ann.bbox.is_null() {
        return ZERO_BOX;
    }

    let parsed = ann.bbox.as_array().and_then(|items| {
        let [x, y, w, h] = items.as_slice() else {
            return None;
        };
        Some([x.as_f64()?, y.as_f64()?, w.as_f64()?, h.as_f64()?])
    });

    parsed.unwrap_or_else(|| {
        issues.push(ConversionIssue::InvalidBbox {
            annotation_id: ann.id,
        });
        ZERO_BOX
    })
}
