// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! File-level conversion tests: archive input, written output, and the
//! settings-driven registry reading it back.

use serde_json::{Value, json};
use std::{io::Write, path::Path};
use tempfile::TempDir;
use vidtrack::{
    DatasetRegistry, Error, FrameIndexing, Settings, SourceFormat, TrackOptions,
    VideoWriteOptions, convert, read_video_dataset,
};
use zip::{ZipWriter, write::SimpleFileOptions};

#[ctor::ctor]
fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .init();
}

fn split_instances() -> (Value, Value) {
    let frames = json!({
        "images": [
            {"id": 1, "file_name": "storm_a/00000.jpg", "width": 640, "height": 360},
            {"id": 2, "file_name": "storm_a/00001.jpg", "width": 640, "height": 360},
            {"id": 3, "file_name": "storm_b/00000.jpg", "width": 320, "height": 240}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1, "instance_id": 5,
             "segmentation": [[1, 1, 9, 1, 9, 9]], "area": 32, "bbox": [1, 1, 8, 8]},
            {"id": 2, "image_id": 2, "category_id": 1, "instance_id": 5,
             "segmentation": [[2, 2, 9, 2, 9, 9]], "area": 24.5, "bbox": [2, 2, 7, 7]}
        ],
        "categories": [{"id": 1, "name": "hurricane_damage", "color": [255, 0, 0]}]
    });
    let more = json!({
        "images": [],
        "annotations": [
            {"id": 3, "image_id": 3, "category_id": 1,
             "segmentation": {"counts": "abc", "size": [240, 320]}, "area": 10, "bbox": [0, 0, 5, 2]}
        ],
        "categories": []
    });
    (frames, more)
}

fn write_archive(path: &Path, parts: &[(&str, &Value)]) -> Result<(), Box<dyn std::error::Error>> {
    let mut zip = ZipWriter::new(std::fs::File::create(path)?);
    for (name, value) in parts {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(serde_json::to_string(value)?.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

#[test]
fn test_convert_archive() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("instances.zip");
    let output = temp_dir.path().join("nested").join("videos.json");
    let (frames, more) = split_instances();
    write_archive(&input, &[("a.json", &frames), ("b.json", &more)])?;

    let conversion = convert(
        &input,
        &output,
        &TrackOptions::default(),
        VideoWriteOptions { pretty: true },
    )?;

    assert!(conversion.validation.is_valid());
    assert_eq!(conversion.dataset.videos.len(), 2);
    assert_eq!(conversion.issue_counts()["unsupported_segmentation"], 1);

    let dataset = read_video_dataset(&output)?;
    assert_eq!(dataset, conversion.dataset);

    // instance_id links both observations of storm_a into a single track.
    let storm_a = &dataset.annotations[0];
    assert_eq!(storm_a.video_id, 1);
    assert_eq!(storm_a.areas, [32.0, 24.5]);

    let storm_b = &dataset.annotations[1];
    assert_eq!(storm_b.video_id, 2);
    assert_eq!(storm_b.segmentations, [None]);
    assert_eq!(storm_b.bboxes, [[0.0, 0.0, 5.0, 2.0]]);
    Ok(())
}

#[test]
fn test_file_stem_indexing_drops_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("instances.json");
    std::fs::write(
        &input,
        serde_json::to_string(&json!({
            "images": [
                {"id": 1, "file_name": "v/00004.png"},
                {"id": 2, "file_name": "v/00000.png"}
            ],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 1, 1]},
                {"id": 2, "image_id": 2, "category_id": 1, "bbox": [0, 0, 1, 1]}
            ],
            "categories": [{"id": 1, "name": "object"}]
        }))?,
    )?;

    let options = TrackOptions {
        frame_indexing: FrameIndexing::FileStem,
        ..Default::default()
    };
    let conversion = convert(
        &input,
        temp_dir.path().join("videos.json"),
        &options,
        VideoWriteOptions::default(),
    )?;

    assert_eq!(conversion.dataset.annotations.len(), 1);
    assert_eq!(conversion.issue_counts()["frame_index_out_of_range"], 1);
    assert!(conversion.validation.is_valid());
    Ok(())
}

#[test]
fn test_registry_from_settings() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    let (frames, _) = split_instances();
    std::fs::write(root.join("train.json"), serde_json::to_string(&frames)?)?;
    convert(
        root.join("train.json"),
        root.join("videos.json"),
        &TrackOptions::default(),
        VideoWriteOptions::default(),
    )?;

    let settings_path = root.join("vidtrack.toml");
    std::fs::write(
        &settings_path,
        r#"
[[datasets]]
name = "storms_frames"
annotations = "train.json"
image_root = "JPEGImages"

[[datasets]]
name = "storms_videos"
annotations = "videos.json"
image_root = "JPEGImages"
format = "video"
thing_classes = ["hurricane_damage"]
"#,
    )?;

    let mut settings = Settings::load(Some(settings_path.as_path()))?;
    settings.datasets_root = root.to_path_buf();
    assert_eq!(settings.datasets[1].format, SourceFormat::Video);

    let registry = DatasetRegistry::from_settings(&settings)?;
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        ["storms_frames", "storms_videos"]
    );

    let from_frames = registry.get("storms_frames")?;
    let from_videos = registry.get("storms_videos")?;
    assert_eq!(from_frames.len(), from_videos.len());
    for (a, b) in from_frames.iter().zip(&from_videos) {
        assert_eq!(a.file_names, b.file_names);
        assert_eq!(a.annotations, b.annotations);
    }

    let record = &from_videos[0];
    assert_eq!(record.dataset_name, "storms_videos");
    assert_eq!(
        record.file_names[0],
        root.join("JPEGImages").join("storm_a/00000.jpg")
    );
    assert_eq!((record.width, record.height), (640, 360));
    assert_eq!(record.annotations[0].category_id, 0);

    assert_eq!(registry.metadata("storms_videos")?.thing_colors.len(), 1);
    assert!(matches!(registry.get("nope"), Err(Error::UnknownDataset(_))));
    Ok(())
}
