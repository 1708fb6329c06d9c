// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! COCO JSON/ZIP readers for frame-level annotation files.

use super::types::CocoDataset;
use crate::Error;
use log::debug;
use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// Reader for frame-level COCO annotation files.
///
/// # Example
///
/// ```rust,no_run
/// use vidtrack::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read("annotations/frames.json")?;
/// println!("Loaded {} frames", dataset.images.len());
/// # Ok::<(), vidtrack::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct CocoReader;

impl CocoReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a dataset from a `.json` file or a `.zip` archive of JSON files.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match ext.as_deref() {
            Some("json") => self.read_json(path),
            Some("zip") => self.read_annotations_zip(path),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} (expected .json or .zip)",
                path.display()
            ))),
        }
    }

    /// Read COCO dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let dataset: CocoDataset = serde_json::from_reader(reader)?;

        debug!(
            "Read {} images, {} annotations from {}",
            dataset.images.len(),
            dataset.annotations.len(),
            path.as_ref().display()
        );

        Ok(dataset)
    }

    /// Read COCO annotations from every `*.json` entry of a ZIP archive.
    ///
    /// Entries are merged in archive order; images and categories are
    /// deduplicated by id, annotations are appended.
    pub fn read_annotations_zip<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut merged = CocoDataset::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if !entry.is_dir() && name.to_lowercase().ends_with(".json") {
                let mut contents = String::new();
                entry.read_to_string(&mut contents)?;

                let dataset: CocoDataset = serde_json::from_str(&contents)?;
                debug!("Merging {} from {}", name, path.as_ref().display());
                merge_entry(&mut merged, dataset);
            }
        }

        Ok(merged)
    }
}

/// Fold one archive entry into the merged dataset. Frames and categories
/// keep their first definition by id.
fn merge_entry(merged: &mut CocoDataset, entry: CocoDataset) {
    let mut frames: HashSet<_> = merged.images.iter().map(|image| image.id).collect();
    merged.images.extend(
        entry
            .images
            .into_iter()
            .filter(|image| frames.insert(image.id)),
    );

    let mut categories: HashSet<_> = merged.categories.iter().map(|c| c.id).collect();
    merged.categories.extend(
        entry
            .categories
            .into_iter()
            .filter(|category| categories.insert(category.id)),
    );

    merged.annotations.extend(entry.annotations);
}
