// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Named dataset registry.
//!
//! Datasets are registered explicitly through [`DatasetRegistryBuilder`] and
//! looked up by name. Nothing is registered as a side effect of loading the
//! crate; a registry is a value owned by its caller.

use crate::{
    Error,
    records::{DatasetMetadata, VideoRecord, load_video_records},
    settings::Settings,
};
use log::debug;
use std::{collections::BTreeMap, fmt};

/// Produces the records of a registered dataset on demand.
pub type Loader = Box<dyn Fn() -> Result<Vec<VideoRecord>, Error> + Send + Sync>;

struct Entry {
    metadata: DatasetMetadata,
    loader: Loader,
}

/// Builder collecting dataset registrations.
#[derive(Default)]
pub struct DatasetRegistryBuilder {
    entries: BTreeMap<String, Entry>,
}

impl DatasetRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under `name`.
    ///
    /// Returns [`Error::InvalidParameters`] if the name is empty or already
    /// taken.
    pub fn register<F>(
        mut self,
        name: &str,
        metadata: DatasetMetadata,
        loader: F,
    ) -> Result<Self, Error>
    where
        F: Fn() -> Result<Vec<VideoRecord>, Error> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(Error::InvalidParameters(
                "dataset name must not be empty".to_string(),
            ));
        }
        if self.entries.contains_key(name) {
            return Err(Error::InvalidParameters(format!(
                "dataset '{}' is already registered",
                name
            )));
        }

        debug!("Registering dataset '{}'", name);
        self.entries.insert(
            name.to_string(),
            Entry {
                metadata,
                loader: Box::new(loader),
            },
        );
        Ok(self)
    }

    pub fn build(self) -> DatasetRegistry {
        DatasetRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable name → dataset lookup table.
#[derive(Default)]
pub struct DatasetRegistry {
    entries: BTreeMap<String, Entry>,
}

impl DatasetRegistry {
    pub fn builder() -> DatasetRegistryBuilder {
        DatasetRegistryBuilder::new()
    }

    /// Build a registry from the datasets declared in `settings`.
    ///
    /// Paths are resolved against [`Settings::datasets_root`] when relative.
    /// Records are loaded lazily each time [`DatasetRegistry::get`] is called.
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        let mut builder = Self::builder();

        for dataset in &settings.datasets {
            let annotations = settings.datasets_root.join(&dataset.annotations);
            let image_root = settings.datasets_root.join(&dataset.image_root);
            let name = dataset.name.clone();
            let format = dataset.format;
            let options = settings.conversion;

            builder = builder.register(&dataset.name, dataset.metadata(), move || {
                load_video_records(&annotations, &image_root, &name, format, &options)
            })?;
        }

        Ok(builder.build())
    }

    /// Load the records of the dataset registered under `name`.
    pub fn get(&self, name: &str) -> Result<Vec<VideoRecord>, Error> {
        let entry = self.entry(name)?;
        (entry.loader)()
    }

    /// Metadata of the dataset registered under `name`.
    pub fn metadata(&self, name: &str) -> Result<&DatasetMetadata, Error> {
        Ok(&self.entry(name)?.metadata)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&Entry, Error> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::UnknownDataset(name.to_string()))
    }
}

impl fmt::Debug for DatasetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, &v.metadata)))
            .finish()
    }
}
