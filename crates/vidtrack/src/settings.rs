// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

//! Layered settings: built-in defaults, an optional TOML file, then
//! `VIDTRACK_` environment variables.
//!
//! ```toml
//! datasets_root = "/data"
//! pretty = true
//!
//! [conversion]
//! orphan_policy = "fail"
//!
//! [[datasets]]
//! name = "hurricane_vidnet_video"
//! annotations = "HurricaneVidNet_Dataset/train.json"
//! image_root = "HurricaneVidNet_Dataset/train"
//! thing_classes = ["hurricane_damage"]
//! thing_colors = [[255, 0, 0]]
//! evaluator_type = "vis"
//! ```
//!
//! Nested keys are reached from the environment with a double underscore,
//! e.g. `VIDTRACK_CONVERSION__ORPHAN_POLICY=fail`.

use crate::{
    Error,
    records::{DatasetMetadata, SourceFormat},
    tracks::TrackOptions,
};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "vidtrack.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory for relative dataset paths.
    pub datasets_root: PathBuf,
    /// Default conversion options; CLI flags override them.
    pub conversion: TrackOptions,
    /// Pretty-print written JSON.
    pub pretty: bool,
    pub datasets: Vec<DatasetSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            datasets_root: PathBuf::from("datasets"),
            conversion: TrackOptions::default(),
            pretty: false,
            datasets: Vec::new(),
        }
    }
}

/// One `[[datasets]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    pub name: String,
    /// Annotation file, relative to `datasets_root` unless absolute.
    pub annotations: PathBuf,
    /// Directory frame paths are joined with.
    pub image_root: PathBuf,
    #[serde(default)]
    pub format: SourceFormat,
    #[serde(default)]
    pub thing_classes: Vec<String>,
    #[serde(default)]
    pub thing_colors: Vec<[u8; 3]>,
    #[serde(default = "default_evaluator")]
    pub evaluator_type: String,
}

fn default_evaluator() -> String {
    "ytvis".to_string()
}

impl DatasetSettings {
    pub fn metadata(&self) -> DatasetMetadata {
        DatasetMetadata::new(
            self.thing_classes.clone(),
            self.thing_colors.clone(),
            &self.evaluator_type,
        )
    }
}

impl Settings {
    /// Per-user settings file, e.g. `~/.config/vidtrack/vidtrack.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vidtrack")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the per-user file is used
    /// when present.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default(
                "datasets_root",
                defaults.datasets_root.to_string_lossy().as_ref(),
            )?
            .set_default("pretty", defaults.pretty)?;

        match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                builder = builder.add_source(File::from(path));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    debug!("Loading optional settings from {}", path.display());
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix("VIDTRACK").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), Error> {
        for (i, dataset) in self.datasets.iter().enumerate() {
            if self.datasets[..i].iter().any(|d| d.name == dataset.name) {
                return Err(Error::InvalidParameters(format!(
                    "dataset '{}' is configured twice",
                    dataset.name
                )));
            }
        }
        Ok(())
    }
}
