//! Configuration for the classifier ensemble and inference pipeline

use crate::ensemble::VotingMode;
use crate::preprocessing::DEFAULT_WINDOW_SIZE;
use crate::report::DEFAULT_WINDOW_VOTES;
use moodwave_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Ensemble configuration.
///
/// The order of `models` defines classifier indices, which `weights` refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Pre-trained models, in ensemble order
    pub models: Vec<ModelEntry>,

    /// Voting mode
    #[serde(default)]
    pub voting: VotingMode,

    /// Optional per-classifier weights keyed by index, missing entries weigh 1.0
    #[serde(default)]
    pub weights: Option<HashMap<usize, f64>>,

    /// Readings per analysis window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Number of per-window vote slots in the report
    #[serde(default = "default_window_votes")]
    pub window_votes: usize,

    /// Minimum analysis windows required for a report
    #[serde(default = "default_min_windows")]
    pub min_windows: usize,
}

/// One configured model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub path: PathBuf,
}

impl EnsembleConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid ensemble config: {}", e)))
    }

    /// Load from file, resolving relative model paths against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make every relative model path relative to `base` instead
    pub fn resolve_paths(&mut self, base: &Path) {
        for model in &mut self.models {
            if model.path.is_relative() {
                model.path = base.join(&model.path);
            }
        }
    }

    /// Structural checks that do not touch the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::ensemble("no models configured"));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                return Err(Error::ensemble(format!(
                    "duplicate model name '{}'",
                    model.name
                )));
            }
        }

        if self.window_size == 0 {
            return Err(Error::config("window_size must be positive"));
        }

        Ok(())
    }

    /// Model names, in ensemble order
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_window_votes() -> usize {
    DEFAULT_WINDOW_VOTES
}

fn default_min_windows() -> usize {
    1
}
