//! Classifier registry initialization and management

use crate::config::EnsembleConfig;
use crate::engine::InferenceEngine;
use crate::ensemble::{Ensemble, Member};
use crate::features::{FeatureSource, MinimalStatistics};
use crate::model_loader::ModelRegistry;
use crate::report::ReportBuilder;
use moodwave_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Configured models plus the settings needed to assemble an engine
pub struct ClassifierRegistry {
    config: EnsembleConfig,
    models: ModelRegistry,
}

impl ClassifierRegistry {
    /// Load every configured model; the first failure aborts
    pub fn from_config(config: EnsembleConfig) -> Result<Self> {
        config.validate()?;
        let models = init_registry_from_config(&config)?;
        Ok(Self { config, models })
    }

    /// Load registry from an ensemble configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(load_config(path)?)
    }

    /// Number of loaded classifiers
    pub fn count(&self) -> usize {
        self.models.len()
    }

    /// Active configuration
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Loaded models
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Ensemble over the configured models, in configuration order
    pub fn build_ensemble(&self) -> Result<Ensemble> {
        let members = self
            .config
            .models
            .iter()
            .map(|entry| {
                self.models
                    .get(&entry.name)
                    .map(|classifier| Member {
                        name: entry.name.clone(),
                        classifier,
                    })
                    .ok_or_else(|| {
                        Error::ensemble(format!("model '{}' is not loaded", entry.name))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ensemble::new(members, self.config.voting, self.config.weights.as_ref())
    }

    /// Inference engine using band statistics as features
    pub fn build_engine(&self) -> Result<InferenceEngine> {
        self.build_engine_with(Arc::new(MinimalStatistics::for_bands()))
    }

    /// Inference engine with a custom feature source
    pub fn build_engine_with(&self, features: Arc<dyn FeatureSource>) -> Result<InferenceEngine> {
        let ensemble = self.build_ensemble()?;
        info!(
            classifiers = ensemble.len(),
            voting = ?ensemble.voting(),
            window_size = self.config.window_size,
            "Built inference engine"
        );

        InferenceEngine::new(
            Arc::new(ensemble),
            features,
            self.config.window_size,
            ReportBuilder::new(self.config.window_votes, self.config.min_windows),
        )
    }
}

/// Load every model named in the configuration
pub fn init_registry_from_config(config: &EnsembleConfig) -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::new();

    info!("Initializing model registry with {} models", config.models.len());

    for entry in &config.models {
        registry.load_and_register(entry.name.clone(), entry.path.clone())?;
        info!(model = %entry.name, path = %entry.path.display(), "Loaded model");
    }

    Ok(registry)
}

/// Load every configured model and assemble the ensemble
pub fn load_ensemble(config: EnsembleConfig) -> Result<Ensemble> {
    ClassifierRegistry::from_config(config)?.build_ensemble()
}

/// Load ensemble configuration from file
pub fn load_config(path: impl AsRef<Path>) -> Result<EnsembleConfig> {
    EnsembleConfig::from_file(path.as_ref())
}

/// Load configuration and models, then build the engine
pub fn load_engine(path: impl AsRef<Path>) -> Result<InferenceEngine> {
    ClassifierRegistry::from_file(path)?.build_engine()
}
