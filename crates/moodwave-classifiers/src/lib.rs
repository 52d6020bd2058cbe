//! Moodwave Classifiers
//!
//! Ensemble valence scoring for headset recordings.
//!
//! An inference cycle runs in stages:
//! - Preprocessing: drop unusable readings, cut 8-reading analysis windows
//! - Features: summary statistics per band and window
//! - Ensemble: every pre-trained classifier scores every window, hard or
//!   soft voting picks a label, side-filtered probabilities give confidence
//! - Report: confidences become display percentages and five categories
//!
//! All classifiers are loaded once at startup and shared read-only.

pub mod category;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod ensemble;
pub mod features;
pub mod model_loader;
pub mod models;
pub mod preprocessing;
pub mod registry;
pub mod report;

pub use category::{display_percent, map_to_category, EmotionCategory};
pub use classifier::{Classifier, FeatureMatrix, Label};
pub use config::{EnsembleConfig, ModelEntry};
pub use engine::{InferenceEngine, InferenceOutcome};
pub use ensemble::{
    aggregate, estimate_confidence, Aggregation, Ensemble, EnsembleBuilder, Member,
    PredictionTensor, VoteResult, VotingMode,
};
pub use features::{FeatureSource, MinimalStatistics};
pub use model_loader::{load_model, ModelFormat, ModelRegistry};
pub use models::{ArtifactClassifier, ModelArtifact, Stump};
pub use preprocessing::{CleanedBands, DEFAULT_WINDOW_SIZE};
pub use registry::{
    init_registry_from_config, load_config, load_engine, load_ensemble, ClassifierRegistry,
};
pub use report::{InferenceReport, ReportBuilder, VoteEntry, WindowVote, DEFAULT_WINDOW_VOTES};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::category::EmotionCategory;
    pub use crate::classifier::{Classifier, Label};
    pub use crate::engine::{InferenceEngine, InferenceOutcome};
    pub use crate::ensemble::{Ensemble, VoteResult, VotingMode};
    pub use crate::features::FeatureSource;
    pub use crate::registry::ClassifierRegistry;
    pub use crate::report::InferenceReport;
}
