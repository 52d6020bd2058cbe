//! Error types for Moodwave

use std::path::PathBuf;

/// Result type alias using Moodwave's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Moodwave operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A classifier returned labels or probabilities that break its contract
    #[error("classifier '{classifier}' returned invalid output: {reason}")]
    InvalidClassifierOutput { classifier: String, reason: String },

    /// No analysis window had a classifier probability on the winning side
    #[error("confidence is undefined in all {windows} analysis windows")]
    UndefinedConfidence { windows: usize },

    /// Not enough analysis windows to vote on
    #[error("insufficient samples: required {required}, available {available}")]
    InsufficientSamples { required: usize, available: usize },

    /// Ensemble could not be constructed from its members or configuration
    #[error("ensemble configuration error: {0}")]
    EnsembleConfiguration(String),

    /// Headset recording could not be interpreted
    #[error("invalid recording: {0}")]
    InvalidRecording(String),

    /// Model artifact could not be read or parsed
    #[error("failed to load model {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Session store errors
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new invalid classifier output error
    pub fn invalid_output(classifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClassifierOutput {
            classifier: classifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ensemble configuration error
    pub fn ensemble(msg: impl Into<String>) -> Self {
        Self::EnsembleConfiguration(msg.into())
    }

    /// Create a new recording error
    pub fn recording(msg: impl Into<String>) -> Self {
        Self::InvalidRecording(msg.into())
    }

    /// Create a new model load error
    pub fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidClassifierOutput { .. } => "invalid_classifier_output",
            Self::UndefinedConfidence { .. } => "undefined_confidence",
            Self::InsufficientSamples { .. } => "insufficient_samples",
            Self::EnsembleConfiguration(_) => "ensemble_configuration",
            Self::InvalidRecording(_) => "invalid_recording",
            Self::ModelLoad { .. } => "model_load",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Never includes paths, classifier names or other internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InsufficientSamples { .. } => "Not enough data was recorded, please retry.",
            Self::UndefinedConfidence { .. } => {
                "The signal was too ambiguous to score, please retry."
            }
            Self::InvalidRecording(_) => "The headset recording could not be read.",
            Self::Persistence(_) => "Results could not be saved right now, please retry later.",
            Self::InvalidClassifierOutput { .. }
            | Self::EnsembleConfiguration(_)
            | Self::ModelLoad { .. }
            | Self::Config(_) => "The emotion classifier is unavailable.",
            Self::Io(_) | Self::Serialization(_) => "An internal error occurred.",
        }
    }

    /// Whether the caller can reasonably retry with a new recording
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSamples { .. }
                | Self::UndefinedConfidence { .. }
                | Self::InvalidRecording(_)
                | Self::Persistence(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_for_core_taxonomy() {
        let errors = [
            Error::invalid_output("knn", "wrong shape"),
            Error::UndefinedConfidence { windows: 2 },
            Error::InsufficientSamples {
                required: 1,
                available: 0,
            },
            Error::ensemble("empty"),
        ];

        let mut kinds: Vec<_> = errors.iter().map(Error::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn test_user_message_does_not_leak_details() {
        let err = Error::model_load("/srv/models/secret.json", "bad json at line 3");
        assert!(!err.user_message().contains("secret"));
        assert!(err.to_string().contains("secret.json"));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::InsufficientSamples {
            required: 1,
            available: 0
        }
        .is_retryable());
        assert!(!Error::ensemble("no members").is_retryable());
    }
}
