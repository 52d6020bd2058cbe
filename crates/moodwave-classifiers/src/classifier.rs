//! Classifier trait and common types

use moodwave_core::Result;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Feature matrix: rows are analysis windows, columns are features
pub type FeatureMatrix = Array2<f64>;

/// Trait for all pre-trained binary valence classifiers.
///
/// Implementations are immutable once loaded and must tolerate concurrent
/// read-only calls from many inference requests.
pub trait Classifier: Send + Sync {
    /// Class probabilities per sample, shape `samples x 2`
    /// (`[P(negative), P(positive)]`, rows summing to 1)
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Discrete class index (0 or 1) per sample.
    ///
    /// Defaults to the argmax of `predict_proba`, ties going to class 0.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(features)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| if row[1] > row[0] { 1 } else { 0 })
            .collect())
    }

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Feature-vector length this classifier was trained on, if known
    fn n_features(&self) -> Option<usize> {
        None
    }
}

/// Binary valence label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Class 0
    Negative,
    /// Class 1
    Positive,
}

impl Label {
    /// Class index (0 or 1)
    pub fn index(self) -> usize {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }

    /// Label for a class index, `None` for anything but 0 or 1
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    /// Argmax of a `[P(0), P(1)]` pair, ties going to `Negative`
    pub fn argmax(p0: f64, p1: f64) -> Self {
        if p1 > p0 {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}
