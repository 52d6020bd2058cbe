//! Serializable pre-trained model artifacts
//!
//! Each artifact is a plain JSON/YAML document tagged by `kind`. Training
//! happens elsewhere; these types only evaluate an already fitted model.

use crate::classifier::Classifier;
use moodwave_core::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// One decision stump: `feature <= threshold` goes left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    /// P(class 1) when `x[feature] <= threshold`
    pub left: f64,
    /// P(class 1) otherwise
    pub right: f64,
}

/// Fitted binary classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Logistic regression: P(1) = sigmoid(w . x + b)
    Logistic {
        n_features: usize,
        coefficients: Vec<f64>,
        intercept: f64,
    },

    /// Gaussian naive Bayes with per-class means and variances
    GaussianNb {
        n_features: usize,
        class_prior: [f64; 2],
        theta: [Vec<f64>; 2],
        var: [Vec<f64>; 2],
        /// Added to every variance before evaluation
        #[serde(default)]
        var_smoothing: f64,
    },

    /// Averaged decision stumps (a depth-1 forest)
    StumpForest {
        n_features: usize,
        stumps: Vec<Stump>,
    },

    /// Fixed probability regardless of input
    Constant {
        #[serde(default)]
        n_features: Option<usize>,
        probability: f64,
    },
}

impl ModelArtifact {
    /// Declared feature-vector length
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Self::Logistic { n_features, .. }
            | Self::GaussianNb { n_features, .. }
            | Self::StumpForest { n_features, .. } => Some(*n_features),
            Self::Constant { n_features, .. } => *n_features,
        }
    }

    /// Short name of the artifact kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Logistic { .. } => "logistic",
            Self::GaussianNb { .. } => "gaussian_nb",
            Self::StumpForest { .. } => "stump_forest",
            Self::Constant { .. } => "constant",
        }
    }

    /// Check internal consistency of the parameters
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Logistic {
                n_features,
                coefficients,
                intercept,
            } => {
                if coefficients.len() != *n_features {
                    return Err(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        n_features
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("non-finite coefficient".to_string());
                }
            }
            Self::GaussianNb {
                n_features,
                class_prior,
                theta,
                var,
                var_smoothing,
            } => {
                if !(*var_smoothing >= 0.0 && var_smoothing.is_finite()) {
                    return Err("var_smoothing must be non-negative".to_string());
                }
                if class_prior.iter().any(|p| !(*p > 0.0 && p.is_finite())) {
                    return Err("class priors must be positive".to_string());
                }
                for class in 0..2 {
                    if theta[class].len() != *n_features || var[class].len() != *n_features {
                        return Err(format!(
                            "class {} parameters do not cover {} features",
                            class, n_features
                        ));
                    }
                    if var[class]
                        .iter()
                        .any(|v| !(v + var_smoothing > 0.0 && v.is_finite()))
                    {
                        return Err(format!("class {} has a non-positive variance", class));
                    }
                }
            }
            Self::StumpForest { n_features, stumps } => {
                if stumps.is_empty() {
                    return Err("forest has no stumps".to_string());
                }
                for stump in stumps {
                    if stump.feature >= *n_features {
                        return Err(format!(
                            "stump splits on feature {} of {}",
                            stump.feature, n_features
                        ));
                    }
                    if !is_probability(stump.left) || !is_probability(stump.right) {
                        return Err("stump leaf is not a probability".to_string());
                    }
                }
            }
            Self::Constant { probability, .. } => {
                if !is_probability(*probability) {
                    return Err(format!("{} is not a probability", probability));
                }
            }
        }
        Ok(())
    }

    /// P(class 1) for a single feature vector
    pub fn positive_probability(&self, x: ArrayView1<'_, f64>) -> f64 {
        match self {
            Self::Logistic {
                coefficients,
                intercept,
                ..
            } => {
                let z = x.iter().zip(coefficients).map(|(v, w)| v * w).sum::<f64>() + intercept;
                sigmoid(z)
            }
            Self::GaussianNb {
                class_prior,
                theta,
                var,
                var_smoothing,
                ..
            } => {
                let mut joint = [0.0; 2];
                for class in 0..2 {
                    joint[class] = class_prior[class].ln()
                        + x.iter()
                            .zip(&theta[class])
                            .zip(&var[class])
                            .map(|((v, mu), s2)| {
                                let s2 = s2 + var_smoothing;
                                -0.5 * (2.0 * std::f64::consts::PI * s2).ln()
                                    - (v - mu).powi(2) / (2.0 * s2)
                            })
                            .sum::<f64>();
                }
                // softmax over the two log joints
                sigmoid(joint[1] - joint[0])
            }
            Self::StumpForest { stumps, .. } => {
                stumps
                    .iter()
                    .map(|s| if x[s.feature] <= s.threshold { s.left } else { s.right })
                    .sum::<f64>()
                    / stumps.len() as f64
            }
            Self::Constant { probability, .. } => *probability,
        }
    }
}

/// A loaded artifact under its ensemble name
#[derive(Debug, Clone)]
pub struct ArtifactClassifier {
    name: String,
    artifact: ModelArtifact,
}

impl ArtifactClassifier {
    /// Wrap a validated artifact
    pub fn new(name: impl Into<String>, artifact: ModelArtifact) -> Result<Self> {
        let name = name.into();
        artifact
            .validate()
            .map_err(|reason| Error::ensemble(format!("model '{}': {}", name, reason)))?;
        Ok(Self { name, artifact })
    }

    /// Underlying parameters
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl Classifier for ArtifactClassifier {
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if let Some(expected) = self.artifact.n_features() {
            if features.ncols() != expected {
                return Err(Error::ensemble(format!(
                    "model '{}' expects {} features, got {}",
                    self.name,
                    expected,
                    features.ncols()
                )));
            }
        }

        let mut out = Array2::zeros((features.nrows(), 2));
        for (x, mut row) in features.rows().into_iter().zip(out.rows_mut()) {
            let p = self.artifact.positive_probability(x);
            row[0] = 1.0 - p;
            row[1] = p;
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> Option<usize> {
        self.artifact.n_features()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}
