//! Ensemble voting over pre-trained classifiers
//!
//! An inference call runs in three steps:
//! - Collect: every member scores the same feature matrix, results are
//!   stacked into a `samples x classifiers x 2` prediction tensor
//! - Aggregate: hard (weighted label count) or soft (weighted probability
//!   average) voting picks one label per sample
//! - Estimate: the display confidence of a sample is the mean positive-class
//!   probability of the members that sit on the winning side of 0.5

use crate::classifier::{Classifier, Label};
use moodwave_core::{Error, Result};
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Tolerance for a probability row to count as normalized
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// How member outputs are combined into a consensus label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingMode {
    /// Weighted majority of discrete labels
    #[default]
    Hard,

    /// Argmax of the weighted average class probabilities
    Soft,
}

/// A named ensemble member
#[derive(Clone)]
pub struct Member {
    pub name: String,
    pub classifier: Arc<dyn Classifier>,
}

/// Ordered set of classifiers plus a voting rule.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct Ensemble {
    members: Vec<Member>,
    voting: VotingMode,
    weights: Vec<f64>,
    n_features: Option<usize>,
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.member_names())
            .field("voting", &self.voting)
            .field("weights", &self.weights)
            .field("n_features", &self.n_features)
            .finish()
    }
}

/// Per-sample outcome of an ensemble vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoteResult {
    /// Winning label
    pub label: Label,

    /// Side-filtered confidence, `None` when no member agreed with the winner
    pub confidence: Option<f64>,
}

/// Labels plus the raw per-member positive-class probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Winning label per sample
    pub labels: Vec<Label>,

    /// `sided_probabilities[sample][member]` = member's P(class 1)
    pub sided_probabilities: Vec<Vec<f64>>,
}

/// Stacked member outputs indexed `[sample][classifier][class]`
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTensor {
    probabilities: Array3<f64>,
    labels: Array2<Label>,
}

impl PredictionTensor {
    /// Build a tensor from probabilities and explicit per-member labels
    pub fn new(probabilities: Array3<f64>, labels: Array2<Label>) -> Result<Self> {
        let (samples, classifiers, classes) = probabilities.dim();
        if classes != 2 {
            return Err(Error::invalid_output(
                "tensor",
                format!("expected 2 classes, got {}", classes),
            ));
        }
        if labels.dim() != (samples, classifiers) {
            return Err(Error::invalid_output(
                "tensor",
                format!(
                    "label matrix shape {:?} does not match {} samples x {} classifiers",
                    labels.dim(),
                    samples,
                    classifiers
                ),
            ));
        }
        for c in 0..classifiers {
            validate_rows(&format!("#{}", c), probabilities.slice(s![.., c, ..]))?;
        }

        Ok(Self {
            probabilities,
            labels,
        })
    }

    /// Build a tensor whose labels are each member's probability argmax
    pub fn from_probabilities(probabilities: Array3<f64>) -> Result<Self> {
        let (samples, classifiers, classes) = probabilities.dim();
        if classes != 2 {
            return Err(Error::invalid_output(
                "tensor",
                format!("expected 2 classes, got {}", classes),
            ));
        }
        let labels = Array2::from_shape_fn((samples, classifiers), |(m, c)| {
            Label::argmax(probabilities[[m, c, 0]], probabilities[[m, c, 1]])
        });
        Self::new(probabilities, labels)
    }

    /// Number of samples (analysis windows)
    pub fn n_samples(&self) -> usize {
        self.probabilities.dim().0
    }

    /// Number of member classifiers
    pub fn n_classifiers(&self) -> usize {
        self.probabilities.dim().1
    }

    /// `(samples, classifiers, classes)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.probabilities.dim()
    }

    /// Raw probability tensor
    pub fn probabilities(&self) -> &Array3<f64> {
        &self.probabilities
    }

    /// Per-member discrete labels, `[sample][classifier]`
    pub fn labels(&self) -> &Array2<Label> {
        &self.labels
    }

    /// Every member's P(class 1) for one sample
    pub fn positive_column(&self, sample: usize) -> ArrayView1<'_, f64> {
        self.probabilities.slice(s![sample, .., 1])
    }
}

impl Ensemble {
    /// Create an ensemble.
    ///
    /// `weights` maps member index to a nonnegative weight; members missing
    /// from the map weigh 1.0. Fails on an empty member list, duplicate
    /// names, disagreeing feature lengths or unusable weights.
    pub fn new(
        members: Vec<Member>,
        voting: VotingMode,
        weights: Option<&HashMap<usize, f64>>,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::ensemble("ensemble has no classifiers"));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.name.as_str()) {
                return Err(Error::ensemble(format!(
                    "classifier '{}' appears more than once",
                    member.name
                )));
            }
        }

        let mut n_features: Option<(usize, &str)> = None;
        for member in &members {
            if let Some(n) = member.classifier.n_features() {
                match n_features {
                    None => n_features = Some((n, member.name.as_str())),
                    Some((expected, first)) if expected != n => {
                        return Err(Error::ensemble(format!(
                            "classifier '{}' expects {} features but '{}' expects {}",
                            member.name, n, first, expected
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        let n_features = n_features.map(|(n, _)| n);

        let weights = resolve_weights(members.len(), weights)?;

        debug!(
            members = members.len(),
            ?voting,
            ?n_features,
            "Constructed ensemble"
        );

        Ok(Self {
            members,
            voting,
            weights,
            n_features,
        })
    }

    /// Start building an ensemble
    pub fn builder() -> EnsembleBuilder {
        EnsembleBuilder::new()
    }

    /// Members in declared order
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Member names in declared order
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// Voting rule
    pub fn voting(&self) -> VotingMode {
        self.voting
    }

    /// Resolved per-member weights
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Feature-vector length shared by the members, if any member declares it
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a constructed ensemble
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run every member over `features` and stack the outputs.
    ///
    /// Hard voting asks each member for its discrete labels; soft voting
    /// derives them from the probabilities.
    pub fn collect(&self, features: ArrayView2<'_, f64>) -> Result<PredictionTensor> {
        let samples = features.nrows();
        if let Some(expected) = self.n_features {
            if features.ncols() != expected {
                return Err(Error::ensemble(format!(
                    "feature matrix has {} columns, ensemble expects {}",
                    features.ncols(),
                    expected
                )));
            }
        }

        let mut probabilities = Array3::<f64>::zeros((samples, self.members.len(), 2));
        let mut labels = Array2::from_elem((samples, self.members.len()), Label::Negative);

        for (idx, member) in self.members.iter().enumerate() {
            let proba = member.classifier.predict_proba(features)?;
            if proba.dim() != (samples, 2) {
                return Err(Error::invalid_output(
                    &member.name,
                    format!(
                        "probability matrix has shape {:?}, expected ({}, 2)",
                        proba.dim(),
                        samples
                    ),
                ));
            }
            validate_rows(&member.name, proba.view())?;
            probabilities.slice_mut(s![.., idx, ..]).assign(&proba);

            match self.voting {
                VotingMode::Hard => {
                    let predicted = member.classifier.predict(features)?;
                    if predicted.len() != samples {
                        return Err(Error::invalid_output(
                            &member.name,
                            format!("{} labels for {} samples", predicted.len(), samples),
                        ));
                    }
                    for (m, raw) in predicted.into_iter().enumerate() {
                        labels[[m, idx]] = Label::from_index(raw).ok_or_else(|| {
                            Error::invalid_output(
                                &member.name,
                                format!("label {} is not a binary class", raw),
                            )
                        })?;
                    }
                }
                VotingMode::Soft => {
                    for m in 0..samples {
                        labels[[m, idx]] = Label::argmax(proba[[m, 0]], proba[[m, 1]]);
                    }
                }
            }
        }

        debug!(
            samples,
            classifiers = self.members.len(),
            "Collected member predictions"
        );

        Ok(PredictionTensor {
            probabilities,
            labels,
        })
    }

    /// Collect, aggregate and estimate confidences in one call
    pub fn vote(&self, features: ArrayView2<'_, f64>) -> Result<Vec<VoteResult>> {
        let tensor = self.collect(features)?;
        let aggregation = aggregate(&tensor, self.voting, &self.weights)?;
        let confidences =
            estimate_confidence(&aggregation.labels, &aggregation.sided_probabilities);

        Ok(aggregation
            .labels
            .into_iter()
            .zip(confidences)
            .map(|(label, confidence)| VoteResult { label, confidence })
            .collect())
    }
}

/// Reduce a prediction tensor to one label per sample.
///
/// `weights` must hold one entry per classifier. Ties go to `Negative` in
/// both modes.
pub fn aggregate(
    tensor: &PredictionTensor,
    mode: VotingMode,
    weights: &[f64],
) -> Result<Aggregation> {
    if weights.len() != tensor.n_classifiers() {
        return Err(Error::ensemble(format!(
            "{} weights for {} classifiers",
            weights.len(),
            tensor.n_classifiers()
        )));
    }

    let mut labels = Vec::with_capacity(tensor.n_samples());
    let mut sided_probabilities = Vec::with_capacity(tensor.n_samples());

    for m in 0..tensor.n_samples() {
        let label = match mode {
            VotingMode::Soft => {
                let total: f64 = weights.iter().sum();
                let mut avg = [0.0; 2];
                for (c, w) in weights.iter().enumerate() {
                    avg[0] += w * tensor.probabilities[[m, c, 0]];
                    avg[1] += w * tensor.probabilities[[m, c, 1]];
                }
                Label::argmax(avg[0] / total, avg[1] / total)
            }
            VotingMode::Hard => {
                let mut counts = [0.0; 2];
                for (c, w) in weights.iter().enumerate() {
                    counts[tensor.labels[[m, c]].index()] += w;
                }
                Label::argmax(counts[0], counts[1])
            }
        };

        labels.push(label);
        sided_probabilities.push(tensor.positive_column(m).to_vec());
    }

    Ok(Aggregation {
        labels,
        sided_probabilities,
    })
}

/// Side-filtered confidence per sample.
///
/// A `Positive` sample averages the member probabilities strictly above 0.5,
/// a `Negative` one those strictly below. Exactly 0.5 never counts. A sample
/// with no qualifying member gets `None`.
pub fn estimate_confidence(labels: &[Label], sided_probabilities: &[Vec<f64>]) -> Vec<Option<f64>> {
    labels
        .iter()
        .zip(sided_probabilities)
        .enumerate()
        .map(|(sample, (label, probs))| {
            let on_side: Vec<f64> = probs
                .iter()
                .copied()
                .filter(|&p| match label {
                    Label::Positive => p > 0.5,
                    Label::Negative => p < 0.5,
                })
                .collect();

            if on_side.is_empty() {
                debug!(sample, ?label, "No member on the winning side");
                None
            } else {
                Some(on_side.iter().sum::<f64>() / on_side.len() as f64)
            }
        })
        .collect()
}

fn resolve_weights(count: usize, weights: Option<&HashMap<usize, f64>>) -> Result<Vec<f64>> {
    let mut resolved = vec![1.0; count];

    if let Some(weights) = weights {
        for (&idx, &w) in weights {
            if idx >= count {
                return Err(Error::ensemble(format!(
                    "weight given for classifier index {} but ensemble has {} classifiers",
                    idx, count
                )));
            }
            if !w.is_finite() || w < 0.0 {
                return Err(Error::ensemble(format!(
                    "weight for classifier index {} must be a nonnegative number, got {}",
                    idx, w
                )));
            }
            resolved[idx] = w;
        }
    }

    if resolved.iter().sum::<f64>() <= 0.0 {
        return Err(Error::ensemble("weights sum to zero"));
    }

    Ok(resolved)
}

fn validate_rows(classifier: &str, proba: ArrayView2<'_, f64>) -> Result<()> {
    for (m, row) in proba.rows().into_iter().enumerate() {
        if row.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
            return Err(Error::invalid_output(
                classifier,
                format!("sample {} has probabilities outside [0, 1]: {:?}", m, row.to_vec()),
            ));
        }
        let sum = row.sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(Error::invalid_output(
                classifier,
                format!("sample {} probabilities sum to {}", m, sum),
            ));
        }
    }
    Ok(())
}

/// Builder for constructing ensembles fluently
pub struct EnsembleBuilder {
    members: Vec<Member>,
    voting: VotingMode,
    weights: HashMap<usize, f64>,
}

impl EnsembleBuilder {
    /// Create a new ensemble builder
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            voting: VotingMode::default(),
            weights: HashMap::new(),
        }
    }

    /// Append a member
    pub fn member(mut self, name: impl Into<String>, classifier: Arc<dyn Classifier>) -> Self {
        self.members.push(Member {
            name: name.into(),
            classifier,
        });
        self
    }

    /// Append a weighted member
    pub fn weighted_member(
        mut self,
        name: impl Into<String>,
        classifier: Arc<dyn Classifier>,
        weight: f64,
    ) -> Self {
        self.weights.insert(self.members.len(), weight);
        self.member(name, classifier)
    }

    /// Set the voting rule
    pub fn voting(mut self, voting: VotingMode) -> Self {
        self.voting = voting;
        self
    }

    /// Build the ensemble
    pub fn build(self) -> Result<Ensemble> {
        let weights = (!self.weights.is_empty()).then_some(&self.weights);
        Ensemble::new(self.members, self.voting, weights)
    }
}

impl Default for EnsembleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    // Mock classifier returning the same P(class 1) for every row
    struct MockClassifier {
        name: String,
        positive: f64,
        n_features: Option<usize>,
    }

    impl MockClassifier {
        fn new(name: &str, positive: f64) -> Arc<dyn Classifier> {
            Arc::new(Self {
                name: name.to_string(),
                positive,
                n_features: None,
            })
        }
    }

    impl Classifier for MockClassifier {
        fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
            let mut out = Array2::zeros((features.nrows(), 2));
            for mut row in out.rows_mut() {
                row[0] = 1.0 - self.positive;
                row[1] = self.positive;
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn n_features(&self) -> Option<usize> {
            self.n_features
        }
    }

    fn tensor(rows: &[&[f64]]) -> PredictionTensor {
        let samples = rows.len();
        let classifiers = rows[0].len();
        let probabilities = Array3::from_shape_fn((samples, classifiers, 2), |(m, c, k)| {
            if k == 1 {
                rows[m][c]
            } else {
                1.0 - rows[m][c]
            }
        });
        PredictionTensor::from_probabilities(probabilities).unwrap()
    }

    #[test]
    fn test_empty_ensemble_is_rejected() {
        let err = Ensemble::builder().build().unwrap_err();
        assert!(matches!(err, Error::EnsembleConfiguration(_)));
    }

    #[test]
    fn test_mismatched_feature_lengths_are_rejected() {
        let a: Arc<dyn Classifier> = Arc::new(MockClassifier {
            name: "a".into(),
            positive: 0.7,
            n_features: Some(64),
        });
        let b: Arc<dyn Classifier> = Arc::new(MockClassifier {
            name: "b".into(),
            positive: 0.7,
            n_features: Some(32),
        });

        let err = Ensemble::builder()
            .member("a", a)
            .member("b", b)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::EnsembleConfiguration(_)));
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let negative = Ensemble::builder()
            .weighted_member("a", MockClassifier::new("a", 0.7), -1.0)
            .build();
        assert!(negative.is_err());

        let mut out_of_range = HashMap::new();
        out_of_range.insert(3, 1.0);
        let members = vec![Member {
            name: "a".into(),
            classifier: MockClassifier::new("a", 0.7),
        }];
        let err = Ensemble::new(members, VotingMode::Hard, Some(&out_of_range)).unwrap_err();
        assert!(matches!(err, Error::EnsembleConfiguration(_)));

        let zero = Ensemble::builder()
            .weighted_member("a", MockClassifier::new("a", 0.7), 0.0)
            .build();
        assert!(zero.is_err());
    }

    #[test]
    fn test_collect_shape_and_order() {
        let ensemble = Ensemble::builder()
            .member("first", MockClassifier::new("first", 0.9))
            .member("second", MockClassifier::new("second", 0.2))
            .member("third", MockClassifier::new("third", 0.6))
            .build()
            .unwrap();

        let features = Array2::<f64>::zeros((4, 3));
        let tensor = ensemble.collect(features.view()).unwrap();

        assert_eq!(tensor.shape(), (4, 3, 2));
        assert_eq!(tensor.positive_column(2).to_vec(), vec![0.9, 0.2, 0.6]);
        for m in 0..4 {
            for c in 0..3 {
                let row = tensor.probabilities().slice(s![m, c, ..]);
                assert!((row.sum() - 1.0).abs() < 1e-9);
            }
        }
        assert_eq!(tensor.labels()[[0, 1]], Label::Negative);
    }

    #[test]
    fn test_collect_rejects_unnormalized_rows() {
        struct Broken;
        impl Classifier for Broken {
            fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
                Ok(Array2::from_elem((features.nrows(), 2), 0.7))
            }
            fn name(&self) -> &str {
                "broken"
            }
        }

        let ensemble = Ensemble::builder()
            .member("broken", Arc::new(Broken))
            .build()
            .unwrap();
        let err = ensemble.collect(Array2::zeros((2, 1)).view()).unwrap_err();

        assert!(matches!(err, Error::InvalidClassifierOutput { .. }));
    }

    #[test]
    fn test_collect_rejects_wrong_shape() {
        struct OneColumn;
        impl Classifier for OneColumn {
            fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
                Ok(Array2::from_elem((features.nrows(), 1), 1.0))
            }
            fn name(&self) -> &str {
                "one_column"
            }
        }

        let ensemble = Ensemble::builder()
            .member("one_column", Arc::new(OneColumn))
            .build()
            .unwrap();
        let err = ensemble.collect(Array2::zeros((2, 1)).view()).unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidClassifierOutput { ref classifier, .. } if classifier == "one_column"
        ));
    }

    #[test]
    fn test_collect_rejects_non_binary_labels() {
        struct Ternary;
        impl Classifier for Ternary {
            fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
                Ok(Array2::from_elem((features.nrows(), 2), 0.5))
            }
            fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
                Ok(vec![2; features.nrows()])
            }
            fn name(&self) -> &str {
                "ternary"
            }
        }

        let ensemble = Ensemble::builder()
            .member("ternary", Arc::new(Ternary))
            .build()
            .unwrap();
        let err = ensemble.collect(Array2::zeros((1, 1)).view()).unwrap_err();

        assert!(matches!(err, Error::InvalidClassifierOutput { .. }));
    }

    #[test]
    fn test_soft_vote_averages_probabilities() {
        // Two weak positives lose to one confident negative on average
        let t = tensor(&[&[0.55, 0.55, 0.05]]);
        let agg = aggregate(&t, VotingMode::Soft, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(agg.labels, vec![Label::Negative]);

        // Hard voting counts heads instead
        let agg = aggregate(&t, VotingMode::Hard, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(agg.labels, vec![Label::Positive]);
    }

    #[test]
    fn test_soft_vote_tie_goes_to_negative() {
        let t = tensor(&[&[0.75, 0.25]]);
        let agg = aggregate(&t, VotingMode::Soft, &[1.0, 1.0]).unwrap();
        assert_eq!(agg.labels, vec![Label::Negative]);
    }

    #[test]
    fn test_hard_vote_tie_goes_to_negative() {
        let t = tensor(&[&[0.9, 0.9, 0.1, 0.1]]);
        let agg = aggregate(&t, VotingMode::Hard, &[1.0; 4]).unwrap();
        assert_eq!(agg.labels, vec![Label::Negative]);
    }

    #[test]
    fn test_hard_vote_respects_weights() {
        let t = tensor(&[&[0.9, 0.1, 0.1]]);
        let agg = aggregate(&t, VotingMode::Hard, &[3.0, 1.0, 1.0]).unwrap();
        assert_eq!(agg.labels, vec![Label::Positive]);

        let agg = aggregate(&t, VotingMode::Hard, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(agg.labels, vec![Label::Negative]);
    }

    #[test]
    fn test_hard_vote_uses_discrete_labels_not_probabilities() {
        // Member 0 says positive even though its probability leans negative
        let probabilities = Array3::from_shape_vec(
            (1, 3, 2),
            vec![0.6, 0.4, 0.6, 0.4, 0.3, 0.7],
        )
        .unwrap();
        let labels = array![[Label::Positive, Label::Positive, Label::Positive]];
        let t = PredictionTensor::new(probabilities, labels).unwrap();

        let agg = aggregate(&t, VotingMode::Hard, &[1.0; 3]).unwrap();
        assert_eq!(agg.labels, vec![Label::Positive]);
        assert_eq!(agg.sided_probabilities, vec![vec![0.4, 0.4, 0.7]]);

        let confidences = estimate_confidence(&agg.labels, &agg.sided_probabilities);
        assert_eq!(confidences, vec![Some(0.7)]);
    }

    #[test]
    fn test_aggregate_rejects_weight_count_mismatch() {
        let t = tensor(&[&[0.9, 0.1]]);
        assert!(aggregate(&t, VotingMode::Hard, &[1.0]).is_err());
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let t = tensor(&[&[0.9, 0.3, 0.6], &[0.2, 0.4, 0.55]]);
        for mode in [VotingMode::Hard, VotingMode::Soft] {
            let first = aggregate(&t, mode, &[1.0, 2.0, 0.5]).unwrap();
            let second = aggregate(&t, mode, &[1.0, 2.0, 0.5]).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_confidence_excludes_exact_half() {
        let labels = [Label::Positive, Label::Negative];
        let sided = vec![vec![0.5, 0.7, 0.9], vec![0.5, 0.1, 0.3]];

        let confidences = estimate_confidence(&labels, &sided);

        assert!((confidences[0].unwrap() - 0.8).abs() < 1e-12);
        assert!((confidences[1].unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_undefined_when_no_member_agrees() {
        let labels = [Label::Positive];
        let sided = vec![vec![0.5, 0.4, 0.2]];

        assert_eq!(estimate_confidence(&labels, &sided), vec![None]);
    }

    #[test]
    fn test_vote_end_to_end() {
        let ensemble = Ensemble::builder()
            .member("a", MockClassifier::new("a", 0.9))
            .member("b", MockClassifier::new("b", 0.7))
            .member("c", MockClassifier::new("c", 0.2))
            .voting(VotingMode::Soft)
            .build()
            .unwrap();

        let votes = ensemble.vote(Array2::zeros((2, 5)).view()).unwrap();

        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].label, Label::Positive);
        assert!((votes[0].confidence.unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_collect_rejects_wrong_feature_width() {
        let a: Arc<dyn Classifier> = Arc::new(MockClassifier {
            name: "a".into(),
            positive: 0.7,
            n_features: Some(4),
        });
        let ensemble = Ensemble::builder().member("a", a).build().unwrap();

        let err = ensemble.collect(Array2::zeros((1, 3)).view()).unwrap_err();
        assert!(matches!(err, Error::EnsembleConfiguration(_)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Probabilities with a good share of exact 0.5 ties
        fn probability() -> impl Strategy<Value = f64> {
            prop_oneof![1 => Just(0.5), 4 => 0.0f64..=1.0]
        }

        /// `(tensor, weights)` of random shape; labels drawn independently of
        /// the probabilities, as a disagreeing hard-vote member can produce
        fn tensor_and_weights() -> impl Strategy<Value = (PredictionTensor, Vec<f64>)> {
            (1usize..6, 1usize..8).prop_flat_map(|(samples, classifiers)| {
                (
                    prop::collection::vec(probability(), samples * classifiers),
                    prop::collection::vec(any::<bool>(), samples * classifiers),
                    prop::collection::vec(0.0f64..10.0, classifiers),
                )
                    .prop_map(move |(positive, votes, weights)| {
                        let probabilities =
                            Array3::from_shape_fn((samples, classifiers, 2), |(m, c, k)| {
                                let p = positive[m * classifiers + c];
                                if k == 1 {
                                    p
                                } else {
                                    1.0 - p
                                }
                            });
                        let labels = Array2::from_shape_fn((samples, classifiers), |(m, c)| {
                            if votes[m * classifiers + c] {
                                Label::Positive
                            } else {
                                Label::Negative
                            }
                        });
                        let tensor = PredictionTensor::new(probabilities, labels).unwrap();
                        (tensor, weights)
                    })
            })
        }

        proptest! {
            #[test]
            fn prop_collect_shape_and_normalized_rows(
                samples in 1usize..10,
                positives in prop::collection::vec(0.0f64..=1.0, 1..8),
            ) {
                let ensemble = positives
                    .iter()
                    .enumerate()
                    .fold(Ensemble::builder(), |builder, (c, &p)| {
                        let name = format!("m{}", c);
                        builder.member(name.clone(), MockClassifier::new(&name, p))
                    })
                    .build()
                    .unwrap();

                let features = Array2::<f64>::zeros((samples, 4));
                let tensor = ensemble.collect(features.view()).unwrap();

                prop_assert_eq!(tensor.shape(), (samples, positives.len(), 2));
                for m in 0..samples {
                    for c in 0..positives.len() {
                        let row = tensor.probabilities().slice(s![m, c, ..]);
                        prop_assert!((row.sum() - 1.0).abs() < 1e-9);
                    }
                    prop_assert_eq!(tensor.positive_column(m).to_vec(), positives.clone());
                }
            }

            #[test]
            fn prop_aggregate_is_deterministic((tensor, weights) in tensor_and_weights()) {
                for mode in [VotingMode::Hard, VotingMode::Soft] {
                    let first = aggregate(&tensor, mode, &weights).unwrap();
                    let second = aggregate(&tensor, mode, &weights).unwrap();
                    prop_assert_eq!(&first.labels, &second.labels);
                    prop_assert_eq!(
                        estimate_confidence(&first.labels, &first.sided_probabilities),
                        estimate_confidence(&second.labels, &second.sided_probabilities)
                    );
                }
            }

            #[test]
            fn prop_confidence_never_counts_exact_half((tensor, weights) in tensor_and_weights()) {
                let aggregation = aggregate(&tensor, VotingMode::Hard, &weights).unwrap();
                let confidences =
                    estimate_confidence(&aggregation.labels, &aggregation.sided_probabilities);

                let without_half: Vec<Vec<f64>> = aggregation
                    .sided_probabilities
                    .iter()
                    .map(|probs| probs.iter().copied().filter(|&p| p != 0.5).collect())
                    .collect();
                prop_assert_eq!(
                    &confidences,
                    &estimate_confidence(&aggregation.labels, &without_half)
                );

                for ((label, probs), confidence) in aggregation
                    .labels
                    .iter()
                    .zip(&aggregation.sided_probabilities)
                    .zip(&confidences)
                {
                    match (label, confidence) {
                        (Label::Positive, Some(c)) => prop_assert!(*c > 0.5),
                        (Label::Negative, Some(c)) => prop_assert!(*c < 0.5),
                        (_, None) => {}
                    }
                    if probs.iter().all(|&p| p == 0.5) {
                        prop_assert_eq!(*confidence, None);
                    }
                }
            }
        }
    }
}
