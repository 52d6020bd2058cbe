//! End-to-end inference: recording to report

use crate::ensemble::{Ensemble, VoteResult};
use crate::features::{FeatureSource, MinimalStatistics};
use crate::preprocessing::{CleanedBands, DEFAULT_WINDOW_SIZE};
use crate::report::{InferenceReport, ReportBuilder};
use moodwave_core::{Error, RawRecording, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Output of one inference cycle
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    /// Report handed to the caller and persisted
    pub report: InferenceReport,

    /// Per-window ensemble votes, in window order
    pub votes: Vec<VoteResult>,

    /// Wall-clock time spent in preprocessing and voting
    pub latency_us: u64,
}

/// Recording -> clean -> windows -> features -> ensemble -> report.
///
/// Holds only immutable state; one engine serves all requests concurrently.
pub struct InferenceEngine {
    ensemble: Arc<Ensemble>,
    features: Arc<dyn FeatureSource>,
    window_size: usize,
    report: ReportBuilder,
}

impl InferenceEngine {
    /// Create an engine.
    ///
    /// Fails when the feature source and the ensemble disagree on the
    /// feature-vector length.
    pub fn new(
        ensemble: Arc<Ensemble>,
        features: Arc<dyn FeatureSource>,
        window_size: usize,
        report: ReportBuilder,
    ) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::config("window size must be positive"));
        }
        if let Some(expected) = ensemble.n_features() {
            if expected != features.feature_count() {
                return Err(Error::ensemble(format!(
                    "feature source emits {} features, ensemble expects {}",
                    features.feature_count(),
                    expected
                )));
            }
        }

        Ok(Self {
            ensemble,
            features,
            window_size,
            report,
        })
    }

    /// Engine with band statistics, 8-reading windows and default report slots
    pub fn with_defaults(ensemble: Arc<Ensemble>) -> Result<Self> {
        Self::new(
            ensemble,
            Arc::new(MinimalStatistics::for_bands()),
            DEFAULT_WINDOW_SIZE,
            ReportBuilder::default(),
        )
    }

    /// Underlying ensemble
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Readings per analysis window
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Run one inference cycle over a recording
    #[instrument(skip_all, fields(readings = recording.len()))]
    pub fn infer(&self, recording: &RawRecording) -> Result<InferenceOutcome> {
        let start = Instant::now();

        let cleaned = CleanedBands::from_recording(recording);
        let windows = cleaned.windows(self.window_size)?;
        if windows.len() < self.report.min_windows() {
            return Err(Error::InsufficientSamples {
                required: self.report.min_windows(),
                available: windows.len(),
            });
        }

        let features = self.features.extract(&windows)?;
        let votes = self.ensemble.vote(features.view())?;

        let labels: Vec<_> = votes.iter().map(|v| v.label).collect();
        let confidences: Vec<_> = votes.iter().map(|v| v.confidence).collect();
        let report = self
            .report
            .build(&confidences, &labels, recording.series())?;

        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            windows = votes.len(),
            latency_us,
            vote0 = report.overall.percent,
            "Inference complete"
        );

        Ok(InferenceOutcome {
            report,
            votes,
            latency_us,
        })
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("ensemble", &self.ensemble)
            .field("feature_count", &self.features.feature_count())
            .field("window_size", &self.window_size)
            .field("report", &self.report)
            .finish()
    }
}
