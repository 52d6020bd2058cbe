//! Inference report assembly

use crate::category::{display_percent, EmotionCategory};
use crate::classifier::Label;
use moodwave_core::{Error, RawSeries, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

/// Default number of per-window vote slots (five 8-second windows per capture)
pub const DEFAULT_WINDOW_VOTES: usize = 5;

/// One displayed vote: percentage plus category.
///
/// Serializes as `[percent, ordinal, name]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VoteTuple", try_from = "VoteTuple")]
pub struct VoteEntry {
    pub percent: u8,
    pub category: EmotionCategory,
}

type VoteTuple = (u8, u8, String);

impl VoteEntry {
    /// Entry for a confidence fraction
    pub fn from_confidence(confidence: f64) -> Self {
        Self {
            percent: display_percent(confidence),
            category: EmotionCategory::from_confidence(confidence),
        }
    }
}

impl From<VoteEntry> for VoteTuple {
    fn from(entry: VoteEntry) -> Self {
        (
            entry.percent,
            entry.category.ordinal(),
            entry.category.name().to_string(),
        )
    }
}

impl TryFrom<VoteTuple> for VoteEntry {
    type Error = String;

    fn try_from((percent, ordinal, _name): VoteTuple) -> std::result::Result<Self, Self::Error> {
        let category = EmotionCategory::from_ordinal(ordinal)
            .ok_or_else(|| format!("unknown category ordinal {}", ordinal))?;
        Ok(Self { percent, category })
    }
}

/// Vote for one analysis window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowVote {
    /// Zero-based window index
    pub window: usize,

    /// Consensus label of the window
    pub label: Label,

    /// Side-filtered confidence, absent when undefined
    pub confidence: Option<f64>,

    /// Display entry, absent when the confidence is undefined
    pub entry: Option<VoteEntry>,
}

/// Result of one inference request. Not mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReport {
    /// Consensus over all windows (`vote0`)
    pub overall: VoteEntry,

    /// Mean of the defined window confidences
    pub overall_confidence: f64,

    /// Leading window votes (`vote1`, `vote2`, ...)
    pub windows: Vec<WindowVote>,

    /// Total analysis windows voted on
    pub windows_total: usize,

    /// Windows whose confidence was undefined
    pub windows_undefined: usize,

    /// Unmodified recording columns for charting
    pub series: RawSeries,
}

impl InferenceReport {
    /// Scalar summary persisted next to the report
    pub fn summary(&self) -> String {
        self.overall.percent.to_string()
    }
}

/// Builds reports from per-window ensemble output
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    window_votes: usize,
    min_windows: usize,
}

impl ReportBuilder {
    /// `window_votes` slots, at least `min_windows` (never below one) windows required
    pub fn new(window_votes: usize, min_windows: usize) -> Self {
        Self {
            window_votes,
            min_windows: min_windows.max(1),
        }
    }

    /// Number of per-window vote slots
    pub fn window_votes(&self) -> usize {
        self.window_votes
    }

    /// Minimum windows a report needs
    pub fn min_windows(&self) -> usize {
        self.min_windows
    }

    /// Assemble a report.
    ///
    /// `vote0` is the mean of every defined window confidence; windows with
    /// an undefined confidence are left out of that mean and shown as empty
    /// slots. Fewer windows than slots yields fewer slots.
    pub fn build(
        &self,
        confidences: &[Option<f64>],
        labels: &[Label],
        series: RawSeries,
    ) -> Result<InferenceReport> {
        if confidences.len() != labels.len() {
            return Err(Error::ensemble(format!(
                "{} confidences for {} labels",
                confidences.len(),
                labels.len()
            )));
        }

        let available = confidences.len();
        if available < self.min_windows {
            return Err(Error::InsufficientSamples {
                required: self.min_windows,
                available,
            });
        }

        let defined: Vec<f64> = confidences.iter().flatten().copied().collect();
        if defined.is_empty() {
            return Err(Error::UndefinedConfidence { windows: available });
        }
        let overall_confidence = defined.iter().sum::<f64>() / defined.len() as f64;

        if available < self.window_votes {
            warn!(
                available,
                slots = self.window_votes,
                "Fewer windows than vote slots"
            );
        }

        let windows: Vec<WindowVote> = confidences
            .iter()
            .zip(labels)
            .take(self.window_votes)
            .enumerate()
            .map(|(window, (confidence, label))| WindowVote {
                window,
                label: *label,
                confidence: *confidence,
                entry: confidence.map(VoteEntry::from_confidence),
            })
            .collect();

        let windows_undefined = available - defined.len();
        debug!(
            available,
            windows_undefined, overall_confidence, "Built inference report"
        );

        Ok(InferenceReport {
            overall: VoteEntry::from_confidence(overall_confidence),
            overall_confidence,
            windows,
            windows_total: available,
            windows_undefined,
            series,
        })
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_VOTES, 1)
    }
}

/// `vote0`, `vote1`, ... as flat keys
struct VoteSlots<'a> {
    overall: &'a VoteEntry,
    windows: &'a [WindowVote],
}

impl Serialize for VoteSlots<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.windows.len() + 1))?;
        map.serialize_entry("vote0", self.overall)?;
        for window in self.windows {
            map.serialize_entry(&format!("vote{}", window.window + 1), &window.entry)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct ReportWire<'a> {
    #[serde(flatten)]
    votes: VoteSlots<'a>,
    confidence: f64,
    windows: &'a [WindowVote],
    windows_total: usize,
    windows_undefined: usize,
    #[serde(flatten)]
    series: &'a RawSeries,
}

impl Serialize for InferenceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ReportWire {
            votes: VoteSlots {
                overall: &self.overall,
                windows: &self.windows,
            },
            confidence: self.overall_confidence,
            windows: &self.windows,
            windows_total: self.windows_total,
            windows_undefined: self.windows_undefined,
            series: &self.series,
        }
        .serialize(serializer)
    }
}
