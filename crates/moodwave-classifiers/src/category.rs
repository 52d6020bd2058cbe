//! Ordinal emotion categories derived from a valence confidence

use serde::{Deserialize, Serialize};

/// Five-step valence scale, ordinals 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

/// Inclusive upper bounds for the first four categories
const THRESHOLDS: [(f64, EmotionCategory); 4] = [
    (0.20, EmotionCategory::VeryNegative),
    (0.40, EmotionCategory::Negative),
    (0.60, EmotionCategory::Neutral),
    (0.80, EmotionCategory::Positive),
];

impl EmotionCategory {
    /// All categories in ordinal order
    pub const ALL: [EmotionCategory; 5] = [
        Self::VeryNegative,
        Self::Negative,
        Self::Neutral,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Map a confidence fraction to its category.
    ///
    /// Bounds are inclusive: 0.20 is still `VeryNegative`. Anything above
    /// 0.80 (and NaN) lands in `VeryPositive`.
    pub fn from_confidence(confidence: f64) -> Self {
        THRESHOLDS
            .iter()
            .find(|(upper, _)| confidence <= *upper)
            .map(|(_, category)| *category)
            .unwrap_or(Self::VeryPositive)
    }

    /// Ordinal 1 (very negative) to 5 (very positive)
    pub fn ordinal(self) -> u8 {
        match self {
            Self::VeryNegative => 1,
            Self::Negative => 2,
            Self::Neutral => 3,
            Self::Positive => 4,
            Self::VeryPositive => 5,
        }
    }

    /// Category for an ordinal, `None` outside 1..=5
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal).checked_sub(1)?).copied()
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::VeryNegative => "very negative",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::VeryPositive => "very positive",
        }
    }
}

impl std::fmt::Display for EmotionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-number percentage for display.
///
/// Rounds half away from zero (`0.125` -> 13) after clamping to [0, 1].
/// Display only; categories are always derived from the fraction.
pub fn display_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// `(ordinal, name)` for a confidence fraction
pub fn map_to_category(confidence: f64) -> (u8, &'static str) {
    let category = EmotionCategory::from_confidence(confidence);
    (category.ordinal(), category.name())
}
