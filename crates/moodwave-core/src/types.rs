//! Core types for Moodwave

use crate::error::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Number of values the headset emits per reading
/// (attention, meditation, then the eight power bands)
pub const VALUES_PER_READING: usize = 10;

/// EEG power bands reported by the headset, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    Delta,
    Theta,
    LowAlpha,
    HighAlpha,
    LowBeta,
    HighBeta,
    LowGamma,
    HighGamma,
}

/// All bands in wire order
pub const BANDS: [Band; 8] = [
    Band::Delta,
    Band::Theta,
    Band::LowAlpha,
    Band::HighAlpha,
    Band::LowBeta,
    Band::HighBeta,
    Band::LowGamma,
    Band::HighGamma,
];

impl Band {
    /// Column name used in recordings and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Theta => "theta",
            Self::LowAlpha => "lowAlpha",
            Self::HighAlpha => "highAlpha",
            Self::LowBeta => "lowBeta",
            Self::HighBeta => "highBeta",
            Self::LowGamma => "lowGamma",
            Self::HighGamma => "highGamma",
        }
    }
}

/// One timestamped headset reading
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Timestamp key as sent by the headset
    pub time: String,

    /// eSense attention meter
    pub attention: Option<f64>,

    /// eSense meditation meter
    pub meditation: Option<f64>,

    /// Band powers in `BANDS` order
    pub bands: [Option<f64>; 8],
}

impl Reading {
    /// Build a reading from the ten wire values
    pub fn from_values(time: impl Into<String>, values: &[Option<f64>]) -> Result<Self> {
        let time = time.into();
        if values.len() != VALUES_PER_READING {
            return Err(Error::recording(format!(
                "reading at '{}' has {} values, expected {}",
                time,
                values.len(),
                VALUES_PER_READING
            )));
        }

        let mut bands = [None; 8];
        bands.copy_from_slice(&values[2..]);

        Ok(Self {
            time,
            attention: values[0],
            meditation: values[1],
            bands,
        })
    }

    /// Band powers if every band is present and non-zero
    pub fn usable_bands(&self) -> Option<[f64; 8]> {
        let mut out = [0.0; 8];
        for (slot, value) in out.iter_mut().zip(self.bands.iter()) {
            match value {
                Some(v) if *v != 0.0 && v.is_finite() => *slot = *v,
                _ => return None,
            }
        }
        Some(out)
    }
}

/// A full headset capture, in the order the readings were recorded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecording {
    readings: Vec<Reading>,
}

impl RawRecording {
    /// Create a recording from already parsed readings
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    /// Parse the headset capture document.
    ///
    /// The document is a JSON object mapping a timestamp to ten values.
    /// Values may be numbers, numeric strings or `null`.
    pub fn from_json(json: &str) -> Result<Self> {
        let recording: RawRecording = serde_json::from_str(json).map_err(|e| {
            if e.is_data() || e.is_syntax() || e.is_eof() {
                Error::recording(e.to_string())
            } else {
                Error::Serialization(e)
            }
        })?;
        debug!(readings = recording.len(), "Parsed headset recording");
        Ok(recording)
    }

    /// All readings in capture order
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Number of readings
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the recording holds no readings
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Unmodified per-column series for charting
    pub fn series(&self) -> RawSeries {
        let mut series = RawSeries::default();
        for reading in &self.readings {
            series.feat_time.push(reading.time.clone());
            series.attention.push(reading.attention);
            series.meditation.push(reading.meditation);
            series.delta.push(reading.bands[0]);
            series.theta.push(reading.bands[1]);
            series.low_alpha.push(reading.bands[2]);
            series.high_alpha.push(reading.bands[3]);
            series.low_beta.push(reading.bands[4]);
            series.high_beta.push(reading.bands[5]);
            series.low_gamma.push(reading.bands[6]);
            series.high_gamma.push(reading.bands[7]);
        }
        series
    }
}

impl<'de> Deserialize<'de> for RawRecording {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RecordingVisitor)
    }
}

struct RecordingVisitor;

impl<'de> Visitor<'de> for RecordingVisitor {
    type Value = RawRecording;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of timestamp to ten headset values")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut readings: Vec<Reading> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut positions: HashMap<String, usize> = HashMap::new();
        while let Some((time, values)) = map.next_entry::<String, Vec<WireValue>>()? {
            let values: Vec<Option<f64>> = values.into_iter().map(WireValue::into_f64).collect();
            let reading = Reading::from_values(time, &values).map_err(de::Error::custom)?;

            // A repeated timestamp overwrites the earlier reading in its original slot
            match positions.get(&reading.time) {
                Some(&idx) => {
                    debug!(time = %reading.time, "Replacing reading with repeated timestamp");
                    readings[idx] = reading;
                }
                None => {
                    positions.insert(reading.time.clone(), readings.len());
                    readings.push(reading);
                }
            }
        }
        Ok(RawRecording { readings })
    }
}

/// A single value as the headset bridge writes it
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Number(f64),
    Text(String),
    Null(()),
}

impl WireValue {
    fn into_f64(self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null(()) => None,
        }
    }
}

/// Raw per-column series passed through to clients for charting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub feat_time: Vec<String>,
    pub attention: Vec<Option<f64>>,
    pub meditation: Vec<Option<f64>>,
    pub delta: Vec<Option<f64>>,
    pub theta: Vec<Option<f64>>,
    #[serde(rename = "lowAlpha")]
    pub low_alpha: Vec<Option<f64>>,
    #[serde(rename = "highAlpha")]
    pub high_alpha: Vec<Option<f64>>,
    #[serde(rename = "lowBeta")]
    pub low_beta: Vec<Option<f64>>,
    #[serde(rename = "highBeta")]
    pub high_beta: Vec<Option<f64>>,
    #[serde(rename = "lowGamma")]
    pub low_gamma: Vec<Option<f64>>,
    #[serde(rename = "highGamma")]
    pub high_gamma: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_capture_order() {
        let json = r#"{
            "1585000002.5": ["40", "60", "100", "200", "300", "400", "500", "600", "700", "800"],
            "1585000001.5": [41, 61, 101, 201, 301, 401, 501, 601, 701, 801]
        }"#;

        let recording = RawRecording::from_json(json).unwrap();

        assert_eq!(recording.len(), 2);
        assert_eq!(recording.readings()[0].time, "1585000002.5");
        assert_eq!(recording.readings()[0].bands[0], Some(100.0));
        assert_eq!(recording.readings()[1].attention, Some(41.0));
    }

    #[test]
    fn test_repeated_timestamp_keeps_last_value_in_first_slot() {
        let json = r#"{
            "1585000001.5": [1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            "1585000002.5": [2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
            "1585000001.5": [3, 3, 3, 3, 3, 3, 3, 3, 3, 3]
        }"#;

        let recording = RawRecording::from_json(json).unwrap();

        assert_eq!(recording.len(), 2);
        assert_eq!(recording.readings()[0].time, "1585000001.5");
        assert_eq!(recording.readings()[0].attention, Some(3.0));
        assert_eq!(recording.readings()[1].attention, Some(2.0));
        assert_eq!(recording.series().feat_time.len(), 2);
    }

    #[test]
    fn test_null_and_garbage_values_are_missing() {
        let json = r#"{"t": [1, 2, null, "x", 3, 4, 5, 6, 7, 8]}"#;
        let recording = RawRecording::from_json(json).unwrap();
        let reading = &recording.readings()[0];

        assert_eq!(reading.bands[0], None);
        assert_eq!(reading.bands[1], None);
        assert!(reading.usable_bands().is_none());
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let json = r#"{"t": [1, 2, 3]}"#;
        let err = RawRecording::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidRecording(_)));
    }

    #[test]
    fn test_zero_band_is_not_usable() {
        let values: Vec<Option<f64>> = vec![
            Some(1.0),
            Some(1.0),
            Some(5.0),
            Some(0.0),
            Some(5.0),
            Some(5.0),
            Some(5.0),
            Some(5.0),
            Some(5.0),
            Some(5.0),
        ];
        let reading = Reading::from_values("t", &values).unwrap();
        assert!(reading.usable_bands().is_none());
    }

    #[test]
    fn test_series_passes_through_missing_values() {
        let json = r#"{"a": [0, 0, 1, 2, 3, 4, 5, 6, 7, null]}"#;
        let series = RawRecording::from_json(json).unwrap().series();

        assert_eq!(series.feat_time, vec!["a".to_string()]);
        assert_eq!(series.attention, vec![Some(0.0)]);
        assert_eq!(series.high_gamma, vec![None]);

        let value = serde_json::to_value(&series).unwrap();
        assert!(value.get("lowAlpha").is_some());
        assert!(value["highGamma"][0].is_null());
    }

    #[test]
    fn test_band_names_match_wire_columns() {
        let names: Vec<_> = BANDS.iter().map(Band::name).collect();
        assert_eq!(
            names,
            vec!["delta", "theta", "lowAlpha", "highAlpha", "lowBeta", "highBeta", "lowGamma", "highGamma"]
        );
    }
}
