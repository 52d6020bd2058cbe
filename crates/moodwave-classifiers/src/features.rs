//! Feature extraction from analysis windows

use crate::classifier::FeatureMatrix;
use moodwave_core::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Produces one fixed-length feature vector per analysis window
pub trait FeatureSource: Send + Sync {
    /// Length of every feature vector this source emits
    fn feature_count(&self) -> usize;

    /// Feature matrix with one row per window
    fn extract(&self, windows: &[ArrayView2<'_, f64>]) -> Result<FeatureMatrix>;

    /// Human readable feature names, in column order
    fn feature_names(&self) -> Vec<String>;
}

/// Per-column summary statistics emitted by [`MinimalStatistics`]
pub const STATISTICS: [&str; 8] = [
    "sum_values",
    "median",
    "mean",
    "length",
    "standard_deviation",
    "variance",
    "maximum",
    "minimum",
];

/// Eight summary statistics per input column.
///
/// Column-major layout: all statistics of column 0, then column 1, and so
/// on. Deviation and variance are population (ddof = 0) values.
#[derive(Debug, Clone)]
pub struct MinimalStatistics {
    columns: Vec<String>,
}

impl MinimalStatistics {
    /// Statistics over the eight headset bands
    pub fn for_bands() -> Self {
        Self {
            columns: moodwave_core::BANDS
                .iter()
                .map(|b| b.name().to_string())
                .collect(),
        }
    }

    /// Statistics over arbitrary named columns
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn summarize(column: ArrayView1<'_, f64>, out: &mut [f64]) {
        let n = column.len() as f64;
        let sum = column.sum();
        let mean = sum / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = column.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        out[0] = sum;
        out[1] = median;
        out[2] = mean;
        out[3] = n;
        out[4] = variance.sqrt();
        out[5] = variance;
        out[6] = sorted[sorted.len() - 1];
        out[7] = sorted[0];
    }
}

impl Default for MinimalStatistics {
    fn default() -> Self {
        Self::for_bands()
    }
}

impl FeatureSource for MinimalStatistics {
    fn feature_count(&self) -> usize {
        self.columns.len() * STATISTICS.len()
    }

    fn extract(&self, windows: &[ArrayView2<'_, f64>]) -> Result<FeatureMatrix> {
        let mut features = Array2::zeros((windows.len(), self.feature_count()));

        for (row, window) in windows.iter().enumerate() {
            if window.ncols() != self.columns.len() {
                return Err(Error::recording(format!(
                    "window {} has {} columns, expected {}",
                    row,
                    window.ncols(),
                    self.columns.len()
                )));
            }
            if window.nrows() == 0 {
                return Err(Error::recording(format!("window {} is empty", row)));
            }

            let mut out = features.row_mut(row);
            let out = out
                .as_slice_mut()
                .ok_or_else(|| Error::recording("feature row is not contiguous"))?;
            for (col, column) in window.axis_iter(Axis(1)).enumerate() {
                let start = col * STATISTICS.len();
                Self::summarize(column, &mut out[start..start + STATISTICS.len()]);
            }
        }

        Ok(features)
    }

    fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| STATISTICS.iter().map(move |s| format!("{}__{}", c, s)))
            .collect()
    }
}
