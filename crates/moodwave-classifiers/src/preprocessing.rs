//! Recording cleanup and analysis-window slicing

use moodwave_core::{Error, RawRecording, Result, BANDS};
use ndarray::{s, Array2, ArrayView2};
use tracing::debug;

/// Readings per analysis window (8 seconds at one reading per second)
pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Band-power rows that survived cleaning, shape `readings x 8`
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedBands {
    rows: Array2<f64>,
}

impl CleanedBands {
    /// Keep the band columns of readings that have every band present and non-zero
    pub fn from_recording(recording: &RawRecording) -> Self {
        let usable: Vec<[f64; 8]> = recording
            .readings()
            .iter()
            .filter_map(|r| r.usable_bands())
            .collect();

        let mut rows = Array2::zeros((usable.len(), BANDS.len()));
        for (i, bands) in usable.iter().enumerate() {
            for (j, value) in bands.iter().enumerate() {
                rows[[i, j]] = *value;
            }
        }

        debug!(
            total = recording.len(),
            kept = usable.len(),
            "Cleaned recording"
        );

        Self { rows }
    }

    /// Number of usable readings
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    /// Whether no reading survived cleaning
    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    /// Raw band matrix
    pub fn rows(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }

    /// Slice into consecutive windows of `size` readings.
    ///
    /// The `len % size` oldest readings are dropped so that the windows end
    /// on the most recent reading.
    pub fn windows(&self, size: usize) -> Result<Vec<ArrayView2<'_, f64>>> {
        if size == 0 {
            return Err(Error::config("window size must be positive"));
        }

        let count = self.len() / size;
        let skip = self.len() % size;

        Ok((0..count)
            .map(|i| {
                let start = skip + i * size;
                self.rows.slice(s![start..start + size, ..])
            })
            .collect())
    }
}
