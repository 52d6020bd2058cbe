//! Moodwave Core
//!
//! Core types and utilities shared across Moodwave components.
//!
//! This crate provides:
//! - The error taxonomy and `Result` alias used by every library crate
//! - The raw headset recording model (timestamped band-power readings)
//! - The raw per-band series embedded in inference reports for charting

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Band, RawRecording, RawSeries, Reading, BANDS};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Band, RawRecording, RawSeries, Reading, BANDS};
}
