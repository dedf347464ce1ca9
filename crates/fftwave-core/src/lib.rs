//! fftwave Core - Signal Model and Data Structures
//!
//! This crate contains the numeric half of the visualizer pipeline:
//! - Sample ring buffer shared between capture and analysis
//! - Spectral analysis (DFT + logarithmic band binning)
//! - Temporal smoothing, falling dots and the sound energy history
//! - Colors and palettes
//! - Configuration and logging settings

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod color;
pub mod config;
pub mod history;
pub mod logging;
pub mod palettes;
pub mod smoothing;

// --- Re-exports grouped by category ---

// Audio System
pub use audio::analyzer::{
    calculate_bands, calculate_bins, AnalyzerConfig, BandLayout, SpectralAnalyzer,
};
#[cfg(feature = "audio")]
pub use audio::backend::CpalSource;
pub use audio::ring::SampleRing;
pub use audio::source::{AudioSource, SweepSource};
pub use audio::MagnitudeSpectrum;

// Smoothing & History
pub use history::{EnergySample, SoundEnergyHistory};
pub use smoothing::{DotState, SmootherOutput, SmootherSettings, TemporalSmoother};

// Colors
pub use color::{HueRotation, Rgba};
pub use palettes::{palette_indexes, palette_offset_wrap, Palette, PaletteBank};

// Configuration & Logging
pub use config::{Config, EnergyMode};
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A sample window did not have the length the analyzer was planned for
    #[error("Invalid window size: expected {expected} samples, got {actual}")]
    InvalidWindowSize {
        /// Planned window length
        expected: usize,
        /// Received window length
        actual: usize,
    },

    /// A configured value range is empty or inverted
    #[error("Invalid range for {name}: min {min} must be below max {max}")]
    InvalidRange {
        /// Name of the configured range
        name: &'static str,
        /// Configured lower bound
        min: f64,
        /// Configured upper bound
        max: f64,
    },

    /// Any other invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Audio device or stream failure
    #[error("Audio error: {0}")]
    Audio(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// WAV writing failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Fail with [`CoreError::InvalidRange`] unless `min < max`.
///
/// Every `(value - min) / (max - min)` normalisation in the pipeline goes
/// through a range checked here at initialisation time.
pub fn ensure_range(name: &'static str, min: f64, max: f64) -> Result<()> {
    if min.is_finite() && max.is_finite() && max > min {
        Ok(())
    } else {
        Err(CoreError::InvalidRange { name, min, max })
    }
}

/// Normalise `value` into `[0, 1]` against a range validated with [`ensure_range`].
#[inline]
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_range() {
        assert!(ensure_range("display", 110.0, 155.0).is_ok());
        assert!(matches!(
            ensure_range("display", 110.0, 110.0),
            Err(CoreError::InvalidRange { name: "display", .. })
        ));
        assert!(ensure_range("display", 155.0, 110.0).is_err());
        assert!(ensure_range("display", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_normalize_clamps() {
        assert_eq!(normalize(100.0, 110.0, 155.0), 0.0);
        assert_eq!(normalize(200.0, 110.0, 155.0), 1.0);
        assert!((normalize(132.5, 110.0, 155.0) - 0.5).abs() < 1e-9);
    }
}
