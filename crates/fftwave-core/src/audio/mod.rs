//! Audio input and spectral analysis
//!
//! The capture side writes signed 16-bit samples into a [`ring::SampleRing`];
//! the analysis side turns one full window into a [`MagnitudeSpectrum`].

pub mod analyzer;
#[cfg(feature = "audio")]
pub mod backend;
pub mod ring;
pub mod source;

/// One log-magnitude value (dB-like, `>= 0`) per logarithmic band.
pub type MagnitudeSpectrum = Vec<f64>;
