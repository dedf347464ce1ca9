//! Spectral Analyzer - DFT with logarithmic band binning
//!
//! One analysis cycle takes a full `2^chunk_power` sample window, runs a
//! forward FFT, and folds the linear magnitude bins into `bin_count`
//! logarithmically spaced bands between `min_hz` and `max_hz`.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::audio::MagnitudeSpectrum;
use crate::config::Config;
use crate::{ensure_range, CoreError, Result};

/// Configuration for [`SpectralAnalyzer`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Sample rate of the captured audio
    pub sample_rate: u32,
    /// Window length is `2^chunk_power`
    pub chunk_power: u32,
    /// Number of logarithmic output bands
    pub bin_count: usize,
    /// Lower edge of the first band
    pub min_hz: f64,
    /// Upper edge of the last band
    pub max_hz: f64,
    /// Apply a Hann window before the transform
    pub use_hann_window: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AnalyzerConfig {
    fn from(config: &Config) -> Self {
        Self {
            sample_rate: config.sample_rate,
            chunk_power: config.fft.chunk_power,
            bin_count: config.fft.bin_count,
            min_hz: config.display.min_hz,
            max_hz: config.display.max_hz,
            use_hann_window: config.fft.use_hann_window,
        }
    }
}

impl AnalyzerConfig {
    /// Window length in samples
    pub fn chunk_size(&self) -> usize {
        1usize << self.chunk_power
    }
}

/// Band edges `[min_hz, max_hz]` split into `bin_count` logarithmic bands.
///
/// Returns `bin_count + 1` strictly increasing edges whose first and last
/// entries are exactly `min_hz` and `max_hz`.
pub fn calculate_bands(min_hz: f64, max_hz: f64, bin_count: usize) -> Result<Vec<f64>> {
    ensure_range("band frequency", min_hz, max_hz)?;
    if min_hz <= 0.0 {
        return Err(CoreError::InvalidConfig(format!(
            "min_hz must be positive, got {}",
            min_hz
        )));
    }
    if bin_count == 0 {
        return Err(CoreError::InvalidConfig(
            "bin_count must be at least 1".to_string(),
        ));
    }

    let low = min_hz.log10();
    let step = (max_hz.log10() - low) / bin_count as f64;

    let mut bands: Vec<f64> = (0..=bin_count)
        .map(|k| 10f64.powf(low + k as f64 * step))
        .collect();
    bands[0] = min_hz;
    bands[bin_count] = max_hz;
    Ok(bands)
}

/// Mapping from logarithmic bands to linear FFT bin positions
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    /// Rounded bin index of every band edge, clamped to `[1, chunk_size / 2]`
    pub bins: Vec<usize>,
    /// Exact (fractional) bin position of every band edge
    pub floating: Vec<f64>,
}

impl BandLayout {
    /// Number of bands described by the layout
    pub fn band_count(&self) -> usize {
        self.bins.len().saturating_sub(1)
    }
}

/// Translate band edges in Hz into FFT bin positions for a given window length.
pub fn calculate_bins(
    min_hz: f64,
    max_hz: f64,
    bin_count: usize,
    sample_rate: u32,
    chunk_size: usize,
) -> Result<BandLayout> {
    let bands = calculate_bands(min_hz, max_hz, bin_count)?;
    let nyquist_bin = (chunk_size / 2).max(1);

    let floating: Vec<f64> = bands
        .iter()
        .map(|hz| chunk_size as f64 * hz / sample_rate as f64)
        .collect();
    let bins = floating
        .iter()
        .map(|pos| (pos.round() as usize).clamp(1, nyquist_bin))
        .collect();

    Ok(BandLayout { bins, floating })
}

/// Largest absolute value in `data[start..end]` (0 for an empty range)
fn max_from_range(data: &[f64], start: usize, end: usize) -> f64 {
    data[start..end]
        .iter()
        .fold(0.0f64, |acc, value| acc.max(value.abs()))
}

/// `20 * log10(magnitude)`, with silence (and anything below 0 dB) mapped to 0.
#[inline]
fn to_decibels(magnitude: f64) -> f64 {
    if magnitude.is_finite() && magnitude > 0.0 {
        (20.0 * magnitude.log10()).max(0.0)
    } else {
        0.0
    }
}

/// Fold linear magnitudes into logarithmic bands.
///
/// Bands spanning at most one linear bin are linearly interpolated between the
/// two neighbouring bins; wider bands take the maximum of the bins they span.
pub fn fft_to_bins(layout: &BandLayout, magnitudes: &[f64], out: &mut [f64]) {
    let last = magnitudes.len().saturating_sub(1);

    for (i, value) in out.iter_mut().enumerate().take(layout.band_count()) {
        let (start, end) = (layout.bins[i], layout.bins[i + 1]);

        let peak = if end.saturating_sub(start) <= 1 {
            let position = layout.floating[i].max(0.0);
            let lower = (position.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let fraction = position.fract();
            (magnitudes[lower] * (1.0 - fraction) + magnitudes[upper] * fraction).abs()
        } else {
            max_from_range(magnitudes, start.min(last), end.min(last + 1))
        };

        *value = to_decibels(peak);
    }
}

/// Spectral analyzer with a pre-planned FFT and reusable buffers
pub struct SpectralAnalyzer {
    /// FFT instance
    fft: Arc<dyn Fft<f64>>,

    /// Configuration
    config: AnalyzerConfig,

    /// Band edge to bin mapping
    layout: BandLayout,

    /// FFT complex buffer
    fft_buffer: Vec<Complex<f64>>,

    /// FFT scratch buffer
    scratch_buffer: Vec<Complex<f64>>,

    /// Hann window coefficients (empty when disabled)
    window: Vec<f64>,

    /// Magnitudes of bins `0..=N/2`
    magnitude_buffer: Vec<f64>,

    /// Debug: analysis count
    cycle_count: u64,
}

impl SpectralAnalyzer {
    /// Create an analyzer, validating the band configuration.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        if !(1..=24).contains(&config.chunk_power) {
            return Err(CoreError::InvalidConfig(format!(
                "chunk_power {} out of range",
                config.chunk_power
            )));
        }
        let nyquist = config.sample_rate as f64 / 2.0;
        if config.max_hz > nyquist {
            return Err(CoreError::InvalidConfig(format!(
                "max_hz {} exceeds the Nyquist frequency {}",
                config.max_hz, nyquist
            )));
        }

        let chunk_size = config.chunk_size();
        let layout = calculate_bins(
            config.min_hz,
            config.max_hz,
            config.bin_count,
            config.sample_rate,
            chunk_size,
        )?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(chunk_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let window = if config.use_hann_window {
            hann_window(chunk_size)
        } else {
            Vec::new()
        };

        debug!(
            "SpectralAnalyzer created: sample_rate={}, chunk_size={}, bins={}, range={}..{} Hz",
            config.sample_rate, chunk_size, config.bin_count, config.min_hz, config.max_hz
        );

        Ok(Self {
            fft,
            layout,
            fft_buffer: vec![Complex::new(0.0, 0.0); chunk_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
            window,
            magnitude_buffer: vec![0.0; chunk_size / 2 + 1],
            cycle_count: 0,
            config,
        })
    }

    /// Turn one sample window into a log-magnitude spectrum.
    pub fn analyze(&mut self, window: &[i16]) -> Result<MagnitudeSpectrum> {
        let mut out = vec![0.0; self.config.bin_count];
        self.analyze_into(window, &mut out)?;
        Ok(out)
    }

    /// [`analyze`](Self::analyze) writing into a caller-owned spectrum.
    pub fn analyze_into(&mut self, window: &[i16], out: &mut [f64]) -> Result<()> {
        let expected = self.config.chunk_size();
        if window.len() != expected {
            return Err(CoreError::InvalidWindowSize {
                expected,
                actual: window.len(),
            });
        }
        if out.len() != self.config.bin_count {
            return Err(CoreError::InvalidConfig(format!(
                "spectrum buffer holds {} bands, analyzer produces {}",
                out.len(),
                self.config.bin_count
            )));
        }

        self.cycle_count += 1;

        for (i, (slot, &sample)) in self.fft_buffer.iter_mut().zip(window).enumerate() {
            let weight = self.window.get(i).copied().unwrap_or(1.0);
            *slot = Complex::new(sample as f64 * weight, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        for (magnitude, bin) in self.magnitude_buffer.iter_mut().zip(&self.fft_buffer) {
            *magnitude = bin.norm();
        }

        fft_to_bins(&self.layout, &self.magnitude_buffer, out);

        if self.cycle_count % 100 == 0 {
            trace!("Analysis #{}: bands={:?}", self.cycle_count, &out[..out.len().min(3)]);
        }

        Ok(())
    }

    /// Band layout in use
    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Current configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Number of windows analysed so far
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}

fn hann_window(size: usize) -> Vec<f64> {
    let denominator = (size.max(2) - 1) as f64;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / denominator).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sine_window(freq: f64, sample_rate: f64, len: usize, amplitude: f64) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate;
                (phase.sin() * amplitude) as i16
            })
            .collect()
    }

    #[test]
    fn test_default_bands() {
        let bands = calculate_bands(36.0, 20000.0, 64).unwrap();
        assert_eq!(bands.len(), 65);
        assert_eq!(bands[0], 36.0);
        assert_eq!(bands[64], 20000.0);
    }

    #[test]
    fn test_bands_reject_bad_input() {
        assert!(calculate_bands(100.0, 100.0, 8).is_err());
        assert!(calculate_bands(0.0, 100.0, 8).is_err());
        assert!(calculate_bands(10.0, 100.0, 0).is_err());
    }

    #[test]
    fn test_bins_are_contiguous_and_clamped() {
        let layout = calculate_bins(36.0, 20000.0, 64, 44100, 8192).unwrap();
        assert_eq!(layout.bins.len(), 65);
        assert!(layout.bins.windows(2).all(|w| w[0] <= w[1]));
        assert!(layout.bins.iter().all(|&b| (1..=4096).contains(&b)));
        // 36 Hz at 8192 / 44100 is bin ~6.7
        assert_eq!(layout.bins[0], 7);
    }

    #[test]
    fn test_wrong_window_size() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let result = analyzer.analyze(&[0i16; 1024]);
        assert!(matches!(
            result,
            Err(CoreError::InvalidWindowSize {
                expected: 8192,
                actual: 1024
            })
        ));
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let spectrum = analyzer.analyze(&vec![0i16; 8192]).unwrap();
        assert_eq!(spectrum.len(), 64);
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_peaks_in_matching_band() {
        let config = AnalyzerConfig::default();
        let layout = calculate_bins(
            config.min_hz,
            config.max_hz,
            config.bin_count,
            config.sample_rate,
            config.chunk_size(),
        )
        .unwrap();
        let mut analyzer = SpectralAnalyzer::new(config).unwrap();

        let freq = 1000.0;
        let window = sine_window(freq, 44100.0, 8192, 8000.0);
        let spectrum = analyzer.analyze(&window).unwrap();

        let peak_band = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let bin = freq * 8192.0 / 44100.0;
        let expected_band = layout
            .floating
            .windows(2)
            .position(|w| w[0] <= bin && bin < w[1])
            .unwrap();
        assert!(
            (peak_band as i64 - expected_band as i64).abs() <= 1,
            "peak in band {}, expected near {}",
            peak_band,
            expected_band
        );
        // 8000 * 8192 / 2 ~ 3.3e7 -> roughly 150 dB
        assert!(spectrum[peak_band] > 140.0);
    }

    #[test]
    fn test_hann_window_keeps_output_finite() {
        let config = AnalyzerConfig {
            use_hann_window: true,
            ..AnalyzerConfig::default()
        };
        let mut analyzer = SpectralAnalyzer::new(config).unwrap();
        let window = sine_window(440.0, 44100.0, 8192, i16::MAX as f64);
        let spectrum = analyzer.analyze(&window).unwrap();
        assert!(spectrum.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn test_rejects_max_hz_above_nyquist() {
        let config = AnalyzerConfig {
            sample_rate: 16000,
            ..AnalyzerConfig::default()
        };
        assert!(SpectralAnalyzer::new(config).is_err());
    }

    proptest! {
        #[test]
        fn prop_band_edges_strictly_increasing(
            min_hz in 1.0f64..1000.0,
            span in 1.0f64..20000.0,
            bin_count in 1usize..256,
        ) {
            let max_hz = min_hz + span;
            let bands = calculate_bands(min_hz, max_hz, bin_count).unwrap();
            prop_assert_eq!(bands.len(), bin_count + 1);
            prop_assert_eq!(bands[0], min_hz);
            prop_assert_eq!(bands[bin_count], max_hz);
            prop_assert!(bands.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn prop_output_never_negative_or_nan(samples in proptest::collection::vec(any::<i16>(), 256)) {
            let config = AnalyzerConfig {
                chunk_power: 8,
                bin_count: 16,
                ..AnalyzerConfig::default()
            };
            let mut analyzer = SpectralAnalyzer::new(config).unwrap();
            let spectrum = analyzer.analyze(&samples).unwrap();
            prop_assert!(spectrum.iter().all(|v| v.is_finite() && *v >= 0.0));
        }
    }
}
