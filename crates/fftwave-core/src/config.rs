//! Configuration loaded from a TOML file
//!
//! Every section falls back to its defaults, so an empty file (or no file at
//! all) gives the stock 128×64 setup.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::logging::LogConfig;
use crate::{ensure_range, CoreError, Result};

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Analysis settings
    pub fft: FftConfig,
    /// Bar display settings
    pub display: DisplayConfig,
    /// Peak marker settings
    pub white_dot: WhiteDotConfig,
    /// Sound energy history settings
    pub sound_energy: SoundEnergyConfig,
    /// LED matrix geometry
    pub matrix: MatrixConfig,
    /// DMX input
    pub dmx: DmxConfig,
    /// Logging
    pub log: LogConfig,
}

/// `[fft]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftConfig {
    /// Analysis window is `2^chunk_power` samples
    pub chunk_power: u32,
    /// Capture chunks per second
    pub update_rate: u32,
    /// Number of logarithmic bands
    pub bin_count: usize,
    /// Apply a Hann window before the transform
    pub use_hann_window: bool,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            chunk_power: 13,
            update_rate: 100,
            bin_count: 64,
            use_hann_window: false,
        }
    }
}

/// `[display]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render ticks per second
    pub refresh_rate: u32,
    /// Exponential smoothing constant in `[0, 1)`
    pub smooth_curve: f64,
    /// Lowest analysed frequency
    pub min_hz: f64,
    /// Highest analysed frequency
    pub max_hz: f64,
    /// Band value drawn as an empty bar
    pub min_val: f64,
    /// Band value drawn as a full bar
    pub max_val: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 120,
            smooth_curve: 0.75,
            min_hz: 36.0,
            max_hz: 20000.0,
            min_val: 110.0,
            max_val: 155.0,
        }
    }
}

/// `[white_dot]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteDotConfig {
    /// Seconds a peak is held before falling
    pub hang_time: f64,
    /// Fall speed in band units per second
    pub drop_speed: f64,
}

impl Default for WhiteDotConfig {
    fn default() -> Self {
        Self {
            hang_time: 0.5,
            drop_speed: 25.0,
        }
    }
}

/// How a history sample is aggregated from a tick's spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    /// Loudest raw band of each spectrum third
    #[default]
    TriBand,
    /// `sqrt(Σ smoothed²)` copied into all three bands
    Scalar,
}

/// `[sound_energy]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundEnergyConfig {
    /// Aggregation mode
    pub mode: EnergyMode,
    /// History depth in render ticks
    pub history_count: usize,
    /// Energy mapped to zero brightness
    pub min: f64,
    /// Energy mapped to full brightness
    pub max: f64,
    /// History color saturation in percent
    pub saturation: f64,
    /// Seconds for one full hue rotation
    pub hue_time: f64,
}

impl Default for SoundEnergyConfig {
    fn default() -> Self {
        Self {
            mode: EnergyMode::TriBand,
            history_count: 128,
            min: 110.0,
            max: 155.0,
            saturation: 100.0,
            hue_time: 10.0,
        }
    }
}

/// `[matrix]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Rows per panel
    pub rows: usize,
    /// Columns per panel
    pub cols: usize,
    /// Panels daisy-chained per output
    pub chain: usize,
    /// Parallel outputs
    pub parallel: usize,
    /// Fold the chain in half into a U shape
    pub u_mapper: bool,
    /// Initial brightness in percent
    pub brightness: u8,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 64,
            chain: 4,
            parallel: 1,
            u_mapper: true,
            brightness: 30,
        }
    }
}

impl MatrixConfig {
    /// Canvas `(width, height)` in pixels
    pub fn canvas_size(&self) -> (usize, usize) {
        let width = self.cols * self.chain;
        let height = self.rows * self.parallel;
        if self.u_mapper {
            (width / 2, height * 2)
        } else {
            (width, height)
        }
    }
}

/// `[dmx]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmxConfig {
    /// Listen for Art-Net
    pub enabled: bool,
    /// UDP bind address
    pub bind: String,
    /// Art-Net universe to accept
    pub universe: u16,
    /// 1-based first channel of the control block
    pub start_address: u16,
    /// Seconds without a valid frame before the console loses control
    pub signal_timeout: f64,
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0:6454".to_string(),
            universe: 0,
            start_address: 1,
            signal_timeout: 2.0,
        }
    }
}

impl DmxConfig {
    /// `signal_timeout` as a duration; never expires if it is not representable
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.signal_timeout).unwrap_or(Duration::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            fft: FftConfig::default(),
            display: DisplayConfig::default(),
            white_dot: WhiteDotConfig::default(),
            sound_energy: SoundEnergyConfig::default(),
            matrix: MatrixConfig::default(),
            dmx: DmxConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&text)?;
        info!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Analysis window length in samples
    pub fn chunk_size(&self) -> usize {
        1usize << self.fft.chunk_power
    }

    /// Samples delivered per capture chunk
    pub fn capture_chunk_len(&self) -> usize {
        (self.sample_rate / self.fft.update_rate.max(1)).max(1) as usize
    }

    /// Canvas `(width, height)` in pixels
    pub fn canvas_size(&self) -> (usize, usize) {
        self.matrix.canvas_size()
    }

    /// Reject configurations that would fail at render time.
    pub fn validate(&self) -> Result<()> {
        ensure_range("display value", self.display.min_val, self.display.max_val)?;
        ensure_range("display frequency", self.display.min_hz, self.display.max_hz)?;
        ensure_range("sound energy", self.sound_energy.min, self.sound_energy.max)?;

        let invalid = |msg: String| Err(CoreError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return invalid("sample_rate must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.display.smooth_curve) {
            return invalid(format!(
                "smooth_curve must be in [0, 1), got {}",
                self.display.smooth_curve
            ));
        }
        if self.display.min_hz <= 0.0 {
            return invalid(format!("min_hz must be positive, got {}", self.display.min_hz));
        }
        if self.display.max_hz > self.sample_rate as f64 / 2.0 {
            return invalid(format!(
                "max_hz {} is above the Nyquist frequency of {} Hz",
                self.display.max_hz, self.sample_rate
            ));
        }
        if self.fft.bin_count == 0 {
            return invalid("bin_count must be at least 1".to_string());
        }
        if !(4..=20).contains(&self.fft.chunk_power) {
            return invalid(format!(
                "chunk_power must be in 4..=20, got {}",
                self.fft.chunk_power
            ));
        }
        if self.fft.update_rate == 0 {
            return invalid("update_rate must be positive".to_string());
        }
        if self.display.refresh_rate == 0 {
            return invalid("refresh_rate must be positive".to_string());
        }
        if self.sound_energy.history_count == 0 {
            return invalid("history_count must be at least 1".to_string());
        }
        if self.sound_energy.hue_time <= 0.0 {
            return invalid(format!(
                "hue_time must be positive, got {}",
                self.sound_energy.hue_time
            ));
        }
        if !(0.0..=100.0).contains(&self.sound_energy.saturation) {
            return invalid(format!(
                "saturation must be a percentage, got {}",
                self.sound_energy.saturation
            ));
        }
        if self.white_dot.hang_time < 0.0 || self.white_dot.drop_speed < 0.0 {
            return invalid("white dot timings must not be negative".to_string());
        }
        let (width, height) = self.canvas_size();
        if width == 0 || height == 0 {
            return invalid(format!("canvas size {}x{} is empty", width, height));
        }
        if self.matrix.brightness > 100 {
            return invalid(format!(
                "brightness must be at most 100, got {}",
                self.matrix.brightness
            ));
        }
        if self.dmx.start_address == 0 || self.dmx.start_address > 512 {
            return invalid(format!(
                "dmx start_address must be in 1..=512, got {}",
                self.dmx.start_address
            ));
        }
        if !(self.dmx.signal_timeout.is_finite() && self.dmx.signal_timeout > 0.0) {
            return invalid(format!(
                "dmx signal_timeout must be a positive number of seconds, got {}",
                self.dmx.signal_timeout
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size(), 8192);
        assert_eq!(config.capture_chunk_len(), 441);
        assert_eq!(config.canvas_size(), (128, 64));
        assert_eq!(config.dmx.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_canvas_without_u_mapper() {
        let matrix = MatrixConfig {
            u_mapper: false,
            ..MatrixConfig::default()
        };
        assert_eq!(matrix.canvas_size(), (256, 32));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            sample_rate = 48000

            [display]
            smooth_curve = 0.5

            [sound_energy]
            mode = "scalar"
            min = 900.0
            max = 1750.0
            "#,
        )
        .unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.display.smooth_curve, 0.5);
        assert_eq!(config.display.min_val, 110.0);
        assert_eq!(config.sound_energy.mode, EnergyMode::Scalar);
        assert_eq!(config.fft.bin_count, 64);
    }

    #[test]
    fn test_zero_span_rejected() {
        let mut config = Config::default();
        config.display.max_val = config.display.min_val;
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidRange { .. })
        ));

        let mut config = Config::default();
        config.sound_energy.max = 100.0;
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_invalid_scalars_rejected() {
        let cases: Vec<fn(&mut Config)> = vec![
            |c| c.display.smooth_curve = 1.0,
            |c| c.fft.bin_count = 0,
            |c| c.fft.chunk_power = 3,
            |c| c.display.refresh_rate = 0,
            |c| c.sound_energy.history_count = 0,
            |c| c.display.max_hz = 30000.0,
            |c| c.dmx.start_address = 0,
            |c| c.dmx.signal_timeout = 0.0,
            |c| c.dmx.signal_timeout = f64::INFINITY,
        ];
        for mutate in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(CoreError::InvalidConfig(_))),
                "accepted {:?}",
                config
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fft]\nbin_count = 32\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fft.bin_count, 32);

        fs::write(&path, "[fft]\nbin_count = \"many\"\n").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(CoreError::ConfigParse(_))
        ));
    }
}
