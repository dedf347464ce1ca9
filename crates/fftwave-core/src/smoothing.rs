//! Temporal smoothing on the render clock
//!
//! The analyzer produces spectra at its own rate; the smoother runs once per
//! render tick on whatever spectrum arrived last. Each tick it
//! - blends the spectrum into the smoothed bars,
//! - advances the peak-hold-then-fall white dots,
//! - advances the hue phase and pushes one [`EnergySample`] into the history.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::{Config, EnergyMode};
use crate::history::{EnergySample, SoundEnergyHistory};
use crate::{CoreError, Result};

/// Smoother parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SmootherSettings {
    /// Weight of the previous value, `[0, 1)`
    pub curve: f64,
    /// How long a dot hangs at its peak
    pub hang_time: Duration,
    /// Dot fall speed in band units per second
    pub drop_speed: f64,
    /// History aggregation
    pub energy_mode: EnergyMode,
    /// History depth
    pub history_count: usize,
    /// Period of one hue rotation
    pub hue_time: Duration,
}

impl From<&Config> for SmootherSettings {
    fn from(config: &Config) -> Self {
        Self {
            curve: config.display.smooth_curve,
            hang_time: Duration::from_secs_f64(config.white_dot.hang_time.max(0.0)),
            drop_speed: config.white_dot.drop_speed,
            energy_mode: config.sound_energy.mode,
            history_count: config.sound_energy.history_count,
            hue_time: Duration::from_secs_f64(config.sound_energy.hue_time.max(0.0)),
        }
    }
}

impl Default for SmootherSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Peak-hold state of one white dot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DotState {
    /// Current dot value in band units
    pub value: f64,
    /// Hang time left before the dot starts falling
    pub time_left: Duration,
}

/// Result of one smoother tick
#[derive(Debug, Clone, Copy)]
pub struct SmootherOutput<'a> {
    /// Smoothed bar values
    pub bars: &'a [f64],
    /// White dot values
    pub dots: &'a [f64],
    /// History including the sample pushed this tick
    pub history: &'a SoundEnergyHistory,
    /// Sample pushed this tick
    pub sample: EnergySample,
}

/// Per-tick smoothing state
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    settings: SmootherSettings,
    smoothed: Vec<f64>,
    dot_values: Vec<f64>,
    dot_time_left: Vec<Duration>,
    history: SoundEnergyHistory,
    hue_phase: Duration,
    started: bool,
    tick_count: u64,
}

impl TemporalSmoother {
    /// Smoother for `bin_count` bars, starting from all-zero state.
    pub fn new(bin_count: usize, settings: SmootherSettings) -> Result<Self> {
        if !(0.0..1.0).contains(&settings.curve) {
            return Err(CoreError::InvalidConfig(format!(
                "smoothing curve must be in [0, 1), got {}",
                settings.curve
            )));
        }
        if settings.drop_speed < 0.0 || !settings.drop_speed.is_finite() {
            return Err(CoreError::InvalidConfig(format!(
                "drop speed must be a non-negative number, got {}",
                settings.drop_speed
            )));
        }
        if settings.hue_time.is_zero() {
            return Err(CoreError::InvalidConfig(
                "hue rotation period must be positive".to_string(),
            ));
        }

        Ok(Self {
            history: SoundEnergyHistory::new(settings.history_count)?,
            smoothed: vec![0.0; bin_count],
            dot_values: vec![0.0; bin_count],
            dot_time_left: vec![Duration::ZERO; bin_count],
            hue_phase: Duration::ZERO,
            started: false,
            tick_count: 0,
            settings,
        })
    }

    /// Smoother configured from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.fft.bin_count, SmootherSettings::from(config))
    }

    /// Advance one render tick using the wall clock for the history timestamp.
    pub fn tick(&mut self, elapsed: Duration, latest: &[f64]) -> SmootherOutput<'_> {
        self.tick_at(Instant::now(), elapsed, latest)
    }

    /// Advance one render tick taken at `now`.
    ///
    /// `elapsed` is the time since the previous tick; it is ignored on the
    /// first tick. Missing or non-finite spectrum values count as silence.
    pub fn tick_at(&mut self, now: Instant, elapsed: Duration, latest: &[f64]) -> SmootherOutput<'_> {
        let elapsed = if self.started { elapsed } else { Duration::ZERO };
        self.started = true;
        self.tick_count += 1;

        let curve = self.settings.curve;
        for (i, bar) in self.smoothed.iter_mut().enumerate() {
            let raw = latest.get(i).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
            *bar = curve * *bar + (1.0 - curve) * raw;
        }

        self.update_dots(elapsed);

        self.hue_phase = Duration::from_nanos(
            ((self.hue_phase + elapsed).as_nanos() % self.settings.hue_time.as_nanos()) as u64,
        );
        let hue = self.hue();
        let sample = match self.settings.energy_mode {
            EnergyMode::TriBand => tri_band(latest, hue, now),
            EnergyMode::Scalar => {
                let loudness = self.smoothed.iter().map(|v| v * v).sum::<f64>().sqrt();
                EnergySample::uniform(loudness, hue, now)
            }
        };
        self.history.push(sample);

        if self.tick_count % 1000 == 0 {
            trace!(
                "Smoother tick #{}: energy={:.1}, hue={:.2}",
                self.tick_count,
                sample.max_band(),
                hue
            );
        }

        SmootherOutput {
            bars: &self.smoothed,
            dots: &self.dot_values,
            history: &self.history,
            sample,
        }
    }

    fn update_dots(&mut self, elapsed: Duration) {
        let hang_time = self.settings.hang_time;
        let drop = self.settings.drop_speed * elapsed.as_secs_f64();

        for ((value, time_left), &bar) in self
            .dot_values
            .iter_mut()
            .zip(self.dot_time_left.iter_mut())
            .zip(&self.smoothed)
        {
            if bar > *value {
                *value = bar;
                *time_left = hang_time;
                continue;
            }
            *time_left = time_left.saturating_sub(elapsed);
            if time_left.is_zero() {
                // A dot never falls through its own bar
                *value = (*value - drop).max(bar);
            }
        }
    }

    /// Current hue phase in `[0, 1)`
    pub fn hue(&self) -> f64 {
        self.hue_phase.as_secs_f64() / self.settings.hue_time.as_secs_f64()
    }

    /// Smoothed bar values
    pub fn bars(&self) -> &[f64] {
        &self.smoothed
    }

    /// White dot values
    pub fn dots(&self) -> &[f64] {
        &self.dot_values
    }

    /// Full state of dot `index`
    pub fn dot(&self, index: usize) -> Option<DotState> {
        Some(DotState {
            value: *self.dot_values.get(index)?,
            time_left: *self.dot_time_left.get(index)?,
        })
    }

    /// Sound energy history, newest first
    pub fn history(&self) -> &SoundEnergyHistory {
        &self.history
    }

    /// Settings in use
    pub fn settings(&self) -> &SmootherSettings {
        &self.settings
    }
}

/// Loudest raw value in each third of the spectrum.
fn tri_band(spectrum: &[f64], hue: f64, at: Instant) -> EnergySample {
    let n = spectrum.len();
    let peak = |range: std::ops::Range<usize>| {
        spectrum[range]
            .iter()
            .filter(|v| v.is_finite())
            .fold(0.0f64, |acc, &v| acc.max(v))
    };
    EnergySample {
        bass: peak(0..n / 3),
        mid: peak(n / 3..2 * n / 3),
        treble: peak(2 * n / 3..n),
        hue,
        at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK: Duration = Duration::from_micros(8333);

    fn settings() -> SmootherSettings {
        SmootherSettings {
            history_count: 16,
            ..SmootherSettings::default()
        }
    }

    #[test]
    fn test_rejects_bad_curve() {
        let bad = SmootherSettings {
            curve: 1.0,
            ..settings()
        };
        assert!(TemporalSmoother::new(8, bad).is_err());
    }

    #[test]
    fn test_silence_stays_zero() {
        let mut smoother = TemporalSmoother::new(64, settings()).unwrap();
        let out = smoother.tick(TICK, &[0.0; 64]);
        assert!(out.bars.iter().all(|&v| v == 0.0));
        assert!(out.dots.iter().all(|&v| v == 0.0));
        assert_eq!(out.sample.max_band(), 0.0);
    }

    #[test]
    fn test_single_step_blend() {
        let mut smoother = TemporalSmoother::new(2, settings()).unwrap();
        let out = smoother.tick(TICK, &[100.0, 40.0]);
        assert!((out.bars[0] - 25.0).abs() < 1e-9);
        assert!((out.bars[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_tick_ignores_elapsed() {
        let mut smoother = TemporalSmoother::new(1, settings()).unwrap();
        smoother.tick(Duration::from_secs(3), &[0.0]);
        assert_eq!(smoother.hue(), 0.0);
        smoother.tick(Duration::from_secs(3), &[0.0]);
        assert!((smoother.hue() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_dot_hangs_then_falls() {
        let config = SmootherSettings {
            curve: 0.0,
            hang_time: Duration::from_millis(500),
            drop_speed: 25.0,
            ..settings()
        };
        let mut smoother = TemporalSmoother::new(1, config).unwrap();
        smoother.tick(TICK, &[150.0]);
        assert_eq!(smoother.dots()[0], 150.0);

        // Still hanging after 400 ms of silence
        smoother.tick(Duration::from_millis(400), &[0.0]);
        assert_eq!(smoother.dots()[0], 150.0);

        // Hang expires during this tick, the fall starts
        smoother.tick(Duration::from_millis(200), &[0.0]);
        assert!((smoother.dots()[0] - 145.0).abs() < 1e-9);

        smoother.tick(Duration::from_secs(1), &[0.0]);
        assert!((smoother.dots()[0] - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_dot_floored_at_bar() {
        let config = SmootherSettings {
            curve: 0.0,
            hang_time: Duration::ZERO,
            drop_speed: 1000.0,
            ..settings()
        };
        let mut smoother = TemporalSmoother::new(1, config).unwrap();
        smoother.tick(TICK, &[150.0]);
        smoother.tick(Duration::from_secs(1), &[120.0]);
        assert_eq!(smoother.dots()[0], 120.0);
    }

    #[test]
    fn test_tri_band_thirds() {
        let mut smoother = TemporalSmoother::new(6, settings()).unwrap();
        let out = smoother.tick(TICK, &[1.0, 2.0, 5.0, 3.0, 9.0, 4.0]);
        assert_eq!((out.sample.bass, out.sample.mid, out.sample.treble), (2.0, 5.0, 9.0));
        assert_eq!(out.history.len(), 1);
    }

    #[test]
    fn test_scalar_energy_uses_smoothed_bars() {
        let config = SmootherSettings {
            curve: 0.0,
            energy_mode: EnergyMode::Scalar,
            ..settings()
        };
        let mut smoother = TemporalSmoother::new(2, config).unwrap();
        let out = smoother.tick(TICK, &[3.0, 4.0]);
        assert!((out.sample.bass - 5.0).abs() < 1e-9);
        assert_eq!(out.sample.bass, out.sample.treble);
    }

    #[test]
    fn test_nan_does_not_poison() {
        let mut smoother = TemporalSmoother::new(2, settings()).unwrap();
        smoother.tick(TICK, &[f64::NAN, f64::INFINITY]);
        let out = smoother.tick(TICK, &[100.0]);
        assert!(out.bars.iter().all(|v| v.is_finite()));
    }

    proptest! {
        #[test]
        fn prop_converges_to_constant_input(curve in 0.0f64..0.99, target in 0.0f64..200.0) {
            let config = SmootherSettings { curve, ..settings() };
            let mut smoother = TemporalSmoother::new(1, config).unwrap();
            // curve^3000 < 1e-13 for curve < 0.99
            for _ in 0..3000 {
                smoother.tick(TICK, &[target]);
            }
            prop_assert!((smoother.bars()[0] - target).abs() < 1e-6);
        }

        #[test]
        fn prop_dots_never_rise_without_peaks(
            peak in 120.0f64..200.0,
            steps in proptest::collection::vec(1u64..200, 1..50),
        ) {
            let config = SmootherSettings { curve: 0.5, ..settings() };
            let mut smoother = TemporalSmoother::new(1, config).unwrap();
            smoother.tick(TICK, &[peak]);
            let mut previous = smoother.dots()[0];
            for ms in steps {
                smoother.tick(Duration::from_millis(ms), &[0.0]);
                let dot = smoother.dots()[0];
                prop_assert!(dot <= previous);
                prop_assert!(dot >= smoother.bars()[0]);
                previous = dot;
            }
        }
    }
}
