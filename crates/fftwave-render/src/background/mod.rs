//! Background ambiance layers
//!
//! Backgrounds run after the pattern. The radial and waterfall variants only
//! paint pixels the pattern left transparent; the tint variants recolor the
//! pattern's pixels instead. All of them are keyed off the sound energy
//! history.

pub mod radial;
pub mod tint;
pub mod waterfall;

pub use radial::{RadialPulse, RadialThreshold};
pub use tint::{Desaturate, HueShift};
pub use waterfall::HistoryWaterfall;

use std::time::{Duration, Instant};

use fftwave_control::DmxControl;
use fftwave_core::{ensure_range, normalize, Config, SoundEnergyHistory};

use crate::canvas::Canvas;
use crate::Result;

/// Number of newest samples averaged by the "instant" variants
pub const RECENT_SAMPLES: usize = 5;

/// Everything a background needs for one tick
#[derive(Debug, Clone, Copy)]
pub struct BackgroundInput<'a> {
    /// Console state for this tick
    pub dmx: &'a DmxControl,
    /// Energy history, newest first
    pub history: &'a SoundEnergyHistory,
    /// Time of the current tick
    pub now: Instant,
}

impl BackgroundInput<'_> {
    /// Hue phase of the newest history sample
    pub fn hue(&self) -> f64 {
        self.history.latest().map_or(0.0, |s| s.hue)
    }

    /// `now - delay`, or the oldest sample time if that lies before the
    /// representable range of [`Instant`]
    pub(crate) fn delayed(&self, delay: Duration) -> Instant {
        self.now
            .checked_sub(delay)
            .or_else(|| self.history.iter().last().map(|s| s.at))
            .unwrap_or(self.now)
    }
}

/// Energy range the backgrounds normalise against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundSettings {
    /// `[sound_energy] min`
    pub energy_min: f64,
    /// `[sound_energy] max`
    pub energy_max: f64,
}

impl BackgroundSettings {
    /// Fails with `InvalidRange` when `energy_max <= energy_min`
    pub fn validate(&self) -> Result<()> {
        ensure_range("sound_energy", self.energy_min, self.energy_max)?;
        Ok(())
    }

    /// Energy mapped into `[0, 1]`
    pub fn level(&self, energy: f64) -> f64 {
        normalize(energy, self.energy_min, self.energy_max)
    }
}

impl From<&Config> for BackgroundSettings {
    fn from(config: &Config) -> Self {
        Self {
            energy_min: config.sound_energy.min,
            energy_max: config.sound_energy.max,
        }
    }
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Ambiance renderer
pub trait BackgroundRenderer: Send {
    /// Name for logs
    fn name(&self) -> &str;

    /// Paint over the pattern's output
    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>);
}

/// Leaves the canvas untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackground;

impl BackgroundRenderer for NoBackground {
    fn name(&self) -> &str {
        "none"
    }

    fn draw(&mut self, _canvas: &mut dyn Canvas, _input: &BackgroundInput<'_>) {}
}

/// Registry in cycling order, ending with [`NoBackground`]
pub fn default_backgrounds(
    width: usize,
    height: usize,
    settings: BackgroundSettings,
) -> Result<Vec<Box<dyn BackgroundRenderer>>> {
    Ok(vec![
        Box::new(RadialPulse::new(width, height, settings)?),
        Box::new(RadialThreshold::new(width, height, settings)?),
        Box::new(HistoryWaterfall::new(width, height, settings)?),
        Box::new(HueShift::new(settings)?),
        Box::new(Desaturate::new(settings)?),
        Box::new(NoBackground),
    ])
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::FrameBuffer;

    #[test]
    fn test_default_registry_order() {
        let backgrounds = default_backgrounds(16, 8, BackgroundSettings::default()).unwrap();
        let names: Vec<&str> = backgrounds.iter().map(|b| b.name()).collect();
        assert_eq!(
            names,
            vec![
                "radial-pulse",
                "radial-threshold",
                "history-waterfall",
                "hue-shift",
                "desaturate",
                "none"
            ]
        );
    }

    #[test]
    fn test_zero_energy_span_rejected() {
        let settings = BackgroundSettings {
            energy_min: 120.0,
            energy_max: 120.0,
        };
        assert!(default_backgrounds(16, 8, settings).is_err());
    }

    #[test]
    fn test_no_background_is_noop() {
        let (history, now) = test_support::steady_history(155.0, 10, Duration::from_millis(10));
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let mut canvas = FrameBuffer::new(4, 4).unwrap();
        NoBackground.draw(&mut canvas, &input);
        assert!(canvas.pixels().iter().all(|p| p.is_transparent()));
    }
}
