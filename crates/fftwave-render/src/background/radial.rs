//! Radial backgrounds centred on the canvas

use std::time::Duration;

use fftwave_core::Rgba;

use super::{BackgroundInput, BackgroundRenderer, BackgroundSettings, RECENT_SAMPLES};
use crate::canvas::Canvas;
use crate::radius::RadiusMap;
use crate::Result;

/// Delay added per pixel of radius by [`RadialPulse`]
pub const PULSE_STEP: Duration = Duration::from_millis(20);

/// Brightness of the [`RadialThreshold`] disc
const THRESHOLD_VALUE: f64 = 0.3;

/// Rings moving outwards from the centre: the ring at radius `r` shows the
/// loudness of `r` pulse steps ago.
#[derive(Debug, Clone)]
pub struct RadialPulse {
    settings: BackgroundSettings,
    radius: RadiusMap,
    step: Duration,
    delay_indexes: Vec<usize>,
}

impl RadialPulse {
    pub fn new(width: usize, height: usize, settings: BackgroundSettings) -> Result<Self> {
        settings.validate()?;
        let radius = RadiusMap::centered(width, height);
        Ok(Self {
            settings,
            delay_indexes: vec![0; radius.max().max(1)],
            radius,
            step: PULSE_STEP,
        })
    }

    /// Use a different ring delay
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    fn update_delays(&mut self, input: &BackgroundInput<'_>) {
        let step = self.step;
        let targets = (0..self.delay_indexes.len()).map(|i| input.delayed(step * i as u32));
        self.delay_indexes = input.history.nearest_indexes(targets);
    }
}

impl BackgroundRenderer for RadialPulse {
    fn name(&self) -> &str {
        "radial-pulse"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>) {
        if input.history.is_empty() {
            return;
        }
        self.update_delays(input);
        let hue = input.hue();
        let s = self.settings;

        let (width, height) = self.radius.size();
        for y in 0..height {
            for x in 0..width {
                if !canvas.get(x, y).is_transparent() {
                    continue;
                }
                let delay = self.radius.get(x, y).saturating_sub(1);
                let Some(sample) = self
                    .delay_indexes
                    .get(delay)
                    .and_then(|&i| input.history.get(i))
                else {
                    continue;
                };
                let value = (sample.max_band() - s.energy_min) / (s.energy_max - s.energy_min);
                if value < 0.0 {
                    continue;
                }
                canvas.set(x, y, Rgba::from_hsv(hue, 1.0, value.min(1.0) / 3.0));
            }
        }
    }
}

/// Solid disc whose radius follows the recent loudness
#[derive(Debug, Clone)]
pub struct RadialThreshold {
    settings: BackgroundSettings,
    radius: RadiusMap,
    span: usize,
}

impl RadialThreshold {
    pub fn new(width: usize, height: usize, settings: BackgroundSettings) -> Result<Self> {
        settings.validate()?;
        let radius = RadiusMap::centered(width, height);
        Ok(Self {
            settings,
            span: radius.max().saturating_sub(1),
            radius,
        })
    }

    /// Pixels with a radius below this are painted
    pub fn threshold(&self, input: &BackgroundInput<'_>) -> i64 {
        let s = self.settings;
        let energy = input.history.recent_max_average(RECENT_SAMPLES);
        let threshold = (energy - s.energy_min) / (s.energy_max - s.energy_min) * self.span as f64;
        (threshold as i64).max(0)
    }
}

impl BackgroundRenderer for RadialThreshold {
    fn name(&self) -> &str {
        "radial-threshold"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>) {
        let threshold = self.threshold(input);
        if threshold <= 0 {
            return;
        }
        let color = Rgba::from_hsv(input.hue(), 1.0, THRESHOLD_VALUE);

        let (width, height) = self.radius.size();
        for y in 0..height {
            for x in 0..width {
                if canvas.get(x, y).is_transparent() && (self.radius.get(x, y) as i64) < threshold {
                    canvas.set(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::test_support::steady_history;
    use crate::canvas::FrameBuffer;
    use fftwave_control::DmxControl;
    use fftwave_core::{EnergySample, SoundEnergyHistory};
    use std::time::Instant;

    #[test]
    fn test_pulse_paints_untouched_pixels() {
        let (history, now) = steady_history(155.0, 64, PULSE_STEP);
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        canvas.set(0, 0, Rgba::WHITE);

        let mut pulse = RadialPulse::new(8, 8, BackgroundSettings::default()).unwrap();
        pulse.draw(&mut canvas, &input);

        // full energy at hue 0, capped at a third of full value
        let expected = Rgba::from_hsv(0.0, 1.0, 1.0 / 3.0);
        assert_eq!(canvas.get(0, 0), Rgba::WHITE);
        assert_eq!(canvas.get(3, 3), expected);
        assert_eq!(canvas.get(7, 0), expected);
    }

    #[test]
    fn test_pulse_skips_quiet_rings() {
        let (history, now) = steady_history(100.0, 64, PULSE_STEP);
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        RadialPulse::new(8, 8, BackgroundSettings::default())
            .unwrap()
            .draw(&mut canvas, &input);
        assert!(canvas.pixels().iter().all(|p| p.is_transparent()));
    }

    #[test]
    fn test_pulse_rings_follow_time() {
        // one loud sample 60ms ago, silence at threshold since
        let now = Instant::now() + Duration::from_secs(1);
        let mut history = SoundEnergyHistory::new(128).unwrap();
        for i in (0..10u32).rev() {
            let value = if i == 3 { 155.0 } else { 110.0 };
            history.push(EnergySample::uniform(value, 0.0, now - PULSE_STEP * i));
        }
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let mut canvas = FrameBuffer::new(16, 16).unwrap();
        RadialPulse::new(16, 16, BackgroundSettings::default())
            .unwrap()
            .draw(&mut canvas, &input);

        let loud = Rgba::from_hsv(0.0, 1.0, 1.0 / 3.0);
        // radius 4 reads delay slot 3; (7.5, 7.5) is the centre
        assert_eq!(canvas.get(11, 7), loud);
        assert_eq!(canvas.get(10, 7), Rgba::BLACK);
    }

    #[test]
    fn test_threshold_grows_with_energy() {
        let dmx = DmxControl::default();
        let disc = RadialThreshold::new(16, 16, BackgroundSettings::default()).unwrap();

        let (quiet, now) = steady_history(110.0, 5, Duration::from_millis(8));
        let input = BackgroundInput {
            dmx: &dmx,
            history: &quiet,
            now,
        };
        assert_eq!(disc.threshold(&input), 0);

        let (loud, now) = steady_history(155.0, 5, Duration::from_millis(8));
        let input = BackgroundInput {
            dmx: &dmx,
            history: &loud,
            now,
        };
        // max radius 11 -> span 10
        assert_eq!(disc.threshold(&input), 10);

        let mut canvas = FrameBuffer::new(16, 16).unwrap();
        let mut disc = disc;
        disc.draw(&mut canvas, &input);
        let color = Rgba::from_hsv(0.0, 1.0, THRESHOLD_VALUE);
        assert_eq!(canvas.get(8, 8), color);
        assert!(canvas.get(0, 0).is_transparent());
    }

    #[test]
    fn test_threshold_ramps_on_fresh_history() {
        let (history, now) = steady_history(155.0, 1, Duration::ZERO);
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let disc = RadialThreshold::new(16, 16, BackgroundSettings::default()).unwrap();
        // four of the five slots are missing and count as silence
        assert_eq!(disc.threshold(&input), 0);
    }
}
