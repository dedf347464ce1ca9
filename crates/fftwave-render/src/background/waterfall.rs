//! Scrolling tri-band history, mirrored around the horizontal centre line

use std::time::Duration;

use fftwave_core::Rgba;

use super::{BackgroundInput, BackgroundRenderer, BackgroundSettings};
use crate::canvas::Canvas;
use crate::Result;

/// Time covered by the full canvas width
pub const WATERFALL_SPAN: Duration = Duration::from_secs(1);

pub const TREBLE_COLOR: Rgba = Rgba::rgb(0x40, 0x40, 0x40);
pub const MID_COLOR: Rgba = Rgba::rgb(0x40, 0, 0);
pub const BASS_COLOR: Rgba = Rgba::rgb(0, 0, 0x40);

/// The newest sample sits in the rightmost column, one second ago in the
/// leftmost. Each column stacks treble, mid and bass segments outwards from
/// the centre line.
#[derive(Debug, Clone)]
pub struct HistoryWaterfall {
    settings: BackgroundSettings,
    width: usize,
    half_height: usize,
    band_rows: f64,
}

impl HistoryWaterfall {
    pub fn new(width: usize, height: usize, settings: BackgroundSettings) -> Result<Self> {
        settings.validate()?;
        let half_height = height / 2;
        Ok(Self {
            settings,
            width,
            half_height,
            band_rows: half_height as f64 / 3.0,
        })
    }

    fn rows(&self, energy: f64) -> usize {
        (self.settings.level(energy) * self.band_rows).round() as usize
    }

    fn paint(&self, canvas: &mut dyn Canvas, x: usize, row: usize, color: Rgba) {
        for y in [self.half_height + row, self.half_height - 1 - row] {
            if canvas.get(x, y).is_transparent() {
                canvas.set(x, y, color);
            }
        }
    }
}

impl BackgroundRenderer for HistoryWaterfall {
    fn name(&self) -> &str {
        "history-waterfall"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>) {
        if input.history.is_empty() || self.half_height == 0 {
            return;
        }
        let width = self.width as u32;
        let targets = (0..width).map(|i| input.delayed(WATERFALL_SPAN * i / width));
        let indexes = input.history.nearest_indexes(targets);

        for (i, &index) in indexes.iter().enumerate() {
            let Some(sample) = input.history.get(index) else {
                continue;
            };
            let x = self.width - 1 - i;
            let segments = [
                (self.rows(sample.treble), TREBLE_COLOR),
                (self.rows(sample.mid), MID_COLOR),
                (self.rows(sample.bass), BASS_COLOR),
            ];
            let rows = segments
                .iter()
                .flat_map(|&(count, color)| std::iter::repeat(color).take(count))
                .take(self.half_height);
            for (row, color) in rows.enumerate() {
                self.paint(canvas, x, row, color);
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
    fn test_stack_order_and_mirror() {
        let now = Instant::now();
        let mut history = SoundEnergyHistory::new(8).unwrap();
        history.push(EnergySample {
            bass: 155.0,
            mid: 132.5,
            treble: 110.0,
            hue: 0.0,
            at: now,
        });
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        // half height 6 -> 2 rows per band
        let mut canvas = FrameBuffer::new(4, 12).unwrap();
        HistoryWaterfall::new(4, 12, BackgroundSettings::default())
            .unwrap()
            .draw(&mut canvas, &input);

        for x in 0..4 {
            // treble empty, mid one row, bass two rows
            assert_eq!(canvas.get(x, 6), MID_COLOR);
            assert_eq!(canvas.get(x, 5), MID_COLOR);
            assert_eq!(canvas.get(x, 7), BASS_COLOR);
            assert_eq!(canvas.get(x, 8), BASS_COLOR);
            assert_eq!(canvas.get(x, 3), BASS_COLOR);
            assert!(canvas.get(x, 9).is_transparent());
            assert!(canvas.get(x, 2).is_transparent());
        }
    }

    #[test]
    fn test_newest_on_the_right() {
        let now = Instant::now() + Duration::from_secs(2);
        let mut history = SoundEnergyHistory::new(128).unwrap();
        history.push(EnergySample::uniform(110.0, 0.0, now - Duration::from_secs(1)));
        history.push(EnergySample::uniform(155.0, 0.0, now));
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        let mut canvas = FrameBuffer::new(10, 6).unwrap();
        HistoryWaterfall::new(10, 6, BackgroundSettings::default())
            .unwrap()
            .draw(&mut canvas, &input);
        assert!(!canvas.get(9, 3).is_transparent());
        assert!(canvas.get(0, 3).is_transparent());
    }

    #[test]
    fn test_full_energy_stays_in_bounds() {
        let (history, now) = steady_history(155.0, 4, Duration::from_millis(8));
        let dmx = DmxControl::default();
        let input = BackgroundInput {
            dmx: &dmx,
            history: &history,
            now,
        };
        // 32 / 3 rounds up to 11 rows per band, more than fits
        let mut canvas = FrameBuffer::new(4, 64).unwrap();
        canvas.set(0, 32, Rgba::WHITE);
        HistoryWaterfall::new(4, 64, BackgroundSettings::default())
            .unwrap()
            .draw(&mut canvas, &input);
        assert!(canvas.pixels().iter().all(|p| !p.is_transparent()));
        assert_eq!(canvas.get(0, 32), Rgba::WHITE);
    }
}
