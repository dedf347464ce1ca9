//! Bars, white dots and the history fill, drawn through a [`Layout`]

use fftwave_core::{ensure_range, normalize, palette_indexes, palette_offset_wrap, Rgba};

use super::{Layout, PatternInput, PatternRenderer, PatternSettings};
use crate::canvas::Canvas;
use crate::radius::RadiusMap;
use crate::Result;

/// Marker color of the peak dots
pub const DOT_COLOR: Rgba = Rgba::WHITE;

/// Spectrum bars in one of the [`LayoutKind`](super::LayoutKind) arrangements
#[derive(Debug, Clone)]
pub struct BarPattern {
    layout: Layout,
    settings: PatternSettings,
    palette_indexes: Vec<u8>,
    radius: RadiusMap,
    columns: Vec<f64>,
    dot_columns: Vec<f64>,
    history_colors: Vec<Rgba>,
}

impl BarPattern {
    /// Pattern for `layout`; fails on an empty value or energy range.
    pub fn new(layout: Layout, settings: PatternSettings) -> Result<Self> {
        ensure_range("display", settings.min_val, settings.max_val)?;
        ensure_range("sound_energy", settings.energy_min, settings.energy_max)?;

        let (dw, dh) = (layout.data_width(), layout.data_height());
        Ok(Self {
            layout,
            settings,
            palette_indexes: palette_indexes(dh),
            // ripples spread from just outside the top-left logical corner
            radius: RadiusMap::new(dw, dh, -0.5, dh as f64 + 0.5),
            columns: vec![0.0; dw],
            dot_columns: vec![0.0; dw],
            history_colors: Vec::new(),
        })
    }

    /// Logical to physical mapping in use
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Height in rows of a bar with value `value`, truncated
    pub fn bar_height(&self, value: f64) -> usize {
        let height = normalize(value, self.settings.min_val, self.settings.max_val)
            * self.layout.data_height() as f64;
        (height as usize).min(self.layout.data_height())
    }

    fn bar_color(&self, input: &PatternInput<'_>, x: usize, y: usize) -> Rgba {
        if let Some(color) = input.dmx.override_color() {
            return color;
        }
        let index = self.palette_indexes[y];
        if input.dmx.active {
            let phase = input.dmx.phase_offset(x, self.layout.data_height());
            input
                .palettes
                .get(input.dmx.palette as usize)
                .get(palette_offset_wrap(index as i64 + phase))
        } else {
            input.palettes.default_palette().get(index)
        }
    }

    fn update_history_colors(&mut self, input: &PatternInput<'_>) {
        let s = &self.settings;
        self.history_colors.clear();
        self.history_colors.extend(
            input
                .history
                .iter()
                .map(|sample| sample.color(s.energy_min, s.energy_max, s.saturation)),
        );
    }
}

/// Nearest/strided selection of `dst.len()` values out of `src`
fn resample(src: &[f64], dst: &mut [f64]) {
    let (n, m) = (src.len(), dst.len());
    for (x, slot) in dst.iter_mut().enumerate() {
        *slot = if n == 0 { 0.0 } else { src[x * n / m] };
    }
}

/// Resample to twice the column count and average neighbouring pairs
fn resample_pairs(src: &[f64], dst: &mut [f64]) {
    let (n, m) = (src.len(), dst.len() * 2);
    for (x, slot) in dst.iter_mut().enumerate() {
        *slot = if n == 0 {
            0.0
        } else {
            (src[2 * x * n / m] + src[(2 * x + 1) * n / m]) / 2.0
        };
    }
}

impl PatternRenderer for BarPattern {
    fn name(&self) -> &str {
        self.layout.kind().name()
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &PatternInput<'_>) {
        let mut columns = std::mem::take(&mut self.columns);
        let mut dot_columns = std::mem::take(&mut self.dot_columns);
        if self.layout.kind().averages_pairs() {
            resample_pairs(input.bars, &mut columns);
            resample_pairs(input.dots, &mut dot_columns);
        } else {
            resample(input.bars, &mut columns);
            resample(input.dots, &mut dot_columns);
        }

        let fill_history = self.layout.kind().fills_history();
        if fill_history {
            self.update_history_colors(input);
        }

        let dots_enabled = input.dmx.dots_enabled();
        let data_height = self.layout.data_height();
        let layout = self.layout;

        for (x, (&value, &dot_value)) in columns.iter().zip(&dot_columns).enumerate() {
            let mut bar = self.bar_height(value);
            let dot = self.bar_height(dot_value);
            if dots_enabled && bar > 0 && bar == dot {
                bar -= 1;
            }

            for y in 0..bar {
                let color = self.bar_color(input, x, y);
                layout.for_each_point(x, y, |px, py| canvas.set(px, py, color));
            }

            if fill_history {
                for y in bar..data_height {
                    if let Some(&color) = self.history_colors.get(self.radius.get(x, y)) {
                        layout.for_each_point(x, y, |px, py| canvas.set(px, py, color));
                    }
                }
            }

            if dots_enabled && dot > 0 {
                layout.for_each_point(x, dot - 1, |px, py| canvas.set(px, py, DOT_COLOR));
            }
        }

        self.columns = columns;
        self.dot_columns = dot_columns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::FrameBuffer;
    use crate::pattern::LayoutKind;
    use fftwave_control::DmxControl;
    use fftwave_core::{EnergySample, PaletteBank, SoundEnergyHistory};
    use std::time::Instant;

    struct Fixture {
        dmx: DmxControl,
        bars: Vec<f64>,
        dots: Vec<f64>,
        history: SoundEnergyHistory,
        palettes: PaletteBank,
    }

    impl Fixture {
        fn new(bars: f64, dots: f64) -> Self {
            Self {
                dmx: DmxControl::default(),
                bars: vec![bars; 64],
                dots: vec![dots; 64],
                history: SoundEnergyHistory::new(128).unwrap(),
                palettes: PaletteBank::default(),
            }
        }

        fn input(&self) -> PatternInput<'_> {
            PatternInput {
                dmx: &self.dmx,
                bars: &self.bars,
                dots: &self.dots,
                history: &self.history,
                palettes: &self.palettes,
            }
        }
    }

    fn pattern(kind: LayoutKind, w: usize, h: usize) -> BarPattern {
        BarPattern::new(Layout::new(kind, w, h).unwrap(), PatternSettings::default()).unwrap()
    }

    #[test]
    fn test_bar_height_truncates() {
        let p = pattern(LayoutKind::Single, 8, 10);
        assert_eq!(p.bar_height(100.0), 0);
        assert_eq!(p.bar_height(110.0), 0);
        // 0.5 * 10
        assert_eq!(p.bar_height(132.5), 5);
        // 0.29 * 10 = 2.9
        assert_eq!(p.bar_height(123.05), 2);
        assert_eq!(p.bar_height(155.0), 10);
        assert_eq!(p.bar_height(900.0), 10);
    }

    #[test]
    fn test_resample_strided() {
        let src: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let mut dst = vec![0.0; 4];
        resample(&src, &mut dst);
        assert_eq!(dst, vec![0.0, 2.0, 4.0, 6.0]);

        let mut pairs = vec![0.0; 2];
        resample_pairs(&src, &mut pairs);
        assert_eq!(pairs, vec![1.0, 5.0]);
    }

    #[test]
    fn test_silence_draws_nothing_on_single() {
        let mut p = pattern(LayoutKind::Single, 8, 8);
        let fixture = Fixture::new(0.0, 0.0);
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());
        assert!(canvas.pixels().iter().all(Rgba::is_transparent));
    }

    #[test]
    fn test_full_bars_fill_canvas() {
        let mut p = pattern(LayoutKind::Quad, 8, 8);
        let mut fixture = Fixture::new(155.0, 0.0);
        fixture.dmx.white_dots = false;
        fixture.dmx.active = true;
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());
        assert!(canvas.pixels().iter().all(|c| !c.is_transparent()));
    }

    #[test]
    fn test_dot_sits_on_top_of_full_bar() {
        let mut p = pattern(LayoutKind::Single, 4, 8);
        let fixture = Fixture::new(155.0, 155.0);
        let mut canvas = FrameBuffer::new(4, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());

        // bar shrinks by one so the dot at the top row stays visible
        for x in 0..4 {
            assert_eq!(canvas.get(x, 0), DOT_COLOR);
            assert_ne!(canvas.get(x, 1), DOT_COLOR);
            assert!(!canvas.get(x, 7).is_transparent());
        }
    }

    #[test]
    fn test_dots_disabled_by_console() {
        let mut p = pattern(LayoutKind::Single, 4, 8);
        let mut fixture = Fixture::new(0.0, 155.0);
        fixture.dmx.active = true;
        fixture.dmx.white_dots = false;
        let mut canvas = FrameBuffer::new(4, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());
        assert!(canvas.pixels().iter().all(Rgba::is_transparent));
    }

    #[test]
    fn test_override_color_wins() {
        let mut p = pattern(LayoutKind::Mirror, 8, 8);
        let mut fixture = Fixture::new(132.5, 0.0);
        fixture.dmx.override_color = Rgba::rgb(1, 2, 3);
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());

        for x in 0..8 {
            for y in 4..8 {
                assert_eq!(canvas.get(x, y), Rgba::rgb(1, 2, 3));
            }
            for y in 0..4 {
                assert!(canvas.get(x, y).is_transparent());
            }
        }
    }

    #[test]
    fn test_console_palette_phase() {
        let mut p = pattern(LayoutKind::Single, 1, 2);
        let mut fixture = Fixture::new(155.0, 0.0);
        fixture.dmx.active = true;
        fixture.dmx.white_dots = false;
        fixture.dmx.palette = 1;
        fixture.dmx.palette_offset = 10;
        let mut canvas = FrameBuffer::new(1, 2).unwrap();
        p.draw(&mut canvas, &fixture.input());

        let palette = fixture.palettes.get(1);
        // row indexes are [0, 255]; the offset pushes 255 into the odd rotation
        assert_eq!(canvas.get(0, 1), palette.get(10));
        assert_eq!(canvas.get(0, 0), palette.get(palette_offset_wrap(265)));
    }

    #[test]
    fn test_history_fill_above_bars() {
        let mut p = pattern(LayoutKind::Dual, 8, 8);
        let mut fixture = Fixture::new(0.0, 0.0);
        let now = Instant::now();
        for _ in 0..128 {
            fixture.history.push(EnergySample::uniform(155.0, 0.0, now));
        }
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());

        let red = EnergySample::uniform(155.0, 0.0, now).color(110.0, 155.0, 1.0);
        assert_eq!(red, Rgba::rgb(255, 0, 0));
        assert!(canvas.pixels().iter().all(|&c| c == red));
    }

    #[test]
    fn test_history_fill_skips_missing_samples() {
        let mut p = pattern(LayoutKind::Quad, 8, 8);
        let mut fixture = Fixture::new(0.0, 0.0);
        fixture
            .history
            .push(EnergySample::uniform(155.0, 0.0, Instant::now()));
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());
        // only radius 0 has a sample, and no logical pixel sits at radius 0
        assert!(canvas.pixels().iter().all(Rgba::is_transparent));
    }

    #[test]
    fn test_single_leaves_history_region_empty() {
        let mut p = pattern(LayoutKind::Single, 8, 8);
        let mut fixture = Fixture::new(132.5, 0.0);
        fixture
            .history
            .push(EnergySample::uniform(155.0, 0.0, Instant::now()));
        let mut canvas = FrameBuffer::new(8, 8).unwrap();
        p.draw(&mut canvas, &fixture.input());
        assert!(canvas.get(0, 0).is_transparent());
    }
}
