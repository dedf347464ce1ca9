//! One render tick
//!
//! The compositor owns the smoother, both renderer registries and the frame
//! buffer. Each tick it smooths the latest spectrum, clears the frame, runs
//! the active pattern, the active background and the optional overlay, then
//! presents the frame.

use std::time::{Duration, Instant};

use fftwave_control::DmxControl;
use fftwave_core::{Config, PaletteBank, TemporalSmoother};
use tracing::{debug, info};

use crate::background::{default_backgrounds, BackgroundInput, BackgroundRenderer, BackgroundSettings};
use crate::canvas::{Canvas, FrameBuffer, FrameSink};
use crate::pattern::{default_patterns, PatternInput, PatternRenderer, PatternSettings};
use crate::Result;

/// Layer painted after the background, e.g. lyrics
pub trait Overlay: Send {
    fn draw(&mut self, canvas: &mut dyn Canvas, dmx: &DmxControl);
}

/// Render state shared across ticks
pub struct Compositor {
    smoother: TemporalSmoother,
    patterns: Vec<Box<dyn PatternRenderer>>,
    backgrounds: Vec<Box<dyn BackgroundRenderer>>,
    pattern_index: usize,
    background_index: usize,
    palettes: PaletteBank,
    overlay: Option<Box<dyn Overlay>>,
    frame: FrameBuffer,
    selection: Option<(usize, usize)>,
    frames: u64,
}

impl Compositor {
    /// Compositor for the configured canvas with the default registries
    pub fn new(config: &Config) -> Result<Self> {
        let (width, height) = config.canvas_size();
        let mut frame = FrameBuffer::new(width, height)?;
        frame.set_brightness(config.matrix.brightness);

        let patterns = default_patterns(width, height, PatternSettings::from(config))?;
        let backgrounds = default_backgrounds(width, height, BackgroundSettings::from(config))?;

        info!(
            "Compositor ready: {}x{} canvas, {} patterns, {} backgrounds",
            width,
            height,
            patterns.len(),
            backgrounds.len()
        );

        Ok(Self {
            smoother: TemporalSmoother::from_config(config)?,
            patterns,
            backgrounds,
            pattern_index: 0,
            background_index: 0,
            palettes: PaletteBank::default(),
            overlay: None,
            frame,
            selection: None,
            frames: 0,
        })
    }

    /// Paint `overlay` on top of every frame
    pub fn with_overlay(mut self, overlay: Box<dyn Overlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Replace the palette bank
    pub fn with_palettes(mut self, palettes: PaletteBank) -> Self {
        self.palettes = palettes;
        self
    }

    /// Render one tick at the current time
    pub fn render(
        &mut self,
        elapsed: Duration,
        spectrum: &[f64],
        dmx: &DmxControl,
        sink: &mut dyn FrameSink,
    ) -> Result<()> {
        self.render_at(Instant::now(), elapsed, spectrum, dmx, sink)
    }

    /// Render one tick taken at `now`
    pub fn render_at(
        &mut self,
        now: Instant,
        elapsed: Duration,
        spectrum: &[f64],
        dmx: &DmxControl,
        sink: &mut dyn FrameSink,
    ) -> Result<()> {
        let (pattern_index, background_index) = self.active_indices(dmx);
        if self.selection != Some((pattern_index, background_index)) {
            debug!(
                "Active pattern '{}', background '{}'",
                self.patterns[pattern_index].name(),
                self.backgrounds[background_index].name()
            );
            self.selection = Some((pattern_index, background_index));
        }

        let smoothed = self.smoother.tick_at(now, elapsed, spectrum);

        self.frame.clear();
        self.patterns[pattern_index].draw(
            &mut self.frame,
            &PatternInput {
                dmx,
                bars: smoothed.bars,
                dots: smoothed.dots,
                history: smoothed.history,
                palettes: &self.palettes,
            },
        );
        self.backgrounds[background_index].draw(
            &mut self.frame,
            &BackgroundInput {
                dmx,
                history: smoothed.history,
                now,
            },
        );
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.draw(&mut self.frame, dmx);
        }

        self.frame.present(sink)?;
        self.frames += 1;
        Ok(())
    }

    /// `(pattern, background)` drawn next tick. An active console selects
    /// both by mode byte, wrapped into range.
    pub fn active_indices(&self, dmx: &DmxControl) -> (usize, usize) {
        if !dmx.active {
            return (self.pattern_index, self.background_index);
        }
        let pattern = dmx.display_mode as usize % self.patterns.len();
        let background = dmx
            .background_mode
            .map_or(self.background_index, |mode| mode as usize % self.backgrounds.len());
        (pattern, background)
    }

    /// Advance to the next pattern, wrapping
    pub fn next_pattern(&mut self) {
        self.pattern_index = (self.pattern_index + 1) % self.patterns.len();
        info!("Pattern: {}", self.patterns[self.pattern_index].name());
    }

    /// Advance to the next background, wrapping
    pub fn next_background(&mut self) {
        self.background_index = (self.background_index + 1) % self.backgrounds.len();
        info!("Background: {}", self.backgrounds[self.background_index].name());
    }

    /// Select a pattern by index, wrapped into range
    pub fn set_pattern(&mut self, index: usize) {
        self.pattern_index = index % self.patterns.len();
    }

    /// Select a background by index, wrapped into range
    pub fn set_background(&mut self, index: usize) {
        self.background_index = index % self.backgrounds.len();
    }

    /// Name of the pattern selected locally
    pub fn pattern_name(&self) -> &str {
        self.patterns[self.pattern_index].name()
    }

    /// Name of the background selected locally
    pub fn background_name(&self) -> &str {
        self.backgrounds[self.background_index].name()
    }

    /// Registered patterns, blank included
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn background_count(&self) -> usize {
        self.backgrounds.len()
    }

    /// Step brightness by `delta` percent
    pub fn adjust_brightness(&mut self, delta: i32) {
        self.frame.adjust_brightness(delta);
        debug!("Brightness: {}%", self.frame.brightness());
    }

    /// Current brightness in percent
    pub fn brightness(&self) -> u8 {
        self.frame.brightness()
    }

    /// Frame buffer as drawn, before brightness
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }

    /// Frames presented so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}
