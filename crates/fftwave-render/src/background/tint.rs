//! Backgrounds that recolor the pattern instead of filling around it

use fftwave_core::{HueRotation, Rgba};

use super::{BackgroundInput, BackgroundRenderer, BackgroundSettings, RECENT_SAMPLES};
use crate::canvas::Canvas;
use crate::Result;

/// Largest hue rotation, reached at full energy
pub const MAX_HUE_SHIFT: f64 = 90.0;

fn recolor<F>(canvas: &mut dyn Canvas, mut f: F)
where
    F: FnMut(Rgba) -> Rgba,
{
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let color = canvas.get(x, y);
            if !color.is_black() {
                canvas.set(x, y, f(color));
            }
        }
    }
}

/// Rotates the hue of every lit pixel by up to 90° as the music gets louder
#[derive(Debug, Clone)]
pub struct HueShift {
    settings: BackgroundSettings,
    rotation: HueRotation,
}

impl HueShift {
    pub fn new(settings: BackgroundSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            rotation: HueRotation::default(),
        })
    }

    /// Rotation in degrees for the current history
    pub fn angle(&self, input: &BackgroundInput<'_>) -> f64 {
        let energy = input.history.recent_max_average(RECENT_SAMPLES);
        self.settings.level(energy) * MAX_HUE_SHIFT
    }
}

impl BackgroundRenderer for HueShift {
    fn name(&self) -> &str {
        "hue-shift"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>) {
        self.rotation = HueRotation::new(self.angle(input));
        let rotation = self.rotation;
        recolor(canvas, |color| rotation.apply(color));
    }
}

/// Washes lit pixels towards grey when the music is quiet
#[derive(Debug, Clone)]
pub struct Desaturate {
    settings: BackgroundSettings,
}

impl Desaturate {
    pub fn new(settings: BackgroundSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// `1 - level(energy)`: 1 fully grey, 0 untouched
    pub fn factor(&self, input: &BackgroundInput<'_>) -> f64 {
        1.0 - self
            .settings
            .level(input.history.recent_max_average(RECENT_SAMPLES))
    }
}

impl BackgroundRenderer for Desaturate {
    fn name(&self) -> &str {
        "desaturate"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, input: &BackgroundInput<'_>) {
        let factor = self.factor(input);
        recolor(canvas, |color| color.desaturate(factor));
    }
}
