//! Bar patterns
//!
//! A pattern draws the smoothed spectrum as bars, the white peak dots and
//! (for some layouts) the sound energy history behind the bars. Variants
//! live in a registry indexed by a small integer, see [`default_patterns`].

pub mod bars;
pub mod blank;
pub mod layout;

pub use bars::BarPattern;
pub use blank::BlankPattern;
pub use layout::{Layout, LayoutKind};

use fftwave_control::DmxControl;
use fftwave_core::{Config, PaletteBank, SoundEnergyHistory};
use tracing::warn;

use crate::canvas::Canvas;
use crate::Result;

/// Everything a pattern needs for one tick
#[derive(Debug, Clone, Copy)]
pub struct PatternInput<'a> {
    /// Console state for this tick
    pub dmx: &'a DmxControl,
    /// Smoothed bar values
    pub bars: &'a [f64],
    /// White dot values
    pub dots: &'a [f64],
    /// Energy history, newest first
    pub history: &'a SoundEnergyHistory,
    /// Palettes selectable by the console
    pub palettes: &'a PaletteBank,
}

/// Value ranges shared by all patterns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSettings {
    /// Bar value drawn as an empty column
    pub min_val: f64,
    /// Bar value drawn as a full column
    pub max_val: f64,
    pub energy_min: f64,
    pub energy_max: f64,
    /// History fill saturation in `[0, 1]`
    pub saturation: f64,
}

impl From<&Config> for PatternSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_val: config.display.min_val,
            max_val: config.display.max_val,
            energy_min: config.sound_energy.min,
            energy_max: config.sound_energy.max,
            saturation: config.sound_energy.saturation / 100.0,
        }
    }
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Foreground renderer
pub trait PatternRenderer: Send {
    /// Name for logs
    fn name(&self) -> &str;

    /// Draw into a canvas the compositor cleared for this tick
    fn draw(&mut self, canvas: &mut dyn Canvas, input: &PatternInput<'_>);
}

/// Registry in cycling order: the six bar layouts, then the blank pattern.
///
/// Layouts that cannot tile the canvas are left out with a warning, so an
/// odd-sized matrix still gets the single layout.
pub fn default_patterns(
    width: usize,
    height: usize,
    settings: PatternSettings,
) -> Result<Vec<Box<dyn PatternRenderer>>> {
    let mut patterns: Vec<Box<dyn PatternRenderer>> = Vec::new();
    for kind in LayoutKind::ALL {
        match Layout::new(kind, width, height) {
            Ok(layout) => patterns.push(Box::new(BarPattern::new(layout, settings)?)),
            Err(e) => warn!("Skipping pattern: {}", e),
        }
    }
    patterns.push(Box::new(BlankPattern));
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let patterns = default_patterns(16, 8, PatternSettings::default()).unwrap();
        let names: Vec<&str> = patterns.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "single",
                "single-mirrored",
                "dual",
                "mirror",
                "quad",
                "quad-sideways",
                "blank"
            ]
        );
    }

    #[test]
    fn test_odd_canvas_keeps_single() {
        let patterns = default_patterns(5, 5, PatternSettings::default()).unwrap();
        let names: Vec<&str> = patterns.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["single", "blank"]);
    }

    #[test]
    fn test_bad_range_rejected() {
        let settings = PatternSettings {
            min_val: 155.0,
            max_val: 110.0,
            ..PatternSettings::default()
        };
        assert!(default_patterns(16, 8, settings).is_err());
    }
}
