//! Pixel colors and the color transforms shared by the renderers

use ::palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};

/// 8-bit RGBA color. Alpha 0 marks a pixel no layer has painted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Rgba {
    /// Untouched pixel
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    /// Opaque black
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    /// White dot marker
    pub const WHITE: Rgba = Rgba::rgb(0xff, 0xff, 0xff);

    /// Create a color from all four channels
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    /// Color from HSV components, each in `[0, 1]` (hue wraps).
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let hsv = Hsv::new(
            (hue.rem_euclid(1.0) * 360.0) as f32,
            saturation.clamp(0.0, 1.0) as f32,
            value.clamp(0.0, 1.0) as f32,
        );
        let rgb: Srgb = Srgb::from_color(hsv);
        let rgb = rgb.into_format::<u8>();
        Self::rgb(rgb.red, rgb.green, rgb.blue)
    }

    /// No layer has painted this pixel
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// All color channels are zero (alpha ignored)
    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Move the color towards its luma by `factor` (`0.2` = 20 % desaturation).
    pub fn desaturate(self, factor: f64) -> Self {
        let luma = 0.3 * self.r as f64 + 0.6 * self.g as f64 + 0.1 * self.b as f64;
        let mix = |c: u8| clamp_channel(c as f64 + factor * (luma - c as f64));
        Self::rgb(mix(self.r), mix(self.g), mix(self.b))
    }

    /// Scale the color channels by `percent / 100`, keeping alpha.
    pub fn scaled(self, percent: u8) -> Self {
        if percent >= 100 {
            return self;
        }
        let scale = |c: u8| ((c as u16 * percent as u16 + 50) / 100) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }
}

#[inline]
fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// 3×3 RGB hue rotation around the grey axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueRotation {
    matrix: [[f64; 3]; 3],
}

impl Default for HueRotation {
    fn default() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl HueRotation {
    /// Rotation by `degrees`
    pub fn new(degrees: f64) -> Self {
        let radians = degrees.to_radians();
        let root = (1.0f64 / 3.0).sqrt();
        let (sin, cos) = radians.sin_cos();
        let diagonal = cos + (1.0 - cos) / 3.0;
        let plus = (1.0 - cos) / 3.0 + root * sin;
        let minus = (1.0 - cos) / 3.0 - root * sin;

        Self {
            matrix: [
                [diagonal, minus, plus],
                [plus, diagonal, minus],
                [minus, plus, diagonal],
            ],
        }
    }

    /// Apply the rotation, clamping each channel into `0..=255`.
    pub fn apply(&self, color: Rgba) -> Rgba {
        let input = [color.r as f64, color.g as f64, color.b as f64];
        let row = |m: &[f64; 3]| clamp_channel(m[0] * input[0] + m[1] * input[1] + m[2] * input[2]);
        Rgba::rgb(
            row(&self.matrix[0]),
            row(&self.matrix[1]),
            row(&self.matrix[2]),
        )
    }
}
