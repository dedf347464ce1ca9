//! DMX control input
//!
//! A lighting console drives the visualizer through a block of 13 (or 14)
//! consecutive DMX channels. The block is decoded into a [`DmxControl`]
//! snapshot that the render loop reads once per tick.
//!
//! ## Channel layout
//!
//! | byte | meaning |
//! |---|---|
//! | 0 | non-zero marks a valid frame |
//! | 1 | bits 0-6 display mode, bit 7 set disables the white dots |
//! | 2 | palette index (`>> 2`) |
//! | 3 | palette angle |
//! | 4 | palette phase offset |
//! | 5-7 | override color RGB |
//! | 8 | override color brightness |
//! | 9-11 | lyric id (big-endian, 24 bit) |
//! | 12 | lyric progress |
//! | 13 | background mode (optional) |
//!
//! A console repeats its whole block many times a second. The override color
//! bytes only take effect when they change, so a local override toggle holds
//! until the operator moves the console's color faders.
//!
//! ## Example Usage
//!
//! ```rust
//! use fftwave_control::dmx::DmxControl;
//!
//! let frame = [1, 2, 0, 0, 0, 255, 0, 0, 255, 0, 0, 0, 0];
//! let control = DmxControl::decode(&frame).unwrap().unwrap();
//! assert_eq!(control.display_mode, 2);
//! assert!(control.override_color().is_some());
//! ```

pub mod artnet;

pub use artnet::{parse_artdmx, ArtNetReceiver, DmxListener};

use fftwave_core::Rgba;
use serde::{Deserialize, Serialize};

use crate::{error::ControlError, Result};

/// Channels in a control block without the optional background byte
pub const FRAME_LEN: usize = 13;
/// Channels in a control block including the background byte
pub const EXTENDED_FRAME_LEN: usize = FRAME_LEN + 1;

/// Decoded control state from the lighting console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmxControl {
    /// A console is connected and has sent at least one valid frame
    pub active: bool,
    /// Pattern index requested by the console
    pub display_mode: u8,
    /// Background index requested by the console, if it sends one
    pub background_mode: Option<u8>,
    /// Draw the white peak dots
    pub white_dots: bool,
    /// Palette index
    pub palette: u8,
    /// Palette phase advance per column
    pub palette_angle: u8,
    /// Palette phase offset
    pub palette_offset: u8,
    /// Constant bar color; alpha 0 means "use the palette"
    pub override_color: Rgba,
    /// Lyric line selected by the console
    pub lyric_id: u32,
    /// Progress through the current lyric line
    pub lyric_progress: u8,
}

impl Default for DmxControl {
    fn default() -> Self {
        Self {
            active: false,
            display_mode: 0,
            background_mode: None,
            white_dots: true,
            palette: 0,
            palette_angle: 0,
            palette_offset: 0,
            override_color: Rgba::TRANSPARENT,
            lyric_id: 0,
            lyric_progress: 0,
        }
    }
}

impl DmxControl {
    /// Decode one control block.
    ///
    /// Returns `Ok(None)` when byte 0 is zero (the console has nothing new),
    /// and an error when the block is shorter than [`FRAME_LEN`].
    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.len() < FRAME_LEN {
            return Err(ControlError::InvalidMessage(format!(
                "DMX control frame needs {} bytes, got {}",
                FRAME_LEN,
                bytes.len()
            )));
        }
        if bytes[0] == 0 {
            return Ok(None);
        }

        let brightness = bytes[8] as f64 / 255.0;
        let scale = |c: u8| (c as f64 * brightness).round() as u8;
        let (r, g, b) = (scale(bytes[5]), scale(bytes[6]), scale(bytes[7]));
        let alpha = if r > 0 || g > 0 || b > 0 { 0xff } else { 0 };

        Ok(Some(Self {
            active: true,
            display_mode: bytes[1] & 0x7f,
            background_mode: bytes.get(FRAME_LEN).copied(),
            white_dots: bytes[1] & 0x80 == 0,
            palette: bytes[2] >> 2,
            palette_angle: bytes[3],
            palette_offset: bytes[4],
            override_color: Rgba::new(r, g, b, alpha),
            lyric_id: u32::from_be_bytes([0, bytes[9], bytes[10], bytes[11]]),
            lyric_progress: bytes[12],
        }))
    }

    /// Adopt a freshly decoded console `frame`.
    ///
    /// The current override color survives when the console sent the same
    /// override color in its `previous` frame.
    pub fn merge_frame(&mut self, frame: DmxControl, previous: Option<&DmxControl>) {
        let local = self.override_color;
        *self = frame;
        if previous.is_some_and(|prev| prev.override_color == frame.override_color) {
            self.override_color = local;
        }
    }

    /// White dots are drawn unless an active console turned them off
    pub fn dots_enabled(&self) -> bool {
        !self.active || self.white_dots
    }

    /// Constant bar color, if one is set
    pub fn override_color(&self) -> Option<Rgba> {
        (!self.override_color.is_transparent()).then_some(self.override_color)
    }

    /// Palette phase for column `x` of a pattern `data_height` rows tall.
    ///
    /// Zero unless a console is active.
    pub fn phase_offset(&self, x: usize, data_height: usize) -> i64 {
        if !self.active {
            return 0;
        }
        let advance = self.palette_angle as f64 / 255.0 * data_height as f64 * x as f64;
        self.palette_offset as i64 + advance as i64
    }

    /// Flip the override color on or off. Turning it on without a known
    /// color selects white.
    pub fn toggle_override(&mut self) {
        if self.override_color.is_transparent() {
            self.override_color = if self.override_color.is_black() {
                Rgba::WHITE
            } else {
                Rgba { a: 0xff, ..self.override_color }
            };
        } else {
            self.override_color.a = 0;
        }
    }
}
