//! 256-entry color palettes and palette index helpers

use crate::color::Rgba;

/// Number of entries in every palette
pub const PALETTE_SIZE: usize = 256;

/// Ordered sequence of 256 colors indexed by a byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgba; PALETTE_SIZE],
}

impl Palette {
    /// Linear gradient through `(position, color)` stops.
    ///
    /// Stops must be sorted by position. Entries before the first stop take
    /// its color, entries after the last stop take the last color.
    pub fn gradient(stops: &[(u8, Rgba)]) -> Self {
        let mut colors = [Rgba::BLACK; PALETTE_SIZE];
        let Some(&(first_pos, first)) = stops.first() else {
            return Self { colors };
        };

        for (i, slot) in colors.iter_mut().enumerate() {
            let i = i as u8;
            *slot = if i <= first_pos {
                first
            } else {
                let next = stops.iter().position(|&(pos, _)| pos >= i);
                match next {
                    Some(n) => {
                        let (from_pos, from) = stops[n - 1];
                        let (to_pos, to) = stops[n];
                        let t = (i - from_pos) as f64 / (to_pos - from_pos) as f64;
                        lerp(from, to, t)
                    }
                    None => stops[stops.len() - 1].1,
                }
            };
        }
        Self { colors }
    }

    /// Color at `index`
    #[inline]
    pub fn get(&self, index: u8) -> Rgba {
        self.colors[index as usize]
    }
}

fn lerp(from: Rgba, to: Rgba, t: f64) -> Rgba {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgba::rgb(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
}

/// The selectable palettes. Index 0 is the default palette.
#[derive(Debug, Clone)]
pub struct PaletteBank {
    palettes: Vec<Palette>,
}

impl Default for PaletteBank {
    fn default() -> Self {
        let palettes = vec![
            // green -> yellow -> red, the classic level meter
            Palette::gradient(&[
                (0, Rgba::rgb(0, 255, 0)),
                (128, Rgba::rgb(255, 255, 0)),
                (255, Rgba::rgb(255, 0, 0)),
            ]),
            // rainbow
            Palette::gradient(&[
                (0, Rgba::rgb(255, 0, 0)),
                (51, Rgba::rgb(255, 255, 0)),
                (102, Rgba::rgb(0, 255, 0)),
                (153, Rgba::rgb(0, 255, 255)),
                (204, Rgba::rgb(0, 0, 255)),
                (255, Rgba::rgb(255, 0, 255)),
            ]),
            // fire
            Palette::gradient(&[
                (0, Rgba::rgb(32, 0, 0)),
                (96, Rgba::rgb(255, 0, 0)),
                (192, Rgba::rgb(255, 160, 0)),
                (255, Rgba::rgb(255, 255, 160)),
            ]),
            // ocean
            Palette::gradient(&[
                (0, Rgba::rgb(0, 0, 64)),
                (128, Rgba::rgb(0, 96, 255)),
                (255, Rgba::rgb(160, 255, 255)),
            ]),
            // forest
            Palette::gradient(&[
                (0, Rgba::rgb(0, 48, 0)),
                (128, Rgba::rgb(64, 160, 0)),
                (255, Rgba::rgb(200, 255, 64)),
            ]),
            // party
            Palette::gradient(&[
                (0, Rgba::rgb(85, 0, 171)),
                (64, Rgba::rgb(255, 0, 85)),
                (128, Rgba::rgb(255, 170, 0)),
                (192, Rgba::rgb(0, 255, 170)),
                (255, Rgba::rgb(85, 0, 171)),
            ]),
        ];
        Self { palettes }
    }
}

impl PaletteBank {
    /// Bank holding exactly the given palettes
    pub fn new(palettes: Vec<Palette>) -> Option<Self> {
        if palettes.is_empty() {
            None
        } else {
            Some(Self { palettes })
        }
    }

    /// Palette used when no DMX controller is active
    pub fn default_palette(&self) -> &Palette {
        &self.palettes[0]
    }

    /// Palette at `index`, wrapping out-of-range indexes.
    pub fn get(&self, index: usize) -> &Palette {
        &self.palettes[index % self.palettes.len()]
    }

    /// Number of palettes
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Always false; a bank holds at least one palette
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}

/// Ping-pong wrap of a palette phase offset.
///
/// Even rotations count up, odd rotations count down, so the index never
/// jumps when the offset crosses a multiple of 256.
pub fn palette_offset_wrap(offset: i64) -> u8 {
    let rotation = offset.div_euclid(PALETTE_SIZE as i64);
    let index = offset.rem_euclid(PALETTE_SIZE as i64) as u8;
    if rotation % 2 == 0 {
        index
    } else {
        255 - index
    }
}

/// Palette index for every row of a bar: `round(y * 255 / (height - 1))`.
pub fn palette_indexes(height: usize) -> Vec<u8> {
    if height <= 1 {
        return vec![0; height];
    }
    (0..height)
        .map(|y| ((y * 255) as f64 / (height - 1) as f64).round() as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_boundaries() {
        assert_eq!(palette_offset_wrap(0), 0);
        assert_eq!(palette_offset_wrap(255), 255);
        // second rotation runs backwards
        assert_eq!(palette_offset_wrap(256), 255);
        assert_eq!(palette_offset_wrap(511), 0);
        assert_eq!(palette_offset_wrap(512), 0);
        assert_eq!(palette_offset_wrap(767), 255);
    }

    #[test]
    fn test_wrap_negative_offsets() {
        assert_eq!(palette_offset_wrap(-1), 0);
        assert_eq!(palette_offset_wrap(-256), 255);
    }

    #[test]
    fn test_palette_indexes() {
        let indexes = palette_indexes(64);
        assert_eq!(indexes.len(), 64);
        assert_eq!(indexes[0], 0);
        assert_eq!(indexes[63], 255);
        assert!(indexes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(palette_indexes(1), vec![0]);
        assert!(palette_indexes(0).is_empty());
    }

    #[test]
    fn test_gradient_hits_stops() {
        let palette = Palette::gradient(&[
            (0, Rgba::rgb(0, 0, 0)),
            (255, Rgba::rgb(255, 255, 255)),
        ]);
        assert_eq!(palette.get(0), Rgba::BLACK);
        assert_eq!(palette.get(255), Rgba::WHITE);
        assert_eq!(palette.get(128), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn test_bank_wraps_index() {
        let bank = PaletteBank::default();
        assert_eq!(bank.get(bank.len()), bank.default_palette());
        assert!(PaletteBank::new(Vec::new()).is_none());
    }

    proptest! {
        #[test]
        fn prop_wrap_mirrors_second_rotation(k in 0i64..256) {
            prop_assert_eq!(palette_offset_wrap(256 + k) as i64, 255 - k);
            prop_assert_eq!(palette_offset_wrap(k) as i64, k);
        }

        #[test]
        fn prop_wrap_is_continuous(offset in -4096i64..4096) {
            let a = palette_offset_wrap(offset) as i16;
            let b = palette_offset_wrap(offset + 1) as i16;
            prop_assert!((a - b).abs() <= 1);
        }
    }
}
