//! Pattern geometry
//!
//! Every bar pattern draws into a logical grid of `data_width` columns by
//! `data_height` rows (row 0 is the bottom of a bar). A [`Layout`] maps each
//! logical pixel to the physical pixels it covers, so that the union over
//! the logical grid tiles the whole canvas exactly once.

use serde::{Deserialize, Serialize};

use crate::{RenderError, Result};

/// Arrangement of the bars on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// One row of bars rising from the bottom edge
    Single,
    /// Bars rising from the bottom on the lower half, mirrored onto the
    /// upper half hanging from the top edge in reverse column order
    SingleMirrored,
    /// One row of bars, each two pixels wide
    Dual,
    /// Bars mirrored left/right around the vertical center line
    Mirror,
    /// Bars mirrored around both center lines, growing outwards
    Quad,
    /// Quad rotated by 90°, bars growing inwards from the side edges
    QuadSideways,
}

impl LayoutKind {
    /// All layouts in registry order
    pub const ALL: [LayoutKind; 6] = [
        LayoutKind::Single,
        LayoutKind::SingleMirrored,
        LayoutKind::Dual,
        LayoutKind::Mirror,
        LayoutKind::Quad,
        LayoutKind::QuadSideways,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            LayoutKind::Single => "single",
            LayoutKind::SingleMirrored => "single-mirrored",
            LayoutKind::Dual => "dual",
            LayoutKind::Mirror => "mirror",
            LayoutKind::Quad => "quad",
            LayoutKind::QuadSideways => "quad-sideways",
        }
    }

    /// Paints the sound energy history above the bars
    pub fn fills_history(&self) -> bool {
        matches!(
            self,
            LayoutKind::Dual | LayoutKind::Quad | LayoutKind::QuadSideways
        )
    }

    /// Columns are built by averaging two neighbouring resampled values
    pub fn averages_pairs(&self) -> bool {
        matches!(self, LayoutKind::QuadSideways)
    }

    fn needs_even_width(&self) -> bool {
        !matches!(self, LayoutKind::Single | LayoutKind::SingleMirrored)
    }

    fn needs_even_height(&self) -> bool {
        matches!(
            self,
            LayoutKind::SingleMirrored | LayoutKind::Quad | LayoutKind::QuadSideways
        )
    }
}

/// A [`LayoutKind`] bound to a canvas size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    kind: LayoutKind,
    width: usize,
    height: usize,
    data_width: usize,
    data_height: usize,
}

impl Layout {
    /// Fails with [`RenderError::InvalidGeometry`] when the canvas cannot be
    /// tiled by this layout.
    pub fn new(kind: LayoutKind, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "{} layout needs a non-empty canvas, got {}x{}",
                kind.name(),
                width,
                height
            )));
        }
        if (kind.needs_even_width() && width % 2 != 0)
            || (kind.needs_even_height() && height % 2 != 0)
        {
            return Err(RenderError::InvalidGeometry(format!(
                "{} layout cannot tile a {}x{} canvas",
                kind.name(),
                width,
                height
            )));
        }

        let (data_width, data_height) = match kind {
            LayoutKind::Single => (width, height),
            LayoutKind::SingleMirrored => (width, height / 2),
            LayoutKind::Dual | LayoutKind::Mirror => (width / 2, height),
            LayoutKind::Quad => (width / 2, height / 2),
            LayoutKind::QuadSideways => (height / 2, width / 2),
        };

        Ok(Self {
            kind,
            width,
            height,
            data_width,
            data_height,
        })
    }

    /// Geometry this layout was built for
    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Logical columns
    pub fn data_width(&self) -> usize {
        self.data_width
    }

    /// Logical rows per column
    pub fn data_height(&self) -> usize {
        self.data_height
    }

    /// Canvas size the layout was built for
    pub fn canvas_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Call `f` with every physical pixel covered by logical `(x, y)`.
    ///
    /// `x < data_width` and `y < data_height` must hold.
    #[inline]
    pub fn for_each_point<F: FnMut(usize, usize)>(&self, x: usize, y: usize, mut f: F) {
        let (w, h) = (self.width, self.height);
        match self.kind {
            LayoutKind::Single => f(x, h - 1 - y),
            LayoutKind::SingleMirrored => {
                let dh = self.data_height;
                f(x, 2 * dh - 1 - y);
                f(w - 1 - x, y);
            }
            LayoutKind::Dual => {
                f(2 * x, h - 1 - y);
                f(2 * x + 1, h - 1 - y);
            }
            LayoutKind::Mirror => {
                let dw = self.data_width;
                f(dw - 1 - x, h - 1 - y);
                f(dw + x, h - 1 - y);
            }
            LayoutKind::Quad => {
                let (dw, dh) = (self.data_width, self.data_height);
                f(dw - 1 - x, dh - 1 - y);
                f(dw + x, dh - 1 - y);
                f(dw - 1 - x, dh + y);
                f(dw + x, dh + y);
            }
            LayoutKind::QuadSideways => {
                let half = h / 2;
                f(y, half - 1 - x);
                f(w - 1 - y, half - 1 - x);
                f(y, half + x);
                f(w - 1 - y, half + x);
            }
        }
    }
}
