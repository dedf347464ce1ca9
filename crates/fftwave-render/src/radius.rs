//! Per-pixel distance from a center point, rounded to whole pixels

/// Rounded Euclidean distance of every `(x, y)` in a `width × height` grid
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusMap {
    width: usize,
    height: usize,
    radii: Vec<usize>,
    max: usize,
}

impl RadiusMap {
    /// Distances from `(center_x, center_y)`; the center may lie off-grid.
    pub fn new(width: usize, height: usize, center_x: f64, center_y: f64) -> Self {
        let mut radii = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 - center_x;
                let dy = y as f64 - center_y;
                radii.push(dx.hypot(dy).round() as usize);
            }
        }
        let max = radii.iter().copied().max().unwrap_or(0);
        Self {
            width,
            height,
            radii,
            max,
        }
    }

    /// Distances from the grid center `(w/2 - 0.5, h/2 - 0.5)`
    pub fn centered(width: usize, height: usize) -> Self {
        Self::new(
            width,
            height,
            width as f64 / 2.0 - 0.5,
            height as f64 / 2.0 - 0.5,
        )
    }

    /// Radius at `(x, y)`
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> usize {
        self.radii[y * self.width + x]
    }

    /// Largest radius in the grid
    pub fn max(&self) -> usize {
        self.max
    }

    /// Grid size
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_radii() {
        let map = RadiusMap::centered(4, 4);
        // (1.5, 1.5) is the center; the inner four pixels are ~0.71 away
        assert_eq!(map.get(1, 1), 1);
        assert_eq!(map.get(2, 2), 1);
        // corners are ~2.12 away
        assert_eq!(map.get(0, 0), 2);
        assert_eq!(map.max(), 2);
    }

    #[test]
    fn test_off_grid_center() {
        let map = RadiusMap::new(3, 3, -0.5, 3.5);
        assert_eq!(map.get(0, 2), 2); // hypot(0.5, 1.5) = 1.58
        assert_eq!(map.get(2, 0), 4); // hypot(2.5, 3.5) = 4.30
        assert_eq!(map.size(), (3, 3));
    }
}
