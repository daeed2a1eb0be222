//! Regular lat/lon concentration grids.

use crate::{AirError, AirResult, BoundingBox};
use serde::{Deserialize, Serialize};

/// Coordinate reference system of every grid and stored geometry.
pub const GRID_CRS: &str = "EPSG:4326";

/// North-up affine transform (rotation is always zero).
///
/// `origin_x`/`origin_y` is the north-west corner of the top-left cell.
/// Cell `(row, col)` spans `cell_size` degrees on both axes and is centred
/// on its node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_size,
        }
    }

    /// Longitude of the node at `col`.
    pub fn node_x(&self, col: usize) -> f64 {
        self.origin_x + (col as f64 + 0.5) * self.cell_size
    }

    /// Latitude of the node at `row`.
    pub fn node_y(&self, row: usize) -> f64 {
        self.origin_y - (row as f64 + 0.5) * self.cell_size
    }

    /// World coordinate of a cell corner in corner-index space.
    ///
    /// Corner `(vx, vy)` is the north-west corner of cell `(row = vy, col = vx)`.
    pub fn corner(&self, vx: i64, vy: i64) -> (f64, f64) {
        (
            self.origin_x + vx as f64 * self.cell_size,
            self.origin_y - vy as f64 * self.cell_size,
        )
    }

    /// Fractional (col, row) position of a coordinate in node space.
    pub fn fractional_index(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.cell_size - 0.5,
            (self.origin_y - y) / self.cell_size - 0.5,
        )
    }

    /// The six GDAL-style coefficients `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.cell_size,
            0.0,
            self.origin_x,
            0.0,
            -self.cell_size,
            self.origin_y,
        ]
    }
}

/// Summary statistics of finite grid values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid_cells: usize,
}

/// Interpolated pollutant concentration over a regular lat/lon lattice.
///
/// Values are row-major with row 0 at the northern edge. Every operation
/// that changes values returns a new grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
    transform: GeoTransform,
}

impl ConcentrationGrid {
    /// Create a grid from row-major values.
    pub fn new(width: usize, height: usize, values: Vec<f64>, transform: GeoTransform) -> AirResult<Self> {
        if width == 0 || height == 0 {
            return Err(AirError::validation("grid dimensions must be non-zero"));
        }
        if values.len() != width * height {
            return Err(AirError::validation(format!(
                "grid has {} values, expected {}x{}",
                values.len(),
                width,
                height
            )));
        }
        if !(transform.cell_size.is_finite() && transform.cell_size > 0.0) {
            return Err(AirError::validation("cell size must be positive"));
        }
        Ok(Self {
            width,
            height,
            values,
            transform,
        })
    }

    /// Node lattice covering `bounds` (both edges included) at `cell_size`.
    ///
    /// Returns `(width, height, transform)`.
    pub fn lattice_for(bounds: &BoundingBox, cell_size: f64) -> AirResult<(usize, usize, GeoTransform)> {
        if !bounds.is_valid() {
            return Err(AirError::validation("grid bounds are inverted or non-finite"));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(AirError::validation("resolution must be positive"));
        }
        let width = (bounds.width() / cell_size + 1e-6).floor() as usize + 1;
        let height = (bounds.height() / cell_size + 1e-6).floor() as usize + 1;
        let transform = GeoTransform::new(
            bounds.min_x - cell_size / 2.0,
            bounds.max_y + cell_size / 2.0,
            cell_size,
        );
        Ok((width, height, transform))
    }

    /// Same geometry, new values.
    pub fn with_values(&self, values: Vec<f64>) -> AirResult<Self> {
        Self::new(self.width, self.height, values, self.transform)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &'static str {
        GRID_CRS
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size
    }

    /// Extent of the node lattice (first node to last node).
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.transform.node_x(0),
            self.transform.node_y(self.height - 1),
            self.transform.node_x(self.width - 1),
            self.transform.node_y(0),
        )
    }

    /// Extent covered by the cells (node extent plus half a cell).
    pub fn extent(&self) -> BoundingBox {
        self.bounds().padded(self.transform.cell_size / 2.0)
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.values[row * self.width + col])
    }

    /// Cell containing a lon/lat coordinate.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (fc, fr) = self.transform.fractional_index(x, y);
        let col = (fc + 0.5).floor();
        let row = (fr + 0.5).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Value of the cell containing a lon/lat coordinate.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.cell_at(x, y)?;
        self.get(row, col)
    }

    /// Iterate `(x, y)` node coordinates in row-major order.
    pub fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.height).flat_map(move |row| {
            (0..self.width).map(move |col| (self.transform.node_x(col), self.transform.node_y(row)))
        })
    }

    /// Sum of all finite values.
    pub fn total_mass(&self) -> f64 {
        self.values.iter().filter(|v| v.is_finite()).sum()
    }

    /// Statistics over finite values, `None` when every cell is NaN.
    pub fn stats(&self) -> Option<GridStats> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in self.values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(GridStats {
            min,
            max,
            mean: sum / count as f64,
            valid_cells: count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_includes_both_edges() {
        let bounds = BoundingBox::new(77.109, 28.5139, 77.309, 28.7139);
        let (w, h, t) = ConcentrationGrid::lattice_for(&bounds, 0.01).unwrap();
        assert_eq!(w, 21);
        assert_eq!(h, 21);
        assert!((t.node_x(0) - 77.109).abs() < 1e-9);
        assert!((t.node_x(10) - 77.209).abs() < 1e-9);
        assert!((t.node_y(0) - 28.7139).abs() < 1e-9);
        assert!((t.node_y(10) - 28.6139).abs() < 1e-9);
    }

    #[test]
    fn test_cell_lookup_and_value() {
        let t = GeoTransform::new(0.0, 3.0, 1.0);
        let grid = ConcentrationGrid::new(3, 3, (0..9).map(f64::from).collect(), t).unwrap();

        // node of (row 1, col 2) is (2.5, 1.5)
        assert_eq!(grid.cell_at(2.5, 1.5), Some((1, 2)));
        assert_eq!(grid.value_at(2.5, 1.5), Some(5.0));
        assert_eq!(grid.cell_at(3.5, 1.5), None);
        assert_eq!(grid.bounds(), BoundingBox::new(0.5, 0.5, 2.5, 2.5));
        assert_eq!(grid.extent(), BoundingBox::new(0.0, 0.0, 3.0, 3.0));
    }

    #[test]
    fn test_stats_ignore_nan() {
        let t = GeoTransform::new(0.0, 2.0, 1.0);
        let grid = ConcentrationGrid::new(2, 2, vec![1.0, f64::NAN, 3.0, 5.0], t).unwrap();
        let stats = grid.stats().unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.valid_cells, 3);
        assert_eq!(grid.total_mass(), 9.0);
    }

    #[test]
    fn test_rejects_bad_shape() {
        let t = GeoTransform::new(0.0, 2.0, 1.0);
        assert!(ConcentrationGrid::new(2, 2, vec![1.0; 3], t).is_err());
        assert!(ConcentrationGrid::new(0, 2, vec![], t).is_err());
    }
}
