//! Generators for synthetic samples and concentration grids.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite. Nothing here is random: the same arguments always
//! give the same data.

use air_common::{ConcentrationGrid, GeoTransform, Sample, StationId};
use chrono::{DateTime, TimeZone, Utc};

/// Timestamp shared by generated samples and fixtures: 2024-11-05T08:00:00Z.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 5, 8, 0, 0).unwrap()
}

/// A single sample at `(lon, lat)` stamped with [`fixed_time`].
pub fn sample_at(station_id: StationId, lon: f64, lat: f64, value: f64) -> Sample {
    Sample {
        station_id,
        latitude: lat,
        longitude: lon,
        timestamp: fixed_time(),
        value,
    }
}

/// Samples scattered over a box, valued by `field(lon, lat)`.
///
/// Positions follow a 2-D golden-ratio (R2) sequence, which spreads points
/// evenly without clustering or collinearity.
///
/// # Example
///
/// ```
/// use test_utils::scattered_samples;
///
/// let samples = scattered_samples(16, (0.0, 0.0, 1.0, 1.0), |x, y| x + y);
/// assert_eq!(samples.len(), 16);
/// assert!(samples.iter().all(|s| s.longitude >= 0.0 && s.longitude <= 1.0));
/// ```
pub fn scattered_samples<F>(count: usize, bbox: (f64, f64, f64, f64), field: F) -> Vec<Sample>
where
    F: Fn(f64, f64) -> f64,
{
    const G: f64 = 1.324_717_957_244_746; // plastic number
    let (a1, a2) = (1.0 / G, 1.0 / (G * G));
    let (min_x, min_y, max_x, max_y) = bbox;

    (0..count)
        .map(|i| {
            let n = i as f64 + 1.0;
            let u = (0.5 + a1 * n).fract();
            let v = (0.5 + a2 * n).fract();
            let lon = min_x + u * (max_x - min_x);
            let lat = min_y + v * (max_y - min_y);
            sample_at(i as StationId + 1, lon, lat, field(lon, lat))
        })
        .collect()
}

/// A grid whose top-left cell's north-west corner is `(origin_x, origin_y)`.
///
/// `rows` are given north first.
///
/// # Example
///
/// ```
/// use test_utils::grid_from_rows;
///
/// let grid = grid_from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], (0.0, 2.0), 1.0);
/// assert_eq!(grid.get(0, 1), Some(2.0));
/// assert_eq!(grid.value_at(0.5, 0.5), Some(3.0));
/// ```
pub fn grid_from_rows(rows: &[Vec<f64>], origin: (f64, f64), cell_size: f64) -> ConcentrationGrid {
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let values: Vec<f64> = rows.iter().flatten().copied().collect();
    ConcentrationGrid::new(
        width,
        height,
        values,
        GeoTransform::new(origin.0, origin.1, cell_size),
    )
    .expect("rows must form a non-empty rectangle")
}

/// A grid with the same value everywhere.
pub fn uniform_grid(width: usize, height: usize, cell_size: f64, value: f64) -> ConcentrationGrid {
    let rows = vec![vec![value; width]; height];
    grid_from_rows(&rows, (0.0, height as f64 * cell_size), cell_size)
}

/// A Gaussian plume centred on cell `(row, col)`.
///
/// Cell value is `peak * exp(-d^2 / (2 sigma^2))` with `d` in cells. The grid
/// origin is `(0, height * cell_size)`, so lon/lat equal cell offsets scaled
/// by `cell_size`.
pub fn plume_grid(
    width: usize,
    height: usize,
    cell_size: f64,
    center: (usize, usize),
    peak: f64,
    sigma_cells: f64,
) -> ConcentrationGrid {
    let (cr, cc) = (center.0 as f64, center.1 as f64);
    let rows: Vec<Vec<f64>> = (0..height)
        .map(|row| {
            (0..width)
                .map(|col| {
                    let d2 = (row as f64 - cr).powi(2) + (col as f64 - cc).powi(2);
                    peak * (-d2 / (2.0 * sigma_cells * sigma_cells)).exp()
                })
                .collect()
        })
        .collect();
    grid_from_rows(&rows, (0.0, height as f64 * cell_size), cell_size)
}

/// A grid with `value` inside the axis-aligned cell block and `background`
/// elsewhere.
///
/// `block` is `(row_start, col_start, row_end, col_end)`, end exclusive.
pub fn block_grid(
    width: usize,
    height: usize,
    cell_size: f64,
    block: (usize, usize, usize, usize),
    value: f64,
    background: f64,
) -> ConcentrationGrid {
    let (r0, c0, r1, c1) = block;
    let rows: Vec<Vec<f64>> = (0..height)
        .map(|row| {
            (0..width)
                .map(|col| {
                    if (r0..r1).contains(&row) && (c0..c1).contains(&col) {
                        value
                    } else {
                        background
                    }
                })
                .collect()
        })
        .collect();
    grid_from_rows(&rows, (0.0, height as f64 * cell_size), cell_size)
}

/// Cell-to-cell noise in `[0, max)` from an integer hash of `(seed, row, col)`.
///
/// Produces ragged, interleaved masks at every threshold; the same seed
/// always gives the same grid.
pub fn noise_grid(width: usize, height: usize, cell_size: f64, max: f64, seed: u64) -> ConcentrationGrid {
    let rows: Vec<Vec<f64>> = (0..height)
        .map(|row| {
            (0..width)
                .map(|col| {
                    let mut x = seed
                        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                        .wrapping_add(((row as u64) << 32) | col as u64);
                    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
                    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
                    x ^= x >> 31;
                    (x >> 11) as f64 / (1u64 << 53) as f64 * max
                })
                .collect()
        })
        .collect();
    grid_from_rows(&rows, (0.0, height as f64 * cell_size), cell_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scattered_samples_are_deterministic_and_distinct() {
        let a = scattered_samples(25, (0.0, 0.0, 1.0, 1.0), |x, _| x);
        let b = scattered_samples(25, (0.0, 0.0, 1.0, 1.0), |x, _| x);
        assert_eq!(a, b);
        for (i, s) in a.iter().enumerate() {
            for t in &a[i + 1..] {
                assert!(s.longitude != t.longitude || s.latitude != t.latitude);
            }
            assert_eq!(s.value, s.longitude);
        }
    }

    #[test]
    fn test_plume_peak_at_center() {
        let grid = plume_grid(11, 11, 0.1, (5, 5), 100.0, 2.0);
        assert_eq!(grid.get(5, 5), Some(100.0));
        assert!(grid.get(0, 0).unwrap() < 1.0);
        let stats = grid.stats().unwrap();
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn test_noise_grid_is_seeded() {
        let a = noise_grid(6, 5, 0.01, 300.0, 3);
        assert_eq!(a, noise_grid(6, 5, 0.01, 300.0, 3));
        assert_ne!(a, noise_grid(6, 5, 0.01, 300.0, 4));
        assert!(a.values().iter().all(|v| (0.0..300.0).contains(v)));
    }

    #[test]
    fn test_block_grid() {
        let grid = block_grid(5, 4, 1.0, (1, 1, 3, 4), 9.0, 1.0);
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert_eq!(grid.get(1, 1), Some(9.0));
        assert_eq!(grid.get(2, 3), Some(9.0));
        assert_eq!(grid.get(3, 3), Some(1.0));
        assert_eq!(grid.total_mass(), 6.0 * 9.0 + 14.0);
    }
}
