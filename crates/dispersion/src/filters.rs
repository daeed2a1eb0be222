//! Grid filters used by the dispersion step: sub-cell shift and Gaussian blur.
//!
//! Both operate on row-major `f64` buffers with row 0 at the north edge.

use rayon::prelude::*;

fn get_or_zero(values: &[f64], width: usize, height: usize, row: i64, col: i64) -> f64 {
    if row < 0 || col < 0 || row >= height as i64 || col >= width as i64 {
        0.0
    } else {
        values[row as usize * width + col as usize]
    }
}

/// Move the field `dx` cells east and `dy` cells north.
///
/// Output cells sample the input bilinearly; anything outside the grid
/// counts as zero, so mass advected off the edge is lost.
pub fn shift_bilinear(values: &[f64], width: usize, height: usize, dx: f64, dy: f64) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    out.par_chunks_mut(width).enumerate().for_each(|(row, chunk)| {
        // North is up: moving content north means sampling from further south.
        let src_row = row as f64 + dy;
        let r0 = src_row.floor();
        let tr = src_row - r0;
        for (col, value) in chunk.iter_mut().enumerate() {
            let src_col = col as f64 - dx;
            let c0 = src_col.floor();
            let tc = src_col - c0;
            let (r0, c0) = (r0 as i64, c0 as i64);

            let v00 = get_or_zero(values, width, height, r0, c0);
            let v01 = get_or_zero(values, width, height, r0, c0 + 1);
            let v10 = get_or_zero(values, width, height, r0 + 1, c0);
            let v11 = get_or_zero(values, width, height, r0 + 1, c0 + 1);

            *value = (1.0 - tr) * ((1.0 - tc) * v00 + tc * v01) + tr * ((1.0 - tc) * v10 + tc * v11);
        }
    });
    out
}

/// Normalised 1-D Gaussian kernel with radius `round(truncate * sigma)`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5).floor() as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Mirror an index into `0..n` with half-sample symmetry (`d c b a | a b c d | d c b a`).
fn reflect(index: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = index.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Separable Gaussian blur with reflected boundaries.
pub fn gaussian_blur(values: &[f64], width: usize, height: usize, sigma: f64, truncate: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return values.to_vec();
    }
    let kernel = gaussian_kernel(sigma, truncate);
    let radius = (kernel.len() / 2) as i64;

    let mut horizontal = vec![0.0; values.len()];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, chunk)| {
            let src = &values[row * width..(row + 1) * width];
            for (col, value) in chunk.iter_mut().enumerate() {
                *value = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * src[reflect(col as i64 + k as i64 - radius, width)])
                    .sum();
            }
        });

    let mut out = vec![0.0; values.len()];
    out.par_chunks_mut(width).enumerate().for_each(|(row, chunk)| {
        for (col, value) in chunk.iter_mut().enumerate() {
            *value = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let r = reflect(row as i64 + k as i64 - radius, height);
                    w * horizontal[r * width + col]
                })
                .sum();
        }
    });
    out
}
