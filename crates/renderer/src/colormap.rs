//! Colour ramp rendering for concentration grids.

use air_common::ConcentrationGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Colour value in RGBA format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Piecewise-linear channel definition: `(position, intensity)` pairs.
type Channel = &'static [(f64, f64)];

const JET_RED: Channel = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: Channel = &[(0.0, 0.0), (0.125, 0.0), (0.375, 1.0), (0.64, 1.0), (0.91, 0.0), (1.0, 0.0)];
const JET_BLUE: Channel = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn channel(stops: Channel, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let mut value = stops[stops.len() - 1].1;
    for pair in stops.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if t <= x1 {
            let f = if x1 > x0 { (t - x0) / (x1 - x0) } else { 0.0 };
            value = y0 + (y1 - y0) * f;
            break;
        }
    }
    (value * 255.0).round() as u8
}

/// Blue-cyan-yellow-red "jet" ramp for a normalised value in [0, 1].
pub fn jet(t: f64) -> Color {
    Color::new(channel(JET_RED, t), channel(JET_GREEN, t), channel(JET_BLUE, t), 255)
}

/// Options for [`render_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Output pixels per grid cell along each axis.
    pub pixels_per_cell: usize,
    /// Append a vertical colour bar (max at the top) to the right edge.
    pub colorbar: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            pixels_per_cell: 4,
            colorbar: true,
        }
    }
}

const COLORBAR_GAP: usize = 4;
const COLORBAR_WIDTH: usize = 12;

/// RGBA pixels with dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// Render a grid with the jet ramp scaled to its finite min/max.
///
/// NaN cells are transparent. A constant grid renders at the bottom of the
/// ramp.
pub fn render_grid(grid: &ConcentrationGrid, style: &RenderStyle) -> RgbaImage {
    let scale = style.pixels_per_cell.max(1);
    let (min, max) = grid.stats().map(|s| (s.min, s.max)).unwrap_or((0.0, 1.0));
    let range = if max - min > f64::EPSILON { max - min } else { 1.0 };

    let map_width = grid.width() * scale;
    let height = grid.height() * scale;
    let width = if style.colorbar {
        map_width + COLORBAR_GAP + COLORBAR_WIDTH
    } else {
        map_width
    };

    let mut pixels = vec![0u8; width * height * 4];
    pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let grid_row = y / scale;
            for x in 0..map_width {
                let value = grid.get(grid_row, x / scale).unwrap_or(f64::NAN);
                let color = if value.is_finite() {
                    jet((value - min) / range)
                } else {
                    Color::transparent()
                };
                put(row, x, color);
            }
            if style.colorbar {
                let t = if height > 1 {
                    1.0 - y as f64 / (height - 1) as f64
                } else {
                    1.0
                };
                let color = jet(t);
                for x in map_width + COLORBAR_GAP..width {
                    put(row, x, color);
                }
            }
        });

    RgbaImage { width, height, pixels }
}

fn put(row: &mut [u8], x: usize, color: Color) {
    let i = x * 4;
    row[i] = color.r;
    row[i + 1] = color.g;
    row[i + 2] = color.b;
    row[i + 3] = color.a;
}
