//! Steady-state Gaussian plume from a single point source.

use air_common::{AirResult, ConcentrationGrid};
use serde::{Deserialize, Serialize};

/// Planar degrees-to-metres factor; longitudes are additionally scaled by
/// the cosine of the source latitude.
const METRES_PER_DEGREE: f64 = 111_000.0;

/// Point-source plume with dispersion coefficients growing linearly
/// downwind (`sigma_y = sigma_z = 0.1 * x`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianPlume {
    /// m/s
    pub wind_speed: f64,
    /// Degrees, meteorological convention.
    pub wind_direction: f64,
    /// Source strength (mass per second).
    pub emission_rate: f64,
    /// m
    pub stack_height: f64,
}

impl GaussianPlume {
    /// Ground-level concentration at `downwind` metres along the plume axis
    /// and `crosswind` metres off it.
    ///
    /// Zero upwind of the source and in calm air.
    pub fn concentration(&self, downwind: f64, crosswind: f64) -> f64 {
        if downwind <= 0.0 || self.wind_speed <= 0.0 {
            return 0.0;
        }
        let sigma_y = 0.1 * downwind;
        let sigma_z = 0.1 * downwind;
        let lateral = (-0.5 * (crosswind / sigma_y).powi(2)).exp();
        self.emission_rate / (2.0 * std::f64::consts::PI * self.wind_speed * sigma_y * sigma_z) * lateral
    }

    /// Split an east/north offset (metres) from the source into
    /// `(downwind, crosswind)` along the direction the wind blows towards.
    pub fn plume_coordinates(&self, east: f64, north: f64) -> (f64, f64) {
        let towards = (self.wind_direction + 180.0).to_radians();
        let (ux, uy) = (towards.sin(), towards.cos());
        (east * ux + north * uy, -east * uy + north * ux)
    }

    /// Evaluate the plume at every node of `template` for a source at
    /// `(lon, lat)`, giving a grid suitable as a forecast starting point.
    pub fn rasterize(&self, source: (f64, f64), template: &ConcentrationGrid) -> AirResult<ConcentrationGrid> {
        let (lon0, lat0) = source;
        let lon_scale = METRES_PER_DEGREE * lat0.to_radians().cos();
        let values = template
            .nodes()
            .map(|(x, y)| {
                let (downwind, crosswind) =
                    self.plume_coordinates((x - lon0) * lon_scale, (y - lat0) * METRES_PER_DEGREE);
                self.concentration(downwind, crosswind)
            })
            .collect();
        template.with_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plume() -> GaussianPlume {
        GaussianPlume {
            wind_speed: 5.0,
            wind_direction: 270.0,
            emission_rate: 100.0,
            stack_height: 30.0,
        }
    }

    #[test]
    fn test_upwind_is_zero() {
        assert_eq!(plume().concentration(-10.0, 0.0), 0.0);
        assert_eq!(plume().concentration(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_decreases_off_axis_and_downwind() {
        let p = plume();
        assert!(p.concentration(100.0, 0.0) > p.concentration(100.0, 10.0));
        assert!(p.concentration(100.0, 0.0) > p.concentration(200.0, 0.0));
    }

    #[test]
    fn test_westerly_wind_blows_east() {
        let (downwind, crosswind) = plume().plume_coordinates(100.0, 0.0);
        assert!((downwind - 100.0).abs() < 1e-9);
        assert!(crosswind.abs() < 1e-9);
    }
}
