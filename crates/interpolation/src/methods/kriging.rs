//! Ordinary kriging with a linear variogram.

use super::SurfaceModel;
use crate::error::{InterpolationError, Result};
use crate::types::{InterpolationMethod, SamplePoint};
use nalgebra::{DMatrix, DVector};

/// Ordinary kriging model.
///
/// The variogram is `gamma(h) = slope * h`, with the slope fitted by least
/// squares through the origin over all sample pairs. The kriging system is
/// inverted once; each node then costs one matrix-vector product.
#[derive(Debug, Clone)]
pub struct KrigingModel {
    points: Vec<SamplePoint>,
    slope: f64,
    inverse: DMatrix<f64>,
}

impl KrigingModel {
    pub fn fit(points: &[SamplePoint]) -> Result<Self> {
        if points.is_empty() {
            return Err(InterpolationError::NoValidSamples);
        }

        let slope = fit_linear_variogram(points)?;
        let n = points.len();

        // [ Gamma 1 ] [ lambda ]   [ gamma_0 ]
        // [ 1^T   0 ] [   mu   ] = [    1    ]
        let system = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i < n, j < n) {
            (true, true) => slope * points[i].distance_to(points[j].x, points[j].y),
            (false, false) => 0.0,
            _ => 1.0,
        });

        let inverse = system.lu().try_inverse().ok_or_else(|| {
            InterpolationError::singular(InterpolationMethod::Kriging, "kriging system is not invertible")
        })?;

        if inverse.iter().any(|v| !v.is_finite()) {
            return Err(InterpolationError::singular(
                InterpolationMethod::Kriging,
                "kriging system is ill-conditioned",
            ));
        }

        Ok(Self {
            points: points.to_vec(),
            slope,
            inverse,
        })
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }
}

/// Least-squares slope through the origin of the semivariance cloud
/// `(h_ij, 0.5 * (z_i - z_j)^2)`.
fn fit_linear_variogram(points: &[SamplePoint]) -> Result<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let h = a.distance_to(b.x, b.y);
            let gamma = 0.5 * (a.value - b.value).powi(2);
            num += h * gamma;
            den += h * h;
        }
    }

    if den <= 0.0 {
        return Err(InterpolationError::degenerate(
            InterpolationMethod::Kriging,
            "at least two distinct sample locations are required",
        ));
    }

    let slope = num / den;
    if !slope.is_finite() || slope <= 0.0 {
        return Err(InterpolationError::singular(
            InterpolationMethod::Kriging,
            format!("variogram slope {} is not positive", slope),
        ));
    }
    Ok(slope)
}

impl SurfaceModel for KrigingModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let n = self.points.len();
        let rhs = DVector::from_fn(n + 1, |i, _| {
            if i < n {
                self.slope * self.points[i].distance_to(x, y)
            } else {
                1.0
            }
        });
        let weights = &self.inverse * rhs;
        self.points
            .iter()
            .zip(weights.iter())
            .map(|(p, w)| w * p.value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<SamplePoint> {
        vec![
            SamplePoint { x: 0.0, y: 0.0, value: 10.0 },
            SamplePoint { x: 1.0, y: 0.0, value: 20.0 },
            SamplePoint { x: 0.0, y: 1.0, value: 40.0 },
        ]
    }

    #[test]
    fn test_kriging_is_exact_at_samples() {
        let model = KrigingModel::fit(&triangle()).unwrap();
        for p in triangle() {
            assert!((model.evaluate(p.x, p.y) - p.value).abs() < 1e-8);
        }
    }

    #[test]
    fn test_kriging_stays_within_sample_range_inside_hull() {
        let model = KrigingModel::fit(&triangle()).unwrap();
        let v = model.evaluate(0.25, 0.25);
        assert!(v > 10.0 && v < 40.0, "got {}", v);
    }

    #[test]
    fn test_single_sample_fails() {
        let points = vec![SamplePoint { x: 0.0, y: 0.0, value: 1.0 }];
        assert!(matches!(
            KrigingModel::fit(&points),
            Err(InterpolationError::Degenerate { .. })
        ));
    }

    #[test]
    fn test_constant_field_fails() {
        let points = vec![
            SamplePoint { x: 0.0, y: 0.0, value: 5.0 },
            SamplePoint { x: 1.0, y: 0.0, value: 5.0 },
            SamplePoint { x: 0.0, y: 1.0, value: 5.0 },
        ];
        assert!(matches!(
            KrigingModel::fit(&points),
            Err(InterpolationError::Singular { .. })
        ));
    }
}
