//! Radial basis function interpolation.

use super::SurfaceModel;
use crate::error::{InterpolationError, Result};
use crate::types::{InterpolationMethod, RbfKernel, SamplePoint};
use nalgebra::{DMatrix, DVector};

/// Weighted sum of radial kernels centred on every sample.
#[derive(Debug, Clone)]
pub struct RbfModel {
    points: Vec<SamplePoint>,
    weights: Vec<f64>,
    kernel: RbfKernel,
    epsilon: f64,
}

impl RbfModel {
    /// Solve `A w = z` with `A[i][j] = phi(|p_i - p_j|)`.
    pub fn fit(points: &[SamplePoint], kernel: RbfKernel) -> Result<Self> {
        if points.is_empty() {
            return Err(InterpolationError::NoValidSamples);
        }

        let epsilon = default_epsilon(points);
        let n = points.len();
        let a = DMatrix::from_fn(n, n, |i, j| {
            let r = points[i].distance_to(points[j].x, points[j].y);
            kernel.apply(r, epsilon)
        });
        let z = DVector::from_iterator(n, points.iter().map(|p| p.value));

        let weights = a
            .lu()
            .solve(&z)
            .ok_or_else(|| InterpolationError::singular(InterpolationMethod::Rbf, "kernel matrix is not invertible"))?;

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(InterpolationError::singular(
                InterpolationMethod::Rbf,
                "kernel weights are not finite",
            ));
        }

        Ok(Self {
            points: points.to_vec(),
            weights: weights.iter().copied().collect(),
            kernel,
            epsilon,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

/// Average sample spacing: `(extent area / n) ^ (1 / dims)` over the
/// non-degenerate axes, 1.0 when all samples share a location.
fn default_epsilon(points: &[SamplePoint]) -> f64 {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let edges: Vec<f64> = [max_x - min_x, max_y - min_y]
        .into_iter()
        .filter(|e| *e > 0.0)
        .collect();
    if edges.is_empty() {
        return 1.0;
    }

    let product: f64 = edges.iter().product();
    (product / points.len() as f64).powf(1.0 / edges.len() as f64)
}

impl SurfaceModel for RbfModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| w * self.kernel.apply(p.distance_to(x, y), self.epsilon))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<SamplePoint> {
        vec![
            SamplePoint { x: 0.0, y: 0.0, value: 1.0 },
            SamplePoint { x: 1.0, y: 0.0, value: 2.0 },
            SamplePoint { x: 0.0, y: 1.0, value: 3.0 },
            SamplePoint { x: 1.0, y: 1.0, value: 4.0 },
        ]
    }

    #[test]
    fn test_rbf_reproduces_samples() {
        for kernel in [RbfKernel::Multiquadric, RbfKernel::Gaussian, RbfKernel::Inverse] {
            let model = RbfModel::fit(&square(), kernel).unwrap();
            for p in square() {
                assert!(
                    (model.evaluate(p.x, p.y) - p.value).abs() < 1e-6,
                    "{:?} at ({}, {})",
                    kernel,
                    p.x,
                    p.y
                );
            }
        }
    }

    #[test]
    fn test_epsilon_is_mean_spacing() {
        let model = RbfModel::fit(&square(), RbfKernel::Multiquadric).unwrap();
        // sqrt(1 * 1 / 4)
        assert!((model.epsilon() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_locations_are_singular() {
        let points = vec![
            SamplePoint { x: 0.0, y: 0.0, value: 1.0 },
            SamplePoint { x: 0.0, y: 0.0, value: 2.0 },
        ];
        assert!(RbfModel::fit(&points, RbfKernel::Multiquadric).is_err());
    }

    #[test]
    fn test_single_sample() {
        let points = vec![SamplePoint { x: 5.0, y: 5.0, value: 7.0 }];
        let model = RbfModel::fit(&points, RbfKernel::Multiquadric).unwrap();
        assert!((model.evaluate(5.0, 5.0) - 7.0).abs() < 1e-12);
    }
}
