//! Inverse distance weighting.

use super::SurfaceModel;
use crate::types::SamplePoint;

/// Distance below which a node is treated as coinciding with a sample.
pub const EXACT_MATCH_EPSILON: f64 = 1e-8;

/// Inverse distance weighted surface: `sum(z / d^p) / sum(1 / d^p)`.
#[derive(Debug, Clone)]
pub struct IdwModel {
    points: Vec<SamplePoint>,
    power: f64,
}

impl IdwModel {
    pub fn new(points: Vec<SamplePoint>, power: f64) -> Self {
        Self { points, power }
    }
}

impl SurfaceModel for IdwModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        // A node sitting on a sample takes the sample value verbatim.
        if let Some(hit) = self
            .points
            .iter()
            .find(|p| p.distance_to(x, y) < EXACT_MATCH_EPSILON)
        {
            return hit.value;
        }

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for p in &self.points {
            let w = 1.0 / p.distance_to(x, y).powf(self.power);
            weighted += w * p.value;
            total_weight += w;
        }

        if total_weight > 0.0 {
            weighted / total_weight
        } else {
            f64::NAN
        }
    }
}
