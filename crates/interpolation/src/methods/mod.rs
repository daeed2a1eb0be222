//! Interpolation methods.
//!
//! Each method fits a [`SurfaceModel`] to the samples once; the model is then
//! evaluated at every grid node, one row per rayon task.

pub mod delaunay;
pub mod idw;
pub mod kriging;
pub mod rbf;
pub mod scattered;

use crate::config::InterpolationConfig;
use crate::error::Result;
use crate::types::{InterpolationMethod, SamplePoint};
use air_common::GeoTransform;
use rayon::prelude::*;

pub use idw::IdwModel;
pub use kriging::KrigingModel;
pub use rbf::RbfModel;
pub use scattered::{CubicModel, LinearModel, NearestModel};

/// A fitted surface that can be evaluated at any (lon, lat).
pub trait SurfaceModel: Send + Sync {
    /// Interpolated value, NaN where the method has no support.
    fn evaluate(&self, x: f64, y: f64) -> f64;
}

/// Fit the requested method to the samples.
pub fn fit(
    method: InterpolationMethod,
    points: &[SamplePoint],
    config: &InterpolationConfig,
) -> Result<Box<dyn SurfaceModel>> {
    let model: Box<dyn SurfaceModel> = match method {
        InterpolationMethod::Idw => Box::new(IdwModel::new(points.to_vec(), config.idw_power)),
        InterpolationMethod::Rbf => Box::new(RbfModel::fit(points, config.rbf_kernel)?),
        InterpolationMethod::Linear => Box::new(LinearModel::fit(points)?),
        InterpolationMethod::Cubic => Box::new(CubicModel::fit(points)?),
        InterpolationMethod::Nearest => Box::new(NearestModel::new(points.to_vec())),
        InterpolationMethod::Kriging => Box::new(KrigingModel::fit(points)?),
    };
    Ok(model)
}

/// Evaluate a model at every node of a `width` x `height` lattice.
pub fn evaluate_grid(
    model: &dyn SurfaceModel,
    width: usize,
    height: usize,
    transform: &GeoTransform,
) -> Vec<f64> {
    let mut values = vec![f64::NAN; width * height];
    values
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, chunk)| {
            let y = transform.node_y(row);
            for (col, value) in chunk.iter_mut().enumerate() {
                *value = model.evaluate(transform.node_x(col), y);
            }
        });
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plane;

    impl SurfaceModel for Plane {
        fn evaluate(&self, x: f64, y: f64) -> f64 {
            x + 10.0 * y
        }
    }

    #[test]
    fn test_evaluate_grid_row_major_north_first() {
        let t = GeoTransform::new(0.0, 2.0, 1.0);
        let values = evaluate_grid(&Plane, 2, 2, &t);
        // nodes: (0.5,1.5) (1.5,1.5) (0.5,0.5) (1.5,0.5)
        assert_eq!(values, vec![15.5, 16.5, 5.5, 6.5]);
    }
}
