//! Scattered-data interpolation on a Delaunay triangulation.

use super::delaunay::Triangulation;
use super::SurfaceModel;
use crate::error::{InterpolationError, Result};
use crate::types::{InterpolationMethod, SamplePoint};

fn triangulate(points: &[SamplePoint], method: InterpolationMethod) -> Result<Triangulation> {
    if points.is_empty() {
        return Err(InterpolationError::NoValidSamples);
    }
    Triangulation::build(points).ok_or_else(|| {
        InterpolationError::degenerate(method, "at least 3 non-collinear samples are required")
    })
}

/// Piecewise-linear (barycentric) surface. NaN outside the convex hull.
#[derive(Debug, Clone)]
pub struct LinearModel {
    mesh: Triangulation,
}

impl LinearModel {
    pub fn fit(points: &[SamplePoint]) -> Result<Self> {
        Ok(Self {
            mesh: triangulate(points, InterpolationMethod::Linear)?,
        })
    }
}

impl SurfaceModel for LinearModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        match self.mesh.locate(x, y) {
            Some(loc) => loc
                .triangle
                .iter()
                .zip(loc.weights)
                .map(|(&v, w)| w * self.mesh.points()[v].value)
                .sum(),
            None => f64::NAN,
        }
    }
}

/// Cubic Bézier triangle patches. NaN outside the convex hull.
///
/// Vertex gradients come from a least-squares plane through each vertex and
/// its mesh neighbours; edge control points follow the gradients, the centre
/// control point is `E + (E - V) / 2`.
#[derive(Debug, Clone)]
pub struct CubicModel {
    mesh: Triangulation,
    gradients: Vec<(f64, f64)>,
}

impl CubicModel {
    pub fn fit(points: &[SamplePoint]) -> Result<Self> {
        let mesh = triangulate(points, InterpolationMethod::Cubic)?;
        let gradients = estimate_gradients(&mesh);
        Ok(Self { mesh, gradients })
    }

    fn control_point(&self, from: usize, towards: usize) -> f64 {
        let p = self.mesh.points()[from];
        let q = self.mesh.points()[towards];
        let (gx, gy) = self.gradients[from];
        p.value + (gx * (q.x - p.x) + gy * (q.y - p.y)) / 3.0
    }
}

fn estimate_gradients(mesh: &Triangulation) -> Vec<(f64, f64)> {
    let points = mesh.points();
    mesh.neighbours()
        .iter()
        .enumerate()
        .map(|(i, adjacent)| {
            let p = points[i];
            let (mut sxx, mut sxy, mut syy, mut sxz, mut syz) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for &j in adjacent {
                let dx = points[j].x - p.x;
                let dy = points[j].y - p.y;
                let dz = points[j].value - p.value;
                sxx += dx * dx;
                sxy += dx * dy;
                syy += dy * dy;
                sxz += dx * dz;
                syz += dy * dz;
            }
            let det = sxx * syy - sxy * sxy;
            if det.abs() < f64::EPSILON * (sxx * syy).abs().max(f64::MIN_POSITIVE) {
                (0.0, 0.0)
            } else {
                ((syy * sxz - sxy * syz) / det, (sxx * syz - sxy * sxz) / det)
            }
        })
        .collect()
}

impl SurfaceModel for CubicModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let Some(loc) = self.mesh.locate(x, y) else {
            return f64::NAN;
        };
        let [a, b, c] = loc.triangle;
        let [u, v, w] = loc.weights;
        let pts = self.mesh.points();

        let b300 = pts[a].value;
        let b030 = pts[b].value;
        let b003 = pts[c].value;
        let b210 = self.control_point(a, b);
        let b120 = self.control_point(b, a);
        let b201 = self.control_point(a, c);
        let b102 = self.control_point(c, a);
        let b021 = self.control_point(b, c);
        let b012 = self.control_point(c, b);

        let e = (b210 + b120 + b201 + b102 + b021 + b012) / 6.0;
        let vertex_mean = (b300 + b030 + b003) / 3.0;
        let b111 = e + (e - vertex_mean) / 2.0;

        u.powi(3) * b300
            + v.powi(3) * b030
            + w.powi(3) * b003
            + 3.0 * u * u * v * b210
            + 3.0 * u * v * v * b120
            + 3.0 * u * u * w * b201
            + 3.0 * u * w * w * b102
            + 3.0 * v * v * w * b021
            + 3.0 * v * w * w * b012
            + 6.0 * u * v * w * b111
    }
}

/// Value of the nearest sample, defined everywhere.
#[derive(Debug, Clone)]
pub struct NearestModel {
    points: Vec<SamplePoint>,
}

impl NearestModel {
    pub fn new(points: Vec<SamplePoint>) -> Self {
        Self { points }
    }
}

impl SurfaceModel for NearestModel {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.points
            .iter()
            .map(|p| (p.distance_to(x, y), p.value))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, value)| value)
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(points: &[(f64, f64)]) -> Vec<SamplePoint> {
        points
            .iter()
            .map(|&(x, y)| SamplePoint {
                x,
                y,
                value: 2.0 * x + 3.0 * y + 1.0,
            })
            .collect()
    }

    fn grid_points() -> Vec<(f64, f64)> {
        vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.2),
            (2.0, 1.0),
            (0.0, 2.0),
            (1.0, 2.0),
            (2.0, 2.0),
        ]
    }

    #[test]
    fn test_linear_reproduces_plane() {
        let model = LinearModel::fit(&plane(&grid_points())).unwrap();
        let v = model.evaluate(0.7, 1.4);
        assert!((v - (2.0 * 0.7 + 3.0 * 1.4 + 1.0)).abs() < 1e-9, "got {}", v);
    }

    #[test]
    fn test_cubic_reproduces_plane() {
        let model = CubicModel::fit(&plane(&grid_points())).unwrap();
        for (x, y) in [(0.3, 0.3), (1.5, 0.6), (1.1, 1.8)] {
            let v = model.evaluate(x, y);
            assert!((v - (2.0 * x + 3.0 * y + 1.0)).abs() < 1e-9, "({}, {}) -> {}", x, y, v);
        }
    }

    #[test]
    fn test_outside_hull_is_nan() {
        let model = LinearModel::fit(&plane(&grid_points())).unwrap();
        assert!(model.evaluate(5.0, 5.0).is_nan());
        let model = CubicModel::fit(&plane(&grid_points())).unwrap();
        assert!(model.evaluate(-1.0, 0.5).is_nan());
    }

    #[test]
    fn test_collinear_is_degenerate() {
        let points = plane(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(matches!(
            LinearModel::fit(&points),
            Err(InterpolationError::Degenerate {
                method: InterpolationMethod::Linear,
                ..
            })
        ));
        assert!(CubicModel::fit(&points).is_err());
    }

    #[test]
    fn test_nearest_everywhere() {
        let model = NearestModel::new(vec![
            SamplePoint { x: 0.0, y: 0.0, value: 1.0 },
            SamplePoint { x: 10.0, y: 0.0, value: 2.0 },
        ]);
        assert_eq!(model.evaluate(-50.0, 3.0), 1.0);
        assert_eq!(model.evaluate(6.0, 0.0), 2.0);
    }
}
