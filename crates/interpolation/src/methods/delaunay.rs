//! Delaunay triangulation of scattered samples.

use crate::types::SamplePoint;
use geo::{Coord, LineString, TriangulateSpade};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Barycentric coordinates may undershoot zero by this much on shared edges.
const BARYCENTRIC_TOLERANCE: f64 = 1e-10;

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Triangle containing a query point, with its barycentric weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub triangle: [usize; 3],
    pub weights: [f64; 3],
}

/// Counter-clockwise triangles over a de-duplicated vertex set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<SamplePoint>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulate the samples. Coincident samples are merged (values
    /// averaged). Returns `None` when fewer than three non-collinear locations
    /// remain.
    pub fn build(samples: &[SamplePoint]) -> Option<Self> {
        let points = merge_coincident(samples);
        if points.len() < 3 {
            return None;
        }

        let index: HashMap<(u64, u64), usize> = points
            .iter()
            .enumerate()
            .map(|(i, p)| ((p.x.to_bits(), p.y.to_bits()), i))
            .collect();
        let vertices: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();

        let faces = match vertices.unconstrained_triangulation() {
            Ok(faces) => faces,
            Err(e) => {
                debug!(error = %e, "Triangulation failed");
                return None;
            }
        };

        let coord = |v: usize| (points[v].x, points[v].y);
        let triangles: Vec<[usize; 3]> = faces
            .iter()
            .filter_map(|face| {
                let [a, b, c] = face
                    .to_array()
                    .map(|corner| index.get(&(corner.x.to_bits(), corner.y.to_bits())).copied());
                let tri = [a?, b?, c?];
                let area2 = orientation(coord(tri[0]), coord(tri[1]), coord(tri[2]));
                if area2 > 0.0 {
                    Some(tri)
                } else if area2 < 0.0 {
                    Some([tri[0], tri[2], tri[1]])
                } else {
                    None
                }
            })
            .collect();

        if triangles.is_empty() {
            return None;
        }

        Some(Self { points, triangles })
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Find the triangle containing `(x, y)`; `None` outside the convex hull.
    pub fn locate(&self, x: f64, y: f64) -> Option<Location> {
        self.triangles.iter().find_map(|tri| {
            let [a, b, c] = tri.map(|v| self.points[v]);
            let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
            if det == 0.0 {
                return None;
            }
            let l1 = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / det;
            let l2 = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / det;
            let l3 = 1.0 - l1 - l2;
            let inside = [l1, l2, l3].iter().all(|l| *l >= -BARYCENTRIC_TOLERANCE);
            inside.then_some(Location {
                triangle: *tri,
                weights: [l1, l2, l3],
            })
        })
    }

    /// For each vertex, the vertices it shares an edge with.
    pub fn neighbours(&self) -> Vec<BTreeSet<usize>> {
        let mut adjacency = vec![BTreeSet::new(); self.points.len()];
        for tri in &self.triangles {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                adjacency[a].insert(b);
                adjacency[b].insert(a);
            }
        }
        adjacency
    }
}

fn merge_coincident(samples: &[SamplePoint]) -> Vec<SamplePoint> {
    let mut merged: Vec<(SamplePoint, usize)> = Vec::with_capacity(samples.len());
    for s in samples {
        match merged
            .iter_mut()
            .find(|(p, _)| p.x == s.x && p.y == s.y)
        {
            Some((p, count)) => {
                p.value += s.value;
                *count += 1;
            }
            None => merged.push((*s, 1)),
        }
    }
    merged
        .into_iter()
        .map(|(mut p, count)| {
            p.value /= count as f64;
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> SamplePoint {
        SamplePoint { x, y, value: 0.0 }
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let tri = Triangulation::build(&[pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)]).unwrap();
        assert_eq!(tri.triangles().len(), 2);
    }

    #[test]
    fn test_collinear_points_fail() {
        assert!(Triangulation::build(&[pt(0.0, 0.0), pt(1.0, 1.0), pt(2.0, 2.0)]).is_none());
        assert!(Triangulation::build(&[pt(0.0, 0.0), pt(1.0, 0.0)]).is_none());
    }

    #[test]
    fn test_coincident_points_are_merged() {
        let samples = vec![
            SamplePoint { x: 0.0, y: 0.0, value: 2.0 },
            SamplePoint { x: 0.0, y: 0.0, value: 4.0 },
            pt(1.0, 0.0),
            pt(0.0, 1.0),
        ];
        let tri = Triangulation::build(&samples).unwrap();
        assert_eq!(tri.points().len(), 3);
        assert_eq!(tri.points()[0].value, 3.0);
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let tri = Triangulation::build(&[pt(0.0, 0.0), pt(1.0, 0.0), pt(0.0, 1.0)]).unwrap();
        let loc = tri.locate(0.25, 0.25).unwrap();
        let sum: f64 = loc.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(tri.locate(1.0, 1.0).is_none());
    }

    #[test]
    fn test_triangles_are_counter_clockwise() {
        let samples: Vec<SamplePoint> = (0..20)
            .map(|i| {
                let t = i as f64 * 0.7;
                pt(t.cos() * (1.0 + i as f64 * 0.1), t.sin() * (1.0 + i as f64 * 0.1))
            })
            .collect();
        let tri = Triangulation::build(&samples).unwrap();
        for t in tri.triangles() {
            let [a, b, c] = t.map(|v| tri.points()[v]);
            assert!(orientation((a.x, a.y), (b.x, b.y), (c.x, c.y)) > 0.0);
        }
    }

    #[test]
    fn test_cocircular_grid_reproduces_plane() {
        let plane = |x: f64, y: f64| 3.0 * x - 2.0 * y + 1.0;
        let samples: Vec<SamplePoint> = (0..6)
            .flat_map(|i| (0..6).map(move |j| (i as f64 * 0.2, j as f64 * 0.2)))
            .map(|(x, y)| SamplePoint { x, y, value: plane(x, y) })
            .collect();
        let tri = Triangulation::build(&samples).unwrap();
        assert_eq!(tri.triangles().len(), 50);

        for &(x, y) in &[(0.1, 0.1), (0.33, 0.71), (0.9, 0.45), (0.4, 0.4)] {
            let loc = tri.locate(x, y).unwrap();
            let value: f64 = loc
                .triangle
                .iter()
                .zip(loc.weights)
                .map(|(v, w)| tri.points()[*v].value * w)
                .sum();
            assert!((value - plane(x, y)).abs() < 1e-9);
        }
    }
}
