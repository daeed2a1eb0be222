//! Boolean mask to polygon conversion.
//!
//! Cells are grouped into 4-connected components. Each component's boundary
//! is emitted as directed unit edges in corner-index space (y pointing up,
//! interior on the left), then linked into rings. Counter-clockwise rings are
//! exteriors, clockwise rings are holes. Corner indices map to world
//! coordinates through the grid transform.

use std::collections::{HashMap, VecDeque};

use air_common::GeoTransform;
use geo::{Contains, Coord, LineString, Point, Polygon};

/// Corner index `(vx, y)` with `y = -row`, so y points north.
type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Label 4-connected `true` cells. Returns per-cell labels (0 = background)
/// and the number of components.
pub fn label_components(mask: &[bool], width: usize, height: usize) -> (Vec<u32>, u32) {
    let mut labels = vec![0u32; mask.len()];
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for start in 0..mask.len() {
        if !mask[start] || labels[start] != 0 {
            continue;
        }
        count += 1;
        labels[start] = count;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (row, col) = (idx / width, idx % width);
            let mut neighbours = Vec::with_capacity(4);
            if row > 0 {
                neighbours.push(idx - width);
            }
            if row + 1 < height {
                neighbours.push(idx + width);
            }
            if col > 0 {
                neighbours.push(idx - 1);
            }
            if col + 1 < width {
                neighbours.push(idx + 1);
            }
            for n in neighbours {
                if mask[n] && labels[n] == 0 {
                    labels[n] = count;
                    queue.push_back(n);
                }
            }
        }
    }

    (labels, count)
}

fn boundary_edges(labels: &[u32], width: usize, height: usize, label: u32) -> Vec<Edge> {
    let inside = |row: i64, col: i64| {
        row >= 0
            && col >= 0
            && (row as usize) < height
            && (col as usize) < width
            && labels[row as usize * width + col as usize] == label
    };

    let mut edges = Vec::new();
    for (idx, _) in labels.iter().enumerate().filter(|(_, l)| **l == label) {
        let (r, c) = ((idx / width) as i64, (idx % width) as i64);
        let sw = (c, -(r + 1));
        let se = (c + 1, -(r + 1));
        let ne = (c + 1, -r);
        let nw = (c, -r);

        if !inside(r + 1, c) {
            edges.push(Edge { from: sw, to: se });
        }
        if !inside(r, c + 1) {
            edges.push(Edge { from: se, to: ne });
        }
        if !inside(r - 1, c) {
            edges.push(Edge { from: ne, to: nw });
        }
        if !inside(r, c - 1) {
            edges.push(Edge { from: nw, to: sw });
        }
    }
    edges
}

/// Preference for the next edge: left turn, then straight, then right.
fn turn_rank(incoming: (i64, i64), outgoing: (i64, i64)) -> u8 {
    let cross = incoming.0 * outgoing.1 - incoming.1 * outgoing.0;
    let dot = incoming.0 * outgoing.0 + incoming.1 * outgoing.1;
    match (cross.signum(), dot.signum()) {
        (1, _) => 0,
        (0, 1) => 1,
        (-1, _) => 2,
        _ => 3,
    }
}

fn link_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let at = edges[current].to;
            let incoming = edges[current].direction();

            let mut candidates: Vec<usize> = outgoing
                .get(&at)
                .map(|out| out.iter().copied().filter(|i| !used[*i]).collect())
                .unwrap_or_default();
            if edges[start].from == at {
                candidates.push(start);
            }

            let Some(next) = candidates
                .into_iter()
                .min_by_key(|i| turn_rank(incoming, edges[*i].direction()))
            else {
                break;
            };
            if next == start {
                break;
            }
            used[next] = true;
            ring.push(at);
            current = next;
        }

        rings.push(ring);
    }

    rings
}

fn remove_collinear(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let a = (cur.0 - prev.0, cur.1 - prev.1);
            let b = (next.0 - cur.0, next.1 - cur.1);
            a.0 * b.1 - a.1 * b.0 != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed area; positive for counter-clockwise rings.
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn cell_space_polygon(ring: &[Vertex]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| Coord { x: x as f64, y: y as f64 })
        .collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Centre of a cell just outside the component, on the right of the
/// hole ring's first edge.
fn hole_interior_point(ring: &[Vertex]) -> Point<f64> {
    let (x0, y0) = ring[0];
    let (x1, y1) = ring[1 % ring.len()];
    let (dx, dy) = ((x1 - x0).signum() as f64, (y1 - y0).signum() as f64);
    Point::new(x0 as f64 + 0.5 * dx + 0.5 * dy, y0 as f64 + 0.5 * dy - 0.5 * dx)
}

fn to_world(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    ring.iter()
        .map(|&(vx, y)| {
            let (x, y) = transform.corner(vx, -y);
            Coord { x, y }
        })
        .collect::<Vec<_>>()
        .into()
}

/// Convert a row-major mask into world-coordinate polygons (with holes).
///
/// Polygons are ordered by the row-major position of their first cell.
pub fn vectorize(mask: &[bool], width: usize, height: usize, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let (labels, count) = label_components(mask, width, height);
    let mut polygons = Vec::new();

    for label in 1..=count {
        let edges = boundary_edges(&labels, width, height, label);
        let mut exteriors: Vec<Vec<Vertex>> = Vec::new();
        let mut holes: Vec<Vec<Vertex>> = Vec::new();

        for ring in link_rings(&edges) {
            let ring = remove_collinear(&ring);
            if ring.len() < 3 {
                continue;
            }
            match signed_area2(&ring) {
                a if a > 0 => exteriors.push(ring),
                a if a < 0 => holes.push(ring),
                _ => {}
            }
        }

        let mut assigned: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
        if exteriors.len() == 1 {
            assigned[0] = holes.iter().map(|h| to_world(h, transform)).collect();
        } else if !exteriors.is_empty() {
            let shells: Vec<Polygon<f64>> = exteriors.iter().map(|e| cell_space_polygon(e)).collect();
            for hole in &holes {
                let inside = hole_interior_point(hole);
                let owner = shells.iter().position(|s| s.contains(&inside)).unwrap_or(0);
                assigned[owner].push(to_world(hole, transform));
            }
        }

        for (exterior, interiors) in exteriors.iter().zip(assigned) {
            polygons.push(Polygon::new(to_world(exterior, transform), interiors));
        }
    }

    polygons
}
