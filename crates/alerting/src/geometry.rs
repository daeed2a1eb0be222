//! GeoJSON affected areas (SRID 4326).

use std::f64::consts::TAU;
use std::fmt::Write;

use geo::{Area, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// SRID of every stored geometry.
pub const SRID: u32 = 4326;

/// Radius in degrees of the circle substituted for unusable polygons.
pub const FALLBACK_RADIUS_DEG: f64 = 0.05;

/// Segments used to approximate the fallback circle.
pub const CIRCLE_SEGMENTS: usize = 64;

/// Area affected by an alert, serialised as a GeoJSON geometry.
///
/// Coordinates are `[lon, lat]`; the first ring is the exterior, any others
/// are holes. Every ring is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AffectedArea {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

fn validate_ring(ring: &[[f64; 2]], label: &str) -> Result<()> {
    if ring.len() < 4 {
        return Err(AlertError::Geometry(format!(
            "{} ring has {} coordinates, need at least 4",
            label,
            ring.len()
        )));
    }
    if ring.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AlertError::Geometry(format!("{} ring has non-finite coordinates", label)));
    }
    if ring.first() != ring.last() {
        return Err(AlertError::Geometry(format!("{} ring is not closed", label)));
    }
    Ok(())
}

impl AffectedArea {
    /// Convert a polygon, rejecting short rings, non-finite coordinates and
    /// zero area.
    pub fn from_polygon(polygon: &Polygon<f64>) -> Result<Self> {
        let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
        rings.push(ring_coords(polygon.exterior()));
        rings.extend(polygon.interiors().iter().map(ring_coords));

        for (i, ring) in rings.iter().enumerate() {
            validate_ring(ring, if i == 0 { "exterior" } else { "interior" })?;
        }

        let area = polygon.unsigned_area();
        if !(area.is_finite() && area > 0.0) {
            return Err(AlertError::Geometry("polygon has zero area".to_string()));
        }

        Ok(AffectedArea::Polygon { coordinates: rings })
    }

    /// Regular polygon approximating a circle of `radius_deg` around
    /// `(lon, lat)`.
    pub fn circle(center: (f64, f64), radius_deg: f64, segments: usize) -> Self {
        let (cx, cy) = center;
        let segments = segments.max(3);
        let mut ring: Vec<[f64; 2]> = (0..segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                [cx + radius_deg * angle.cos(), cy + radius_deg * angle.sin()]
            })
            .collect();
        ring.push(ring[0]);
        AffectedArea::Polygon { coordinates: vec![ring] }
    }

    pub fn rings(&self) -> &[Vec<[f64; 2]>] {
        match self {
            AffectedArea::Polygon { coordinates } => coordinates,
        }
    }

    /// The geometry as a `geo` polygon.
    pub fn to_polygon(&self) -> Polygon<f64> {
        let to_line = |ring: &Vec<[f64; 2]>| -> LineString<f64> {
            ring.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect()
        };
        let rings = self.rings();
        let exterior = rings.first().map(to_line).unwrap_or_else(|| LineString::new(Vec::new()));
        let interiors = rings.iter().skip(1).map(to_line).collect();
        Polygon::new(exterior, interiors)
    }

    /// `SRID=4326;POLYGON((lon lat, ...), ...)`.
    pub fn to_ewkt(&self) -> String {
        let mut out = format!("SRID={};POLYGON(", SRID);
        for (i, ring) in self.rings().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push('(');
            for (j, [x, y]) in ring.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{} {}", x, y);
            }
            out.push(')');
        }
        out.push(')');
        out
    }
}
