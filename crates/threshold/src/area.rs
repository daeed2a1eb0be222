//! Planar area approximation for lon/lat polygons.

use geo::{Area, Centroid, Coord, MapCoords, Polygon};

/// Kilometres per degree used on both axes.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Approximate area in km².
///
/// Longitudes are scaled by `cos(latitude of the centroid)`, then both axes
/// use [`KM_PER_DEGREE`]. Good to a few percent for city-scale polygons.
pub fn polygon_area_km2(polygon: &Polygon<f64>) -> f64 {
    let Some(centroid) = polygon.centroid() else {
        return 0.0;
    };
    let scale = centroid.y().to_radians().cos();
    let projected = polygon.map_coords(|Coord { x, y }| Coord { x: x * scale, y });
    projected.unsigned_area() * KM_PER_DEGREE * KM_PER_DEGREE
}

/// Area in km² of one grid cell centred at `latitude`.
pub fn cell_area_km2(cell_size: f64, latitude: f64) -> f64 {
    cell_size * cell_size * latitude.to_radians().cos() * KM_PER_DEGREE * KM_PER_DEGREE
}
