//! Centers each cross-section on the build plate.

use geo::{Area, BooleanOps, Centroid, MultiPolygon, Polygon, Translate};
use nalgebra::Vector2;

use crate::section::MIN_RING_AREA;

/// Merges all polygons into one shape so overlapping islands are only counted
/// once. Polygons without area are skipped.
pub fn union(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    polygons
        .iter()
        .filter(|x| x.unsigned_area() >= MIN_RING_AREA)
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon.clone()]))
        })
}

/// Area centroid of the union of all polygons, holes included. None if the
/// union has no area.
pub fn centroid(polygons: &[Polygon<f64>]) -> Option<Vector2<f64>> {
    let shape = union(polygons);
    if shape.unsigned_area() < MIN_RING_AREA {
        return None;
    }

    let point = shape.centroid()?;
    Some(Vector2::new(point.x(), point.y()))
}

/// Moves every polygon by the same offset so the centroid of their union
/// lands on `center`, the middle of the build plate. The union is only used
/// for the centroid, the returned polygons keep their original rings and
/// holes. Returns the moved polygons and the offset, or None for an empty or
/// zero area section.
pub fn recenter(
    polygons: &[Polygon<f64>],
    center: Vector2<f64>,
) -> Option<(Vec<Polygon<f64>>, Vector2<f64>)> {
    let offset = center - centroid(polygons)?;
    let moved = polygons
        .iter()
        .map(|x| x.translate(offset.x, offset.y))
        .collect();

    Some((moved, offset))
}
