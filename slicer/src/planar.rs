//! Conversions between the nalgebra points the slicer works with and the geo
//! types used for polygon operations.

use geo::{Coord, LineString, Polygon};
use nalgebra::Vector2;

pub fn to_coord(point: Vector2<f64>) -> Coord<f64> {
    Coord {
        x: point.x,
        y: point.y,
    }
}

/// Builds a closed geo ring from a list of points without the closing point.
pub fn to_line_string(ring: &[Vector2<f64>]) -> LineString<f64> {
    let mut line = ring.iter().copied().map(to_coord).collect::<LineString<_>>();
    line.close();
    line
}

/// Shoelace area of an implicitly closed ring, positive when counter-clockwise.
pub fn signed_area(ring: &[Vector2<f64>]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Every ring of a polygon, exterior first.
pub fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace() {
        let square = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)].map(|(x, y)| Vector2::new(x, y));
        assert_eq!(signed_area(&square), 4.0);

        let mut reversed = square;
        reversed.reverse();
        assert_eq!(signed_area(&reversed), -4.0);
        assert_eq!(signed_area(&square[..2]), 0.0);
    }

    #[test]
    fn line_string_is_closed() {
        let ring = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)].map(|(x, y)| Vector2::new(x, y));
        let line = to_line_string(&ring);
        assert!(line.is_closed());
        assert_eq!(line.0.len(), 4);
        assert_eq!(line.0[1], Coord { x: 1.0, y: 0.0 });
    }
}
