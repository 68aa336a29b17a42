use geo::{orient::Direction, BoundingRect, Contains, Orient, Polygon};
use nalgebra::Vector2;

use crate::planar::{signed_area, to_line_string};

/// Groups rings into polygons by how deeply each one is nested.
///
/// A ring inside an even number of other rings bounds material, one inside an
/// odd number is a hole of the smallest ring directly around it. The source
/// winding is ignored, exteriors come out counter-clockwise and holes
/// clockwise.
pub fn nest_rings(rings: Vec<Vec<Vector2<f64>>>) -> Vec<Polygon<f64>> {
    let shapes = rings
        .iter()
        .map(|x| Polygon::new(to_line_string(x), Vec::new()))
        .collect::<Vec<_>>();
    let areas = rings.iter().map(|x| signed_area(x).abs()).collect::<Vec<_>>();
    let bounds = shapes.iter().map(BoundingRect::bounding_rect).collect::<Vec<_>>();

    // Only a ring lying wholly inside another counts as nested. Rings from
    // overlapping shells cross each other and both stay exteriors.
    let encloses = |outer: usize, inner: usize| {
        outer != inner
            && areas[outer] > areas[inner]
            && match (bounds[outer], bounds[inner]) {
                (Some(a), Some(b)) => {
                    a.min().x <= b.min().x
                        && a.min().y <= b.min().y
                        && a.max().x >= b.max().x
                        && a.max().y >= b.max().y
                }
                _ => false,
            }
            && shapes[outer].contains(&shapes[inner])
    };

    let containers = (0..rings.len())
        .map(|i| (0..rings.len()).filter(|&j| encloses(j, i)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let depth = containers.iter().map(Vec::len).collect::<Vec<_>>();

    let mut parent = vec![None; rings.len()];
    for i in (0..rings.len()).filter(|&i| depth[i] % 2 == 1) {
        parent[i] = containers[i]
            .iter()
            .copied()
            .filter(|&j| depth[j] + 1 == depth[i])
            .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
    }

    let mut holes = vec![Vec::new(); rings.len()];
    for (i, shape) in shapes.iter().enumerate() {
        if let Some(owner) = parent[i] {
            holes[owner].push(shape.exterior().clone());
        }
    }

    // Outermost first, ties kept in discovery order.
    let mut order = (0..rings.len())
        .filter(|&i| parent[i].is_none())
        .collect::<Vec<_>>();
    order.sort_by_key(|&i| depth[i]);

    let mut shapes = shapes.into_iter().zip(holes).map(Some).collect::<Vec<_>>();
    order
        .into_iter()
        .filter_map(|i| shapes[i].take())
        .map(|(shape, holes)| {
            let (exterior, _) = shape.into_inner();
            Polygon::new(exterior, holes).orient(Direction::Default)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::Area;

    use super::*;

    fn square(min: f64, max: f64, clockwise: bool) -> Vec<Vector2<f64>> {
        let mut ring = [(min, min), (max, min), (max, max), (min, max)]
            .map(|(x, y)| Vector2::new(x, y))
            .to_vec();
        if clockwise {
            ring.reverse();
        }
        ring
    }

    #[test]
    fn hole_assigned_to_smallest_container() {
        let polygons = nest_rings(vec![
            square(0.0, 10.0, false),
            square(2.0, 8.0, false),
            square(4.0, 6.0, true),
            square(4.5, 5.5, true),
        ]);

        // The frame from 0 to 10 with its hole, then the island from 4 to 6
        // with the innermost square as its hole.
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert_eq!(polygons[1].interiors().len(), 1);
        assert!((polygons[0].unsigned_area() - 64.0).abs() < 1e-9);
        assert!((polygons[1].unsigned_area() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn winding_is_normalized() {
        let polygons = nest_rings(vec![square(0.0, 4.0, true), square(1.0, 3.0, false)]);
        assert_eq!(polygons.len(), 1);
        assert!(polygons[0].signed_area() > 0.0);
        assert!((polygons[0].signed_area() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn side_by_side() {
        let mut right = square(0.0, 1.0, false);
        right.iter_mut().for_each(|x| x.x += 5.0);
        let polygons = nest_rings(vec![square(0.0, 1.0, false), right]);
        assert_eq!(polygons.len(), 2);
        assert!(polygons.iter().all(|x| x.interiors().is_empty()));
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Vector2<f64>> {
        [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
            .map(|(x, y)| Vector2::new(x, y))
            .to_vec()
    }

    #[test]
    fn overlapping_rings_stay_exteriors() {
        let polygons = nest_rings(vec![rect(0.0, 0.0, 10.0, 10.0), rect(3.0, 2.0, 15.0, 8.0)]);
        assert_eq!(polygons.len(), 2);
        assert!(polygons.iter().all(|x| x.interiors().is_empty()));
        assert!(polygons.iter().all(|x| x.signed_area() > 0.0));
    }

    #[test]
    fn outermost_comes_first() {
        let polygons = nest_rings(vec![
            square(12.0, 18.0, false),
            square(5.0, 25.0, true),
            square(0.0, 30.0, false),
        ]);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!((polygons[0].unsigned_area() - 500.0).abs() < 1e-9);
        assert!(polygons[1].interiors().is_empty());
        assert!((polygons[1].unsigned_area() - 36.0).abs() < 1e-9);
    }
}
