use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector2;

use crate::{
    geometry::{EdgeKey, PlaneSegment, PLANE_EPSILON},
    planar::signed_area,
};

use super::{MIN_RING_AREA, RING_CLOSE_TOLERANCE};

/// Closed rings recovered from the segments of one plane.
#[derive(Debug, Default)]
pub struct Contours {
    pub rings: Vec<Vec<Vector2<f64>>>,
    pub open_chains: usize,
}

/// Links segments into rings through the mesh edges they share.
///
/// Crossings are matched by edge, not by position, so the result only
/// depends on mesh topology. Chains are walked starting from the smallest
/// edge key, chains with a loose end first, so identical input always gives
/// identical rings. Chains left open are then joined end to end when their
/// ends lie within [`RING_CLOSE_TOLERANCE`]; whatever still does not close is
/// dropped and counted.
pub fn chain_segments(segments: &[PlaneSegment]) -> Contours {
    let mut points = HashMap::new();
    let mut adjacency = BTreeMap::<EdgeKey, Vec<usize>>::new();
    for (i, segment) in segments.iter().enumerate() {
        for end in segment.ends {
            points.insert(end.key, end.point);
            adjacency.entry(end.key).or_default().push(i);
        }
    }

    let loose = adjacency
        .iter()
        .filter(|(_, x)| x.len() % 2 == 1)
        .map(|(&key, _)| key);
    let starts = loose.chain(adjacency.keys().copied()).collect::<Vec<_>>();

    let mut walker = Walker {
        segments,
        adjacency: &adjacency,
        used: vec![false; segments.len()],
    };

    let mut rings = Vec::new();
    let mut open = Vec::new();
    for start in starts {
        while let Some((keys, closed)) = walker.walk(start) {
            let chain = keys.iter().map(|x| points[x]).collect::<Vec<_>>();
            if closed {
                rings.push(chain);
            } else {
                open.push(chain);
            }
        }
    }

    let (joined, open_chains) = join_open_chains(open);
    rings.extend(joined);
    rings.iter_mut().for_each(merge_close_points);
    rings.retain(|x| x.len() >= 3 && signed_area(x).abs() >= MIN_RING_AREA);

    Contours { rings, open_chains }
}

struct Walker<'a> {
    segments: &'a [PlaneSegment],
    adjacency: &'a BTreeMap<EdgeKey, Vec<usize>>,
    used: Vec<bool>,
}

impl Walker<'_> {
    /// Follows unused segments from `start` until it returns to `start` or
    /// runs out. Returns None if nothing is left to walk from `start`.
    fn walk(&mut self, start: EdgeKey) -> Option<(Vec<EdgeKey>, bool)> {
        let mut path = vec![start];
        let mut current = start;

        loop {
            let next = self.adjacency[&current]
                .iter()
                .copied()
                .find(|&x| !self.used[x]);
            let Some(segment) = next else {
                return (path.len() > 1).then_some((path, false));
            };

            self.used[segment] = true;
            let [a, b] = self.segments[segment].ends.map(|x| x.key);
            let other = if a == current { b } else { a };

            if other == start {
                return Some((path, true));
            }

            path.push(other);
            current = other;
        }
    }
}

/// Collapses runs of points that are practically identical, as happens when
/// the plane passes through a mesh vertex.
fn merge_close_points(ring: &mut Vec<Vector2<f64>>) {
    ring.dedup_by(|a, b| (*a - *b).magnitude() <= PLANE_EPSILON);
    while ring.len() > 1 && (ring[0] - ring[ring.len() - 1]).magnitude() <= PLANE_EPSILON {
        ring.pop();
    }
}

fn near(a: Vector2<f64>, b: Vector2<f64>) -> bool {
    (a - b).magnitude() <= RING_CLOSE_TOLERANCE
}

/// Closes open chains whose own ends meet and splices together chains that
/// continue each other, possibly reversed. Returns the new rings and the
/// number of chains that stayed open.
fn join_open_chains(mut open: Vec<Vec<Vector2<f64>>>) -> (Vec<Vec<Vector2<f64>>>, usize) {
    let mut rings = Vec::new();

    loop {
        if let Some(i) = open
            .iter()
            .position(|x| x.len() >= 3 && near(x[0], x[x.len() - 1]))
        {
            let mut ring = open.remove(i);
            ring.pop();
            rings.push(ring);
            continue;
        }

        let pairs = (0..open.len()).flat_map(|i| (i + 1..open.len()).map(move |j| (i, j)));
        let Some((i, j, joined)) = pairs
            .filter_map(|(i, j)| splice(&open[i], &open[j]).map(|x| (i, j, x)))
            .next()
        else {
            break;
        };

        open.remove(j);
        open[i] = joined;
    }

    (rings, open.len())
}

fn splice(a: &[Vector2<f64>], b: &[Vector2<f64>]) -> Option<Vec<Vector2<f64>>> {
    let (a_start, a_end) = (a[0], a[a.len() - 1]);
    let (b_start, b_end) = (b[0], b[b.len() - 1]);

    let joined = if near(a_end, b_start) {
        a.iter().chain(&b[1..]).copied().collect()
    } else if near(a_end, b_end) {
        a.iter().chain(b.iter().rev().skip(1)).copied().collect()
    } else if near(a_start, b_end) {
        b.iter().chain(&a[1..]).copied().collect()
    } else if near(a_start, b_start) {
        a.iter().rev().chain(&b[1..]).copied().collect()
    } else {
        return None;
    };

    Some(joined)
}
