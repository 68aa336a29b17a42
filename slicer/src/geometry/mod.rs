use nalgebra::Vector2;

use crate::mesh::Mesh;

pub mod segments_1d;
pub use segments_1d::Segments1D;

/// Vertices closer than this (mm) to a slicing plane count as above it.
pub const PLANE_EPSILON: f64 = 1e-9;

/// An undirected mesh edge, stored as (lower index, higher index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(pub u32, pub u32);

/// The point where a mesh edge passes through a slicing plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub key: EdgeKey,
    pub point: Vector2<f64>,
}

/// The part of one face that lies on a slicing plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSegment {
    pub ends: [Crossing; 2],
}

impl EdgeKey {
    pub fn new(a: u32, b: u32) -> Self {
        Self(a.min(b), a.max(b))
    }
}

/// Intersects a plane at `height` with one face of the mesh.
///
/// Every vertex is classified as above (`z - height > -PLANE_EPSILON`) or
/// below the plane, so a face always yields either zero or two crossings and
/// vertices lying on the plane never produce zero length segments. The
/// crossing point of an edge is always interpolated from its lower index
/// vertex, which makes both faces sharing an edge agree on it bit for bit.
pub fn intersect_triangle(mesh: &Mesh, face: usize, height: f64) -> Option<PlaneSegment> {
    let indices = *mesh.face(face);
    let vertices = mesh.vertices();
    let above = indices.map(|x| vertices[x as usize].z - height > -PLANE_EPSILON);

    let mut ends = [None; 2];
    let mut n = 0;

    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if above[i] == above[j] {
            continue;
        }

        let key = EdgeKey::new(indices[i], indices[j]);
        let (lo, hi) = (vertices[key.0 as usize], vertices[key.1 as usize]);
        let t = ((height - lo.z) / (hi.z - lo.z)).clamp(0.0, 1.0);
        let point = lo.xy() + (hi.xy() - lo.xy()) * t;

        ends[n] = Some(Crossing { key, point });
        n += 1;
    }

    match ends {
        [Some(a), Some(b)] => Some(PlaneSegment { ends: [a, b] }),
        _ => None,
    }
}
