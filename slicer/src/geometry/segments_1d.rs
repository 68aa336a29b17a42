use crate::{
    geometry::{intersect_triangle, PlaneSegment, PLANE_EPSILON},
    mesh::Mesh,
};

/// Acceleration structure for mesh slicing. By spiting the mesh into segments
/// along the slicing axis and adding references to all the triangles that
/// overlap each segment, to slice a layer, you don't need to loop through every
/// triangle in the mesh to find all intersecting faces.
#[derive(Debug, Clone)]
pub struct Segments1D {
    start_height: f64,
    end_height: f64,
    segment_height: f64,

    segments: Vec<Vec<usize>>,
}

impl Segments1D {
    /// Creates a new Segments structure from a given mesh and segment count.
    /// Flat meshes get a single segment holding every face.
    pub fn from_mesh(mesh: &Mesh, segment_count: usize) -> Self {
        let (min, max) = mesh.bounds();
        let span = max.z - min.z;

        let segment_count = if span > 0.0 && span.is_finite() {
            segment_count.max(1)
        } else {
            1
        };
        let segment_height = if segment_count > 1 {
            span / segment_count as f64
        } else {
            f64::INFINITY
        };

        let mut out = Self {
            start_height: min.z,
            end_height: max.z,
            segment_height,

            segments: vec![Vec::new(); segment_count],
        };

        // Adds the index of each face into all of the segments it covers. The
        // plane epsilon is added on both sides so no crossing face is missed.
        for face in 0..mesh.face_count() {
            let (min_height, max_height) = triangle_bounds(mesh, face);
            let first = out.segment_index(min_height - PLANE_EPSILON);
            let last = out.segment_index(max_height + PLANE_EPSILON);

            for segment in &mut out.segments[first..=last] {
                segment.push(face);
            }
        }

        out
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Intersects a plane with the mesh this Segments instance was built with.
    pub fn intersect_plane(&self, mesh: &Mesh, height: f64) -> Vec<PlaneSegment> {
        if height < self.start_height || height > self.end_height + PLANE_EPSILON {
            return Vec::new();
        }

        self.segments[self.segment_index(height)]
            .iter()
            .filter_map(|&face| intersect_triangle(mesh, face, height))
            .collect()
    }

    fn segment_index(&self, height: f64) -> usize {
        let index = ((height - self.start_height) / self.segment_height).floor();
        (index.max(0.0) as usize).min(self.segments.len() - 1)
    }
}

/// Gets the min and max heights of the vertices of a face.
fn triangle_bounds(mesh: &Mesh, face: usize) -> (f64, f64) {
    let [a, b, c] = mesh.face_verts(face).map(|x| x.z);
    (a.min(b).min(c), a.max(b).max(c))
}
