use std::{collections::HashMap, fs, path::Path, sync::Arc};

use common::{progress::Progress, serde::SliceDeserializer};
use mesh_format::Body;

use crate::{
    geometry::{intersect_triangle, PlaneSegment},
    Pos, SliceError,
};

/// A mesh made of vertices and triangular faces. The geometry lives behind an
/// [`Arc`] so clones are cheap and can be handed to every slicing task.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    inner: Arc<MeshInner>,
}

#[derive(Debug, Default)]
struct MeshInner {
    vertices: Box<[Pos]>,
    faces: Box<[[u32; 3]]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Pos>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            inner: Arc::new(MeshInner {
                vertices: vertices.into_boxed_slice(),
                faces: faces.into_boxed_slice(),
            }),
        }
    }

    pub fn vertices(&self) -> &[Pos] {
        self.inner.vertices.as_ref()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        self.inner.faces.as_ref()
    }

    pub fn face(&self, index: usize) -> &[u32; 3] {
        &self.faces()[index]
    }

    pub fn face_verts(&self, index: usize) -> [Pos; 3] {
        self.face(index).map(|x| self.vertices()[x as usize])
    }

    /// Area weighted normal of a face, its length is twice the face area.
    pub fn face_cross(&self, index: usize) -> Pos {
        let [v0, v1, v2] = self.face_verts(index);
        (v1 - v0).cross(&(v2 - v0))
    }

    pub fn face_area(&self, index: usize) -> f64 {
        self.face_cross(index).magnitude() / 2.0
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    pub fn face_count(&self) -> usize {
        self.faces().len()
    }

    /// Intersect the mesh with a horizontal plane in linear time. Slicing many
    /// layers should go through [`crate::geometry::Segments1D`] instead.
    pub fn intersect_plane(&self, height: f64) -> Vec<PlaneSegment> {
        (0..self.face_count())
            .filter_map(|face| intersect_triangle(self, face, height))
            .collect()
    }

    /// True when every edge is shared by exactly two faces.
    pub fn is_manifold(&self) -> bool {
        let mut edges = HashMap::<_, u8>::new();

        for [a, b, c] in self.faces() {
            for (a, b) in [(a, b), (b, c), (c, a)] {
                let count = edges.entry((a.min(b), a.max(b))).or_default();
                *count = count.saturating_add(1);
            }
        }

        edges.values().all(|&count| count == 2)
    }

    /// Get the minimum and maximum of each component of every vertex in the
    /// model. These points define the bounding box of the model.
    pub fn bounds(&self) -> (Pos, Pos) {
        self.vertices().iter().fold(
            (Pos::repeat(f64::MAX), Pos::repeat(f64::MIN)),
            |(min, max), v| (min.inf(v), max.sup(v)),
        )
    }
}

/// Reads every given mesh file and returns all of their bodies in order.
pub fn load_bodies<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Body>, SliceError> {
    let mut bodies = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let unreadable = |reason: String| SliceError::unreadable(Some(path.to_owned()), reason);

        let format = path
            .extension()
            .map(|x| x.to_string_lossy().to_ascii_lowercase())
            .ok_or_else(|| unreadable("missing file extension".into()))?;
        let data = fs::read(path).map_err(|err| unreadable(err.to_string()))?;

        let mut des = SliceDeserializer::new(&data);
        let loaded = mesh_format::load_mesh(&mut des, &format, Progress::new())
            .map_err(|err| unreadable(format!("{err:#}")))?;

        tracing::info!(
            "Loaded `{}`. {{ bodies: {}, vert: {}, face: {} }}",
            path.display(),
            loaded.len(),
            loaded.iter().map(Body::vertex_count).sum::<usize>(),
            loaded.iter().map(Body::face_count).sum::<usize>(),
        );
        bodies.extend(loaded);
    }

    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use crate::builder::MeshBuilder;

    use super::*;

    #[test]
    fn cube_properties() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::new(1.0, 2.0, 3.0), Pos::new(4.0, 6.0, 8.0));
        let mesh = builder.build();

        assert!(mesh.is_manifold());
        assert_eq!(mesh.bounds(), (Pos::new(1.0, 2.0, 3.0), Pos::new(4.0, 6.0, 8.0)));
        let area = (0..mesh.face_count()).map(|x| mesh.face_area(x)).sum::<f64>();
        assert!((area - 2.0 * (12.0 + 15.0 + 20.0)).abs() < 1e-9);

        // Outward normals
        for face in 0..mesh.face_count() {
            let [v0, v1, v2] = mesh.face_verts(face);
            let centroid = (v0 + v1 + v2) / 3.0 - Pos::new(2.5, 4.0, 5.5);
            assert!(mesh.face_cross(face).dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn linear_intersection() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::zeros(), Pos::repeat(10.0));
        let mesh = builder.build();

        // Each of the four side walls is two triangles, both crossing.
        assert_eq!(mesh.intersect_plane(5.0).len(), 8);
        assert!(mesh.intersect_plane(11.0).is_empty());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = load_bodies(&["does/not/exist.stl"]).unwrap_err();
        assert!(matches!(err, SliceError::UnreadableGeometry { .. }));

        let err = load_bodies(&["no_extension"]).unwrap_err();
        assert!(err.to_string().contains("extension"));
    }
}
