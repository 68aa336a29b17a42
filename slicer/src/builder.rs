use std::f64::consts::TAU;

use mesh_format::Body;

use crate::{mesh::Mesh, Pos};

/// Incrementally builds triangle meshes, mostly used to generate test and
/// benchmark geometry.
pub struct MeshBuilder {
    vertices: Vec<Pos>,
    faces: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self, vertex: Pos) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    pub fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    pub fn add_quad(&mut self, quad: [u32; 4]) {
        self.add_face([quad[0], quad[1], quad[2]]);
        self.add_face([quad[2], quad[1], quad[3]]);
    }

    /// Removes the most recently added faces, leaving a hole behind.
    pub fn remove_faces(&mut self, count: usize) {
        self.faces.truncate(self.faces.len().saturating_sub(count));
    }

    pub fn build(self) -> Mesh {
        Mesh::new(self.vertices, self.faces)
    }

    pub fn build_body(self, name: &str) -> Body {
        Body {
            name: Some(name.to_owned()),
            verts: self.vertices,
            faces: self.faces,
        }
    }
}

impl MeshBuilder {
    /// Adds an axis aligned box with outward facing triangles.
    pub fn add_box(&mut self, min: Pos, max: Pos) {
        let corners = (0..8)
            .map(|i| {
                let pick = |bit: u32, lo: f64, hi: f64| if i & (1 << bit) == 0 { lo } else { hi };
                self.add_vertex(Pos::new(
                    pick(0, min.x, max.x),
                    pick(1, min.y, max.y),
                    pick(2, min.z, max.z),
                ))
            })
            .collect::<Vec<_>>();

        #[rustfmt::skip]
        const FACES: [[usize; 3]; 12] = [
            [0, 2, 3], [0, 3, 1], // bottom
            [4, 5, 7], [4, 7, 6], // top
            [0, 1, 5], [0, 5, 4], // front
            [3, 2, 6], [3, 6, 7], // back
            [2, 0, 4], [2, 4, 6], // left
            [1, 3, 7], [1, 7, 5], // right
        ];
        for face in FACES {
            self.add_face(face.map(|x| corners[x]));
        }
    }

    /// Adds a torus lying in the XY plane around `center`.
    pub fn add_torus(
        &mut self,
        center: Pos,
        (major_radius, minor_radius): (f64, f64),
        (major_segments, minor_segments): (u32, u32),
    ) {
        let first = self.vertices.len() as u32;
        for i in 0..major_segments {
            let u = TAU * i as f64 / major_segments as f64;
            for j in 0..minor_segments {
                let v = TAU * j as f64 / minor_segments as f64;
                let radius = major_radius + minor_radius * v.cos();
                self.add_vertex(
                    center + Pos::new(radius * u.cos(), radius * u.sin(), minor_radius * v.sin()),
                );
            }
        }

        let index = |i: u32, j: u32| first + (i % major_segments) * minor_segments + j % minor_segments;
        for i in 0..major_segments {
            for j in 0..minor_segments {
                self.add_quad([
                    index(i, j),
                    index(i + 1, j),
                    index(i, j + 1),
                    index(i + 1, j + 1),
                ]);
            }
        }
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torus_is_closed() {
        let mut builder = MeshBuilder::new();
        builder.add_torus(Pos::zeros(), (10.0, 3.0), (32, 16));
        let mesh = builder.build();

        assert_eq!(mesh.vertex_count(), 32 * 16);
        assert_eq!(mesh.face_count(), 32 * 16 * 2);
        assert!(mesh.is_manifold());

        let (min, max) = mesh.bounds();
        assert!((max.x - 13.0).abs() < 1e-9 && (min.x + 13.0).abs() < 1e-9);
        assert!((max.z - 3.0).abs() < 0.1);
    }

    #[test]
    fn removing_faces_opens_mesh() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::zeros(), Pos::repeat(1.0));
        builder.remove_faces(2);
        let body = builder.build_body("open");
        assert_eq!(body.faces.len(), 10);
        assert_eq!(body.verts.len(), 8);
    }
}
