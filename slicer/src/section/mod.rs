//! Horizontal cross-sections of a mesh.

use geo::{Area, Polygon};

use crate::{geometry::Segments1D, mesh::Mesh};

mod chain;
mod nesting;

pub use chain::{chain_segments, Contours};
pub use nesting::nest_rings;

/// Open chain ends closer than this (mm) are joined.
pub const RING_CLOSE_TOLERANCE: f64 = 1e-4;
/// Rings enclosing less area than this (mm²) are dropped.
pub const MIN_RING_AREA: f64 = 1e-10;
/// Number of Z buckets used to find the faces crossing a plane.
pub const SEGMENT_LAYERS: usize = 100;

/// Polygons formed by cutting a mesh at one height. Exteriors are
/// counter-clockwise and holes clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub height: f64,
    pub polygons: Vec<Polygon<f64>>,
    /// Chains that could not be closed into rings and were dropped.
    pub open_chains: usize,
}

/// Cuts a mesh with horizontal planes. Can be shared between threads.
pub struct PlaneSlicer {
    mesh: Mesh,
    segments: Segments1D,
    height_range: (f64, f64),
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(|x| x.unsigned_area()).sum()
    }
}

impl PlaneSlicer {
    pub fn new(mesh: &Mesh) -> Self {
        let (min, max) = mesh.bounds();
        Self {
            mesh: mesh.clone(),
            segments: Segments1D::from_mesh(mesh, SEGMENT_LAYERS),
            height_range: (min.z, max.z),
        }
    }

    /// Returns the cross-section at `height`, or None if the plane does not
    /// touch the mesh.
    pub fn section_at(&self, height: f64) -> Option<Section> {
        let (min, max) = self.height_range;
        if !(min..=max).contains(&height) {
            return None;
        }

        let segments = self.segments.intersect_plane(&self.mesh, height);
        if segments.is_empty() {
            return None;
        }

        let contours = chain_segments(&segments);
        Some(Section {
            height,
            polygons: nest_rings(contours.rings),
            open_chains: contours.open_chains,
        })
    }
}
