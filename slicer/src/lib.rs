//! Turns a triangulated solid into centered, anti-aliased exposure masks for
//! resin (DLP / LCD) printers.
//!
//! The pipeline for each layer is: [`section::PlaneSlicer`] cuts the repaired
//! [`mesh::Mesh`] into polygons, [`compositor`] recenters them on the build
//! plate, and [`raster::Rasterizer`] scan-converts them into a grayscale
//! mask. [`slicer::Slicer`] runs that pipeline for every layer in parallel.

use nalgebra::Vector3;

pub mod builder;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod half_edge;
pub mod mesh;
pub mod planar;
pub mod raster;
pub mod repair;
pub mod section;
pub mod slicer;

pub use error::SliceError;

pub type Pos = Vector3<f64>;
