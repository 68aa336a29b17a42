//! Parsers for triangulated surface files. Every parser returns the bodies
//! found in the file separately, merging them is left to the caller.

use std::collections::HashMap;

use anyhow::{bail, Result};
use common::{progress::Progress, serde::Deserializer};
use nalgebra::Vector3;

mod obj;
mod stl;
mod util;

/// One triangulated body. Faces index into `verts`.
#[derive(Debug, Default, Clone)]
pub struct Body {
    pub name: Option<String>,
    pub verts: Vec<Vector3<f64>>,
    pub faces: Vec<[u32; 3]>,
}

/// Extensions accepted by [`load_mesh`].
pub const SUPPORTED_FORMATS: &[&str] = &["stl", "obj"];

/// Parses a mesh file of the given format (its extension). Bodies without
/// any faces are dropped.
pub fn load_mesh<T: Deserializer>(des: &mut T, format: &str, progress: Progress) -> Result<Vec<Body>> {
    let bodies = match format.to_ascii_lowercase().as_str() {
        "stl" => stl::parse(des, progress.clone())?,
        "obj" => obj::parse(des, progress.clone())?,
        _ => bail!("Unsupported format: `{format}`"),
    };

    progress.set_finished();
    Ok(bodies.into_iter().filter(|x| !x.faces.is_empty()).collect())
}

impl Body {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Deduplicates bit-identical vertices while a body is being built.
#[derive(Default)]
pub(crate) struct VertexInterner {
    lookup: HashMap<[u64; 3], u32>,
}

impl VertexInterner {
    pub fn index(&mut self, body: &mut Body, vert: Vector3<f64>) -> u32 {
        let size = body.verts.len() as u32;
        *self.lookup.entry([vert.x, vert.y, vert.z].map(f64::to_bits)).or_insert_with(|| {
            body.verts.push(vert);
            size
        })
    }
}
