use std::collections::HashMap;

use anyhow::{ensure, Context, Result};
use common::{progress::Progress, serde::Deserializer};
use nalgebra::Vector3;

use crate::{util, Body};

/// Parses `v` and `f` records. Vertex indices are global to the file, so each
/// body remaps the ones it uses. `o` and `g` records start a new body.
pub fn parse<T: Deserializer>(des: &mut T, progress: Progress) -> Result<Vec<Body>> {
    let mut verts = Vec::new();
    let mut bodies = Vec::new();
    let mut current = ObjBody::default();

    util::lines(des, progress, |line| {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => verts.push(Vector3::new(
                util::parse_f64(parts.next())?,
                util::parse_f64(parts.next())?,
                util::parse_f64(parts.next())?,
            )),
            Some("f") => {
                let face = parts
                    .map(|x| resolve_index(x, verts.len()))
                    .collect::<Result<Vec<_>>>()
                    .context("Invalid face")?;
                ensure!(face.len() >= 3, "Face has only {} vertices", face.len());

                // Polygons are fan triangulated around their first vertex.
                let face = face.into_iter().map(|x| current.local(&verts, x)).collect::<Vec<_>>();
                for i in 1..face.len() - 1 {
                    current.body.faces.push([face[0], face[i], face[i + 1]]);
                }
            }
            Some("o" | "g") => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                let previous = std::mem::replace(&mut current, ObjBody::named(name));
                bodies.push(previous.body);
            }
            _ => {}
        }
        Ok(())
    })?;

    bodies.push(current.body);
    Ok(bodies)
}

#[derive(Default)]
struct ObjBody {
    body: Body,
    remap: HashMap<usize, u32>,
}

impl ObjBody {
    fn named(name: Option<String>) -> Self {
        Self {
            body: Body::new(name),
            ..Default::default()
        }
    }

    fn local(&mut self, verts: &[Vector3<f64>], global: usize) -> u32 {
        let body = &mut self.body;
        *self.remap.entry(global).or_insert_with(|| {
            body.verts.push(verts[global]);
            (body.verts.len() - 1) as u32
        })
    }
}

/// Resolves a `v`, `v/vt`, `v//vn` or `v/vt/vn` reference to a zero based
/// vertex index. Negative indices count back from the last vertex.
fn resolve_index(token: &str, count: usize) -> Result<usize> {
    let number = token.split_once('/').map(|x| x.0).unwrap_or(token);
    let idx = number
        .parse::<i64>()
        .with_context(|| format!("Invalid vertex reference `{token}`"))?;

    let resolved = match idx.signum() {
        1 => idx - 1,
        -1 => count as i64 + idx,
        _ => -1,
    };

    (resolved >= 0 && (resolved as usize) < count)
        .then_some(resolved as usize)
        .with_context(|| format!("Vertex reference `{token}` is out of range"))
}

#[cfg(test)]
mod tests {
    use common::serde::SliceDeserializer;

    use super::*;

    fn parse_str(text: &str) -> Result<Vec<Body>> {
        parse(&mut SliceDeserializer::new(text.as_bytes()), Progress::new())
    }

    #[test]
    fn quads_are_triangulated() {
        let bodies = parse_str(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/2 3/3/3 4/4/4\n",
        )
        .unwrap();
        let body = bodies.last().unwrap();
        assert_eq!(body.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn objects_become_bodies() {
        let bodies = parse_str(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 5 5 5\no a\nf 1 2 3\no b\nf -1 -2 -3\n",
        )
        .unwrap();
        let bodies = bodies.into_iter().filter(|x| x.face_count() > 0).collect::<Vec<_>>();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name.as_deref(), Some("a"));
        assert_eq!(bodies[1].vertex_count(), 3);
        assert_eq!(bodies[1].verts[0], Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn out_of_range_reference() {
        assert!(parse_str("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_str("v 0 0 0\nv 0 0 0\nv 0 0 0\nf 0 1 2\n").is_err());
    }
}
