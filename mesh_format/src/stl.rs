use anyhow::{bail, ensure, Context, Result};
use common::{progress::Progress, serde::Deserializer};
use nalgebra::Vector3;

use crate::{util, Body, VertexInterner};

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

pub fn parse<T: Deserializer>(des: &mut T, progress: Progress) -> Result<Vec<Body>> {
    let is_ascii = looks_ascii(des);
    des.jump_to(0);

    if is_ascii {
        ascii::parse(des, progress)
    } else {
        binary::parse(des, progress).map(|body| vec![body])
    }
}

/// Some exporters write binary files whose header starts with `solid`, so the
/// prefix alone is not enough. A file whose size matches its binary triangle
/// count exactly is always treated as binary.
fn looks_ascii<T: Deserializer>(des: &mut T) -> bool {
    if des.read_bytes(5) != b"solid" {
        return false;
    }

    des.jump_to(HEADER_SIZE);
    match des.read_u32_le() {
        Some(count) => HEADER_SIZE + 4 + count as usize * TRIANGLE_SIZE != des.size(),
        None => true,
    }
}

/// From Wikipedia :eyes:
/// ```text
/// UINT8[80]    – Header                 - 80 bytes
/// UINT32       – Number of triangles    - 04 bytes
/// foreach triangle                      - 50 bytes
///     REAL32[3] – Normal vector         - 12 bytes
///     REAL32[3] – Vertex 1              - 12 bytes
///     REAL32[3] – Vertex 2              - 12 bytes
///     REAL32[3] – Vertex 3              - 12 bytes
///     UINT16    – Attribute byte count  - 02 bytes
/// end
/// ```
mod binary {
    use super::*;

    pub fn parse<T: Deserializer>(des: &mut T, progress: Progress) -> Result<Body> {
        des.advance_by(HEADER_SIZE).context("Binary STL header is truncated")?;
        let tri_count = des.read_u32_le().context("Binary STL is missing its triangle count")?;
        ensure!(
            des.remaining() >= tri_count as usize * TRIANGLE_SIZE,
            "Binary STL is truncated, header declares {tri_count} triangles"
        );
        progress.set_total(tri_count as u64);

        let mut body = Body::new(None);
        let mut verts = VertexInterner::default();
        body.faces.reserve(tri_count as usize);

        for i in 0..tri_count {
            progress.set_complete(i as u64);
            des.advance_by(4 * 3).context("Truncated normal")?;

            let mut face = [0; 3];
            for idx in face.iter_mut() {
                *idx = verts.index(&mut body, read_vec3f(des)?);
            }

            body.faces.push(face);
            des.advance_by(2).context("Truncated attribute count")?;
        }

        Ok(body)
    }

    fn read_vec3f<T: Deserializer>(des: &mut T) -> Result<Vector3<f64>> {
        let mut out = Vector3::zeros();
        for i in 0..3 {
            let value = des.read_f32_le().context("Truncated vertex")?;
            ensure!(value.is_finite(), "Non-finite vertex coordinate");
            out[i] = value as f64;
        }
        Ok(out)
    }
}

/// ```text
/// solid name
/// facet normal ni nj nk
///     outer loop
///         vertex v1x v1y v1z
///         vertex v2x v2y v2z
///         vertex v3x v3y v3z
///     endloop
/// endfacet
/// endsolid name
/// ```
/// A file may hold several `solid` blocks, each becomes its own body.
mod ascii {
    use super::*;

    pub fn parse<T: Deserializer>(des: &mut T, progress: Progress) -> Result<Vec<Body>> {
        let mut bodies = Vec::new();
        let mut current: Option<(Body, VertexInterner)> = None;
        let mut facet = Vec::with_capacity(3);

        util::lines(des, progress, |line| {
            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            match keyword {
                "solid" => {
                    if let Some((body, _)) = current.take() {
                        bodies.push(body);
                    }
                    let name = rest.trim();
                    let name = (!name.is_empty()).then(|| name.to_owned());
                    current = Some((Body::new(name), VertexInterner::default()));
                }
                "endsolid" => {
                    if let Some((body, _)) = current.take() {
                        bodies.push(body);
                    }
                }
                "outer" => facet.clear(),
                "vertex" => {
                    let mut parts = rest.split_whitespace();
                    facet.push(Vector3::new(
                        util::parse_f64(parts.next())?,
                        util::parse_f64(parts.next())?,
                        util::parse_f64(parts.next())?,
                    ));
                }
                "endloop" => {
                    if facet.len() != 3 {
                        bail!("Facet has {} vertices, expected 3", facet.len());
                    }

                    let (body, verts) = current.get_or_insert_with(Default::default);
                    let face = [0, 1, 2].map(|i| verts.index(body, facet[i]));
                    body.faces.push(face);
                    facet.clear();
                }
                _ => {}
            }

            Ok(())
        })?;

        if let Some((body, _)) = current {
            bodies.push(body);
        }

        Ok(bodies)
    }
}

#[cfg(test)]
mod tests {
    use common::serde::SliceDeserializer;

    use super::*;

    const TETRA: &str = "solid tetra
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 1 0 0
  endloop
endfacet
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 0 1
  endloop
endfacet
endsolid tetra
";

    fn binary_stl(triangles: &[[[f32; 3]; 3]], header: &[u8]) -> Vec<u8> {
        let mut out = vec![0; 80];
        out[..header.len()].copy_from_slice(header);
        out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            out.extend_from_slice(&[0; 12]);
            for vert in tri {
                for component in vert {
                    out.extend_from_slice(&component.to_le_bytes());
                }
            }
            out.extend_from_slice(&[0; 2]);
        }
        out
    }

    #[test]
    fn ascii_shares_vertices() {
        let mut des = SliceDeserializer::new(TETRA.as_bytes());
        let bodies = parse(&mut des, Progress::new()).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].name.as_deref(), Some("tetra"));
        assert_eq!(bodies[0].face_count(), 2);
        assert_eq!(bodies[0].vertex_count(), 4);
    }

    #[test]
    fn ascii_multiple_solids() {
        let text = format!("{TETRA}{}", TETRA.replace("tetra", "second"));
        let mut des = SliceDeserializer::new(text.as_bytes());
        let bodies = parse(&mut des, Progress::new()).unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1].name.as_deref(), Some("second"));
    }

    #[test]
    fn ascii_rejects_bad_numbers() {
        let text = TETRA.replace("vertex 0 1 0", "vertex 0 one 0");
        let mut des = SliceDeserializer::new(text.as_bytes());
        assert!(parse(&mut des, Progress::new()).is_err());
    }

    #[test]
    fn binary_with_solid_header() {
        let tri = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let data = binary_stl(&[tri, tri], b"solid but actually binary");
        let mut des = SliceDeserializer::new(&data);
        let bodies = parse(&mut des, Progress::new()).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].face_count(), 2);
        assert_eq!(bodies[0].vertex_count(), 3);
    }

    #[test]
    fn binary_truncated() {
        let tri = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut data = binary_stl(&[tri], b"");
        data.truncate(data.len() - 10);
        let mut des = SliceDeserializer::new(&data);
        assert!(parse(&mut des, Progress::new()).is_err());
    }
}
