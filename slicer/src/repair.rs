//! Best-effort cleanup that turns whatever was loaded into a mesh the plane
//! slicer can chain into closed contours. The result is not guaranteed to be
//! manifold; holes that cannot be closed are reported and left open.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use mesh_format::Body;
use nalgebra::Vector2;
use tracing::{debug, info, warn};

use crate::{
    half_edge::HalfEdgeMesh,
    mesh::{load_bodies, Mesh},
    Pos, SliceError,
};

/// Faces with less area than this (mm²) are dropped.
pub const DEGENERATE_AREA_EPSILON: f64 = 1e-12;

/// Counts of everything [`repair`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub bodies: usize,
    pub welded_vertices: usize,
    pub invalid_faces: usize,
    pub degenerate_faces: usize,
    pub duplicate_faces: usize,
    pub holes_filled: usize,
    pub holes_unfilled: usize,
    pub unreferenced_vertices: usize,
}

/// Loads every mesh file and repairs them as one composite solid.
pub fn load_and_repair<P: AsRef<Path>>(paths: &[P]) -> Result<(Mesh, RepairReport), SliceError> {
    let bodies = load_bodies(paths)?;
    repair(bodies).map_err(|err| match (err, paths) {
        (SliceError::UnreadableGeometry { path: None, reason }, [path]) => {
            SliceError::unreadable(Some(path.as_ref().to_owned()), reason)
        }
        (err, _) => err,
    })
}

/// Merges all bodies into one mesh and cleans it up. Fails only if no faces
/// are left afterwards.
pub fn repair(bodies: Vec<Body>) -> Result<(Mesh, RepairReport), SliceError> {
    let mut report = RepairReport {
        bodies: bodies.len(),
        ..Default::default()
    };

    let (mut vertices, mut faces) = concatenate(bodies, &mut report);
    weld_vertices(&mut vertices, &mut faces, &mut report);
    report.degenerate_faces += remove_degenerate_faces(&vertices, &mut faces);
    report.duplicate_faces += remove_duplicate_faces(&mut faces);
    fill_holes(&vertices, &mut faces, &mut report);
    report.degenerate_faces += remove_degenerate_faces(&vertices, &mut faces);
    report.unreferenced_vertices += remove_unreferenced_vertices(&mut vertices, &mut faces);

    if faces.is_empty() {
        return Err(SliceError::unreadable(None, "mesh has no faces after repair"));
    }

    info!(
        "Repaired mesh. {{ vert: {}, face: {}, welded: {}, dropped faces: {}, holes filled: {} }}",
        vertices.len(),
        faces.len(),
        report.welded_vertices,
        report.invalid_faces + report.degenerate_faces + report.duplicate_faces,
        report.holes_filled,
    );
    if report.holes_unfilled > 0 {
        warn!(
            "{} boundary loop(s) could not be closed, affected layers may show seams",
            report.holes_unfilled
        );
    }

    Ok((Mesh::new(vertices, faces), report))
}

/// Appends every body into one vertex and face list. Faces pointing outside
/// of their body are dropped.
fn concatenate(bodies: Vec<Body>, report: &mut RepairReport) -> (Vec<Pos>, Vec<[u32; 3]>) {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for body in bodies {
        let offset = vertices.len() as u32;
        let count = body.verts.len() as u32;

        for face in body.faces {
            if face.iter().any(|&x| x >= count) {
                report.invalid_faces += 1;
                continue;
            }
            faces.push(face.map(|x| x + offset));
        }
        vertices.extend(body.verts);
    }

    (vertices, faces)
}

/// Merges vertices with identical coordinates, also across bodies.
fn weld_vertices(vertices: &mut Vec<Pos>, faces: &mut [[u32; 3]], report: &mut RepairReport) {
    let mut lookup = HashMap::new();
    let mut welded = Vec::with_capacity(vertices.len());

    // Adding 0.0 turns -0.0 into 0.0 so both hash the same.
    let remap = vertices
        .iter()
        .map(|v| {
            let key = [v.x + 0.0, v.y + 0.0, v.z + 0.0].map(f64::to_bits);
            *lookup.entry(key).or_insert_with(|| {
                welded.push(*v);
                (welded.len() - 1) as u32
            })
        })
        .collect::<Vec<_>>();

    for face in faces.iter_mut() {
        *face = face.map(|x| remap[x as usize]);
    }

    report.welded_vertices += vertices.len() - welded.len();
    *vertices = welded;
}

fn is_degenerate(vertices: &[Pos], [a, b, c]: [u32; 3]) -> bool {
    if a == b || b == c || c == a {
        return true;
    }

    let (v0, v1, v2) = (vertices[a as usize], vertices[b as usize], vertices[c as usize]);
    (v1 - v0).cross(&(v2 - v0)).magnitude() / 2.0 < DEGENERATE_AREA_EPSILON
}

fn remove_degenerate_faces(vertices: &[Pos], faces: &mut Vec<[u32; 3]>) -> usize {
    let before = faces.len();
    faces.retain(|&face| !is_degenerate(vertices, face));
    before - faces.len()
}

/// Drops faces using the same three vertices as an earlier face, regardless
/// of winding.
fn remove_duplicate_faces(faces: &mut Vec<[u32; 3]>) -> usize {
    let mut seen = HashSet::new();
    let before = faces.len();
    faces.retain(|face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    });
    before - faces.len()
}

fn fill_holes(vertices: &[Pos], faces: &mut Vec<[u32; 3]>, report: &mut RepairReport) {
    let loops = HalfEdgeMesh::build(faces).boundary_loops();
    if loops.is_empty() {
        return;
    }

    debug!("Found {} boundary loop(s)", loops.len());
    for hole in loops {
        if !hole.closed || hole.vertices.len() < 3 {
            report.holes_unfilled += 1;
            continue;
        }

        faces.extend(triangulate_hole(vertices, &hole.vertices));
        report.holes_filled += 1;
    }
}

/// Ear clips a boundary loop in its best fit plane. The new triangles are
/// wound against the loop so they match the faces around the hole. Falls back
/// to a fan if the projected loop has no ear left.
fn triangulate_hole(vertices: &[Pos], hole: &[u32]) -> Vec<[u32; 3]> {
    let positions = hole.iter().map(|&x| vertices[x as usize]).collect::<Vec<_>>();
    let points = project_loop(&positions);

    let mut remaining = (0..hole.len()).collect::<Vec<_>>();
    let mut triangles = Vec::with_capacity(hole.len() - 2);

    while remaining.len() > 3 {
        let Some(i) = (0..remaining.len()).find(|&i| is_ear(&points, &remaining, i)) else {
            debug!("No ear left with {} vertices remaining, using a fan", remaining.len());
            break;
        };

        let len = remaining.len();
        let (prev, curr, next) = (remaining[(i + len - 1) % len], remaining[i], remaining[(i + 1) % len]);
        triangles.push([hole[next], hole[curr], hole[prev]]);
        remaining.remove(i);
    }

    for i in 1..remaining.len() - 1 {
        triangles.push([hole[remaining[i + 1]], hole[remaining[i]], hole[remaining[0]]]);
    }

    triangles
}

/// Projects a loop onto the plane given by its Newell normal, such that the
/// loop winds counter-clockwise in 2D.
fn project_loop(positions: &[Pos]) -> Vec<Vector2<f64>> {
    let origin = positions.iter().sum::<Pos>() / positions.len() as f64;
    let normal = (0..positions.len())
        .map(|i| (positions[i] - origin).cross(&(positions[(i + 1) % positions.len()] - origin)))
        .sum::<Pos>();

    let normal = normal.try_normalize(f64::EPSILON).unwrap_or_else(Pos::z);
    let axis = if normal.x.abs() < 0.9 { Pos::x() } else { Pos::y() };
    let u = (axis - normal * axis.dot(&normal)).normalize();
    let w = normal.cross(&u);

    positions
        .iter()
        .map(|p| Vector2::new((p - origin).dot(&u), (p - origin).dot(&w)))
        .collect()
}

fn cross2(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn is_ear(points: &[Vector2<f64>], remaining: &[usize], i: usize) -> bool {
    let len = remaining.len();
    let (prev, curr, next) = (remaining[(i + len - 1) % len], remaining[i], remaining[(i + 1) % len]);
    let (a, b, c) = (points[prev], points[curr], points[next]);

    if cross2(b - a, c - b) <= 0.0 {
        return false;
    }

    remaining
        .iter()
        .filter(|&&x| x != prev && x != curr && x != next)
        .map(|&x| points[x])
        .filter(|&p| p != a && p != b && p != c)
        .all(|p| !(cross2(b - a, p - a) >= 0.0 && cross2(c - b, p - b) >= 0.0 && cross2(a - c, p - c) >= 0.0))
}

fn remove_unreferenced_vertices(vertices: &mut Vec<Pos>, faces: &mut [[u32; 3]]) -> usize {
    let mut remap = vec![None; vertices.len()];
    let mut kept = Vec::with_capacity(vertices.len());

    for face in faces.iter_mut() {
        for idx in face.iter_mut() {
            let new = *remap[*idx as usize].get_or_insert_with(|| {
                kept.push(vertices[*idx as usize]);
                (kept.len() - 1) as u32
            });
            *idx = new;
        }
    }

    let removed = vertices.len() - kept.len();
    *vertices = kept;
    removed
}

#[cfg(test)]
mod tests {
    use crate::builder::MeshBuilder;

    use super::*;

    fn cube_body(min: f64, max: f64) -> Body {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::repeat(min), Pos::repeat(max));
        builder.build_body("cube")
    }

    #[test]
    fn closed_cube_is_untouched() {
        let (mesh, report) = repair(vec![cube_body(0.0, 10.0)]).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(
            report,
            RepairReport {
                bodies: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn bodies_are_concatenated() {
        let (mesh, report) = repair(vec![cube_body(0.0, 1.0), cube_body(5.0, 6.0)]).unwrap();
        assert_eq!(report.bodies, 2);
        assert_eq!(mesh.face_count(), 24);
        assert_eq!(mesh.vertex_count(), 16);
    }

    #[test]
    fn coincident_bodies_are_welded() {
        let (mesh, report) = repair(vec![cube_body(0.0, 1.0), cube_body(0.0, 1.0)]).unwrap();
        assert_eq!(report.welded_vertices, 8);
        assert_eq!(report.duplicate_faces, 12);
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn open_box_is_closed() {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::zeros(), Pos::repeat(10.0));
        builder.remove_faces(2);
        let (mesh, report) = repair(vec![builder.build_body("open")]).unwrap();

        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.holes_unfilled, 0);
        assert_eq!(mesh.face_count(), 12);
        assert!(mesh.is_manifold());
        assert!(HalfEdgeMesh::build(mesh.faces()).boundary_edges().next().is_none());
    }

    #[test]
    fn concave_hole_is_ear_clipped() {
        // An L shaped loop in the z = 0 plane.
        let vertices = [
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ]
        .map(|(x, y)| Pos::new(x, y, 0.0));
        let hole = [0, 1, 2, 3, 4, 5];
        let triangles = triangulate_hole(&vertices, &hole);
        assert_eq!(triangles.len(), 4);

        let area = triangles
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (vertices[a as usize], vertices[b as usize], vertices[c as usize]);
                (b - a).cross(&(c - a)).z / 2.0
            })
            .sum::<f64>();
        // Wound against the loop, so the signed area is negative.
        assert!((area + 3.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_and_unreferenced_are_dropped() {
        let mut body = cube_body(0.0, 1.0);
        body.verts.push(Pos::new(9.0, 9.0, 9.0));
        body.verts.push(Pos::new(0.5, 0.0, 0.0));
        body.faces.push([0, 0, 1]);
        body.faces.push([0, 1, 9]);
        body.faces.push([0, 1, 42]);

        let (mesh, report) = repair(vec![body]).unwrap();
        assert_eq!(report.invalid_faces, 1);
        assert_eq!(report.degenerate_faces, 2);
        assert_eq!(report.unreferenced_vertices, 2);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn empty_input_is_unreadable() {
        let err = repair(Vec::new()).unwrap_err();
        assert!(matches!(err, SliceError::UnreadableGeometry { path: None, .. }));

        let mut body = cube_body(0.0, 1.0);
        body.faces = vec![[0, 0, 0]];
        assert!(repair(vec![body]).is_err());
    }
}
