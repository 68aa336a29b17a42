use std::collections::{BTreeMap, HashMap};

/// Half-edge view of a face list, used to find the open boundaries of a mesh.
#[derive(Clone)]
pub struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
}

#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub origin_vertex: u32,
    pub vertex: u32,
    pub twin: Option<u32>,
}

/// Boundary vertices in the direction of their half-edges. A closed loop
/// returns to its first vertex, an open one dead-ends.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLoop {
    pub vertices: Vec<u32>,
    pub closed: bool,
}

impl HalfEdgeMesh {
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut half_edges = Vec::with_capacity(faces.len() * 3);
        let mut edge_map = HashMap::new();

        for face in faces {
            for i in 0..3 {
                let (origin_vertex, vertex) = (face[i], face[(i + 1) % 3]);
                edge_map
                    .entry((origin_vertex, vertex))
                    .or_insert(half_edges.len() as u32);
                half_edges.push(HalfEdge {
                    origin_vertex,
                    vertex,
                    twin: None,
                });
            }
        }

        for edge in half_edges.iter_mut() {
            edge.twin = edge_map.get(&(edge.vertex, edge.origin_vertex)).copied();
        }

        Self { half_edges }
    }

    /// Half-edges without a twin, these border a hole.
    pub fn boundary_edges(&self) -> impl Iterator<Item = &HalfEdge> {
        self.half_edges.iter().filter(|x| x.twin.is_none())
    }

    /// Chains boundary half-edges head to tail into loops. Where several
    /// boundary edges leave the same vertex, the one with the lowest target
    /// vertex is taken first so the result does not depend on hashing.
    pub fn boundary_loops(&self) -> Vec<BoundaryLoop> {
        let mut outgoing = BTreeMap::<u32, Vec<u32>>::new();
        for edge in self.boundary_edges() {
            outgoing.entry(edge.origin_vertex).or_default().push(edge.vertex);
        }
        outgoing.values_mut().for_each(|x| x.sort_unstable_by(|a, b| b.cmp(a)));

        let mut loops = Vec::new();
        while let Some((&start, _)) = outgoing.iter().find(|(_, x)| !x.is_empty()) {
            let mut vertices = vec![start];
            let mut current = start;

            let closed = loop {
                let Some(next) = outgoing.get_mut(&current).and_then(Vec::pop) else {
                    break false;
                };

                if next == start {
                    break true;
                }

                vertices.push(next);
                current = next;
            };

            loops.push(BoundaryLoop { vertices, closed });
        }

        loops
    }
}
