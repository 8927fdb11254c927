//! Topological edge indexing, free-edge and non-manifold-vertex detection.
//!
//! An edge is identified by its canonical key `(min(a, b), max(a, b))` of
//! vertex indices. The index records, per edge, every face that references
//! it; a clean manifold mesh has exactly two incidences per interior edge.

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::timing::OperationTimer;
use crate::types::Mesh;

/// Canonical undirected edge key: vertex indices in ascending order.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

/// Per-edge face-incidence lists for a face table.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    map: HashMap<(u32, u32), Vec<u32>>,
}

impl EdgeIndex {
    /// Build the index in one pass over the face table.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut map: HashMap<(u32, u32), Vec<u32>> = HashMap::with_capacity(faces.len() * 3 / 2);

        for (face_idx, &[a, b, c]) in faces.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                map.entry(edge_key(u, v))
                    .or_default()
                    .push(face_idx as u32);
            }
        }

        Self { map }
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.map.len()
    }

    /// Faces incident to an edge, or an empty slice if the edge is unknown.
    pub fn faces_of(&self, a: u32, b: u32) -> &[u32] {
        self.map
            .get(&edge_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over `(edge, incident faces)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &Vec<u32>)> {
        self.map.iter()
    }

    /// Edges with exactly one incident face, sorted ascending.
    pub fn free_edges(&self) -> Vec<(u32, u32)> {
        let mut free: Vec<(u32, u32)> = self
            .map
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
            .collect();
        free.sort_unstable();
        free
    }
}

/// Detect free edges: edges bounding exactly one face (open boundary).
///
/// Returns the edges sorted ascending by vertex-index pair, plus elapsed
/// wall-clock seconds.
pub fn detect_free_edges(mesh: &Mesh) -> (Vec<(u32, u32)>, f64) {
    let timer = OperationTimer::start("detect_free_edges");

    let index = EdgeIndex::build(&mesh.faces);
    let free = index.free_edges();

    debug!(
        edges = index.edge_count(),
        free = free.len(),
        "free-edge scan complete"
    );
    (free, timer.finish())
}

/// Parameters for non-manifold-vertex detection.
#[derive(Debug, Clone)]
pub struct NonManifoldParams {
    /// Geometric tolerance, accepted for future use and currently unused.
    pub tolerance: f64,
}

impl Default for NonManifoldParams {
    fn default() -> Self {
        Self { tolerance: 1e-5 }
    }
}

/// Detect non-manifold vertices: vertices incident to four or more free
/// edges.
///
/// A manifold-with-boundary vertex lies on at most two free edges and a
/// branch point on three; four or more means multiple sheets meet at the
/// vertex. Returns vertex indices sorted ascending, plus elapsed seconds.
pub fn detect_non_manifold_vertices(mesh: &Mesh, _params: &NonManifoldParams) -> (Vec<u32>, f64) {
    let timer = OperationTimer::start("detect_non_manifold_vertices");

    let index = EdgeIndex::build(&mesh.faces);

    let mut free_edge_degree: HashMap<u32, u32> = HashMap::new();
    for (&(a, b), faces) in index.iter() {
        if faces.len() == 1 {
            *free_edge_degree.entry(a).or_insert(0) += 1;
            *free_edge_degree.entry(b).or_insert(0) += 1;
        }
    }

    let mut vertices: Vec<u32> = free_edge_degree
        .iter()
        .filter(|&(_, &degree)| degree >= 4)
        .map(|(&v, _)| v)
        .collect();
    vertices.sort_unstable();

    if !vertices.is_empty() {
        info!(count = vertices.len(), "non-manifold vertices found");
    }
    (vertices, timer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two coplanar triangles sharing the diagonal of a unit square.
    fn square_mesh() -> Mesh {
        Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [1, 3, 2]],
        )
    }

    #[test]
    fn test_edge_key_is_order_independent() {
        assert_eq!(edge_key(3, 7), edge_key(7, 3));
        assert_eq!(edge_key(3, 7), (3, 7));
    }

    #[test]
    fn test_shared_edge_has_two_incidences() {
        let mesh = square_mesh();
        let index = EdgeIndex::build(&mesh.faces);
        assert_eq!(index.faces_of(1, 2), &[0, 1]);
        assert_eq!(index.faces_of(0, 1), &[0]);
    }

    #[test]
    fn test_single_triangle_has_three_free_edges() {
        let mesh = Mesh::from_rows(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        );
        let (free, _) = detect_free_edges(&mesh);
        assert_eq!(free, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_square_boundary_is_free() {
        let (free, _) = detect_free_edges(&square_mesh());
        // The shared diagonal (1,2) is interior; the four outer edges are open.
        assert_eq!(free, vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_no_free_edges_on_closed_fan() {
        // Tetrahedron: every edge has exactly two incident faces.
        let mesh = Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.5, 0.5, 1.0],
            ],
            vec![[0, 1, 2], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        );
        let (free, _) = detect_free_edges(&mesh);
        assert!(free.is_empty());
    }

    #[test]
    fn test_cross_of_open_strips_flags_hub_vertex() {
        // Four triangles meeting at vertex 0, every edge free.
        let mesh = Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 0.0, 0.0],
                [-1.0, -1.0, 0.0],
                [0.0, 1.0, 0.5],
                [0.0, 1.0, 1.5],
                [0.0, -1.0, 0.5],
                [0.0, -1.0, 1.5],
            ],
            vec![[0, 1, 2], [0, 3, 4], [0, 5, 6], [0, 7, 8]],
        );
        let (vertices, _) = detect_non_manifold_vertices(&mesh, &NonManifoldParams::default());
        assert_eq!(vertices, vec![0]);
    }

    #[test]
    fn test_square_has_no_non_manifold_vertices() {
        let (vertices, _) = detect_non_manifold_vertices(&square_mesh(), &Default::default());
        assert!(vertices.is_empty());
    }
}
