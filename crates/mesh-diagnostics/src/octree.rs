//! Octree spatial index over triangle centroids.
//!
//! Faces are bucketed by the octant of their centroid, which keeps
//! construction linear and the tree shallow. Triangles can cross cell
//! boundaries, so queries are conservative: a query yields every face
//! stored in any leaf whose cell box overlaps the query box, and the
//! caller re-filters with exact per-face bounding boxes.
//!
//! Nodes live in a flat arena (`Vec<Node>` with child indices) rather than
//! boxed per-node allocations, so the whole tree drops in one free and
//! traversal stays cache-friendly.

use nalgebra::Point3;
use tracing::debug;

use crate::types::{Aabb, Triangle};

/// Maximum subdivision depth.
pub const MAX_DEPTH: u32 = 8;

/// A node with this many faces or fewer is not subdivided further.
pub const LEAF_FACE_LIMIT: usize = 20;

/// Fractional padding applied to the root cell so every centroid is
/// strictly interior.
const ROOT_PAD: f64 = 1.01;

#[derive(Debug, Clone)]
struct Node {
    center: Point3<f64>,
    /// Half-width of the cubic cell.
    half_size: f64,
    depth: u32,
    /// Faces whose centroid falls in this cell; populated at leaves only.
    faces: Vec<u32>,
    /// Children indexed by `(x>=cx) | (y>=cy)<<1 | (z>=cz)<<2`.
    children: [Option<u32>; 8],
}

impl Node {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    #[inline]
    fn cell_aabb(&self) -> Aabb {
        let h = self.half_size;
        Aabb {
            min: Point3::new(self.center.x - h, self.center.y - h, self.center.z - h),
            max: Point3::new(self.center.x + h, self.center.y + h, self.center.z + h),
        }
    }

    #[inline]
    fn octant_of(&self, p: &Point3<f64>) -> usize {
        (usize::from(p.x >= self.center.x))
            | (usize::from(p.y >= self.center.y) << 1)
            | (usize::from(p.z >= self.center.z) << 2)
    }
}

/// Octree over the centroids of a triangle set.
#[derive(Debug, Clone, Default)]
pub struct Octree {
    nodes: Vec<Node>,
}

impl Octree {
    /// Build the tree from a triangle table. An empty table yields an
    /// empty tree that answers no candidates.
    pub fn build(triangles: &[Triangle]) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if triangles.is_empty() {
            return tree;
        }

        // Root cell: padded cube around all triangle vertices.
        let mut min = triangles[0].v0;
        let mut max = min;
        for tri in triangles {
            for v in tri.corners() {
                min.x = min.x.min(v.x);
                min.y = min.y.min(v.y);
                min.z = min.z.min(v.z);
                max.x = max.x.max(v.x);
                max.y = max.y.max(v.y);
                max.z = max.z.max(v.z);
            }
        }
        let center = Point3::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        );
        let extent = (max.x - min.x).max(max.y - min.y).max(max.z - min.z);
        let half_size = extent * ROOT_PAD;

        let centroids: Vec<Point3<f64>> = triangles.iter().map(Triangle::centroid).collect();
        let all_faces: Vec<u32> = (0..triangles.len() as u32).collect();

        tree.subdivide(&centroids, all_faces, center, half_size, 0);
        debug!(
            faces = triangles.len(),
            nodes = tree.nodes.len(),
            "octree built"
        );
        tree
    }

    /// Allocate one node, recursing into octants while the face set is
    /// large enough and the maximum depth is not reached. Returns the
    /// node's index.
    fn subdivide(
        &mut self,
        centroids: &[Point3<f64>],
        faces: Vec<u32>,
        center: Point3<f64>,
        half_size: f64,
        depth: u32,
    ) -> u32 {
        let node_idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            center,
            half_size,
            depth,
            faces: Vec::new(),
            children: [None; 8],
        });

        if depth >= MAX_DEPTH || faces.len() <= LEAF_FACE_LIMIT {
            self.nodes[node_idx as usize].faces = faces;
            return node_idx;
        }

        let mut octant_faces: [Vec<u32>; 8] = Default::default();
        for &face in &faces {
            let octant = self.nodes[node_idx as usize].octant_of(&centroids[face as usize]);
            octant_faces[octant].push(face);
        }

        let child_half = half_size / 2.0;
        for (octant, bucket) in octant_faces.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child_center = Point3::new(
                center.x + if octant & 1 != 0 { child_half } else { -child_half },
                center.y + if octant & 2 != 0 { child_half } else { -child_half },
                center.z + if octant & 4 != 0 { child_half } else { -child_half },
            );
            let child_idx = self.subdivide(centroids, bucket, child_center, child_half, depth + 1);
            self.nodes[node_idx as usize].children[octant] = Some(child_idx);
        }

        node_idx
    }

    /// Whether the tree holds any nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visit every face stored in a leaf whose cell box overlaps `bbox`.
    ///
    /// Candidates are a superset of the faces actually near `bbox`; the
    /// caller is responsible for de-duplication and self-exclusion.
    pub fn for_each_candidate(&self, bbox: &Aabb, visit: &mut impl FnMut(u32)) {
        if !self.nodes.is_empty() {
            self.visit_node(0, bbox, visit);
        }
    }

    fn visit_node(&self, node_idx: u32, bbox: &Aabb, visit: &mut impl FnMut(u32)) {
        let node = &self.nodes[node_idx as usize];
        if !node.cell_aabb().intersects(bbox) {
            return;
        }

        if node.is_leaf() {
            for &face in &node.faces {
                visit(face);
            }
            return;
        }

        for child in node.children.into_iter().flatten() {
            self.visit_node(child, bbox, visit);
        }
    }

    #[cfg(test)]
    fn leaf_faces(&self) -> Vec<u32> {
        let mut all: Vec<u32> = self
            .nodes
            .iter()
            .filter(|n| n.is_leaf())
            .flat_map(|n| n.faces.iter().copied())
            .collect();
        all.sort_unstable();
        all
    }
}
