//! Core mesh data types.

use nalgebra::{Point3, Vector3};

/// Degenerate-geometry threshold (areas, norms, coincident vertices).
pub const EPS_GEOM: f64 = 1e-10;

/// Near-zero guard for divisions and separating-axis candidates.
pub const EPS_AXIS: f64 = 1e-8;

/// Divide a vector by a scalar, returning the zero vector when the
/// divisor is too small to be meaningful.
#[inline]
pub fn safe_div(v: Vector3<f64>, divisor: f64) -> Vector3<f64> {
    if divisor.abs() < EPS_AXIS {
        Vector3::zeros()
    } else {
        v / divisor
    }
}

/// A triangle surface mesh: a dense vertex table and a face table
/// indexing into it.
///
/// Vertex coordinates are stored in single precision (the boundary
/// contract with mesh files and host applications); all derived
/// computation promotes to `f64`.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions, row-major `n x 3`.
    pub vertices: Vec<Point3<f32>>,

    /// Triangle faces as indices into the vertex table.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a mesh from raw coordinate triples and index triples.
    pub fn from_rows(vertices: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: vertices
                .into_iter()
                .map(|[x, y, z]| Point3::new(x, y, z))
                .collect(),
            faces,
        }
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces (triangles) in the mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty (no vertices or faces).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Whether every face index lies inside the vertex table.
    pub fn indices_in_bounds(&self) -> bool {
        let n = self.vertices.len() as u32;
        self.faces.iter().all(|f| f.iter().all(|&i| i < n))
    }

    /// Vertex position promoted to double precision.
    #[inline]
    pub fn position(&self, vertex_idx: u32) -> Point3<f64> {
        let p = &self.vertices[vertex_idx as usize];
        Point3::new(p.x as f64, p.y as f64, p.z as f64)
    }

    /// Get a specific triangle by face index, or None when the face index
    /// or any of its vertex indices is out of range.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        let &[i0, i1, i2] = self.faces.get(face_idx)?;
        let n = self.vertices.len() as u32;
        if i0 >= n || i1 >= n || i2 >= n {
            return None;
        }
        Some(Triangle {
            v0: self.position(i0),
            v1: self.position(i1),
            v2: self.position(i2),
        })
    }

    /// Iterate over triangles, yielding concrete vertex data.
    ///
    /// Panics on out-of-range face indices; use [`Mesh::triangle`] on
    /// untrusted input.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[i0, i1, i2]| Triangle {
            v0: self.position(i0),
            v1: self.position(i1),
            v2: self.position(i2),
        })
    }

    /// Compute the axis-aligned bounding box of all vertices.
    /// Returns None if the mesh has no vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        if self.vertices.is_empty() {
            return None;
        }

        let mut min = self.position(0);
        let mut max = min;

        for i in 1..self.vertices.len() as u32 {
            let p = self.position(i);
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }
}

/// A triangle with concrete double-precision vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Corner positions as an array, in winding order.
    #[inline]
    pub fn corners(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// The (unnormalized) face normal via cross product.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// The unit face normal, or the zero vector for degenerate triangles
    /// (cross-product norm below [`EPS_GEOM`]).
    pub fn normal(&self) -> Vector3<f64> {
        let n = self.normal_unnormalized();
        let norm = n.norm();
        if norm < EPS_GEOM {
            Vector3::zeros()
        } else {
            n / norm
        }
    }

    /// Area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// The centroid (mean of the three corners).
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.v0.x + self.v1.x + self.v2.x) / 3.0,
            (self.v0.y + self.v1.y + self.v2.y) / 3.0,
            (self.v0.z + self.v1.z + self.v2.z) / 3.0,
        )
    }

    /// The three edge vectors, in winding order.
    #[inline]
    pub fn edge_vectors(&self) -> [Vector3<f64>; 3] {
        [self.v1 - self.v0, self.v2 - self.v1, self.v0 - self.v2]
    }

    /// Lengths of the three edges.
    #[inline]
    pub fn edge_lengths(&self) -> [f64; 3] {
        let [e0, e1, e2] = self.edge_vectors();
        [e0.norm(), e1.norm(), e2.norm()]
    }

    /// Mean edge length, the triangle's characteristic scale.
    #[inline]
    pub fn avg_edge_length(&self) -> f64 {
        let [a, b, c] = self.edge_lengths();
        (a + b + c) / 3.0
    }

    /// Axis-aligned bounding box of the three corners.
    pub fn aabb(&self) -> Aabb {
        let min = Point3::new(
            self.v0.x.min(self.v1.x).min(self.v2.x),
            self.v0.y.min(self.v1.y).min(self.v2.y),
            self.v0.z.min(self.v1.z).min(self.v2.z),
        );
        let max = Point3::new(
            self.v0.x.max(self.v1.x).max(self.v2.x),
            self.v0.y.max(self.v1.y).max(self.v2.y),
            self.v0.z.max(self.v1.z).max(self.v2.z),
        );
        Aabb { min, max }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Closed-interval overlap test on all three axes.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn unit_right_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_triangle_normal() {
        let n = unit_right_triangle().normal();
        assert!(approx_eq(n.x, 0.0));
        assert!(approx_eq(n.y, 0.0));
        assert!(approx_eq(n.z, 1.0));
    }

    #[test]
    fn test_degenerate_normal_is_zero() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(tri.normal(), Vector3::zeros());
    }

    #[test]
    fn test_triangle_area_and_centroid() {
        let tri = unit_right_triangle();
        assert!(approx_eq(tri.area(), 0.5));
        let c = tri.centroid();
        assert!(approx_eq(c.x, 1.0 / 3.0));
        assert!(approx_eq(c.y, 1.0 / 3.0));
    }

    #[test]
    fn test_aabb_intersects_closed_intervals() {
        let a = Aabb {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        let touching = Aabb {
            min: Point3::new(1.0, 0.0, 0.0),
            max: Point3::new(2.0, 1.0, 1.0),
        };
        let apart = Aabb {
            min: Point3::new(1.5, 0.0, 0.0),
            max: Point3::new(2.0, 1.0, 1.0),
        };
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_mesh_bounds_promotes_to_f64() {
        let mesh = Mesh::from_rows(
            vec![[0.0, 0.0, 0.0], [10.0, 5.0, 3.0], [-2.0, 8.0, 1.0]],
            vec![],
        );
        let (min, max) = mesh.bounds().expect("non-empty mesh");
        assert!(approx_eq(min.x, -2.0));
        assert!(approx_eq(max.y, 8.0));
        assert!(approx_eq(max.z, 3.0));
    }

    #[test]
    fn test_triangle_rejects_out_of_range_indices() {
        let mesh = Mesh::from_rows(vec![[0.0; 3], [1.0, 0.0, 0.0]], vec![[0, 1, 7]]);
        assert!(mesh.triangle(0).is_none());
        assert!(mesh.triangle(3).is_none());
    }

    #[test]
    fn test_safe_div_zero_divisor() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(safe_div(v, 0.0), Vector3::zeros());
        assert_eq!(safe_div(v, 1e-12), Vector3::zeros());
        assert!(approx_eq(safe_div(v, 2.0).x, 0.5));
    }
}
