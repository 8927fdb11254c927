//! Overlapping-edge detection via geometric edge keys.
//!
//! Topological edge identity misses defects where two faces reference the
//! same geometry through distinct vertex indices (duplicate vertices). The
//! geometric key quantizes both endpoints to a fixed decimal precision so
//! coincident edges collide regardless of which vertex rows they use.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::timing::OperationTimer;
use crate::types::Mesh;

/// Parameters for overlapping-edge detection.
#[derive(Debug, Clone)]
pub struct OverlapParams {
    /// Decimal places retained when quantizing endpoint coordinates.
    /// The default of 5 corresponds to a coordinate tolerance of 1e-5.
    pub precision: u32,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self { precision: 5 }
    }
}

/// An endpoint quantized to integer grid coordinates.
type QuantizedPoint = [i64; 3];

/// Geometric edge key: both endpoints quantized, then ordered
/// lexicographically so `(p, q)` and `(q, p)` collide. Hashing on the
/// integer representation avoids floating-point hash instability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GeometricEdgeKey {
    lo: QuantizedPoint,
    hi: QuantizedPoint,
}

impl GeometricEdgeKey {
    fn new(p: Point3<f64>, q: Point3<f64>, scale: f64) -> Self {
        let qp = quantize(p, scale);
        let qq = quantize(q, scale);
        if qp <= qq {
            Self { lo: qp, hi: qq }
        } else {
            Self { lo: qq, hi: qp }
        }
    }
}

#[inline]
fn quantize(p: Point3<f64>, scale: f64) -> QuantizedPoint {
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

/// Detect overlapping edges: geometric edges referenced by more than two
/// face-edge incidences.
///
/// The representative emitted per overlap is the first `(a, b)` vertex-index
/// pair observed in insertion order; the result is sorted ascending by that
/// pair. Also returns elapsed wall-clock seconds.
pub fn detect_overlapping_edges(mesh: &Mesh, params: &OverlapParams) -> (Vec<(u32, u32)>, f64) {
    let timer = OperationTimer::start("detect_overlapping_edges");

    let scale = 10f64.powi(params.precision as i32);
    let mut buckets: HashMap<GeometricEdgeKey, Vec<(u32, u32)>> =
        HashMap::with_capacity(mesh.faces.len() * 3 / 2);

    for &[a, b, c] in &mesh.faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let key = GeometricEdgeKey::new(mesh.position(u), mesh.position(v), scale);
            buckets.entry(key).or_default().push((u, v));
        }
    }

    let mut overlapping: Vec<(u32, u32)> = buckets
        .values()
        .filter(|incidences| incidences.len() > 2)
        .map(|incidences| incidences[0])
        .collect();
    overlapping.sort_unstable();

    debug!(buckets = buckets.len(), "geometric edge buckets built");
    if !overlapping.is_empty() {
        info!(count = overlapping.len(), "overlapping edges found");
    }
    (overlapping, timer.finish())
}
