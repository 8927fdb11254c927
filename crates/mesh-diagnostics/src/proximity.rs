//! Adjacent-face detection by centroid proximity.
//!
//! Two faces are adjacent when their centroid distance, relative to the
//! smaller of their average edge lengths, is at or below a threshold. The
//! scan is quadratic in the face count and is intended for small suspect
//! subsets pre-filtered by the caller.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::timing::OperationTimer;
use crate::types::{EPS_GEOM, Mesh};

/// Parameters for adjacent-face detection.
#[derive(Debug, Clone)]
pub struct ProximityParams {
    /// Maximum centroid distance relative to the minimum average edge
    /// length. Default 0.5.
    pub threshold: f64,
}

impl Default for ProximityParams {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Detect adjacent faces: unordered pairs `(i, j)` with `j > i` whose
/// centroids lie closer than `threshold` times their edge scale.
///
/// Degenerate rules: when both the edge scale and the distance are below
/// 1e-10 the pair counts as adjacent (coincident slivers); when only the
/// edge scale is degenerate the pair is skipped. Faces with out-of-range
/// vertex indices are logged and skipped. Returns pairs sorted ascending,
/// plus elapsed wall-clock seconds.
pub fn detect_adjacent_faces(mesh: &Mesh, params: &ProximityParams) -> (Vec<(u32, u32)>, f64) {
    let timer = OperationTimer::start("detect_adjacent_faces");

    // Per-face centroid and characteristic scale; None for invalid faces.
    let face_data: Vec<Option<(nalgebra::Point3<f64>, f64)>> = (0..mesh.face_count())
        .map(|face_idx| {
            let tri = mesh.triangle(face_idx);
            if tri.is_none() {
                warn!(face = face_idx, "face references out-of-range vertex, skipped");
            }
            tri.map(|t| (t.centroid(), t.avg_edge_length()))
        })
        .collect();

    let mut pairs: Vec<(u32, u32)> = (0..face_data.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let face_data = &face_data;
            let threshold = params.threshold;
            let lhs = face_data[i];
            (i + 1..face_data.len()).filter_map(move |j| {
                let (ci, li) = lhs?;
                let (cj, lj) = face_data[j]?;

                let d = (ci - cj).norm();
                let scale = li.min(lj);

                let adjacent = if scale < EPS_GEOM && d < EPS_GEOM {
                    true
                } else if scale < EPS_GEOM {
                    false
                } else {
                    d / scale <= threshold
                };

                adjacent.then_some((i as u32, j as u32))
            })
        })
        .collect();
    pairs.sort_unstable();

    if !pairs.is_empty() {
        info!(count = pairs.len(), "adjacent face pairs found");
    }
    (pairs, timer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_halves_are_not_adjacent_at_default_threshold() {
        let mesh = Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [1, 3, 2]],
        );
        let (pairs, _) = detect_adjacent_faces(&mesh, &ProximityParams::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_nearly_coincident_faces_are_adjacent() {
        // Second triangle is the first nudged well below its edge scale.
        let mesh = Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.01, 0.0, 0.01],
                [1.01, 0.0, 0.01],
                [0.51, 1.0, 0.01],
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let (pairs, _) = detect_adjacent_faces(&mesh, &ProximityParams::default());
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_coincident_degenerate_pair_is_adjacent() {
        // Two point-triangles collapsed onto the same location.
        let mesh = Mesh::from_rows(
            vec![[2.0, 2.0, 2.0], [2.0, 2.0, 2.0]],
            vec![[0, 0, 0], [1, 1, 1]],
        );
        let (pairs, _) = detect_adjacent_faces(&mesh, &ProximityParams::default());
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_degenerate_face_away_from_others_is_skipped() {
        let mesh = Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.4, 0.4, 0.0],
            ],
            vec![[0, 1, 2], [3, 3, 3]],
        );
        let (pairs, _) = detect_adjacent_faces(&mesh, &ProximityParams::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_invalid_face_index_is_skipped() {
        let mesh = Mesh::from_rows(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
            vec![[0, 1, 2], [0, 1, 99]],
        );
        let (pairs, _) = detect_adjacent_faces(&mesh, &ProximityParams::default());
        assert!(pairs.is_empty());
    }
}
