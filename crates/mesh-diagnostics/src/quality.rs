//! Triangle shape-quality analysis.
//!
//! Quality is the inscribed/circumscribed-radius ratio `2r/R`: 1 for an
//! equilateral triangle, 0 for a degenerate one. Values are clamped to
//! `[0, 1]` on output to guard against floating-point rounding at the
//! boundary.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::timing::OperationTimer;
use crate::types::{EPS_GEOM, Mesh, Triangle};

/// Labels for the ten histogram bins, `[0.0, 0.1)` through `[0.9, 1.0]`
/// (the top bin is inclusive).
pub const QUALITY_BIN_LABELS: [&str; 10] = [
    "0.0-0.1", "0.1-0.2", "0.2-0.3", "0.3-0.4", "0.4-0.5", "0.5-0.6", "0.6-0.7", "0.7-0.8",
    "0.8-0.9", "0.9-1.0",
];

/// Parameters for face-quality analysis.
#[derive(Debug, Clone)]
pub struct QualityParams {
    /// Faces with quality below this value are reported. Default 0.3.
    pub threshold: f64,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self { threshold: 0.3 }
    }
}

/// Aggregate statistics over all face qualities.
#[derive(Debug, Clone)]
pub struct QualityStats {
    /// Total number of faces analyzed (including degenerate ones).
    pub total_faces: usize,
    /// Number of faces below the threshold.
    pub low_quality_faces: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Face counts per quality bin; see [`QUALITY_BIN_LABELS`].
    pub histogram: [usize; 10],
}

impl QualityStats {
    /// Histogram bins paired with their labels.
    pub fn labeled_histogram(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        QUALITY_BIN_LABELS
            .iter()
            .zip(self.histogram.iter())
            .map(|(&label, &count)| (label, count))
    }
}

impl std::fmt::Display for QualityStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Face quality ({} faces):", self.total_faces)?;
        writeln!(
            f,
            "  min {:.4}  max {:.4}  mean {:.4}  below threshold: {}",
            self.min, self.max, self.mean, self.low_quality_faces
        )?;
        for (label, count) in self.labeled_histogram() {
            writeln!(f, "  {label}: {count}")?;
        }
        Ok(())
    }
}

/// Quality of a single triangle by the `2r/R` metric.
///
/// Uses Heron's formula for the area; a triangle with area below
/// [`EPS_GEOM`] is degenerate and scores 0.
pub fn triangle_quality(tri: &Triangle) -> f64 {
    let [a, b, c] = tri.edge_lengths();
    let s = (a + b + c) / 2.0;
    let area = (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt();

    if area < EPS_GEOM {
        return 0.0;
    }

    let r = area / s;
    let big_r = (a * b * c) / (4.0 * area);
    (2.0 * r / big_r).clamp(0.0, 1.0)
}

/// Analyze the shape quality of every face.
///
/// Returns the indices of faces with quality below the threshold (sorted
/// ascending), the aggregate statistics, and elapsed wall-clock seconds.
/// Faces with out-of-range vertex indices are logged and skipped; they
/// count toward `total_faces` but not toward the statistics.
pub fn analyze_face_quality(mesh: &Mesh, params: &QualityParams) -> (Vec<u32>, QualityStats, f64) {
    let timer = OperationTimer::start("analyze_face_quality");

    let qualities: Vec<Option<f64>> = (0..mesh.face_count())
        .into_par_iter()
        .map(|face_idx| mesh.triangle(face_idx).map(|tri| triangle_quality(&tri)))
        .collect();

    let mut low_quality = Vec::new();
    let mut histogram = [0usize; 10];
    let mut min = 1.0f64;
    let mut max = 0.0f64;
    let mut sum = 0.0f64;
    let mut counted = 0usize;

    for (face_idx, quality) in qualities.iter().enumerate() {
        let Some(q) = *quality else {
            warn!(face = face_idx, "face references out-of-range vertex, skipped");
            continue;
        };

        histogram[((q * 10.0) as usize).min(9)] += 1;
        min = min.min(q);
        max = max.max(q);
        sum += q;
        counted += 1;

        if q < params.threshold {
            low_quality.push(face_idx as u32);
        }
    }

    let stats = QualityStats {
        total_faces: mesh.face_count(),
        low_quality_faces: low_quality.len(),
        min,
        max,
        mean: if counted > 0 { sum / counted as f64 } else { 0.0 },
        histogram,
    };

    info!(
        faces = stats.total_faces,
        low_quality = stats.low_quality_faces,
        mean = format!("{:.4}", stats.mean),
        "face quality analyzed"
    );
    (low_quality, stats, timer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_equilateral_quality_is_one() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 3.0f64.sqrt() / 2.0, 0.0),
        );
        assert!((triangle_quality(&tri) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_quality_is_zero() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(triangle_quality(&tri), 0.0);
    }

    #[test]
    fn test_right_isoceles_quality() {
        // Legs 1, hypotenuse sqrt(2): r = (2 - sqrt(2))/2, R = sqrt(2)/2,
        // so 2r/R = 2(sqrt(2) - 1) which is about 0.8284.
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!((triangle_quality(&tri) - 0.828_427).abs() < 1e-4);
    }

    #[test]
    fn test_analyze_flags_thin_triangle() {
        let mesh = Mesh::from_rows(
            vec![
                // Equilateral
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 0.866_025, 0.0],
                // Needle
                [0.0, 0.0, 1.0],
                [10.0, 0.0, 1.0],
                [5.0, 0.01, 1.0],
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let (low, stats, _) = analyze_face_quality(&mesh, &QualityParams::default());
        assert_eq!(low, vec![1]);
        assert_eq!(stats.total_faces, 2);
        assert_eq!(stats.low_quality_faces, 1);
        assert!(stats.max > 0.999);
        assert!(stats.min < 0.05);
    }

    #[test]
    fn test_histogram_top_bin_is_inclusive() {
        let mesh = Mesh::from_rows(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 0.866_025, 0.0]],
            vec![[0, 1, 2]],
        );
        let (_, stats, _) = analyze_face_quality(&mesh, &QualityParams::default());
        assert_eq!(stats.histogram[9], 1);
        assert_eq!(stats.histogram.iter().sum::<usize>(), 1);
    }

    #[test]
    fn test_duplicated_index_counts_as_degenerate() {
        let mesh = Mesh::from_rows(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
            vec![[0, 0, 1]],
        );
        let (low, stats, _) = analyze_face_quality(&mesh, &QualityParams::default());
        assert_eq!(low, vec![0]);
        assert_eq!(stats.histogram[0], 1);
        assert_eq!(stats.min, 0.0);
    }
}
