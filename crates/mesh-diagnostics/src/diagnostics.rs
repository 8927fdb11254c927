//! Aggregated diagnostics across every detector.
//!
//! This is the narrow surface intended for host applications: one call
//! runs the selected detectors over a mesh and returns their findings
//! together with per-stage wall-clock timings.

use tracing::{info, warn};

use crate::edges::{NonManifoldParams, detect_free_edges, detect_non_manifold_vertices};
use crate::error::DiagResult;
use crate::overlap::{OverlapParams, detect_overlapping_edges};
use crate::pierced::{PiercedParams, PiercedResult, detect_pierced_faces_with_params};
use crate::proximity::{ProximityParams, detect_adjacent_faces};
use crate::quality::{QualityParams, QualityStats, analyze_face_quality};
use crate::timing::OperationTimer;
use crate::types::Mesh;

/// Which detectors to run, and with what parameters.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsParams {
    pub non_manifold: NonManifoldParams,
    pub overlap: OverlapParams,
    pub quality: QualityParams,
    pub proximity: ProximityParams,
    pub pierced: PiercedParams,

    /// Run the quadratic adjacent-face scan. Off by default: it is meant
    /// for small suspect subsets, not whole meshes.
    pub run_adjacent: bool,

    /// Skip the pierced-face detector (the most expensive stage).
    pub skip_pierced: bool,
}

/// Per-stage elapsed seconds.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsTimings {
    pub free_edges: f64,
    pub overlapping_edges: f64,
    pub non_manifold_vertices: f64,
    pub face_quality: f64,
    pub adjacent_faces: Option<f64>,
    pub pierced_faces: Option<f64>,
    pub total: f64,
}

/// Findings from a full diagnostic run.
#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    pub free_edges: Vec<(u32, u32)>,
    pub overlapping_edges: Vec<(u32, u32)>,
    pub non_manifold_vertices: Vec<u32>,
    pub low_quality_faces: Vec<u32>,
    pub quality_stats: QualityStats,
    /// Present when the adjacent-face scan was enabled.
    pub adjacent_faces: Option<Vec<(u32, u32)>>,
    /// Present when the pierced-face detector ran.
    pub pierced: Option<PiercedResult>,
    pub timings: DiagnosticsTimings,
}

impl DiagnosticsReport {
    /// Whether no detector reported a defect.
    pub fn is_clean(&self) -> bool {
        self.free_edges.is_empty()
            && self.overlapping_edges.is_empty()
            && self.non_manifold_vertices.is_empty()
            && self.low_quality_faces.is_empty()
            && self.adjacent_faces.as_ref().is_none_or(Vec::is_empty)
            && self.pierced.as_ref().is_none_or(PiercedResult::is_clean)
    }
}

impl std::fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh diagnostics:")?;
        writeln!(f, "  Free edges: {}", self.free_edges.len())?;
        writeln!(f, "  Overlapping edges: {}", self.overlapping_edges.len())?;
        writeln!(
            f,
            "  Non-manifold vertices: {}",
            self.non_manifold_vertices.len()
        )?;
        writeln!(
            f,
            "  Low-quality faces: {} of {} (mean quality {:.4})",
            self.low_quality_faces.len(),
            self.quality_stats.total_faces,
            self.quality_stats.mean
        )?;
        match &self.adjacent_faces {
            Some(pairs) => writeln!(f, "  Adjacent face pairs: {}", pairs.len())?,
            None => writeln!(f, "  Adjacent face pairs: not checked")?,
        }
        match &self.pierced {
            Some(result) => writeln!(f, "  Pierced faces: {}", result.faces.len())?,
            None => writeln!(f, "  Pierced faces: not checked")?,
        }
        writeln!(f, "  Total time: {:.4}s", self.timings.total)?;
        Ok(())
    }
}

/// Run every selected detector over the mesh and aggregate the results.
pub fn run_diagnostics(mesh: &Mesh, params: &DiagnosticsParams) -> DiagResult<DiagnosticsReport> {
    let timer = OperationTimer::start("run_diagnostics");
    let mut timings = DiagnosticsTimings::default();

    let (free_edges, elapsed) = detect_free_edges(mesh);
    timings.free_edges = elapsed;

    let (overlapping_edges, elapsed) = detect_overlapping_edges(mesh, &params.overlap);
    timings.overlapping_edges = elapsed;

    let (non_manifold_vertices, elapsed) = detect_non_manifold_vertices(mesh, &params.non_manifold);
    timings.non_manifold_vertices = elapsed;

    let (low_quality_faces, quality_stats, elapsed) = analyze_face_quality(mesh, &params.quality);
    timings.face_quality = elapsed;

    let adjacent_faces = if params.run_adjacent {
        let (pairs, elapsed) = detect_adjacent_faces(mesh, &params.proximity);
        timings.adjacent_faces = Some(elapsed);
        Some(pairs)
    } else {
        None
    };

    let pierced = if params.skip_pierced {
        None
    } else {
        let result = detect_pierced_faces_with_params(mesh, &params.pierced)?;
        timings.pierced_faces = Some(result.elapsed);
        Some(result)
    };

    timings.total = timer.finish();

    let report = DiagnosticsReport {
        free_edges,
        overlapping_edges,
        non_manifold_vertices,
        low_quality_faces,
        quality_stats,
        adjacent_faces,
        pierced,
        timings,
    };

    if report.is_clean() {
        info!(
            faces = mesh.face_count(),
            "diagnostics complete, no defects found"
        );
    } else {
        warn!(
            free_edges = report.free_edges.len(),
            overlapping_edges = report.overlapping_edges.len(),
            non_manifold_vertices = report.non_manifold_vertices.len(),
            low_quality = report.low_quality_faces.len(),
            pierced = report.pierced.as_ref().map_or(0, |p| p.faces.len()),
            "diagnostics complete, defects found"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Mesh {
        Mesh::from_rows(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.5, 0.5, 1.0],
            ],
            vec![[0, 1, 2], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    #[test]
    fn test_clean_tetrahedron_report() {
        let report = run_diagnostics(&tetrahedron(), &DiagnosticsParams::default()).unwrap();
        assert!(report.free_edges.is_empty());
        assert!(report.overlapping_edges.is_empty());
        assert!(report.non_manifold_vertices.is_empty());
        assert!(report.pierced.as_ref().unwrap().is_clean());
        assert!(report.adjacent_faces.is_none());
        assert_eq!(report.quality_stats.total_faces, 4);
    }

    #[test]
    fn test_open_mesh_is_not_clean() {
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        let report = run_diagnostics(&mesh, &DiagnosticsParams::default()).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.free_edges.len(), 3);
    }

    #[test]
    fn test_adjacent_scan_is_opt_in() {
        let params = DiagnosticsParams {
            run_adjacent: true,
            ..Default::default()
        };
        let report = run_diagnostics(&tetrahedron(), &params).unwrap();
        assert!(report.adjacent_faces.is_some());
        assert!(report.timings.adjacent_faces.is_some());
    }

    #[test]
    fn test_report_display_mentions_each_section() {
        let report = run_diagnostics(&tetrahedron(), &DiagnosticsParams::default()).unwrap();
        let text = format!("{report}");
        assert!(text.contains("Free edges"));
        assert!(text.contains("Pierced faces"));
        assert!(text.contains("Total time"));
    }
}
