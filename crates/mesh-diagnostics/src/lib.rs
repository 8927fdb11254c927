//! Quality and topology diagnostics for triangle surface meshes.
//!
//! This crate detects the geometric and topological defects that commonly
//! break CAD/CFD preprocessing pipelines. It never mutates mesh topology:
//! every operation is a pure diagnosis over a vertex table and a face
//! table.
//!
//! # Detectors
//!
//! - **Free edges**: edges bounding exactly one face (open boundary)
//! - **Overlapping edges**: geometrically coincident edges referenced by
//!   more than two faces, found via quantized edge keys
//! - **Non-manifold vertices**: vertices incident to four or more free
//!   edges
//! - **Face quality**: triangle shape quality by the `2r/R`
//!   inscribed/circumscribed-radius ratio, with histogram
//! - **Adjacent faces**: face pairs whose centroids lie closer than a
//!   threshold relative to their edge scale
//! - **Pierced faces**: non-vertex-sharing triangle pairs that intersect
//!   in 3D, found via an octree and the Separating Axis Theorem, with
//!   full, incremental, and localized detection modes
//!
//! # File formats
//!
//! [`io::load_mesh`] reads binary and ASCII STL and NAS (Nastran
//! `GRID*`/`CTRIA3`) files. STL vertices are not merged: each facet
//! contributes three fresh vertex rows.
//!
//! # Quick start
//!
//! ```no_run
//! use mesh_diagnostics::{DiagnosticsParams, load_mesh, run_diagnostics};
//!
//! let loaded = load_mesh("part.stl".as_ref()).unwrap();
//! let report = run_diagnostics(&loaded.mesh, &DiagnosticsParams::default()).unwrap();
//! println!("{report}");
//! ```
//!
//! # Incremental pierced-face detection
//!
//! For interactive editing, [`SpatialIndex`] keeps the octree and cached
//! triangle geometry alive across edits:
//!
//! ```
//! use mesh_diagnostics::{Mesh, SpatialIndex};
//!
//! let mut mesh = Mesh::from_rows(
//!     vec![
//!         [-1.0, -1.0, 0.0],
//!         [1.0, -1.0, 0.0],
//!         [0.0, 1.0, 0.0],
//!         [-1.0, 0.0, -1.0],
//!         [1.0, 0.0, -1.0],
//!         [0.0, 0.0, 1.0],
//!     ],
//!     vec![[0, 1, 2], [3, 4, 5]],
//! );
//!
//! let mut index = SpatialIndex::new();
//! index.initialize(&mesh).unwrap();
//!
//! // Edit the mesh, then refresh the modified faces and re-check locally.
//! mesh.vertices[5].z = 2.0;
//! index.update(&mesh, &[1]).unwrap();
//! let result = index.detect_local(&mesh, &[1]).unwrap();
//! assert_eq!(result.faces, vec![0, 1]);
//! ```
//!
//! # Determinism
//!
//! Runs on identical inputs produce identical results: every detector
//! sorts its output ascending by face or vertex index. The persistent
//! [`SpatialIndex`] is single-owner state; do not share one index across
//! concurrent detection runs.

mod error;
mod timing;
mod types;

pub mod diagnostics;
pub mod edges;
pub mod io;
pub mod octree;
pub mod overlap;
pub mod pierced;
pub mod proximity;
pub mod quality;

pub use diagnostics::{DiagnosticsParams, DiagnosticsReport, DiagnosticsTimings, run_diagnostics};
pub use edges::{EdgeIndex, NonManifoldParams, detect_free_edges, detect_non_manifold_vertices};
pub use error::{DiagError, DiagResult};
pub use io::{LoadedMesh, MeshFormat, load_mesh};
pub use overlap::{OverlapParams, detect_overlapping_edges};
pub use pierced::{
    PiercedParams, PiercedResult, SpatialIndex, detect_pierced_faces,
    detect_pierced_faces_with_params,
};
pub use proximity::{ProximityParams, detect_adjacent_faces};
pub use quality::{QUALITY_BIN_LABELS, QualityParams, QualityStats, analyze_face_quality};
pub use types::{Aabb, EPS_AXIS, EPS_GEOM, Mesh, Triangle, safe_div};

impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    /// Per-facet normals, if the format carries them, are discarded;
    /// use [`io::load_mesh`] to keep them.
    pub fn load(path: impl AsRef<std::path::Path>) -> DiagResult<Self> {
        io::load_mesh(path.as_ref()).map(|loaded| loaded.mesh)
    }

    /// Run every default detector and aggregate the findings.
    pub fn diagnose(&self) -> DiagResult<DiagnosticsReport> {
        diagnostics::run_diagnostics(self, &DiagnosticsParams::default())
    }
}
