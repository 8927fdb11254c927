//! Error types for mesh diagnostics.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for diagnostic operations.
pub type DiagResult<T> = Result<T, DiagError>;

/// Errors that can occur while loading or diagnosing a mesh.
///
/// Degenerate geometry (zero-area faces, zero-length edges) is never an
/// error: detectors handle it locally. Only structural input problems and
/// file I/O failures surface here.
#[derive(Debug, Error)]
pub enum DiagError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}: {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or truncated mesh file.
    #[error("failed to parse mesh from {path}: {details}")]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported mesh format: {extension:?}")]
    UnsupportedFormat { extension: Option<String> },

    /// Empty mesh (no vertices or faces) where content is required.
    #[error("mesh is empty: {details}")]
    EmptyMesh { details: String },

    /// A face references a vertex index outside the vertex table in a
    /// mandatory-read path.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, \
         but mesh only has {vertex_count} vertices"
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },
}
