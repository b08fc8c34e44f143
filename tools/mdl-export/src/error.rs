//! Export error type

use thiserror::Error;

/// Failure while exporting scene objects to MDL records
///
/// Every variant is fatal to the whole export: no record (and no file) is produced.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A face has other than exactly three vertices
    #[error(
        "object '{object}': face {face} has {vertex_count} vertices, only triangles are supported"
    )]
    UnsupportedTopology {
        object: String,
        face: usize,
        vertex_count: usize,
    },

    /// The evaluated mesh has no active UV layer
    #[error("object '{object}': mesh has no active UV layer")]
    MissingUvChannel { object: String },

    /// The UV layer is not aligned with the mesh faces
    #[error("object '{object}': UV layer has no coordinates for every corner of face {face}")]
    UvLayerMismatch { object: String, face: usize },

    /// A face references a vertex outside the mesh's vertex pool
    #[error(
        "object '{object}': face {face} references vertex {index}, mesh has {vertex_count} vertices"
    )]
    InvalidVertexIndex {
        object: String,
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    /// The record would need more corners than a u32 count can describe
    #[error("object '{object}': {count} vertices exceed the u32 record count")]
    TooManyVertices { object: String, count: usize },

    /// The scene could not evaluate the object's mesh
    #[error("object '{object}': failed to evaluate mesh")]
    Evaluation {
        object: String,
        #[source]
        source: anyhow::Error,
    },

    /// The output stream could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, ExportError>`.
pub type ExportResult<T> = Result<T, ExportError>;
