//! Error types for uvratio.
//!
//! Two families live here. [`MeshError`] covers failures of the library
//! surface (file I/O, malformed input, bad parameters). [`JobError`] is the
//! per-job outcome recorded by the processing pipeline; it never aborts a
//! run and is reported alongside the job's statistics.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while loading, saving or accessing meshes.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face references an invalid UV index.
    #[error("face {face} references invalid uv index {uv}")]
    InvalidUvIndex {
        /// The face index.
        face: usize,
        /// The invalid UV index.
        uv: usize,
    },

    /// A face has fewer than three corners.
    #[error("face {face} has {corners} corners, at least 3 required")]
    DegenerateFace {
        /// The face index.
        face: usize,
        /// Number of corners found.
        corners: usize,
    },

    /// The per-face UV assignment does not match the face's corner count.
    #[error("face {face} has {corners} corners but {uvs} uv assignments")]
    CornerMismatch {
        /// The face index.
        face: usize,
        /// Number of polygon corners.
        corners: usize,
        /// Number of UV indices supplied.
        uvs: usize,
    },

    /// The named UV set does not exist on the mesh.
    #[error("uv set '{name}' not found on mesh '{mesh}'")]
    UnknownUvSet {
        /// The requested UV set name.
        name: String,
        /// The mesh name.
        mesh: String,
    },

    /// U and V coordinate arrays have different lengths.
    #[error("u and v arrays differ in length ({u} vs {v})")]
    UvLengthMismatch {
        /// Length of the U array.
        u: usize,
        /// Length of the V array.
        v: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        MeshError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a failed job or mesh.
///
/// A job without an error carries `None`; the first failing stage sets the
/// error and every later stage skips the job.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobError {
    /// The mesh has no UV set at all.
    #[error("Mesh has no UV-Set, mesh skipped")]
    NoUvSetFound,

    /// The requested UV set is missing and fallback is disabled.
    #[error("Specified UV-Set not found, mesh skipped")]
    UvSetNotFound,

    /// The ratio search used its whole iteration budget.
    #[error("Ratio not found, mesh skipped")]
    RatioNotFound,

    /// The mesh could not be accessed.
    #[error("Invalid mesh")]
    InvalidMesh,

    /// The host returned U and V arrays of different lengths.
    #[error("Unequal length of U and V lists")]
    UvListsDifferentLengths,

    /// The search bracket collapsed before converging.
    #[error("Iteration failed")]
    IterationFailed,

    /// The UV area of the job is exactly zero.
    #[error("Zero texture area")]
    ZeroTextureArea,

    /// The surface area of the job is exactly zero.
    #[error("Zero surface area")]
    ZeroSurfaceArea,

    /// The run was cancelled before the job was processed.
    #[error("Skipped, User Aborted")]
    Skipped,
}

/// Human-readable status for an optional job error.
pub fn status_str(error: Option<JobError>) -> String {
    match error {
        Some(e) => e.to_string(),
        None => "Ok".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_messages() {
        assert_eq!(JobError::ZeroTextureArea.to_string(), "Zero texture area");
        assert_eq!(JobError::Skipped.to_string(), "Skipped, User Aborted");
        assert_eq!(status_str(None), "Ok");
        assert_eq!(status_str(Some(JobError::IterationFailed)), "Iteration failed");
    }

    #[test]
    fn test_invalid_param_display() {
        let err = MeshError::invalid_param("goal_ratio", -1.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: goal_ratio = -1 (must be positive)"
        );
    }
}
