//! Mesh file I/O.
//!
//! This module provides functions for loading and saving UV-mapped meshes.
//! A file may hold several objects, so loading always returns a list.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Keeps polygons and UV seams |
//! | glTF | `.gltf`, `.glb` | ✓ | ✗ | `TEXCOORD_0` only |
//!
//! # Usage
//!
//! ```no_run
//! use uvratio::io::{load, save};
//!
//! let meshes = load("model.obj").unwrap();
//! save(&meshes, "output.obj").unwrap();
//! ```

pub mod gltf;
pub mod obj;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::UvMesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// glTF format.
    Gltf,
    /// glTF binary format.
    Glb,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "gltf" => Some(Format::Gltf),
            "glb" => Some(Format::Glb),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load every mesh in a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<UvMesh>> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Gltf | Format::Glb => gltf::load(path),
    }
}

/// Save meshes to a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn save<P: AsRef<Path>>(meshes: &[UvMesh], path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(meshes, path),
        Format::Gltf | Format::Glb => Err(MeshError::SaveError {
            path: path.to_path_buf(),
            message: "glTF saving is not supported".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/model.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("scene.glb"), Some(Format::Glb));
        assert_eq!(Format::from_path("mesh.stl"), None);
        assert!(matches!(
            load("mesh.stl"),
            Err(MeshError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_gltf_save_unsupported() {
        let result = save(&[], std::env::temp_dir().join("uvratio_unsupported.gltf"));
        assert!(matches!(result, Err(MeshError::SaveError { .. })));
    }
}
