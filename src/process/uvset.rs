//! Choosing the UV set a mesh is processed on.

use crate::error::JobError;
use crate::mesh::MeshAccess;

/// The UV set picked for a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UvSetChoice {
    /// The mesh's current set.
    Current(String),
    /// A different set, made current for the duration of the run.
    Override(String),
}

impl UvSetChoice {
    /// Name of the chosen set.
    pub fn name(&self) -> &str {
        match self {
            UvSetChoice::Current(name) | UvSetChoice::Override(name) => name,
        }
    }
}

/// Pick the UV set to work on.
///
/// Without a request the current set is used. A requested set that equals
/// the current one is reported as [`UvSetChoice::Current`]. A requested set
/// that does not exist falls back to the current set only if
/// `allow_fallback` is set.
///
/// # Errors
///
/// - [`JobError::NoUvSetFound`] if the mesh has no UV set at all.
/// - [`JobError::UvSetNotFound`] if the requested set is missing and
///   fallback is not allowed.
pub fn resolve_uv_set<M: MeshAccess + ?Sized>(
    mesh: &M,
    requested: Option<&str>,
    allow_fallback: bool,
) -> Result<UvSetChoice, JobError> {
    let current = match mesh.current_uv_set() {
        Some(current) => current,
        None => return Err(JobError::NoUvSetFound),
    };

    let Some(requested) = requested else {
        return Ok(UvSetChoice::Current(current));
    };

    if requested == current {
        Ok(UvSetChoice::Current(current))
    } else if mesh.has_uv_set(requested) {
        Ok(UvSetChoice::Override(requested.to_string()))
    } else if allow_fallback {
        Ok(UvSetChoice::Current(current))
    } else {
        Err(JobError::UvSetNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_grid, UvMesh};
    use nalgebra::{Point2, Point3};

    fn two_sets() -> UvMesh {
        let mut mesh = build_grid("grid", 1, 1, 1.0, 1.0, Point2::origin()).unwrap();
        let coords = vec![Point2::new(0.0, 0.0); 4];
        mesh.add_uv_set("lightmap", &coords, &[vec![0, 1, 3, 2]])
            .unwrap();
        mesh
    }

    #[test]
    fn test_current_without_request() {
        let mesh = two_sets();
        assert_eq!(
            resolve_uv_set(&mesh, None, false),
            Ok(UvSetChoice::Current("map1".to_string()))
        );
        assert_eq!(
            resolve_uv_set(&mesh, Some("map1"), false),
            Ok(UvSetChoice::Current("map1".to_string()))
        );
    }

    #[test]
    fn test_override() {
        let mesh = two_sets();
        let choice = resolve_uv_set(&mesh, Some("lightmap"), false).unwrap();
        assert_eq!(choice, UvSetChoice::Override("lightmap".to_string()));
        assert_eq!(choice.name(), "lightmap");
    }

    #[test]
    fn test_missing_set_and_fallback() {
        let mesh = two_sets();
        assert_eq!(
            resolve_uv_set(&mesh, Some("missing"), false),
            Err(JobError::UvSetNotFound)
        );
        assert_eq!(
            resolve_uv_set(&mesh, Some("missing"), true),
            Ok(UvSetChoice::Current("map1".to_string()))
        );
    }

    #[test]
    fn test_no_uv_sets() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = UvMesh::from_polygons("bare", positions, &[vec![0, 1, 2]]).unwrap();
        assert_eq!(
            resolve_uv_set(&mesh, Some("map1"), true),
            Err(JobError::NoUvSetFound)
        );
    }
}
