//! Host mesh access.
//!
//! [`MeshAccess`] is the seam between the numeric core and whatever owns the
//! geometry. The core only ever reads polygon corners, their positions and
//! their UV assignments, and reads or writes whole UV coordinate arrays.

use nalgebra::Point3;

use super::index::{FaceId, UvId};
use crate::error::Result;

/// Coordinate space for surface measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    /// World space, converted to display units.
    #[default]
    World,
    /// Raw object-space positions.
    Object,
}

/// Read/write access to one mesh's geometry and UV storage.
///
/// Implementations must triangulate faces into polygon-local corner triples.
/// The area code looks corners up by that local index, so a triangulation
/// that returns mesh-relative vertex indices instead silently produces wrong
/// UV areas.
pub trait MeshAccess {
    /// Display name of the mesh.
    fn name(&self) -> &str;

    /// Number of polygon faces.
    fn num_faces(&self) -> usize;

    /// Number of corners of a face.
    fn face_corner_count(&self, face: FaceId) -> usize;

    /// Triangulation of a face as polygon-local corner index triples.
    fn face_triangles(&self, face: FaceId) -> Vec<[usize; 3]>;

    /// Position of a polygon corner.
    fn corner_position(&self, face: FaceId, corner: usize, space: Space) -> Point3<f64>;

    /// UV index assigned to a polygon corner in the given set, if mapped.
    fn corner_uv(&self, face: FaceId, corner: usize, uv_set: &str) -> Option<UvId>;

    /// Names of all UV sets on the mesh.
    fn uv_set_names(&self) -> Vec<String>;

    /// Name of the current UV set, if the mesh has any.
    fn current_uv_set(&self) -> Option<String>;

    /// Make the named UV set current.
    fn set_current_uv_set(&mut self, name: &str) -> Result<()>;

    /// Copy out the U and V coordinate arrays of a UV set.
    fn uvs(&self, uv_set: &str) -> Result<(Vec<f32>, Vec<f32>)>;

    /// Overwrite the U and V coordinate arrays of a UV set.
    fn set_uvs(&mut self, uv_set: &str, u: &[f32], v: &[f32]) -> Result<()>;

    /// Check whether a UV set with this name exists.
    fn has_uv_set(&self, name: &str) -> bool {
        self.uv_set_names().iter().any(|n| n == name)
    }

    /// Iterate over all face ids.
    fn face_ids(&self) -> FaceIds {
        FaceIds {
            next: 0,
            end: self.num_faces(),
        }
    }
}

/// Iterator over the face ids of a mesh.
#[derive(Debug, Clone)]
pub struct FaceIds {
    next: usize,
    end: usize,
}

impl Iterator for FaceIds {
    type Item = FaceId;

    fn next(&mut self) -> Option<FaceId> {
        if self.next < self.end {
            let id = FaceId::new(self.next);
            self.next += 1;
            Some(id)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FaceIds {}
