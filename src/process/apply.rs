//! Writing results back to meshes.
//!
//! The pipeline never edits UVs itself at the end of a run. It describes each
//! change as a [`TransformRequest`] and hands it to a [`TransformSink`], which
//! may apply it directly, record it for undo, or forward it to a host.

use nalgebra::{Point2, Vector2};

use crate::error::Result;
use crate::mesh::{MeshAccess, UvId};

/// UVs a transform applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformTarget {
    /// Every UV of the set.
    All,
    /// Only the listed UVs.
    Uvs(Vec<UvId>),
}

/// A scale about a pivot followed by a translation.
///
/// Each targeted UV `p` becomes `(p - pivot) * scale + pivot + translate`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// Handle of the mesh in the host collection.
    pub mesh: usize,
    /// UVs to move.
    pub target: TransformTarget,
    /// UV set to edit.
    pub uv_set: String,
    /// Scaling pivot.
    pub pivot: Point2<f64>,
    /// Per-axis scale.
    pub scale: Vector2<f64>,
    /// Translation applied after scaling.
    pub translate: Vector2<f64>,
    /// Whether the sink should keep the request for undo.
    pub record_undo: bool,
}

impl TransformRequest {
    /// Transform a single UV coordinate.
    #[inline]
    pub fn transform_point(&self, p: Point2<f64>) -> Point2<f64> {
        let local = (p - self.pivot).component_mul(&self.scale);
        self.pivot + local + self.translate
    }

    /// The request that moves the UVs back, if the scale is invertible.
    pub fn inverse(&self) -> Option<Self> {
        if self.scale.x == 0.0 || self.scale.y == 0.0 {
            return None;
        }
        // q = (p - c) * s + c + t  =>  p = (q - (c + t)) / s + c
        let pivot = self.pivot + self.translate;
        Some(Self {
            pivot,
            scale: Vector2::new(1.0 / self.scale.x, 1.0 / self.scale.y),
            translate: -self.translate,
            target: self.target.clone(),
            uv_set: self.uv_set.clone(),
            ..*self
        })
    }

    /// Apply the transform to a mesh's UV storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the UV set does not exist or cannot be written.
    pub fn apply_to<M: MeshAccess + ?Sized>(&self, mesh: &mut M) -> Result<()> {
        let (mut u, mut v) = mesh.uvs(&self.uv_set)?;
        let n = u.len().min(v.len());

        let mut move_uv = |i: usize| {
            if i >= n {
                return;
            }
            let p = self.transform_point(Point2::new(u[i] as f64, v[i] as f64));
            u[i] = p.x as f32;
            v[i] = p.y as f32;
        };

        match &self.target {
            TransformTarget::All => (0..n).for_each(&mut move_uv),
            TransformTarget::Uvs(uvs) => uvs.iter().for_each(|uv| move_uv(uv.index())),
        }

        mesh.set_uvs(&self.uv_set, &u, &v)
    }
}

/// Receives the transforms produced by a run.
pub trait TransformSink {
    /// Apply one transform to `mesh`.
    fn apply(&mut self, mesh: &mut dyn MeshAccess, request: &TransformRequest) -> Result<()>;
}

/// Sink that applies transforms and keeps an undo log.
///
/// Requests with `record_undo` set are appended after they succeed.
#[derive(Debug, Clone, Default)]
pub struct TransformLog {
    entries: Vec<TransformRequest>,
}

impl TransformLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded requests, oldest first.
    pub fn entries(&self) -> &[TransformRequest] {
        &self.entries
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Revert every recorded request, newest first, and clear the log.
    ///
    /// Requests naming a mesh outside `meshes` or with a non-invertible scale
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Stops at the first request that fails to apply; earlier reverts stay.
    pub fn undo_all<M: MeshAccess>(&mut self, meshes: &mut [M]) -> Result<()> {
        while let Some(request) = self.entries.pop() {
            let Some(mesh) = meshes.get_mut(request.mesh) else {
                continue;
            };
            if let Some(inverse) = request.inverse() {
                inverse.apply_to(mesh)?;
            }
        }
        Ok(())
    }
}

impl TransformSink for TransformLog {
    fn apply(&mut self, mesh: &mut dyn MeshAccess, request: &TransformRequest) -> Result<()> {
        request.apply_to(mesh)?;
        if request.record_undo {
            self.entries.push(request.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_grid;

    fn request(target: TransformTarget) -> TransformRequest {
        TransformRequest {
            mesh: 0,
            target,
            uv_set: "map1".to_string(),
            pivot: Point2::new(0.5, 0.5),
            scale: Vector2::new(2.0, 0.5),
            translate: Vector2::new(0.25, 0.0),
            record_undo: true,
        }
    }

    #[test]
    fn test_transform_point() {
        let r = request(TransformTarget::All);
        let p = r.transform_point(Point2::new(1.0, 1.0));
        assert!((p.x - 1.75).abs() < 1e-12);
        assert!((p.y - 0.75).abs() < 1e-12);

        let back = r.inverse().unwrap().transform_point(p);
        assert!((back.x - 1.0).abs() < 1e-12);
        assert!((back.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_to_targets_only_listed_uvs() {
        let mut mesh = build_grid("grid", 1, 1, 1.0, 1.0, Point2::origin()).unwrap();
        let (u0, v0) = mesh.uvs("map1").unwrap();
        request(TransformTarget::Uvs(vec![UvId::new(3)]))
            .apply_to(&mut mesh)
            .unwrap();
        let (u, v) = mesh.uvs("map1").unwrap();
        assert_eq!(u[0], u0[0]);
        assert_eq!(v[2], v0[2]);
        // UV 3 sits at (1, 1).
        assert!((u[3] - 1.75).abs() < 1e-6);
        assert!((v[3] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_log_records_and_undoes() {
        let mut meshes = vec![build_grid("grid", 2, 2, 1.0, 0.5, Point2::origin()).unwrap()];
        let (u0, v0) = meshes[0].uvs("map1").unwrap();

        let mut log = TransformLog::new();
        log.apply(&mut meshes[0], &request(TransformTarget::All)).unwrap();
        let mut silent = request(TransformTarget::All);
        silent.record_undo = false;
        log.apply(&mut meshes[0], &silent).unwrap();
        assert_eq!(log.len(), 1);

        // Revert the unrecorded one by hand, then the log.
        silent.inverse().unwrap().apply_to(&mut meshes[0]).unwrap();
        log.undo_all(&mut meshes).unwrap();
        assert!(log.is_empty());

        let (u, v) = meshes[0].uvs("map1").unwrap();
        for i in 0..u.len() {
            assert!((u[i] - u0[i]).abs() < 1e-5);
            assert!((v[i] - v0[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_missing_uv_set_is_an_error() {
        let mut mesh = build_grid("grid", 1, 1, 1.0, 1.0, Point2::origin()).unwrap();
        let mut r = request(TransformTarget::All);
        r.uv_set = "missing".to_string();
        assert!(r.apply_to(&mut mesh).is_err());
    }
}
