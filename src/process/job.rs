//! Jobs and the meshes that own them.

use nalgebra::{Point2, Vector2};

use crate::error::JobError;
use crate::mesh::{FaceId, UvId};

/// What part of a mesh a job covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Every face and UV of the mesh.
    Whole,
    /// One connected UV shell.
    Shell {
        /// Shell number within the mesh.
        shell: usize,
        /// UVs of the shell.
        uvs: Vec<UvId>,
        /// Faces mapped onto the shell.
        faces: Vec<FaceId>,
    },
}

/// One unit of scaling work and its results.
///
/// `error` is set at most once, by the first stage that fails; every later
/// stage leaves the job alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Part of the mesh the job covers.
    pub kind: JobKind,
    /// World-space surface area.
    pub surface_area: f64,
    /// UV area before scaling.
    pub texture_area: f64,
    /// UV area expected after scaling.
    pub final_texture_area: f64,
    /// Scale about [`Job::center`], per axis.
    pub scale: Vector2<f64>,
    /// Center of the UV bounding box; the scaling pivot.
    pub center: Point2<f64>,
    /// Size of the UV bounding box.
    pub extent: Vector2<f64>,
    /// Translation applied after scaling.
    pub offset: Vector2<f64>,
    /// Rejected probes of the scale search.
    pub iterations: usize,
    /// First failure, if any.
    pub error: Option<JobError>,
    /// Set once the transform has been applied (or was a no-op).
    pub completed: bool,
}

impl Job {
    fn with_kind(kind: JobKind) -> Self {
        Self {
            kind,
            surface_area: 0.0,
            texture_area: 0.0,
            final_texture_area: 0.0,
            scale: Vector2::new(1.0, 1.0),
            center: Point2::origin(),
            extent: Vector2::zeros(),
            offset: Vector2::zeros(),
            iterations: 0,
            error: None,
            completed: false,
        }
    }

    /// A job covering a whole mesh.
    pub fn whole() -> Self {
        Self::with_kind(JobKind::Whole)
    }

    /// A job covering one UV shell.
    pub fn shell(shell: usize, uvs: Vec<UvId>, faces: Vec<FaceId>) -> Self {
        Self::with_kind(JobKind::Shell { shell, uvs, faces })
    }

    /// Record a failure unless one is already recorded.
    pub fn fail(&mut self, error: JobError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Check whether no stage has failed.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Faces the job measures; `None` for the whole mesh.
    pub fn faces(&self) -> Option<&[FaceId]> {
        match &self.kind {
            JobKind::Whole => None,
            JobKind::Shell { faces, .. } => Some(faces),
        }
    }

    /// UVs the job moves; `None` for the whole mesh.
    pub fn uvs(&self) -> Option<&[UvId]> {
        match &self.kind {
            JobKind::Whole => None,
            JobKind::Shell { uvs, .. } => Some(uvs),
        }
    }

    /// Display name: the mesh name for whole-mesh jobs, `shell:N` otherwise.
    pub fn name(&self, mesh_name: &str) -> String {
        match &self.kind {
            JobKind::Whole => mesh_name.to_string(),
            JobKind::Shell { shell, .. } => format!("shell:{}", shell),
        }
    }

    /// Surface/UV area ratio before scaling.
    pub fn initial_ratio(&self) -> f64 {
        self.surface_area / self.texture_area
    }

    /// Surface/UV area ratio after scaling.
    pub fn final_ratio(&self) -> f64 {
        self.surface_area / self.final_texture_area
    }

    /// Check whether applying the job would change nothing.
    pub fn is_noop(&self) -> bool {
        self.scale == Vector2::new(1.0, 1.0) && self.offset == Vector2::zeros()
    }

    /// Lower and upper corner of the bounding box after scaling and offset.
    pub fn placed_bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let half = self.extent.component_mul(&self.scale) * 0.5;
        let center = self.center + self.offset;
        (center - half, center + half)
    }
}

/// A mesh taking part in a run, with the jobs it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshUnit {
    /// Index of the mesh in the host collection.
    pub handle: usize,
    /// Mesh name, filled in during gathering.
    pub name: String,
    /// UV set that was current before the run.
    pub current_uv_set: Option<String>,
    /// UV set the run works on.
    pub use_uv_set: Option<String>,
    /// U coordinates captured during gathering.
    pub u: Vec<f32>,
    /// V coordinates captured during gathering.
    pub v: Vec<f32>,
    /// Mesh-level failure; when set, none of the jobs run.
    pub error: Option<JobError>,
    /// Jobs owned by this mesh.
    pub jobs: Vec<Job>,
}

impl MeshUnit {
    /// Create a unit for the mesh at `handle`.
    pub fn new(handle: usize, jobs: Vec<Job>) -> Self {
        Self {
            handle,
            name: String::new(),
            current_uv_set: None,
            use_uv_set: None,
            u: Vec::new(),
            v: Vec::new(),
            error: None,
            jobs,
        }
    }

    /// Record a mesh-level failure unless one is already recorded.
    pub fn fail(&mut self, error: JobError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Check whether the mesh itself is usable.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Check whether any job failed.
    pub fn has_job_errors(&self) -> bool {
        self.jobs.iter().any(|j| j.error.is_some())
    }

    /// Jobs that have not failed, on a mesh that has not failed.
    pub fn healthy_jobs(&self) -> impl Iterator<Item = &Job> {
        let ok = self.is_ok();
        self.jobs.iter().filter(move |j| ok && j.is_ok())
    }

    pub(crate) fn healthy_jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        let ok = self.is_ok();
        self.jobs.iter_mut().filter(move |j| ok && j.is_ok())
    }
}
