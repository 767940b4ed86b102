//! Scale search for a target surface/UV area ratio.
//!
//! Given a surface area `S`, a UV area `A` and a goal ratio `g`, the solver
//! finds the factor by which the UVs must be scaled so that `S / A'` is
//! within a threshold of `g`.
//!
//! # Algorithms
//!
//! - [`fast_scale`]: closed form for uniform scaling. Scaling both axes by
//!   `s` multiplies the UV area by `s^2`, so the answer is exact.
//! - [`bisect`]: bisection over a [`ScaleProbe`], used when only one axis
//!   may change. The probe measures the real UV area at a trial scale.
//! - [`solve_relaxed`]: repeated bisection with a threshold that grows by
//!   a factor of ten per attempt, from `1e-4` up to `1e3`.
//!
//! # Example
//!
//! ```
//! use uvratio::algo::ratio::{bisect, RatioProblem, ScaleProbe};
//!
//! // UV area grows linearly with the scale, as for single-axis scaling.
//! struct Linear(f64);
//! impl ScaleProbe for Linear {
//!     fn area_at(&mut self, scale: f64) -> f64 {
//!         self.0 * scale
//!     }
//! }
//!
//! let problem = RatioProblem::new(10.0, 3.0, 2.0);
//! let solution = bisect(&mut Linear(3.0), &problem, 0.001, 200).unwrap();
//! let ratio = 10.0 / solution.area;
//! assert!((ratio - 2.0).abs() < 0.001);
//! ```

use nalgebra::Vector2;

use crate::error::JobError;
use crate::mesh::{FaceId, MeshAccess, UvId};

use super::area::uv_area_from;

/// Bracket used when the UVs must shrink.
const SHRINK_BRACKET: (f64, f64) = (1e-5, 1.0);
/// Bracket used when the UVs must grow.
const GROW_BRACKET: (f64, f64) = (1.0, 1e5);

/// Which UV axes a scale applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingAxis {
    /// Scale U and V uniformly.
    #[default]
    Both,
    /// Scale U only.
    Horizontal,
    /// Scale V only.
    Vertical,
}

impl ScalingAxis {
    /// Expand a scalar factor into a per-axis scale, with `1.0` on axes that
    /// do not change.
    pub fn scale_vector(self, scale: f64) -> Vector2<f64> {
        match self {
            ScalingAxis::Both => Vector2::new(scale, scale),
            ScalingAxis::Horizontal => Vector2::new(scale, 1.0),
            ScalingAxis::Vertical => Vector2::new(1.0, scale),
        }
    }

    /// Force the unused axis of `scale` to `1.0`.
    pub fn restrict(self, scale: Vector2<f64>) -> Vector2<f64> {
        match self {
            ScalingAxis::Both => scale,
            ScalingAxis::Horizontal => Vector2::new(scale.x, 1.0),
            ScalingAxis::Vertical => Vector2::new(1.0, scale.y),
        }
    }
}

/// Closed-form uniform scale that maps a UV area onto a target area.
///
/// `shape_area` is the current UV area and `width`/`height` its bounding
/// box. The result is `sqrt(target_area / shape_area)` expressed through
/// the bounding box, which keeps the box aspect ratio.
pub fn fast_scale(shape_area: f64, target_area: f64, width: f64, height: f64) -> f64 {
    let rect_area = width * height;
    let area_ratio = rect_area / shape_area;
    let target_rect_area = target_area * area_ratio;
    let rect_ratio = width / height;
    let target_height = (target_rect_area / rect_ratio).sqrt();
    target_height / height
}

/// Measures the UV area that results from a trial scale.
pub trait ScaleProbe {
    /// UV area after scaling the original UVs by `scale`.
    fn area_at(&mut self, scale: f64) -> f64;
}

/// Inputs of a ratio search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioProblem {
    /// Surface area of the job.
    pub surface_area: f64,
    /// UV area before scaling.
    pub texture_area: f64,
    /// Requested surface/UV area ratio.
    pub goal_ratio: f64,
}

impl RatioProblem {
    /// Create a problem from surface area, current UV area and goal ratio.
    pub fn new(surface_area: f64, texture_area: f64, goal_ratio: f64) -> Self {
        Self {
            surface_area,
            texture_area,
            goal_ratio,
        }
    }

    /// UV area that meets the goal exactly.
    pub fn target_area(&self) -> f64 {
        self.surface_area / self.goal_ratio
    }

    /// Current surface/UV area ratio.
    pub fn ratio(&self) -> f64 {
        self.surface_area / self.texture_area
    }

    /// Check whether the current ratio already meets the goal.
    pub fn is_satisfied(&self, threshold: f64) -> bool {
        (self.ratio() - self.goal_ratio).abs() < threshold
    }
}

/// An accepted scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Scale factor to apply.
    pub scale: f64,
    /// UV area measured at that scale.
    pub area: f64,
    /// Number of rejected probes.
    pub iterations: usize,
}

impl Solution {
    /// Identity solution keeping the current area.
    pub fn unchanged(area: f64, iterations: usize) -> Self {
        Self {
            scale: 1.0,
            area,
            iterations,
        }
    }
}

/// A failed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    /// Why the search stopped.
    pub error: JobError,
    /// Probes spent before stopping.
    pub iterations: usize,
}

/// Bisect for a scale whose ratio is within `threshold` of the goal.
///
/// The bracket is `[1e-5, 1]` when the current ratio is below the goal (the
/// UVs are too large) and `[1, 1e5]` otherwise. Each probe at the bracket
/// midpoint either meets the threshold or halves the bracket.
///
/// # Errors
///
/// - [`JobError::IterationFailed`] if the bracket collapses to a point.
/// - [`JobError::RatioNotFound`] if `max_iterations` probes are rejected.
pub fn bisect(
    probe: &mut dyn ScaleProbe,
    problem: &RatioProblem,
    threshold: f64,
    max_iterations: usize,
) -> Result<Solution, Failure> {
    let goal = problem.goal_ratio;
    let (mut min, mut max) = if problem.ratio() < goal {
        SHRINK_BRACKET
    } else {
        GROW_BRACKET
    };

    let mut iterations = 0;
    while iterations < max_iterations {
        let scale = min + (max - min) * 0.5;
        let area = probe.area_at(scale);
        let ratio = problem.surface_area / area;

        if (ratio - goal).abs() < threshold {
            return Ok(Solution {
                scale,
                area,
                iterations,
            });
        }

        if ratio < goal {
            max = scale;
        } else {
            min = scale;
        }

        if min == max {
            return Err(Failure {
                error: JobError::IterationFailed,
                iterations,
            });
        }

        iterations += 1;
    }

    Err(Failure {
        error: JobError::RatioNotFound,
        iterations,
    })
}

/// Bisect with thresholds `1e-4, 1e-3, ..., 1e3`, stopping at the first
/// success.
///
/// Iterations accumulate across attempts. On total failure the error of the
/// last attempt is returned.
pub fn solve_relaxed(
    probe: &mut dyn ScaleProbe,
    problem: &RatioProblem,
    max_iterations: usize,
) -> Result<Solution, Failure> {
    let mut total = 0;
    let mut last = JobError::RatioNotFound;

    for power in -4..=3 {
        let threshold = 10f64.powi(power);
        match bisect(probe, problem, threshold, max_iterations) {
            Ok(mut solution) => {
                solution.iterations += total;
                log::debug!(
                    "ratio found at threshold {:e} after {} iterations",
                    threshold,
                    solution.iterations
                );
                return Ok(solution);
            }
            Err(failure) => {
                total += failure.iterations;
                last = failure.error;
            }
        }
    }

    Err(Failure {
        error: last,
        iterations: total,
    })
}

/// Probe that writes trial UVs into a mesh and measures them.
///
/// The original coordinates are snapshotted on creation. Every probe scales
/// the snapshot (not the previous trial) about the UV origin, restricted to
/// the target UVs and axis, and writes it through [`MeshAccess::set_uvs`].
/// The snapshot is written back by [`UvScaleProbe::restore`] or on drop.
pub struct UvScaleProbe<'a, M: MeshAccess + ?Sized> {
    mesh: &'a mut M,
    uv_set: &'a str,
    faces: Option<&'a [FaceId]>,
    targets: Option<&'a [UvId]>,
    axis: ScalingAxis,
    original_u: &'a [f32],
    original_v: &'a [f32],
    work_u: Vec<f32>,
    work_v: Vec<f32>,
    dirty: bool,
}

impl<'a, M: MeshAccess + ?Sized> UvScaleProbe<'a, M> {
    /// Create a probe over the given faces and UVs.
    ///
    /// `faces` limits the area measurement and `targets` limits which UVs are
    /// scaled; `None` means the whole mesh for either.
    pub fn new(
        mesh: &'a mut M,
        uv_set: &'a str,
        faces: Option<&'a [FaceId]>,
        targets: Option<&'a [UvId]>,
        axis: ScalingAxis,
        u: &'a [f32],
        v: &'a [f32],
    ) -> Self {
        Self {
            mesh,
            uv_set,
            faces,
            targets,
            axis,
            work_u: u.to_vec(),
            work_v: v.to_vec(),
            original_u: u,
            original_v: v,
            dirty: false,
        }
    }

    fn scale_one(&mut self, i: usize, scale: f32) {
        let (Some(&u), Some(&v)) = (self.original_u.get(i), self.original_v.get(i)) else {
            return;
        };
        match self.axis {
            ScalingAxis::Both => {
                self.work_u[i] = u * scale;
                self.work_v[i] = v * scale;
            }
            ScalingAxis::Horizontal => self.work_u[i] = u * scale,
            ScalingAxis::Vertical => self.work_v[i] = v * scale,
        }
    }

    /// Write the original coordinates back.
    pub fn restore(mut self) -> crate::error::Result<()> {
        self.write_back()
    }

    fn write_back(&mut self) -> crate::error::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        self.mesh
            .set_uvs(self.uv_set, self.original_u, self.original_v)
    }
}

impl<M: MeshAccess + ?Sized> ScaleProbe for UvScaleProbe<'_, M> {
    fn area_at(&mut self, scale: f64) -> f64 {
        let s = scale as f32;
        match self.targets {
            Some(targets) => {
                for uv in targets {
                    self.scale_one(uv.index(), s);
                }
            }
            None => {
                for i in 0..self.original_u.len() {
                    self.scale_one(i, s);
                }
            }
        }

        self.dirty = true;
        if let Err(e) = self.mesh.set_uvs(self.uv_set, &self.work_u, &self.work_v) {
            log::warn!("failed to write trial uvs on '{}': {}", self.mesh.name(), e);
        }
        uv_area_from(&*self.mesh, self.faces, self.uv_set, &self.work_u, &self.work_v)
    }
}

impl<M: MeshAccess + ?Sized> Drop for UvScaleProbe<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.write_back() {
            log::warn!("failed to restore uvs on '{}': {}", self.mesh.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::area::uv_area;
    use crate::mesh::build_grid;
    use nalgebra::Point2;

    struct Linear(f64);

    impl ScaleProbe for Linear {
        fn area_at(&mut self, scale: f64) -> f64 {
            self.0 * scale
        }
    }

    struct Quadratic(f64);

    impl ScaleProbe for Quadratic {
        fn area_at(&mut self, scale: f64) -> f64 {
            self.0 * scale * scale
        }
    }

    #[test]
    fn test_fast_scale_is_exact() {
        let (a, t, w, h) = (0.37, 2.5, 0.9, 0.6);
        let s = fast_scale(a, t, w, h);
        assert!((a * s * s - t).abs() < 1e-9);
        assert!((s - (t / a).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_bisect_converges_linear() {
        let problem = RatioProblem::new(10.0, 3.0, 2.0);
        let sol = bisect(&mut Linear(3.0), &problem, 0.001, 200).unwrap();
        assert!((10.0 / sol.area - 2.0).abs() < 0.001);
        assert!(sol.scale > 1.0);
        assert!(sol.iterations > 0);
    }

    #[test]
    fn test_bisect_shrinks_when_ratio_below_goal() {
        // Ratio 0.5, goal 8: UVs are too large.
        let problem = RatioProblem::new(4.0, 8.0, 8.0);
        let sol = bisect(&mut Quadratic(8.0), &problem, 0.001, 200).unwrap();
        assert!(sol.scale < 1.0);
        assert!((4.0 / sol.area - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_bisect_budget_exhausted() {
        let problem = RatioProblem::new(10.0, 3.0, 2.0);
        let err = bisect(&mut Linear(3.0), &problem, 1e-12, 3).unwrap_err();
        assert_eq!(err.error, JobError::RatioNotFound);
        assert_eq!(err.iterations, 3);
    }

    #[test]
    fn test_bisect_bracket_collapse() {
        // Goal is unreachable: the bracket is pushed against 1e5 until the
        // midpoint no longer moves.
        let problem = RatioProblem::new(1e12, 1.0, 1.0);
        let err = bisect(&mut Linear(1.0), &problem, 1e-3, 10_000).unwrap_err();
        assert_eq!(err.error, JobError::IterationFailed);
        assert!(err.iterations < 10_000);
    }

    #[test]
    fn test_relaxed_accumulates_iterations() {
        let problem = RatioProblem::new(10.0, 3.0, 2.0);
        let direct = bisect(&mut Linear(3.0), &problem, 1e-4, 200).unwrap();
        let relaxed = solve_relaxed(&mut Linear(3.0), &problem, 200).unwrap();
        assert_eq!(direct.iterations, relaxed.iterations);

        // With one probe per attempt, thresholds 1e-4..=1 each fail once and
        // the first probe is accepted at threshold 10.
        let relaxed = solve_relaxed(&mut Linear(3.0), &problem, 1).unwrap();
        assert_eq!(relaxed.iterations, 5);
        assert!((relaxed.scale - 50_000.5).abs() < 1e-9);
    }

    #[test]
    fn test_axis_restriction() {
        assert_eq!(ScalingAxis::Horizontal.scale_vector(2.0), Vector2::new(2.0, 1.0));
        assert_eq!(
            ScalingAxis::Vertical.restrict(Vector2::new(3.0, 4.0)),
            Vector2::new(1.0, 4.0)
        );
    }

    #[test]
    fn test_uv_probe_restores_original() {
        let mut mesh = build_grid("grid", 2, 2, 1.0, 0.25, Point2::new(0.5, 0.5)).unwrap();
        let (u, v) = mesh.uvs("map1").unwrap();
        let before = uv_area(&mesh, None, "map1");

        {
            let mut probe = UvScaleProbe::new(
                &mut mesh,
                "map1",
                None,
                None,
                ScalingAxis::Horizontal,
                &u,
                &v,
            );
            let area = probe.area_at(2.0);
            assert!((area - before * 2.0).abs() < 1e-6);
            // Trials always start from the snapshot.
            let area = probe.area_at(3.0);
            assert!((area - before * 3.0).abs() < 1e-6);
        }

        let (u2, v2) = mesh.uvs("map1").unwrap();
        assert_eq!(u, u2);
        assert_eq!(v, v2);
    }

    #[test]
    fn test_uv_probe_single_axis_bisection() {
        let mut mesh = build_grid("grid", 2, 1, 1.0, 0.5, Point2::origin()).unwrap();
        let (u, v) = mesh.uvs("map1").unwrap();
        let problem = RatioProblem::new(2.0, uv_area(&mesh, None, "map1"), 4.0);

        let mut probe =
            UvScaleProbe::new(&mut mesh, "map1", None, None, ScalingAxis::Vertical, &u, &v);
        let sol = solve_relaxed(&mut probe, &problem, 200).unwrap();
        probe.restore().unwrap();

        assert!((problem.surface_area / sol.area - 4.0).abs() < 1e-3);
        assert!((sol.scale - 1.0).abs() < 1e-3);
    }
}
