//! The job pipeline.
//!
//! A run takes a set of meshes, splits the selected parts into jobs, and
//! moves every job through the same stages:
//!
//! 1. **Gather**: resolve the UV set, measure surface and UV area, find the
//!    UV bounding box.
//! 2. **Find scale**: search the scale that brings the area ratio to the goal
//!    (skipped with [`AutoRatioOptions::skip_scaling`]).
//! 3. **Layout**: push overlapping jobs apart (optional).
//! 4. **Normalise**: fit everything into the unit square (optional).
//! 5. **Apply**: hand one transform per changed job to a [`TransformSink`].
//!
//! A job that fails a stage keeps its first error and is skipped by every
//! later stage. Cancellation is polled between stages and between jobs;
//! after a cancelled run every unfinished job is marked
//! [`JobError::Skipped`](crate::error::JobError::Skipped).
//!
//! # Example
//!
//! ```
//! use uvratio::algo::Progress;
//! use uvratio::mesh::build_grid;
//! use uvratio::process::{discover_jobs, run_jobs, AutoRatioOptions, Selection, TransformLog};
//! use nalgebra::Point2;
//!
//! // 4 square units of surface on 0.04 of UV space: ratio 100.
//! let mut meshes = vec![build_grid("plane", 2, 2, 1.0, 0.1, Point2::origin()).unwrap()];
//! let options = AutoRatioOptions::default().with_goal_ratio(4.0);
//!
//! let mut units = discover_jobs(&meshes, &[(0, Selection::Whole)], &options);
//! let mut log = TransformLog::new();
//! let report = run_jobs(&mut meshes, &mut units, &options, &mut log, &Progress::none()).unwrap();
//!
//! assert!(report.outcomes[0].error.is_none());
//! assert!((report.outcomes[0].scale.x - 5.0).abs() < 1e-4);
//! ```

mod apply;
mod discover;
mod job;
mod options;
mod report;
mod stages;
mod uvset;

use std::time::{Duration, Instant};

use nalgebra::Vector2;

use crate::algo::Progress;
use crate::error::{JobError, Result};
use crate::mesh::MeshAccess;

pub use apply::{TransformLog, TransformRequest, TransformSink, TransformTarget};
pub use discover::{discover_jobs, uv_shells, Selection, UvShells};
pub use job::{Job, JobKind, MeshUnit};
pub use options::{AutoRatioOptions, OperationMode};
pub use report::{write_summary, write_timings};
pub use uvset::{resolve_uv_set, UvSetChoice};

const STAGES: usize = 6;

/// Final state of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Handle of the mesh the job belongs to.
    pub mesh: usize,
    /// Index of the job within its mesh.
    pub job: usize,
    /// Scale that was applied.
    pub scale: Vector2<f64>,
    /// Translation that was applied.
    pub offset: Vector2<f64>,
    /// Job or mesh failure, if any.
    pub error: Option<JobError>,
    /// Rejected probes of the scale search.
    pub iterations: usize,
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    /// Gather stage.
    pub gather: Duration,
    /// Scale search.
    pub find_scale: Duration,
    /// Layout.
    pub layout: Duration,
    /// Normalise.
    pub normalise: Duration,
    /// Apply.
    pub apply: Duration,
    /// Whole run.
    pub total: Duration,
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Number of meshes taking part.
    pub meshes: usize,
    /// Number of jobs across all meshes.
    pub jobs: usize,
    /// One entry per job, in mesh then job order.
    pub outcomes: Vec<JobOutcome>,
    /// Per-stage durations.
    pub timings: StageTimings,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl RunReport {
    /// Number of jobs that ended with an error.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

fn timed<F: FnOnce()>(slot: &mut Duration, f: F) {
    let start = Instant::now();
    f();
    *slot = start.elapsed();
}

/// Run the pipeline over `units`, which normally come from [`discover_jobs`].
///
/// `meshes` is the host collection that unit handles index into. Jobs and
/// units are updated in place with their statistics, so they can be passed
/// to [`write_summary`] afterwards.
///
/// # Errors
///
/// Returns an error only if `options` fail [`AutoRatioOptions::validate`].
/// Per-job failures are recorded on the jobs and in the report.
pub fn run_jobs<M, S>(
    meshes: &mut [M],
    units: &mut [MeshUnit],
    options: &AutoRatioOptions,
    sink: &mut S,
    progress: &Progress,
) -> Result<RunReport>
where
    M: MeshAccess,
    S: TransformSink + ?Sized,
{
    options.validate()?;

    let start = Instant::now();
    let mut timings = StageTimings::default();

    progress.begin_stage(1, STAGES, "Gathering Data...");
    log::info!("gathering {} meshes", units.len());
    timed(&mut timings.gather, || {
        for unit in units.iter_mut() {
            if progress.is_cancelled() {
                break;
            }
            match meshes.get_mut(unit.handle) {
                Some(mesh) => stages::gather(mesh, unit, options, progress),
                None => {
                    log::warn!("mesh {} not found", unit.handle);
                    unit.fail(JobError::InvalidMesh);
                }
            }
        }
    });

    if !progress.is_cancelled() && !options.skip_scaling {
        progress.begin_stage(2, STAGES, "Calculating Scale...");
        log::info!("calculating scale");
        timed(&mut timings.find_scale, || {
            for unit in units.iter_mut() {
                if progress.is_cancelled() {
                    break;
                }
                if let Some(mesh) = meshes.get_mut(unit.handle) {
                    stages::find_scale(mesh, unit, options, progress);
                }
            }
        });
    }

    if !progress.is_cancelled() && options.layout_shells {
        progress.begin_stage(3, STAGES, "Solving Overlaps...");
        log::info!("solving overlaps");
        timed(&mut timings.layout, || {
            stages::layout(units, options, progress);
        });
    }

    if !progress.is_cancelled() && options.normalise {
        progress.begin_stage(4, STAGES, "Normalising...");
        log::info!("normalising");
        timed(&mut timings.normalise, || stages::normalise(units, options));
    }

    if !progress.is_cancelled() {
        progress.begin_stage(5, STAGES, "Applying...");
        log::info!("applying");
        timed(&mut timings.apply, || {
            for unit in units.iter_mut() {
                if progress.is_cancelled() {
                    break;
                }
                if let Some(mesh) = meshes.get_mut(unit.handle) {
                    stages::apply(mesh, unit, options, sink, progress);
                }
            }
        });
    }

    for unit in units.iter() {
        if let Some(mesh) = meshes.get_mut(unit.handle) {
            stages::restore_uv_set(mesh, unit);
        }
    }

    let cancelled = progress.is_cancelled();
    if cancelled {
        log::warn!("run cancelled");
        stages::mark_skipped(units);
    } else {
        progress.report(STAGES, STAGES, "Done");
    }
    timings.total = start.elapsed();

    let outcomes: Vec<JobOutcome> = units
        .iter()
        .flat_map(|unit| {
            unit.jobs.iter().enumerate().map(move |(i, job)| JobOutcome {
                mesh: unit.handle,
                job: i,
                scale: job.scale,
                offset: job.offset,
                error: unit.error.or(job.error),
                iterations: job.iterations,
            })
        })
        .collect();

    Ok(RunReport {
        meshes: units.len(),
        jobs: outcomes.len(),
        outcomes,
        timings,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::area::uv_area;
    use crate::algo::ScalingAxis;
    use crate::mesh::{build_grid, UvMesh};
    use nalgebra::{Point2, Point3};

    fn plane(uv_origin: Point2<f32>) -> UvMesh {
        // 4 square units of surface mapped onto 0.2 x 0.2 of UV space.
        build_grid("plane", 2, 2, 1.0, 0.1, uv_origin).unwrap()
    }

    fn run(meshes: &mut [UvMesh], options: &AutoRatioOptions) -> (Vec<MeshUnit>, RunReport, TransformLog) {
        let selection: Vec<_> = (0..meshes.len()).map(|i| (i, Selection::Whole)).collect();
        let mut units = discover_jobs(meshes, &selection, options);
        let mut log = TransformLog::new();
        let report = run_jobs(meshes, &mut units, options, &mut log, &Progress::none()).unwrap();
        (units, report, log)
    }

    #[test]
    fn test_fast_path_reaches_goal() {
        let mut meshes = vec![plane(Point2::new(0.3, 0.3))];
        let options = AutoRatioOptions::default().with_goal_ratio(25.0);
        let (units, report, _) = run(&mut meshes, &options);

        assert_eq!(report.failed(), 0);
        let job = &units[0].jobs[0];
        assert!((job.initial_ratio() - 100.0).abs() < 1e-3);
        assert!((job.final_texture_area - 0.16).abs() < 1e-9);
        assert!(job.completed);

        let after = uv_area(&meshes[0], None, "map1");
        assert!((4.0 / after - 25.0).abs() < 1e-2);

        // Scaled about the box center, which stays put.
        let (u, v) = meshes[0].uvs("map1").unwrap();
        let cx = (u.iter().cloned().fold(f32::MAX, f32::min) + u.iter().cloned().fold(f32::MIN, f32::max)) * 0.5;
        let cy = (v.iter().cloned().fold(f32::MAX, f32::min) + v.iter().cloned().fold(f32::MIN, f32::max)) * 0.5;
        assert!((cx - 0.4).abs() < 1e-5);
        assert!((cy - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_single_axis_search() {
        let mut meshes = vec![plane(Point2::origin())];
        let options = AutoRatioOptions::default()
            .with_goal_ratio(50.0)
            .with_scaling_axis(ScalingAxis::Horizontal);
        let (units, report, _) = run(&mut meshes, &options);

        assert_eq!(report.failed(), 0);
        let job = &units[0].jobs[0];
        assert!(job.iterations > 0);
        assert_eq!(job.scale.y, 1.0);
        assert!((job.scale.x - 2.0).abs() < 1e-3);
        assert!((job.final_ratio() - 50.0).abs() < 1e-3);

        let (_, v) = meshes[0].uvs("map1").unwrap();
        assert!((v[8] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_goal_already_met_is_noop() {
        let mut meshes = vec![plane(Point2::origin())];
        let (u0, v0) = meshes[0].uvs("map1").unwrap();
        let options = AutoRatioOptions::default()
            .with_goal_ratio(100.0)
            .with_threshold(0.01);
        let (units, report, log) = run(&mut meshes, &options);

        assert_eq!(report.failed(), 0);
        assert!(units[0].jobs[0].completed);
        assert!(log.is_empty());
        assert_eq!(meshes[0].uvs("map1").unwrap(), (u0, v0));
    }

    #[test]
    fn test_invalid_handle() {
        let mut meshes = vec![plane(Point2::origin())];
        let options = AutoRatioOptions::default().with_goal_ratio(2.0);
        let mut units = discover_jobs(&meshes, &[(0, Selection::Whole), (5, Selection::Whole)], &options);
        let report = run_jobs(
            &mut meshes,
            &mut units,
            &options,
            &mut TransformLog::new(),
            &Progress::none(),
        )
        .unwrap();

        assert_eq!(report.meshes, 2);
        assert_eq!(report.outcomes[0].error, None);
        assert_eq!(report.outcomes[1].error, Some(JobError::InvalidMesh));
    }

    #[test]
    fn test_zero_areas() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mut flat_uv = UvMesh::from_polygons("flat_uv", positions.clone(), &[vec![0, 1, 2]]).unwrap();
        flat_uv
            .add_uv_set("map1", &[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], &[vec![0, 1, 1]])
            .unwrap();
        let mut flat_3d = UvMesh::from_polygons("flat_3d", positions, &[vec![0, 1, 3]]).unwrap();
        flat_3d
            .add_uv_set(
                "map1",
                &[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
                &[vec![0, 1, 2]],
            )
            .unwrap();

        let mut meshes = vec![flat_uv, flat_3d];
        let (_, report, _) = run(&mut meshes, &AutoRatioOptions::default().with_goal_ratio(1.0));
        assert_eq!(report.outcomes[0].error, Some(JobError::ZeroTextureArea));
        assert_eq!(report.outcomes[1].error, Some(JobError::ZeroSurfaceArea));
    }

    #[test]
    fn test_override_uv_set_is_restored() {
        // Same layout as map1, at twice the size: ratio 25.
        let mut mesh = plane(Point2::origin());
        let (u, v) = mesh.uvs("map1").unwrap();
        let pts: Vec<Point2<f32>> = u
            .iter()
            .zip(&v)
            .map(|(&x, &y)| Point2::new(x * 2.0, y * 2.0))
            .collect();
        let polys: Vec<Vec<usize>> = mesh
            .face_ids()
            .map(|f| {
                let set = mesh.uv_set("map1").unwrap();
                set.face_uvs(f).iter().map(|uv| uv.index()).collect()
            })
            .collect();
        mesh.add_uv_set("lightmap", &pts, &polys).unwrap();

        let mut meshes = vec![mesh];
        let options = AutoRatioOptions::default()
            .with_goal_ratio(1.0)
            .with_uv_set("lightmap");
        let (units, report, _) = run(&mut meshes, &options);

        assert_eq!(report.failed(), 0);
        assert_eq!(units[0].use_uv_set.as_deref(), Some("lightmap"));
        assert_eq!(meshes[0].current_uv_set().as_deref(), Some("map1"));
        // Only the override set changed.
        assert!((uv_area(&meshes[0], None, "lightmap") - 4.0).abs() < 1e-3);
        assert!((uv_area(&meshes[0], None, "map1") - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_cancelled_run_marks_skipped() {
        let mut meshes = vec![plane(Point2::origin())];
        let options = AutoRatioOptions::default().with_goal_ratio(2.0);
        let mut units = discover_jobs(&meshes, &[(0, Selection::Whole)], &options);
        let progress = Progress::none();
        progress.cancel();

        let report = run_jobs(&mut meshes, &mut units, &options, &mut TransformLog::new(), &progress).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.outcomes[0].error, Some(JobError::Skipped));
        assert!((uv_area(&meshes[0], None, "map1") - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_missing_goal_is_rejected() {
        let mut meshes = vec![plane(Point2::origin())];
        let options = AutoRatioOptions::default();
        let mut units = discover_jobs(&meshes, &[(0, Selection::Whole)], &options);
        let result = run_jobs(&mut meshes, &mut units, &options, &mut TransformLog::new(), &Progress::none());
        assert!(result.is_err());
    }
}
