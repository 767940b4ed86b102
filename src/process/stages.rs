//! The individual pipeline stages.
//!
//! Every stage leaves failed meshes and failed jobs untouched, and polls for
//! cancellation between jobs.

use nalgebra::{Point2, Vector2};

use crate::algo::area::{surface_area, uv_area_from};
use crate::algo::layout::{run_layout, LayoutRect};
use crate::algo::ratio::{fast_scale, solve_relaxed, RatioProblem, UvScaleProbe};
use crate::algo::{Progress, ScalingAxis};
use crate::error::JobError;
use crate::mesh::{MeshAccess, Space};

use super::apply::{TransformRequest, TransformSink, TransformTarget};
use super::job::{Job, JobKind, MeshUnit};
use super::options::AutoRatioOptions;
use super::uvset::{resolve_uv_set, UvSetChoice};

/// Resolve the UV set of a mesh, snapshot its UVs and measure every job.
pub(crate) fn gather<M: MeshAccess + ?Sized>(
    mesh: &mut M,
    unit: &mut MeshUnit,
    options: &AutoRatioOptions,
    progress: &Progress,
) {
    unit.name = mesh.name().to_string();

    let choice = match resolve_uv_set(&*mesh, options.uv_set.as_deref(), options.fallback) {
        Ok(choice) => choice,
        Err(e) => {
            log::warn!("{}: {}", unit.name, e);
            unit.fail(e);
            return;
        }
    };

    unit.current_uv_set = mesh.current_uv_set();
    unit.use_uv_set = Some(choice.name().to_string());
    if let UvSetChoice::Override(name) = &choice {
        if let Err(e) = mesh.set_current_uv_set(name) {
            log::warn!("{}: cannot switch to uv set '{}': {}", unit.name, name, e);
        }
    }

    match mesh.uvs(choice.name()) {
        Ok((u, v)) => {
            unit.u = u;
            unit.v = v;
        }
        Err(e) => {
            log::warn!("{}: {}", unit.name, e);
            unit.fail(JobError::UvSetNotFound);
            return;
        }
    }

    progress.set_total(unit.jobs.len(), "Jobs");
    for job in unit.jobs.iter_mut() {
        if progress.is_cancelled() {
            break;
        }
        progress.step();
        gather_job(&*mesh, choice.name(), &unit.u, &unit.v, job);
        log::debug!(
            "{} {}: surface {:.6}, uv {:.6}, status {:?}",
            unit.name,
            job.name(&unit.name),
            job.surface_area,
            job.texture_area,
            job.error
        );
    }
}

fn gather_job<M: MeshAccess + ?Sized>(mesh: &M, uv_set: &str, u: &[f32], v: &[f32], job: &mut Job) {
    let (texture_area, surface) = {
        let faces = job.faces();
        (
            uv_area_from(mesh, faces, uv_set, u, v),
            surface_area(mesh, faces, Space::World),
        )
    };

    job.surface_area = surface;
    job.texture_area = texture_area;
    job.final_texture_area = texture_area;

    // Whole meshes check the surface first, shells the texture.
    let zero_surface = (surface == 0.0).then_some(JobError::ZeroSurfaceArea);
    let zero_texture = (texture_area == 0.0).then_some(JobError::ZeroTextureArea);
    let zero = match job.kind {
        JobKind::Whole => zero_surface.or(zero_texture),
        JobKind::Shell { .. } => zero_texture.or(zero_surface),
    };
    if let Some(error) = zero {
        job.fail(error);
        return;
    }

    if u.len() != v.len() {
        job.fail(JobError::UvListsDifferentLengths);
        return;
    }

    let (low, high) = match job.uvs() {
        Some(uvs) => uv_bounds(u, v, uvs.iter().map(|uv| uv.index())),
        None => uv_bounds(u, v, 0..u.len()),
    };
    job.center = Point2::from((low.coords + high.coords) * 0.5);
    job.extent = high - low;
}

/// Bounding box of the given UVs, computed in storage precision.
fn uv_bounds<I>(u: &[f32], v: &[f32], indices: I) -> (Point2<f64>, Point2<f64>)
where
    I: Iterator<Item = usize>,
{
    let mut min = [f32::MAX; 2];
    let mut max = [f32::MIN; 2];
    for i in indices {
        let (Some(&x), Some(&y)) = (u.get(i), v.get(i)) else {
            continue;
        };
        min[0] = min[0].min(x);
        min[1] = min[1].min(y);
        max[0] = max[0].max(x);
        max[1] = max[1].max(y);
    }
    if min[0] > max[0] {
        return (Point2::origin(), Point2::origin());
    }
    (
        Point2::new(min[0] as f64, min[1] as f64),
        Point2::new(max[0] as f64, max[1] as f64),
    )
}

/// Search the scale of every job of a mesh that is not yet on target.
pub(crate) fn find_scale<M: MeshAccess + ?Sized>(
    mesh: &mut M,
    unit: &mut MeshUnit,
    options: &AutoRatioOptions,
    progress: &Progress,
) {
    if !unit.is_ok() {
        return;
    }
    let Some(uv_set) = unit.use_uv_set.clone() else {
        return;
    };
    let goal = options.goal();

    progress.set_total(unit.jobs.len(), "Jobs");
    for job in unit.jobs.iter_mut() {
        if progress.is_cancelled() {
            break;
        }
        progress.step();
        if !job.is_ok() {
            continue;
        }

        let problem = RatioProblem::new(job.surface_area, job.texture_area, goal);
        if problem.is_satisfied(options.threshold) {
            continue;
        }

        if options.scaling_axis == ScalingAxis::Both {
            let target = problem.target_area();
            let s = fast_scale(job.texture_area, target, job.extent.x, job.extent.y);
            job.scale = Vector2::new(s, s);
            job.final_texture_area = target;
            job.iterations = 0;
            continue;
        }

        let result = {
            let mut probe = UvScaleProbe::new(
                &mut *mesh,
                &uv_set,
                job.faces(),
                job.uvs(),
                options.scaling_axis,
                &unit.u,
                &unit.v,
            );
            let result = solve_relaxed(&mut probe, &problem, options.max_iterations);
            if let Err(e) = probe.restore() {
                log::warn!("{}: failed to restore uvs: {}", unit.name, e);
            }
            result
        };

        match result {
            Ok(solution) => {
                job.scale = options.scaling_axis.scale_vector(solution.scale);
                job.final_texture_area = solution.area;
                job.iterations = solution.iterations;
            }
            Err(failure) => {
                job.scale = Vector2::new(1.0, 1.0);
                job.final_texture_area = job.texture_area;
                job.iterations = failure.iterations;
                job.fail(failure.error);
            }
        }
        log::debug!(
            "{} {}: scale {:?} after {} iterations",
            unit.name,
            job.name(&unit.name),
            job.scale,
            job.iterations
        );
    }
}

/// Push the scaled jobs of all meshes apart so they no longer overlap.
///
/// Returns `false` if the layout was cancelled, in which case no offsets are
/// written.
pub(crate) fn layout(units: &mut [MeshUnit], options: &AutoRatioOptions, progress: &Progress) -> bool {
    let gap = Vector2::new(options.layout_min_distance, options.layout_min_distance);
    let rects: Vec<LayoutRect> = units
        .iter()
        .flat_map(|unit| unit.healthy_jobs())
        .map(|job| LayoutRect::new(job.extent.component_mul(&job.scale) + gap, job.center))
        .collect();
    if rects.is_empty() {
        return true;
    }

    let outcome = run_layout(
        &rects,
        options.layout_iterations,
        options.layout_step,
        progress,
    );
    if outcome.cancelled {
        return false;
    }
    if !outcome.converged {
        log::warn!(
            "layout stopped after {} steps with overlaps left",
            outcome.steps
        );
    }

    let jobs = units.iter_mut().flat_map(|unit| unit.healthy_jobs_mut());
    for (job, position) in jobs.zip(outcome.positions) {
        job.offset = position - job.center;
    }
    true
}

/// Fit the union of all placed jobs into the unit square.
///
/// The extra scale composes with each job's own scale and offset, so the
/// result of scaling and layout is preserved up to a common factor.
pub(crate) fn normalise(units: &mut [MeshUnit], options: &AutoRatioOptions) {
    let mut low = Point2::new(f64::MAX, f64::MAX);
    let mut high = Point2::new(f64::MIN, f64::MIN);
    let mut any = false;
    for job in units.iter().flat_map(|unit| unit.healthy_jobs()) {
        let (lo, hi) = job.placed_bounds();
        low = Point2::from(low.coords.inf(&lo.coords));
        high = Point2::from(high.coords.sup(&hi.coords));
        any = true;
    }
    if !any {
        return;
    }

    let extent = high - low;
    let k = if options.keep_aspect_ratio {
        let major = extent.x.max(extent.y);
        Vector2::new(1.0 / major, 1.0 / major)
    } else {
        Vector2::new(1.0 / extent.x, 1.0 / extent.y)
    };
    if !k.x.is_finite() || !k.y.is_finite() {
        log::warn!("normalise skipped: degenerate extent {:?}", extent);
        return;
    }

    log::info!(
        "extents: ({:.6}, {:.6}) -> ({:.6}, {:.6})",
        low.x,
        low.y,
        high.x,
        high.y
    );

    for job in units.iter_mut().flat_map(|unit| unit.healthy_jobs_mut()) {
        let moved = job.center.coords + job.offset - low.coords;
        job.scale = job.scale.component_mul(&k);
        job.offset = moved.component_mul(&k) - job.center.coords;
    }
}

/// Hand the transform of every changed job to the sink.
pub(crate) fn apply<M, S>(
    mesh: &mut M,
    unit: &mut MeshUnit,
    options: &AutoRatioOptions,
    sink: &mut S,
    progress: &Progress,
) where
    M: MeshAccess,
    S: TransformSink + ?Sized,
{
    if !unit.is_ok() {
        return;
    }
    let Some(uv_set) = unit.use_uv_set.clone() else {
        return;
    };

    progress.set_total(unit.jobs.len(), "Jobs");
    for job in unit.jobs.iter_mut() {
        if progress.is_cancelled() {
            break;
        }
        progress.step();
        if !job.is_ok() {
            continue;
        }
        if job.is_noop() {
            job.completed = true;
            continue;
        }

        // A normalised scale is meant for both axes.
        let scale = if options.normalise {
            job.scale
        } else {
            options.scaling_axis.restrict(job.scale)
        };
        let target = match &job.kind {
            JobKind::Whole => TransformTarget::All,
            JobKind::Shell { uvs, .. } => TransformTarget::Uvs(uvs.clone()),
        };
        let request = TransformRequest {
            mesh: unit.handle,
            target,
            uv_set: uv_set.clone(),
            pivot: job.center,
            scale,
            translate: job.offset,
            record_undo: options.record_undo,
        };

        match sink.apply(&mut *mesh, &request) {
            Ok(()) => job.completed = true,
            Err(e) => log::warn!("{} {}: {}", unit.name, job.name(&unit.name), e),
        }
    }
}

/// Make the UV set that was current before the run current again.
pub(crate) fn restore_uv_set<M: MeshAccess + ?Sized>(mesh: &mut M, unit: &MeshUnit) {
    let (Some(current), Some(used)) = (&unit.current_uv_set, &unit.use_uv_set) else {
        return;
    };
    if current != used {
        if let Err(e) = mesh.set_current_uv_set(current) {
            log::warn!("{}: cannot restore uv set '{}': {}", unit.name, current, e);
        }
    }
}

/// After a cancelled run, mark every unfinished job of a usable mesh.
pub(crate) fn mark_skipped(units: &mut [MeshUnit]) {
    for job in units.iter_mut().flat_map(|unit| unit.healthy_jobs_mut()) {
        if !job.completed {
            job.fail(JobError::Skipped);
        }
    }
}
