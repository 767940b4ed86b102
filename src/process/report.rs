//! Text reports of a run.

use std::io::Write;
use std::time::Duration;

use crate::error::{status_str, Result};

use super::{MeshUnit, RunReport};

/// Write per-mesh and per-job statistics.
///
/// In verbose mode every mesh and job is listed with its areas, scale, ratio
/// and placement. Otherwise only meshes with a failure are listed, and only
/// their failed jobs.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_summary<W: Write>(out: &mut W, units: &[MeshUnit], verbose: bool) -> Result<()> {
    for (j, unit) in units.iter().enumerate() {
        if !verbose && unit.is_ok() && !unit.has_job_errors() {
            continue;
        }

        writeln!(
            out,
            "  Mesh{:2} - {} : {} on uvset '{}'",
            j,
            status_str(unit.error),
            unit.name,
            unit.use_uv_set.as_deref().unwrap_or("")
        )?;

        for (i, job) in unit.jobs.iter().enumerate() {
            let status = status_str(job.error);
            let name = job.name(&unit.name);
            if !verbose {
                if job.error.is_some() {
                    writeln!(out, "    Job{:2} - {} : {}", i, status, name)?;
                }
                continue;
            }
            writeln!(
                out,
                "    Job{:2} - {} : {}  PolyArea: {:8.8}  UVArea: ({:.12} -> {:.12}) Scale: ({:.12} {:.12})  Ratio: ({:.12} -> {:.12})  (after {} iterations)  bounds:({:.12} {:.12}) center:({:8.8} {:8.8})  offset:({:8.8}, {:8.8})",
                i,
                status,
                name,
                job.surface_area,
                job.texture_area,
                job.final_texture_area,
                job.scale.x,
                job.scale.y,
                job.initial_ratio(),
                job.final_ratio(),
                job.iterations,
                job.extent.x,
                job.extent.y,
                job.center.x,
                job.center.y,
                job.offset.x,
                job.offset.y
            )?;
        }
    }
    Ok(())
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Write the one-line timing summary of a run.
///
/// `load` is the time the caller spent loading meshes and discovering jobs.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_timings<W: Write>(out: &mut W, report: &RunReport, load: Duration) -> Result<()> {
    let t = &report.timings;
    writeln!(
        out,
        "UVAR: {} meshes, {} jobs:  LoadTime: {:.2}ms    GatherTime: {:.2}ms    ProcessTime: {:.2}ms    LayoutTime: {:.2}ms    ApplyTime: {:.2}ms    TotalTime: {:.2}ms",
        report.meshes,
        report.jobs,
        ms(load),
        ms(t.gather),
        ms(t.find_scale),
        ms(t.layout + t.normalise),
        ms(t.apply),
        ms(load + t.total)
    )?;
    Ok(())
}
