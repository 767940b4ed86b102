//! uvratio CLI - rescale UVs to a surface/UV area ratio.
//!
//! Usage: uvratio <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `uvratio --help` for available commands.

use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use uvratio::algo::area::measure_faces;
use uvratio::algo::{Progress, ScalingAxis};
use uvratio::io;
use uvratio::mesh::{MeshAccess, UvMesh};
use uvratio::process::{
    discover_jobs, resolve_uv_set, run_jobs, uv_shells, write_summary, write_timings,
    AutoRatioOptions, OperationMode, Selection, TransformLog,
};

#[derive(Parser)]
#[command(name = "uvratio")]
#[command(author, version, about = "UV auto-ratio CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display meshes, UV sets and shell counts
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Print surface area, UV area and ratio
    Measure {
        /// Input mesh file
        input: PathBuf,

        /// Measure every UV shell separately
        #[arg(long)]
        shells: bool,

        /// UV set to measure (default: current set)
        #[arg(long)]
        uv_set: Option<String>,

        /// Only measure meshes with these names
        #[arg(long = "mesh")]
        meshes: Vec<String>,
    },

    /// Scale UVs to a goal ratio and save the result
    Run {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        #[command(flatten)]
        options: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Surface area per unit of UV area to reach
    #[arg(short, long, required_unless_present = "skip_scaling")]
    goal_ratio: Option<f64>,

    /// Accepted distance from the goal ratio
    #[arg(short, long, default_value = "0.001")]
    threshold: f64,

    /// Iteration budget of the scale search
    #[arg(long, default_value = "200")]
    max_iterations: usize,

    /// Only scale U
    #[arg(long, conflicts_with = "only_scale_v")]
    only_scale_h: bool,

    /// Only scale V
    #[arg(long)]
    only_scale_v: bool,

    /// Treat every UV shell as its own job
    #[arg(long)]
    shells: bool,

    /// Push scaled jobs apart until they no longer overlap
    #[arg(long)]
    layout: bool,

    /// Layout step budget
    #[arg(long, default_value = "10000")]
    layout_iterations: usize,

    /// Layout time step
    #[arg(long, default_value = "0.001")]
    layout_step: f64,

    /// Extra gap between laid out jobs
    #[arg(long, default_value = "0.0")]
    min_distance: f64,

    /// Fit the result into the unit square
    #[arg(long)]
    normalise: bool,

    /// Let normalise stretch each axis independently
    #[arg(long, requires = "normalise")]
    stretch: bool,

    /// Keep the current scale; only lay out and normalise
    #[arg(long)]
    skip_scaling: bool,

    /// UV set to work on (default: current set)
    #[arg(long)]
    uv_set: Option<String>,

    /// Use the current set when --uv-set is missing on a mesh
    #[arg(long, requires = "uv_set")]
    fallback: bool,

    /// Do not keep an undo log
    #[arg(long)]
    no_undo: bool,

    /// Only process meshes with these names
    #[arg(long = "mesh")]
    meshes: Vec<String>,

    /// Print statistics for every job, not just failures
    #[arg(short, long)]
    verbose: bool,

    /// Print stage timings
    #[arg(long)]
    timings: bool,
}

impl RunArgs {
    fn to_options(&self) -> AutoRatioOptions {
        let axis = if self.only_scale_h {
            ScalingAxis::Horizontal
        } else if self.only_scale_v {
            ScalingAxis::Vertical
        } else {
            ScalingAxis::Both
        };
        let mode = if self.shells {
            OperationMode::UvShellLevel
        } else {
            OperationMode::ObjectLevel
        };

        let mut options = AutoRatioOptions::default()
            .with_threshold(self.threshold)
            .with_max_iterations(self.max_iterations)
            .with_scaling_axis(axis)
            .with_operation_mode(mode)
            .with_layout(self.layout)
            .with_layout_iterations(self.layout_iterations)
            .with_layout_step(self.layout_step)
            .with_layout_min_distance(self.min_distance)
            .with_normalise(self.normalise)
            .with_fallback(self.fallback)
            .with_record_undo(!self.no_undo);
        if let Some(goal) = self.goal_ratio {
            options = options.with_goal_ratio(goal);
        }
        if self.stretch {
            options = options.stretch_to_fit();
        }
        if self.skip_scaling {
            options = options.skip_scaling();
        }
        if let Some(name) = &self.uv_set {
            options = options.with_uv_set(name.clone());
        }
        options
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => cmd_info(&input)?,
        Commands::Measure {
            input,
            shells,
            uv_set,
            meshes,
        } => cmd_measure(&input, shells, uv_set.as_deref(), &meshes)?,
        Commands::Run {
            input,
            output,
            options,
        } => cmd_run(&input, &output, &options)?,
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only increase; stage changes would otherwise make the bar jump back.
        let (percent, increased) = loop {
            let old_max = max_percent.load(Ordering::Relaxed);
            let new_max = old_max.max(raw_percent);
            if new_max == old_max {
                break (old_max, false);
            }
            match max_percent.compare_exchange_weak(
                old_max,
                new_max,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break (new_max, true),
                Err(_) => continue,
            }
        };

        if !increased && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        // Pad so a shorter message fully overwrites a longer one.
        eprint!("\r[{}{}] {:3}% {:<24}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

/// Build the selection: every mesh, or only the named ones.
fn select(meshes: &[UvMesh], names: &[String]) -> Vec<(usize, Selection)> {
    meshes
        .iter()
        .enumerate()
        .filter(|(_, m)| names.is_empty() || names.iter().any(|n| n == m.name()))
        .map(|(i, _)| (i, Selection::Whole))
        .collect()
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let meshes = io::load(input)?;

    println!("File: {}", input.display());
    println!("Meshes: {}", meshes.len());
    for (i, mesh) in meshes.iter().enumerate() {
        println!(
            "  Mesh{:2} - {}: {} vertices, {} faces",
            i,
            mesh.name(),
            mesh.num_vertices(),
            mesh.num_faces()
        );
        let current = mesh.current_uv_set();
        for set in mesh.uv_sets() {
            let marker = if current.as_deref() == Some(set.name()) {
                " (current)"
            } else {
                ""
            };
            let shells = uv_shells(mesh, set.name());
            println!(
                "    uvset '{}'{}: {} uvs, {} shells",
                set.name(),
                marker,
                set.len(),
                shells.count
            );
        }
    }

    Ok(())
}

fn cmd_measure(
    input: &PathBuf,
    shells: bool,
    uv_set: Option<&str>,
    names: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let meshes = io::load(input)?;

    let mut options = AutoRatioOptions::default();
    if shells {
        options = options.with_operation_mode(OperationMode::UvShellLevel);
    }
    if let Some(name) = uv_set {
        options = options.with_uv_set(name);
    }

    let units = discover_jobs(&meshes, &select(&meshes, names), &options);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for unit in &units {
        let mesh = &meshes[unit.handle];
        let set = match resolve_uv_set(mesh, uv_set, false) {
            Ok(choice) => choice.name().to_string(),
            Err(e) => {
                writeln!(out, "{}: {}", mesh.name(), e)?;
                continue;
            }
        };
        for job in &unit.jobs {
            let m = measure_faces(mesh, job.faces(), &set);
            writeln!(
                out,
                "{} on '{}': surface {:.6}  uv {:.6}  ratio {:.6}",
                job.name(mesh.name()),
                set,
                m.area_3d,
                m.area_2d,
                m.ratio()
            )?;
        }
    }
    out.flush()?;

    Ok(())
}

fn cmd_run(input: &PathBuf, output: &PathBuf, args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options();
    options.validate()?;

    let load_start = Instant::now();
    let mut meshes = io::load(input)?;
    println!("Loaded: {} meshes", meshes.len());

    let mut units = discover_jobs(&meshes, &select(&meshes, &args.meshes), &options);
    let load_time = load_start.elapsed();
    if units.is_empty() {
        return Err("nothing selected".into());
    }

    let progress = create_progress();
    progress.begin_stage(0, 6, "Inspecting Selection...");

    let mut log = TransformLog::new();
    let report = run_jobs(&mut meshes, &mut units, &options, &mut log, &progress)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_summary(&mut out, &units, args.verbose)?;
    if args.timings {
        write_timings(&mut out, &report, load_time)?;
    }
    writeln!(
        out,
        "Result: {} jobs, {} failed, {} transforms recorded",
        report.jobs,
        report.failed(),
        log.len()
    )?;
    out.flush()?;

    io::save(&meshes, output)?;
    println!("Saved: {} ({:.2?})", output.display(), report.timings.total);

    Ok(())
}
