//! # uvratio
//!
//! Rescale UV layouts so that texture space matches surface area.
//!
//! The ratio of a part's world-space surface area to its UV area tells how
//! much texture resolution it gets. uvratio measures that ratio for whole
//! meshes or single UV shells, scales each part's UVs about its bounding-box
//! center until the ratio hits a goal, and can then push the scaled parts
//! apart and fit them back into the unit square.
//!
//! ## Features
//!
//! - **Area measurement**: triangle-fan surface and UV areas of any face subset
//! - **Ratio search**: closed-form uniform scaling, or a bisection search when
//!   only one axis may change
//! - **Overlap removal**: a damped spring simulation over bounding boxes
//! - **Host seam**: the [`mesh::MeshAccess`] trait lets the pipeline run on
//!   any mesh storage
//! - **File formats**: OBJ and glTF
//!
//! ## Quick Start
//!
//! ```no_run
//! use uvratio::prelude::*;
//!
//! let mut meshes = uvratio::io::load("model.obj").unwrap();
//! let options = AutoRatioOptions::default().with_goal_ratio(10.0);
//!
//! let selection: Vec<_> = (0..meshes.len()).map(|i| (i, Selection::Whole)).collect();
//! let mut units = discover_jobs(&meshes, &selection, &options);
//! let mut log = TransformLog::new();
//! let report = run_jobs(&mut meshes, &mut units, &options, &mut log, &Progress::none()).unwrap();
//! println!("{} of {} jobs failed", report.failed(), report.jobs);
//!
//! uvratio::io::save(&meshes, "output.obj").unwrap();
//! ```
//!
//! ## Measuring
//!
//! ```
//! use uvratio::prelude::*;
//! use uvratio::algo::area::{surface_area, uv_area};
//! use nalgebra::Point2;
//!
//! let mesh = build_grid("plane", 2, 2, 1.0, 0.25, Point2::origin()).unwrap();
//! let surface = surface_area(&mesh, None, Space::World);
//! let uv = uv_area(&mesh, None, "map1");
//!
//! assert!((surface - 4.0).abs() < 1e-12);
//! assert!((uv - 0.25).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod process;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use uvratio::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{Progress, ScalingAxis};
    pub use crate::error::{JobError, MeshError, Result};
    pub use crate::mesh::{build_grid, FaceId, MeshAccess, Space, UvId, UvMesh, VertexId};
    pub use crate::process::{
        discover_jobs, run_jobs, AutoRatioOptions, OperationMode, RunReport, Selection,
        TransformLog, TransformSink,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
