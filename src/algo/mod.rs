//! Numeric building blocks of the UV ratio pipeline.
//!
//! - **Area**: triangle-based surface and UV area accumulation
//! - **Ratio**: closed-form and bisection search for a target area ratio
//! - **Layout**: spring simulation that pushes overlapping islands apart
//! - **Progress**: progress callbacks and cooperative cancellation
//!
//! None of these depend on the job pipeline in [`crate::process`]; they can
//! be used directly on any [`crate::mesh::MeshAccess`] implementation.

pub mod area;
pub mod layout;
pub mod progress;
pub mod ratio;

pub use layout::{run_layout, LayoutOutcome, LayoutRect, SpringLayout};
pub use progress::Progress;
pub use ratio::ScalingAxis;
