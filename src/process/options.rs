//! Run configuration.

use crate::algo::ScalingAxis;
use crate::error::{MeshError, Result};

/// How selected meshes are split into jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationMode {
    /// One job per mesh, covering all of its faces.
    #[default]
    ObjectLevel,
    /// One job per UV shell touched by the selection.
    UvShellLevel,
}

/// Options for [`run_jobs`](super::run_jobs).
///
/// Setters clamp out-of-range values instead of failing; the one value that
/// cannot be clamped, the goal ratio, is checked by [`AutoRatioOptions::validate`].
///
/// # Example
///
/// ```
/// use uvratio::process::{AutoRatioOptions, OperationMode};
///
/// let options = AutoRatioOptions::default()
///     .with_goal_ratio(10.0)
///     .with_threshold(0.0)
///     .with_operation_mode(OperationMode::UvShellLevel)
///     .with_layout(true);
///
/// assert_eq!(options.threshold, 0.0001);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AutoRatioOptions {
    /// Target surface area per unit of UV area.
    pub goal_ratio: Option<f64>,

    /// Accepted distance between the reached and the goal ratio.
    pub threshold: f64,

    /// Probe budget of each bisection attempt.
    pub max_iterations: usize,

    /// Which UV axes may be scaled.
    pub scaling_axis: ScalingAxis,

    /// Job granularity.
    pub operation_mode: OperationMode,

    /// Push overlapping jobs apart after scaling.
    pub layout_shells: bool,

    /// Step budget of the layout simulation.
    pub layout_iterations: usize,

    /// Time step of the layout simulation.
    pub layout_step: f64,

    /// Extra gap kept between laid out jobs, in UV units.
    pub layout_min_distance: f64,

    /// Fit the union of all jobs into the unit square.
    pub normalise: bool,

    /// Use the same normalisation factor on both axes.
    pub keep_aspect_ratio: bool,

    /// Leave the scale alone; only layout and normalise run.
    pub skip_scaling: bool,

    /// UV set to work on instead of the current one.
    pub uv_set: Option<String>,

    /// Use the current UV set when [`Self::uv_set`] is missing on a mesh.
    pub fallback: bool,

    /// Ask the transform sink to record undo information.
    pub record_undo: bool,
}

impl Default for AutoRatioOptions {
    fn default() -> Self {
        Self {
            goal_ratio: None,
            threshold: 0.001,
            max_iterations: 200,
            scaling_axis: ScalingAxis::Both,
            operation_mode: OperationMode::ObjectLevel,
            layout_shells: false,
            layout_iterations: 10_000,
            layout_step: 0.001,
            layout_min_distance: 0.0,
            normalise: false,
            keep_aspect_ratio: true,
            skip_scaling: false,
            uv_set: None,
            fallback: false,
            record_undo: true,
        }
    }
}

impl AutoRatioOptions {
    /// Set the goal ratio.
    pub fn with_goal_ratio(mut self, ratio: f64) -> Self {
        self.goal_ratio = Some(ratio);
        self
    }

    /// Set the ratio threshold, clamped to `[0.0001, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0001, 1.0);
        self
    }

    /// Set the bisection budget, clamped to `[1, 10000]`.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.clamp(1, 10_000);
        self
    }

    /// Restrict scaling to one axis.
    pub fn with_scaling_axis(mut self, axis: ScalingAxis) -> Self {
        self.scaling_axis = axis;
        self
    }

    /// Set the job granularity.
    pub fn with_operation_mode(mut self, mode: OperationMode) -> Self {
        self.operation_mode = mode;
        self
    }

    /// Enable or disable overlap removal.
    pub fn with_layout(mut self, layout: bool) -> Self {
        self.layout_shells = layout;
        self
    }

    /// Set the layout step budget, clamped to `[1, 10000]`.
    pub fn with_layout_iterations(mut self, iterations: usize) -> Self {
        self.layout_iterations = iterations.clamp(1, 10_000);
        self
    }

    /// Set the layout time step, clamped to `[0.00001, 0.1]`.
    pub fn with_layout_step(mut self, step: f64) -> Self {
        self.layout_step = step.clamp(0.00001, 0.1);
        self
    }

    /// Set the minimum layout gap, clamped to `[0, 1000]`.
    pub fn with_layout_min_distance(mut self, distance: f64) -> Self {
        self.layout_min_distance = distance.clamp(0.0, 1000.0);
        self
    }

    /// Enable or disable normalisation into the unit square.
    pub fn with_normalise(mut self, normalise: bool) -> Self {
        self.normalise = normalise;
        self
    }

    /// Normalise each axis independently.
    pub fn stretch_to_fit(mut self) -> Self {
        self.keep_aspect_ratio = false;
        self
    }

    /// Skip the scale search.
    pub fn skip_scaling(mut self) -> Self {
        self.skip_scaling = true;
        self
    }

    /// Work on the named UV set.
    pub fn with_uv_set(mut self, name: impl Into<String>) -> Self {
        self.uv_set = Some(name.into());
        self
    }

    /// Allow falling back to the current UV set.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set whether applied transforms are recorded for undo.
    pub fn with_record_undo(mut self, record: bool) -> Self {
        self.record_undo = record;
        self
    }

    /// Check the options that setters cannot repair.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidParameter`] if scaling is enabled and the
    /// goal ratio is missing, not finite, or not positive.
    pub fn validate(&self) -> Result<()> {
        if self.skip_scaling {
            return Ok(());
        }
        match self.goal_ratio {
            None => Err(MeshError::invalid_param(
                "goal_ratio",
                "none",
                "required unless scaling is skipped",
            )),
            Some(r) if !r.is_finite() || r <= 0.0 => Err(MeshError::invalid_param(
                "goal_ratio",
                r,
                "must be a positive number",
            )),
            Some(_) => Ok(()),
        }
    }

    /// Goal ratio used by the scale search.
    ///
    /// Falls back to `1.0` when unset; [`Self::validate`] rejects that case
    /// whenever the search actually runs.
    pub(crate) fn goal(&self) -> f64 {
        self.goal_ratio.unwrap_or(1.0)
    }
}
