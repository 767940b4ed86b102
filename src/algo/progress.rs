//! Progress reporting and cooperative cancellation.
//!
//! Long-running stages report progress through a callback and poll a shared
//! cancellation token between units of work. The reporter is passed
//! explicitly down the call chain; there is no global progress state.
//!
//! # Example
//!
//! ```
//! use uvratio::algo::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//!
//! progress.set_total(2, "Jobs");
//! progress.step();
//! progress.step();
//! assert!(!progress.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A progress reporter that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
    cancelled: Arc<AtomicBool>,
    sub_done: AtomicUsize,
    sub_total: AtomicUsize,
    sub_name: Mutex<String>,
    stage: AtomicUsize,
    stages: AtomicUsize,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            cancelled: Arc::new(AtomicBool::new(false)),
            sub_done: AtomicUsize::new(0),
            sub_total: AtomicUsize::new(0),
            sub_name: Mutex::new(String::new()),
            stage: AtomicUsize::new(0),
            stages: AtomicUsize::new(0),
        }
    }

    /// Share an existing cancellation token, e.g. one set by a signal handler.
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancelled = token;
        self
    }

    /// The cancellation token polled by [`Progress::is_cancelled`].
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Request cancellation of the running operation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report progress within a sub-range.
    ///
    /// Maps progress from `[0, sub_total]` to `[range_current, range_current + 1]`
    /// within a total of `range_total` steps.
    #[inline]
    pub fn report_sub(
        &self,
        sub_current: usize,
        sub_total: usize,
        range_current: usize,
        range_total: usize,
        message: &str,
    ) {
        if sub_total == 0 || range_total == 0 {
            return;
        }
        // Fixed-point: 1000 sub-steps per range step.
        let sub_fraction = (sub_current.min(sub_total) * 1000) / sub_total;
        let effective = range_current * 1000 + sub_fraction;
        let total_scaled = range_total * 1000;
        (self.callback)(effective, total_scaled, message);
    }

    /// Enter stage `stage` of `stages` and report its start.
    ///
    /// Until the next call, [`Progress::step`] reports within this stage's
    /// share of the overall range.
    pub fn begin_stage(&self, stage: usize, stages: usize, message: &str) {
        self.stage.store(stage, Ordering::Relaxed);
        self.stages.store(stages, Ordering::Relaxed);
        self.report_sub(0, 1, stage, stages, message);
    }

    /// Start a new group of `total` sub-tasks named `name`.
    pub fn set_total(&self, total: usize, name: &str) {
        self.sub_total.store(total, Ordering::Relaxed);
        self.sub_done.store(0, Ordering::Relaxed);
        if let Ok(mut n) = self.sub_name.lock() {
            n.clear();
            n.push_str(name);
        }
    }

    /// Mark one sub-task of the current group as done and report it.
    pub fn step(&self) {
        let done = self.sub_done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.sub_total.load(Ordering::Relaxed);
        if total == 0 {
            return;
        }
        let name = self
            .sub_name
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default();
        let stages = self.stages.load(Ordering::Relaxed);
        if stages == 0 {
            (self.callback)(done.min(total), total, &name);
        } else {
            let stage = self.stage.load(Ordering::Relaxed);
            self.report_sub(done, total, stage, stages, &name);
        }
    }

    /// Sub-tasks completed in the current group.
    pub fn steps_done(&self) -> usize {
        self.sub_done.load(Ordering::Relaxed)
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
