//! Overlap removal for UV islands.
//!
//! Each island is represented by its bounding box. Boxes whose padded
//! rectangles intersect are joined by a damped spring whose rest length
//! exceeds their combined half-diagonals, and the simulation runs until no
//! two boxes overlap (or the step budget runs out).
//!
//! Springs live in an arena owned by [`SpringLayout`]; boxes refer to them
//! by index. The per-box adjacency is rebuilt whenever springs are removed.
//!
//! # Example
//!
//! ```
//! use uvratio::algo::layout::SpringLayout;
//! use nalgebra::Point2;
//!
//! let mut layout = SpringLayout::new();
//! layout.add_box(0.5, 0.5, Point2::new(0.0, 0.0));
//! layout.add_box(0.5, 0.5, Point2::new(0.1, 0.0));
//!
//! let mut steps = 0;
//! while layout.step(0.01) && steps < 10_000 {
//!     steps += 1;
//! }
//! assert!(!layout.any_overlap());
//! ```

use nalgebra::{Point2, Vector2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Progress;

/// Padding added around every box when testing for overlap.
pub const BORDER: f64 = 1.0 / 256.0;

const SPRING_CONSTANT: f64 = 0.125;
const SPRING_DAMPING: f64 = 0.01;
const REST_FACTOR: f64 = 0.75;
const DRAG: f64 = 0.1;
const NUDGE: f64 = 0.001;
const DEFAULT_SEED: u64 = 0x5eed_0f_1a_7e;

/// Steps between progress updates and cancellation checks.
pub const POLL_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
struct LayoutBox {
    size: Vector2<f64>,
    position: Point2<f64>,
    velocity: Vector2<f64>,
    force: Vector2<f64>,
    springs: Vec<usize>,
}

impl LayoutBox {
    fn half_diagonal(&self) -> f64 {
        REST_FACTOR * self.size.norm()
    }
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    a: usize,
    b: usize,
    constant: f64,
    damping: f64,
    rest_length: f64,
}

/// Damped mass-spring simulation over axis-aligned boxes.
#[derive(Debug, Clone)]
pub struct SpringLayout {
    boxes: Vec<LayoutBox>,
    springs: Vec<Spring>,
    rng: StdRng,
}

impl Default for SpringLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl SpringLayout {
    /// Create an empty layout with a fixed nudge seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create an empty layout whose degeneracy nudges use `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            boxes: Vec::new(),
            springs: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Add a box and return its index.
    pub fn add_box(&mut self, width: f64, height: f64, center: Point2<f64>) -> usize {
        self.boxes.push(LayoutBox {
            size: Vector2::new(width, height),
            position: center,
            velocity: Vector2::zeros(),
            force: Vector2::zeros(),
            springs: Vec::new(),
        });
        self.boxes.len() - 1
    }

    /// Current center of a box.
    pub fn position(&self, index: usize) -> Point2<f64> {
        self.boxes[index].position
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Check if the layout has no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Number of live springs.
    pub fn num_springs(&self) -> usize {
        self.springs.len()
    }

    /// Remove all boxes and springs.
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.springs.clear();
    }

    /// Check whether the padded rectangles of two boxes overlap.
    ///
    /// Touching edges do not count as overlap.
    pub fn boxes_intersect(&self, a: usize, b: usize) -> bool {
        intersect(&self.boxes[a], &self.boxes[b])
    }

    /// Check whether any pair of boxes overlaps.
    pub fn any_overlap(&self) -> bool {
        let n = self.boxes.len();
        (0..n).any(|i| (i + 1..n).any(|j| self.boxes_intersect(i, j)))
    }

    /// Advance the simulation by `dt`.
    ///
    /// Returns `true` while springs remain, i.e. while some boxes still
    /// overlap.
    pub fn step(&mut self, dt: f64) -> bool {
        self.connect_overlapping();
        self.remove_springs();
        self.update_particles(dt);

        for b in &mut self.boxes {
            if b.springs.is_empty() {
                b.velocity = Vector2::zeros();
                b.force = Vector2::zeros();
            }
        }

        !self.springs.is_empty()
    }

    fn connected(&self, a: usize, b: usize) -> bool {
        self.boxes[a].springs.iter().any(|&s| {
            let s = &self.springs[s];
            (s.a == a && s.b == b) || (s.a == b && s.b == a)
        })
    }

    fn connect_overlapping(&mut self) {
        let n = self.boxes.len();
        for i in 0..n {
            for j in i + 1..n {
                if !self.boxes_intersect(i, j) || self.connected(i, j) {
                    continue;
                }
                let rest_length = self.boxes[i].half_diagonal() + self.boxes[j].half_diagonal();
                let id = self.springs.len();
                self.springs.push(Spring {
                    a: i,
                    b: j,
                    constant: SPRING_CONSTANT,
                    damping: SPRING_DAMPING,
                    rest_length,
                });
                self.boxes[i].springs.push(id);
                self.boxes[j].springs.push(id);
            }
        }
    }

    fn remove_springs(&mut self) {
        let before = self.springs.len();
        let boxes = &self.boxes;
        self.springs.retain(|s| intersect(&boxes[s.a], &boxes[s.b]));
        if self.springs.len() == before {
            return;
        }

        for b in &mut self.boxes {
            b.springs.clear();
        }
        for (id, s) in self.springs.iter().enumerate() {
            self.boxes[s.a].springs.push(id);
            self.boxes[s.b].springs.push(id);
        }
    }

    fn update_particles(&mut self, dt: f64) {
        self.compute_forces();

        // Positions and velocities both advance from the pre-step state.
        for b in &mut self.boxes {
            let dp = b.velocity;
            let dv = b.force;
            b.position += dp * dt;
            b.velocity += dv * dt;
        }
    }

    fn compute_forces(&mut self) {
        for b in &mut self.boxes {
            b.force = -DRAG * b.velocity;
        }

        for i in 0..self.springs.len() {
            let s = self.springs[i];
            let mut d = self.boxes[s.a].position - self.boxes[s.b].position;
            if d.norm_squared() == 0.0 {
                self.nudge(s.a);
                self.nudge(s.b);
                d = self.boxes[s.a].position - self.boxes[s.b].position;
            }

            let len = d.norm();
            let dir = if len > 0.0 { d / len } else { Vector2::zeros() };
            let relative = self.boxes[s.a].velocity - self.boxes[s.b].velocity;
            let magnitude = s.constant * (len - s.rest_length) + s.damping * relative.dot(&dir);
            let f = -magnitude * dir;

            self.boxes[s.a].force += f;
            self.boxes[s.b].force -= f;
        }
    }

    fn nudge(&mut self, index: usize) {
        let dx = self.rng.random_range(-1.0..=1.0) * NUDGE;
        let dy = self.rng.random_range(-1.0..=1.0) * NUDGE;
        self.boxes[index].position += Vector2::new(dx, dy);
    }
}

fn intersect(a: &LayoutBox, b: &LayoutBox) -> bool {
    let a_half = a.size * 0.5;
    let b_half = b.size * 0.5;

    let a_left = a.position.x - a_half.x - BORDER;
    let a_right = a.position.x + a_half.x + BORDER;
    let b_left = b.position.x - b_half.x - BORDER;
    let b_right = b.position.x + b_half.x + BORDER;

    let a_bottom = a.position.y - a_half.y - BORDER;
    let a_top = a.position.y + a_half.y + BORDER;
    let b_bottom = b.position.y - b_half.y - BORDER;
    let b_top = b.position.y + b_half.y + BORDER;

    a_right > b_left && a_left < b_right && a_top > b_bottom && a_bottom < b_top
}

/// A box to lay out: full size and starting center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRect {
    /// Width and height, including any minimum distance.
    pub size: Vector2<f64>,
    /// Starting center.
    pub center: Point2<f64>,
}

impl LayoutRect {
    /// Create a rect from its size and center.
    pub fn new(size: Vector2<f64>, center: Point2<f64>) -> Self {
        Self { size, center }
    }
}

/// Result of [`run_layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    /// Final box centers, in input order.
    pub positions: Vec<Point2<f64>>,
    /// Number of steps that left springs behind.
    pub steps: usize,
    /// `true` if the last step found no overlapping boxes.
    pub converged: bool,
    /// `true` if the run stopped on a cancellation request.
    pub cancelled: bool,
}

/// Separate overlapping boxes.
///
/// Runs at most `iterations` steps of size `step`, stopping early once no
/// springs remain. Progress is reported and cancellation polled every
/// [`POLL_INTERVAL`] steps; a cancelled run still returns the positions
/// reached so far.
pub fn run_layout(
    rects: &[LayoutRect],
    iterations: usize,
    step: f64,
    progress: &Progress,
) -> LayoutOutcome {
    let mut layout = SpringLayout::new();
    for r in rects {
        layout.add_box(r.size.x, r.size.y, r.center);
    }

    progress.set_total(iterations / POLL_INTERVAL, "Layout");

    let mut steps = 0;
    let mut converged = false;
    let mut cancelled = false;
    let mut since_poll = 0;
    while steps < iterations {
        if !layout.step(step) {
            converged = true;
            break;
        }
        steps += 1;

        since_poll += 1;
        if since_poll >= POLL_INTERVAL {
            since_poll = 0;
            progress.step();
            if progress.is_cancelled() {
                cancelled = true;
                break;
            }
        }
    }

    log::debug!(
        "layout of {} boxes: {} steps, converged: {}",
        rects.len(),
        steps,
        converged
    );

    LayoutOutcome {
        positions: (0..layout.len()).map(|i| layout.position(i)).collect(),
        steps,
        converged,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: f64, h: f64, x: f64, y: f64) -> LayoutRect {
        LayoutRect::new(Vector2::new(w, h), Point2::new(x, y))
    }

    #[test]
    fn test_intersection_uses_padding() {
        let mut layout = SpringLayout::new();
        layout.add_box(1.0, 1.0, Point2::new(0.0, 0.0));
        // Gap of 1/256 is closed by the padding on both sides.
        layout.add_box(1.0, 1.0, Point2::new(1.0 + BORDER, 0.0));
        assert!(layout.boxes_intersect(0, 1));

        // Padded edges exactly touching do not overlap.
        layout.add_box(1.0, 1.0, Point2::new(0.0, 1.0 + 2.0 * BORDER));
        assert!(!layout.boxes_intersect(0, 2));
    }

    #[test]
    fn test_springs_created_once_and_removed() {
        let mut layout = SpringLayout::new();
        layout.add_box(0.2, 0.2, Point2::new(0.0, 0.0));
        layout.add_box(0.2, 0.2, Point2::new(0.05, 0.0));
        layout.add_box(0.2, 0.2, Point2::new(5.0, 5.0));

        assert!(layout.step(0.01));
        assert!(layout.step(0.01));
        assert_eq!(layout.num_springs(), 1);

        // The isolated box never moves.
        assert_eq!(layout.position(2), Point2::new(5.0, 5.0));
    }

    #[test]
    fn test_no_overlap_returns_false() {
        let mut layout = SpringLayout::new();
        layout.add_box(0.1, 0.1, Point2::new(0.0, 0.0));
        layout.add_box(0.1, 0.1, Point2::new(1.0, 0.0));
        assert!(!layout.step(0.01));
        assert_eq!(layout.position(0), Point2::new(0.0, 0.0));
        assert_eq!(layout.position(1), Point2::new(1.0, 0.0));
    }

    #[test]
    fn test_symmetric_pair_stays_symmetric() {
        let rects = [rect(1.0, 1.0, 0.0, 0.0), rect(1.0, 1.0, 0.5, 0.5)];
        let outcome = run_layout(&rects, 10_000, 0.01, &Progress::none());
        assert!(outcome.converged);

        let p1 = outcome.positions[0];
        let p2 = outcome.positions[1];
        assert!((p1.x - p1.y).abs() < 1e-9);
        assert!((p2.x - p2.y).abs() < 1e-9);
        // Equal and opposite forces keep the midpoint fixed.
        assert!((p1.x + p2.x - 0.5).abs() < 1e-9);
        assert!((p1.y + p2.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_boxes_separate() {
        let rects = [rect(0.3, 0.3, 0.5, 0.5), rect(0.3, 0.3, 0.5, 0.5)];
        let outcome = run_layout(&rects, 10_000, 0.01, &Progress::none());
        assert!(outcome.converged);
        assert!(outcome.positions[0] != outcome.positions[1]);
    }

    #[test]
    fn test_converges_for_typical_steps() {
        for &dt in &[0.001, 0.01, 0.1] {
            let rects = [
                rect(0.4, 0.3, 0.5, 0.5),
                rect(0.3, 0.4, 0.6, 0.55),
                rect(0.2, 0.2, 0.45, 0.6),
            ];
            let outcome = run_layout(&rects, 10_000, dt, &Progress::none());
            assert!(outcome.converged, "step {} did not converge", dt);
            assert!(outcome.steps <= 10_000);

            let mut layout = SpringLayout::new();
            for (r, p) in rects.iter().zip(&outcome.positions) {
                layout.add_box(r.size.x, r.size.y, *p);
            }
            assert!(!layout.any_overlap());
        }
    }

    #[test]
    fn test_budget_bounds_steps() {
        let rects = [rect(1.0, 1.0, 0.0, 0.0), rect(1.0, 1.0, 0.1, 0.0)];
        let outcome = run_layout(&rects, 5, 1e-5, &Progress::none());
        assert!(!outcome.converged);
        assert_eq!(outcome.steps, 5);
    }

    #[test]
    fn test_cancellation_is_polled() {
        let rects = [rect(1.0, 1.0, 0.0, 0.0), rect(1.0, 1.0, 0.1, 0.0)];
        let progress = Progress::none();
        progress.cancel();
        let outcome = run_layout(&rects, 10_000, 1e-5, &progress);
        assert!(outcome.cancelled);
        assert_eq!(outcome.steps, POLL_INTERVAL);
    }

    #[test]
    fn test_clear() {
        let mut layout = SpringLayout::with_seed(7);
        layout.add_box(1.0, 1.0, Point2::origin());
        layout.add_box(1.0, 1.0, Point2::origin());
        layout.step(0.01);
        layout.clear();
        assert!(layout.is_empty());
        assert_eq!(layout.num_springs(), 0);
    }
}
