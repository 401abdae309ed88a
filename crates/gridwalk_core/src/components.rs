//! Per-mover data: the step queue and the motion state record.
//!
//! Components are pure data. The transitions between phases live in
//! [`crate::controller`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::GridCoordinate;
use crate::math::{Fixed, Vec2Fixed};
use crate::resolver::RerouteSearch;

/// Unique identifier for movers.
pub type MoverId = u64;

/// FIFO queue of cells still to be walked, oldest first.
///
/// Never starts with the cell the mover currently occupies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepQueue {
    /// The pending cells.
    steps: VecDeque<GridCoordinate>,
}

impl StepQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    /// Add a step to the back of the queue.
    pub fn push(&mut self, step: GridCoordinate) {
        self.steps.push_back(step);
    }

    /// Next step to take.
    #[must_use]
    pub fn front(&self) -> Option<GridCoordinate> {
        self.steps.front().copied()
    }

    /// Final step in the queue.
    #[must_use]
    pub fn back(&self) -> Option<GridCoordinate> {
        self.steps.back().copied()
    }

    /// Remove and return the next step.
    pub fn pop(&mut self) -> Option<GridCoordinate> {
        self.steps.pop_front()
    }

    /// Drop all pending steps.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of pending steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if `cell` is anywhere in the queue.
    #[must_use]
    pub fn contains(&self, cell: GridCoordinate) -> bool {
        self.steps.contains(&cell)
    }

    /// Iterate over pending steps in walking order.
    pub fn iter(&self) -> impl Iterator<Item = &GridCoordinate> {
        self.steps.iter()
    }

    /// Copy the steps into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<GridCoordinate> {
        self.steps.iter().copied().collect()
    }
}

impl Extend<GridCoordinate> for StepQueue {
    fn extend<T: IntoIterator<Item = GridCoordinate>>(&mut self, iter: T) {
        self.steps.extend(iter);
    }
}

impl FromIterator<GridCoordinate> for StepQueue {
    fn from_iter<T: IntoIterator<Item = GridCoordinate>>(iter: T) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StepQueue {
    type Item = &'a GridCoordinate;
    type IntoIter = std::collections::vec_deque::Iter<'a, GridCoordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl IntoIterator for StepQueue {
    type Item = GridCoordinate;
    type IntoIter = std::collections::vec_deque::IntoIter<GridCoordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// A single timed step from one cell to an adjacent one.
///
/// Time is counted in whole simulation ticks. The mover reaches `to` once
/// `elapsed == duration` and then rests there for `delay` more ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMotion {
    /// Cell the step started from.
    pub from: GridCoordinate,
    /// Cell the step ends on.
    pub to: GridCoordinate,
    /// Ticks spent in this step so far.
    pub elapsed: u32,
    /// Ticks needed to cover the distance (at least 1).
    pub duration: u32,
    /// Ticks to rest on `to` before the next step.
    pub delay: u32,
}

impl StepMotion {
    /// Start a step.
    #[must_use]
    pub fn new(from: GridCoordinate, to: GridCoordinate, duration: u32, delay: u32) -> Self {
        Self {
            from,
            to,
            elapsed: 0,
            duration: duration.max(1),
            delay,
        }
    }

    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1).min(self.duration + self.delay);
    }

    /// Interpolation parameter in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        let elapsed = self.elapsed.min(self.duration);
        Fixed::from_num(elapsed) / Fixed::from_num(self.duration)
    }

    /// Current world position along the step.
    ///
    /// Exactly `to.to_world()` once the travel part is over.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.from.to_world().lerp(self.to.to_world(), self.progress())
    }

    /// True once the travel and the rest delay are both over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration + self.delay
    }
}

/// Movement state-machine phase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionPhase {
    /// No movement request in progress.
    #[default]
    Idle,
    /// A target was accepted; the line is planned on the next tick.
    PathPlanning,
    /// Between steps; the next queued cell is examined.
    Stepping,
    /// Walking one step.
    Interpolating(StepMotion),
    /// Searching for a detour, one radius per tick.
    Rerouting(RerouteSearch),
    /// The detour search failed; collapses to `Idle` within the same tick.
    Failed,
}

impl MotionPhase {
    /// Short name for logs and protocol output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PathPlanning => "path_planning",
            Self::Stepping => "stepping",
            Self::Interpolating(_) => "interpolating",
            Self::Rerouting(_) => "rerouting",
            Self::Failed => "failed",
        }
    }
}

/// Motion record owned by each mover.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotionState {
    /// Current phase.
    pub phase: MotionPhase,
    /// Final target of the active request.
    pub target: Option<GridCoordinate>,
    /// Steps still to walk.
    pub pending: StepQueue,
    /// Last line produced by planning or rerouting, for debug overlays.
    pub last_line: StepQueue,
}

impl MotionState {
    /// True while a timed step is in progress.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        matches!(self.phase, MotionPhase::Interpolating(_))
    }

    /// True while a movement request is active.
    #[must_use]
    pub fn is_moving_to_target(&self) -> bool {
        !matches!(self.phase, MotionPhase::Idle | MotionPhase::Failed)
    }

    /// Drop the active request.
    pub fn reset(&mut self) {
        self.phase = MotionPhase::Idle;
        self.target = None;
        self.pending.clear();
    }
}
