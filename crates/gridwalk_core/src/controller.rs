//! Per-mover movement state machine.
//!
//! ```text
//! Idle --request--> PathPlanning --plan--> Stepping
//! Stepping --next passable--> Interpolating --done--> Stepping | Idle
//! Stepping --next blocked--> Rerouting --found--> Stepping
//! Rerouting --exhausted--> Failed --> Idle
//! Stepping --queue empty--> Idle
//! ```
//!
//! [`Mover::tick`] runs instantaneous transitions back to back and stops at
//! the first phase that has to wait: an in-progress step advances by one
//! tick, a reroute search probes one radius.

use serde::{Deserialize, Serialize};

use crate::components::{MotionPhase, MotionState, MoverId, StepMotion, StepQueue};
use crate::config::MovementConfig;
use crate::error::{Result, WalkError};
use crate::grid::{GridCoordinate, GridQuery};
use crate::line::plan_line;
use crate::math::Vec2Fixed;
use crate::resolver::{RerouteSearch, SearchStep};

/// Result of an accepted (non-error) move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRequest {
    /// A new plan will be computed on the next tick.
    Accepted,
    /// The target is the mover's own cell; nothing changes.
    AlreadyThere,
    /// A step is in progress; the request was dropped.
    Ignored,
}

/// Something observable that happened to a mover during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionEvent {
    /// A straight line toward the target was planned.
    PathPlanned {
        /// Final target.
        target: GridCoordinate,
        /// Number of queued steps.
        steps: usize,
    },
    /// A timed step began.
    StepStarted {
        /// Origin cell.
        from: GridCoordinate,
        /// Destination cell.
        to: GridCoordinate,
    },
    /// A step (including its rest delay) finished.
    StepCompleted {
        /// Cell the mover now occupies.
        at: GridCoordinate,
    },
    /// The next step was impassable and a detour search began.
    RerouteStarted {
        /// Cell the mover is standing on.
        from: GridCoordinate,
        /// The impassable cell.
        blocked: GridCoordinate,
    },
    /// A search radius produced no detour.
    RerouteProbe {
        /// Radius just probed.
        radius: u32,
    },
    /// A detour replaced the pending queue.
    Rerouted {
        /// Number of queued steps in the detour.
        steps: usize,
    },
    /// The final target was reached.
    Arrived {
        /// The target cell.
        at: GridCoordinate,
    },
    /// The move was cancelled because no detour was found.
    MoveFailed {
        /// Cell the mover stays on.
        at: GridCoordinate,
        /// Target of the cancelled move.
        target: GridCoordinate,
    },
}

/// An agent walking the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mover {
    id: MoverId,
    /// Last cell the mover settled on.
    cell: GridCoordinate,
    /// Current (possibly interpolated) world position.
    position: Vec2Fixed,
    motion: MotionState,
}

impl Mover {
    /// Create an idle mover standing on `cell`.
    #[must_use]
    pub fn new(id: MoverId, cell: GridCoordinate) -> Self {
        Self {
            id,
            cell,
            position: cell.to_world(),
            motion: MotionState::default(),
        }
    }

    /// Mover id.
    #[must_use]
    pub const fn id(&self) -> MoverId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: MoverId) {
        self.id = id;
    }

    /// Last settled cell.
    #[must_use]
    pub const fn cell(&self) -> GridCoordinate {
        self.cell
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Motion record.
    #[must_use]
    pub const fn motion(&self) -> &MotionState {
        &self.motion
    }

    /// Steps still queued (debug overlay).
    #[must_use]
    pub fn pending_steps(&self) -> &StepQueue {
        &self.motion.pending
    }

    /// Last planned or rerouted line (debug overlay).
    #[must_use]
    pub fn last_line(&self) -> &StepQueue {
        &self.motion.last_line
    }

    /// True while a timed step is in progress.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.motion.is_moving()
    }

    /// True while a movement request is active.
    #[must_use]
    pub fn is_moving_to_target(&self) -> bool {
        self.motion.is_moving_to_target()
    }

    /// True when there is nothing left to do.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.motion.phase == MotionPhase::Idle
    }

    /// Ask the mover to walk to `target`.
    ///
    /// Replaces any leftover queue or running detour search unless a step is
    /// in progress, in which case the request is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::TargetUnreachable`] if `target` is impassable or
    /// outside the grid. The mover's state is left untouched.
    pub fn request_move<G: GridQuery + ?Sized>(
        &mut self,
        grid: &G,
        target: GridCoordinate,
    ) -> Result<MoveRequest> {
        if self.motion.is_moving() {
            tracing::debug!(mover = self.id, %target, "Move request ignored while stepping");
            return Ok(MoveRequest::Ignored);
        }

        if target == self.cell {
            return Ok(MoveRequest::AlreadyThere);
        }

        let class = grid.classify(target);
        if !class.is_passable() {
            tracing::warn!(mover = self.id, %target, %class, "Rejected unreachable target");
            return Err(WalkError::TargetUnreachable { target, class });
        }

        self.motion.reset();
        self.motion.target = Some(target);
        self.motion.phase = MotionPhase::PathPlanning;
        Ok(MoveRequest::Accepted)
    }

    /// Drop the active request. A step in progress still completes.
    pub fn stop(&mut self) {
        if self.motion.is_moving() {
            self.motion.target = None;
            self.motion.pending.clear();
        } else {
            self.motion.reset();
        }
    }

    /// Advance the state machine by one tick.
    pub fn tick<G: GridQuery + ?Sized>(
        &mut self,
        grid: &G,
        config: &MovementConfig,
        events: &mut Vec<MotionEvent>,
    ) {
        loop {
            let phase = std::mem::take(&mut self.motion.phase);
            match phase {
                MotionPhase::Idle => return,

                MotionPhase::PathPlanning => {
                    let Some(target) = self.motion.target else {
                        self.motion.reset();
                        return;
                    };
                    let line = plan_line(self.cell, target);
                    tracing::debug!(mover = self.id, from = %self.cell, %target, steps = line.len(), "Planned line");
                    events.push(MotionEvent::PathPlanned {
                        target,
                        steps: line.len(),
                    });
                    self.motion.last_line = line.clone();
                    self.motion.pending = line;
                    self.motion.phase = MotionPhase::Stepping;
                }

                MotionPhase::Stepping => {
                    if self.begin_next_step(grid, config, events) {
                        return;
                    }
                }

                MotionPhase::Interpolating(mut step) => {
                    step.advance();
                    self.position = step.position();
                    if !step.is_finished() {
                        self.motion.phase = MotionPhase::Interpolating(step);
                        return;
                    }

                    self.cell = step.to;
                    self.position = step.to.to_world();
                    events.push(MotionEvent::StepCompleted { at: self.cell });
                    tracing::trace!(mover = self.id, at = %self.cell, "Step completed");

                    if self.motion.target == Some(self.cell) {
                        tracing::info!(mover = self.id, at = %self.cell, "Arrived");
                        events.push(MotionEvent::Arrived { at: self.cell });
                        self.motion.reset();
                        return;
                    }
                    self.motion.phase = MotionPhase::Stepping;
                }

                MotionPhase::Rerouting(mut search) => match search.advance(grid) {
                    SearchStep::Pending { radius } => {
                        events.push(MotionEvent::RerouteProbe { radius });
                        self.motion.phase = MotionPhase::Rerouting(search);
                        return;
                    }
                    SearchStep::Found(detour) => {
                        tracing::debug!(mover = self.id, from = %search.from(), steps = detour.len(), "Rerouted");
                        events.push(MotionEvent::Rerouted {
                            steps: detour.len(),
                        });
                        self.motion.last_line = detour.clone();
                        self.motion.pending = detour;
                        self.motion.phase = MotionPhase::Stepping;
                    }
                    SearchStep::Exhausted => {
                        tracing::warn!(mover = self.id, error = %search.failure(), "Cancelling move");
                        self.motion.phase = MotionPhase::Failed;
                    }
                },

                MotionPhase::Failed => {
                    if let Some(target) = self.motion.target {
                        events.push(MotionEvent::MoveFailed {
                            at: self.cell,
                            target,
                        });
                    }
                    self.motion.reset();
                    return;
                }
            }
        }
    }

    /// Handle the `Stepping` phase. Returns true if the tick should end.
    fn begin_next_step<G: GridQuery + ?Sized>(
        &mut self,
        grid: &G,
        config: &MovementConfig,
        events: &mut Vec<MotionEvent>,
    ) -> bool {
        let Some(next) = self.motion.pending.front() else {
            self.motion.reset();
            return true;
        };

        if grid.is_passable(next) {
            #[cfg(feature = "debug-validation")]
            assert!(
                self.cell.is_adjacent(next),
                "step {} -> {next} is not orthogonally adjacent",
                self.cell
            );
            self.motion.pending.pop();
            let step = StepMotion::new(
                self.cell,
                next,
                config.step_ticks(self.cell, next),
                config.delay_ticks(),
            );
            tracing::trace!(mover = self.id, from = %self.cell, to = %next, ticks = step.duration, "Step started");
            events.push(MotionEvent::StepStarted {
                from: self.cell,
                to: next,
            });
            self.motion.phase = MotionPhase::Interpolating(step);
            return true;
        }

        let Some(target) = self.motion.target else {
            self.motion.reset();
            return true;
        };

        tracing::debug!(mover = self.id, at = %self.cell, blocked = %next, "Next step blocked, rerouting");
        events.push(MotionEvent::RerouteStarted {
            from: self.cell,
            blocked: next,
        });
        self.motion.pending.clear();
        self.motion.phase =
            MotionPhase::Rerouting(RerouteSearch::new(self.cell, target, config.reroute_radius));
        true
    }
}
