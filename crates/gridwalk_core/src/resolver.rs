//! Local detour search around an impassable step.
//!
//! Probes cells at increasing distance in the four orthogonal directions
//! from where the mover stands. A probe is accepted when the mover can walk
//! straight to it and the planned line from it to the final target is
//! entirely passable. This is a best-effort local repair, not a global
//! shortest-path search.
//!
//! The search is incremental: [`RerouteSearch::advance`] checks one radius
//! per call so the controller can spread it over several ticks.

use serde::{Deserialize, Serialize};

use crate::components::StepQueue;
use crate::error::{Result, WalkError};
use crate::grid::{Direction, GridCoordinate, GridQuery};
use crate::line::{is_line_clear, plan_line};

/// Default probe radius cap.
pub const DEFAULT_REROUTE_RADIUS: u32 = 5;

/// Outcome of one [`RerouteSearch::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    /// Nothing found at `radius`; larger radii remain.
    Pending {
        /// Radius that was just probed.
        radius: u32,
    },
    /// A detour: the approach to the probe followed by the line to the target.
    Found(StepQueue),
    /// Every radius up to the cap failed.
    Exhausted,
}

/// Suspended detour search state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerouteSearch {
    from: GridCoordinate,
    target: GridCoordinate,
    next_radius: u32,
    max_radius: u32,
}

impl RerouteSearch {
    /// Start a search around `from` toward `target`.
    #[must_use]
    pub fn new(from: GridCoordinate, target: GridCoordinate, max_radius: u32) -> Self {
        Self {
            from,
            target,
            next_radius: 1,
            max_radius,
        }
    }

    /// Cell the search is centered on.
    #[must_use]
    pub const fn from(&self) -> GridCoordinate {
        self.from
    }

    /// Final target the detour must reach.
    #[must_use]
    pub const fn target(&self) -> GridCoordinate {
        self.target
    }

    /// Radius the next [`advance`](Self::advance) call will probe.
    #[must_use]
    pub const fn next_radius(&self) -> u32 {
        self.next_radius
    }

    /// Probe the next radius.
    pub fn advance<G: GridQuery + ?Sized>(&mut self, grid: &G) -> SearchStep {
        if self.next_radius > self.max_radius {
            return SearchStep::Exhausted;
        }

        let radius = self.next_radius;
        self.next_radius += 1;

        if let Some(detour) = probe_ring(grid, self.from, self.target, radius) {
            return SearchStep::Found(detour);
        }

        if self.next_radius > self.max_radius {
            SearchStep::Exhausted
        } else {
            SearchStep::Pending { radius }
        }
    }

    /// Build the error reported when the search gives up.
    #[must_use]
    pub fn failure(&self) -> WalkError {
        WalkError::NoPathFound {
            from: self.from,
            target: self.target,
        }
    }
}

/// Probe the four cells at `radius` from `from`, in right/left/up/down order.
///
/// Returns the first detour whose approach and onward line are both clear.
#[must_use]
pub fn probe_ring<G: GridQuery + ?Sized>(
    grid: &G,
    from: GridCoordinate,
    target: GridCoordinate,
    radius: u32,
) -> Option<StepQueue> {
    let distance = i32::try_from(radius).ok()?;

    for direction in Direction::PROBE_ORDER {
        let probe = from.offset(direction, distance);
        if !grid.is_passable(probe) {
            tracing::trace!(%probe, radius, "Reroute probe blocked");
            continue;
        }

        let approach = plan_line(from, probe);
        if !is_line_clear(grid, &approach) {
            tracing::trace!(%probe, radius, "Reroute approach obstructed");
            continue;
        }

        let onward = plan_line(probe, target);
        if !is_line_clear(grid, &onward) {
            tracing::trace!(%probe, radius, "Reroute line obstructed");
            continue;
        }

        let mut detour = approach;
        detour.extend(onward);
        return Some(detour);
    }

    None
}

/// Run the whole search synchronously.
///
/// # Errors
///
/// Returns [`WalkError::NoPathFound`] if no probe up to `max_radius` works.
pub fn resolve<G: GridQuery + ?Sized>(
    grid: &G,
    from: GridCoordinate,
    target: GridCoordinate,
    max_radius: u32,
) -> Result<StepQueue> {
    let mut search = RerouteSearch::new(from, target, max_radius);
    loop {
        match search.advance(grid) {
            SearchStep::Found(detour) => return Ok(detour),
            SearchStep::Exhausted => return Err(search.failure()),
            SearchStep::Pending { .. } => {}
        }
    }
}
