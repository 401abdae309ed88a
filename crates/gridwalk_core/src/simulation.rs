//! Core simulation loop.
//!
//! The simulation owns the tile grid, the movement config and every mover,
//! and advances them at a fixed tick rate.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`crate::math::Fixed`])
//! - No system randomness
//! - Movers are ticked in ascending id order
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use gridwalk_core::grid::{CellClass, GridCoordinate, TileGrid};
//! use gridwalk_core::simulation::Simulation;
//!
//! let grid = TileGrid::filled(8, 8, CellClass::Grass);
//! let mut sim = Simulation::new(grid, Default::default()).unwrap();
//!
//! let mover = sim.spawn_mover(GridCoordinate::new(0, 0)).unwrap();
//! sim.command_move(mover, GridCoordinate::new(3, 4).to_world()).unwrap();
//!
//! while !sim.is_settled() {
//!     sim.tick();
//! }
//! assert_eq!(sim.mover(mover).unwrap().cell(), GridCoordinate::new(3, 4));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{MotionPhase, MoverId};
use crate::config::MovementConfig;
use crate::controller::{MotionEvent, MoveRequest, Mover};
use crate::error::{Result, WalkError};
use crate::grid::{GridCoordinate, GridQuery, TileGrid};
use crate::math::Vec2Fixed;

/// Storage for all movers in the simulation.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys when ticking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverRegistry {
    movers: HashMap<MoverId, Mover>,
    next_id: MoverId,
}

impl MoverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            movers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a mover and return its assigned id.
    pub fn insert(&mut self, mut mover: Mover) -> MoverId {
        let id = self.next_id;
        self.next_id += 1;
        mover.set_id(id);
        self.movers.insert(id, mover);
        id
    }

    /// Remove a mover by id.
    pub fn remove(&mut self, id: MoverId) -> Option<Mover> {
        self.movers.remove(&id)
    }

    /// Get a mover by id.
    #[must_use]
    pub fn get(&self, id: MoverId) -> Option<&Mover> {
        self.movers.get(&id)
    }

    /// Get a mutable reference to a mover by id.
    pub fn get_mut(&mut self, id: MoverId) -> Option<&mut Mover> {
        self.movers.get_mut(&id)
    }

    /// Number of movers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.movers.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movers.is_empty()
    }

    /// Sorted ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<MoverId> {
        let mut ids: Vec<_> = self.movers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Movers in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Mover> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.movers.get(&id))
    }

}

impl Default for MoverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A motion event tagged with the mover it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoverEvent {
    /// The mover.
    pub mover: MoverId,
    /// What happened.
    #[serde(flatten)]
    pub event: MotionEvent,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number after the advance.
    pub tick: u64,
    /// Events in mover-id order, then in the order they happened.
    pub events: Vec<MoverEvent>,
}

/// The movement simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    tick: u64,
    grid: TileGrid,
    config: MovementConfig,
    movers: MoverRegistry,
}

impl Simulation {
    /// Create a simulation over `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::InvalidConfig`] if `config` fails validation.
    pub fn new(grid: TileGrid, config: MovementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tick: 0,
            grid,
            config,
            movers: MoverRegistry::new(),
        })
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The classification grid.
    #[must_use]
    pub const fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Mutable access to the grid (terrain edits between ticks).
    pub fn grid_mut(&mut self) -> &mut TileGrid {
        &mut self.grid
    }

    /// Movement config.
    #[must_use]
    pub const fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Mover registry.
    #[must_use]
    pub const fn movers(&self) -> &MoverRegistry {
        &self.movers
    }

    /// Get a mover by id.
    #[must_use]
    pub fn mover(&self, id: MoverId) -> Option<&Mover> {
        self.movers.get(id)
    }

    /// True when no mover has an active request.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.movers.iter_sorted().all(Mover::is_idle)
    }

    /// Spawn an idle mover on `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::BlockedSpawn`] if `cell` is impassable or
    /// outside the grid.
    pub fn spawn_mover(&mut self, cell: GridCoordinate) -> Result<MoverId> {
        let class = self.grid.classify(cell);
        if !class.is_passable() {
            tracing::warn!(%cell, %class, "Rejected spawn cell");
            return Err(WalkError::BlockedSpawn { cell, class });
        }
        let id = self.movers.insert(Mover::new(0, cell));
        tracing::debug!(mover = id, %cell, "Spawned mover");
        Ok(id)
    }

    /// Remove a mover.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::MoverNotFound`] if the mover doesn't exist.
    pub fn despawn_mover(&mut self, id: MoverId) -> Result<()> {
        self.movers
            .remove(id)
            .map(|_| ())
            .ok_or(WalkError::MoverNotFound(id))
    }

    /// Send a mover toward a world position (snapped to the nearest cell).
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::MoverNotFound`] for unknown ids and
    /// [`WalkError::TargetUnreachable`] for impassable targets.
    pub fn command_move(&mut self, id: MoverId, target: Vec2Fixed) -> Result<MoveRequest> {
        let mover = self
            .movers
            .get_mut(id)
            .ok_or(WalkError::MoverNotFound(id))?;
        mover.request_move(&self.grid, GridCoordinate::from_world(target))
    }

    /// Cancel a mover's active request.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::MoverNotFound`] if the mover doesn't exist.
    pub fn command_stop(&mut self, id: MoverId) -> Result<()> {
        self.movers
            .get_mut(id)
            .ok_or(WalkError::MoverNotFound(id))?
            .stop();
        Ok(())
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        let mut scratch = Vec::new();

        for id in self.movers.sorted_ids() {
            let Some(mover) = self.movers.get_mut(id) else {
                continue;
            };
            mover.tick(&self.grid, &self.config, &mut scratch);
            events.events.extend(
                scratch
                    .drain(..)
                    .map(|event| MoverEvent { mover: id, event }),
            );
        }

        self.tick += 1;
        events.tick = self.tick;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Hash of the tick counter and every mover's state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.movers.sorted_ids();
        ids.len().hash(&mut hasher);

        for mover in self.movers.iter_sorted() {
            mover.id().hash(&mut hasher);
            mover.cell().hash(&mut hasher);
            mover.position().x.to_bits().hash(&mut hasher);
            mover.position().y.to_bits().hash(&mut hasher);

            let motion = mover.motion();
            motion.phase.name().hash(&mut hasher);
            match &motion.phase {
                MotionPhase::Interpolating(step) => {
                    step.to.hash(&mut hasher);
                    step.elapsed.hash(&mut hasher);
                }
                MotionPhase::Rerouting(search) => search.next_radius().hash(&mut hasher),
                _ => {}
            }
            motion.target.hash(&mut hasher);
            for step in &motion.pending {
                step.hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the simulation state for replay or snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| WalkError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore simulation state from [`snapshot`](Self::snapshot) bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn restore(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            WalkError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}
