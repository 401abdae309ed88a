//! # Gridwalk Core
//!
//! Deterministic grid movement core.
//!
//! An agent on an integer grid walks toward a clicked point one cell at a
//! time, avoiding impassable cells:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`grid`] - Coordinates, cell classes and the [`grid::GridQuery`] boundary
//! - [`line`] - Orthogonal Bresenham line planning
//! - [`resolver`] - Bounded local detour search
//! - [`controller`] - Per-mover movement state machine
//! - [`simulation`] - Mover registry and fixed-rate tick loop
//! - [`config`] - Movement tuning loaded from RON
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod controller;
pub mod error;
pub mod grid;
pub mod line;
pub mod math;
pub mod resolver;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{MotionPhase, MotionState, MoverId, StepMotion, StepQueue};
    pub use crate::config::{MovementConfig, StepPacing};
    pub use crate::controller::{MotionEvent, MoveRequest, Mover};
    pub use crate::error::{Result, WalkError};
    pub use crate::grid::{CellClass, Direction, GridCoordinate, GridQuery, LookupMiss, TileGrid};
    pub use crate::line::{first_obstruction, is_line_clear, plan_line};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::resolver::{resolve, RerouteSearch, SearchStep};
    pub use crate::simulation::{MoverEvent, MoverRegistry, Simulation, TickEvents};
}
