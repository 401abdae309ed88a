//! Error types for the movement core.

use thiserror::Error;

use crate::grid::{CellClass, GridCoordinate};

/// Result type alias using [`WalkError`].
pub type Result<T> = std::result::Result<T, WalkError>;

/// Top-level error type for the movement core.
///
/// None of these are fatal: callers degrade the affected mover to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    /// The reroute search exhausted its radius without finding a clear line.
    #[error("No path found from {from} to {target}")]
    NoPathFound {
        /// Cell the mover was standing on when the search started.
        from: GridCoordinate,
        /// Final target of the cancelled move.
        target: GridCoordinate,
    },

    /// The requested target is impassable or outside the grid.
    #[error("Target {target} is unreachable ({class})")]
    TargetUnreachable {
        /// Requested target cell.
        target: GridCoordinate,
        /// Classification reported for the target.
        class: CellClass,
    },

    /// A mover can only be placed on a passable cell inside the grid.
    #[error("Cannot spawn a mover at {cell} ({class})")]
    BlockedSpawn {
        /// Requested spawn cell.
        cell: GridCoordinate,
        /// Classification reported for the cell.
        class: CellClass,
    },

    /// Invalid mover reference.
    #[error("Mover not found: {0}")]
    MoverNotFound(u64),

    /// Movement configuration failed validation.
    #[error("Invalid movement config: {0}")]
    InvalidConfig(String),

    /// Invalid simulation state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalkError::NoPathFound {
            from: GridCoordinate::new(1, 0),
            target: GridCoordinate::new(4, 0),
        };
        assert_eq!(err.to_string(), "No path found from (1, 0) to (4, 0)");

        let err = WalkError::TargetUnreachable {
            target: GridCoordinate::new(2, 0),
            class: CellClass::Water,
        };
        assert_eq!(err.to_string(), "Target (2, 0) is unreachable (water)");

        let err = WalkError::BlockedSpawn {
            cell: GridCoordinate::new(-3, 20),
            class: CellClass::None,
        };
        assert_eq!(err.to_string(), "Cannot spawn a mover at (-3, 20) (none)");
    }
}
