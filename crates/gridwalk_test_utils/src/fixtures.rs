//! Test fixtures and helpers.
//!
//! Pre-built grids, configs and simulations for consistent testing.

use fixed::types::I32F32;
use serde::Deserialize;

use gridwalk_core::components::MoverId;
use gridwalk_core::config::{MovementConfig, StepPacing};
use gridwalk_core::grid::{CellClass, GridCoordinate, GridParseError, TileGrid};
use gridwalk_core::simulation::{MoverEvent, Simulation};

/// Create the fixed-point ratio `num / den`.
///
/// # Panics
///
/// Panics if `den` is zero.
#[must_use]
pub fn fixed_ratio(num: i32, den: i32) -> I32F32 {
    I32F32::from_num(num) / I32F32::from_num(den)
}

/// Shorthand for [`GridCoordinate::new`].
#[must_use]
pub const fn cell(x: i32, y: i32) -> GridCoordinate {
    GridCoordinate::new(x, y)
}

/// An all-grass grid.
#[must_use]
pub fn open_field(width: u32, height: u32) -> TileGrid {
    TileGrid::filled(width, height, CellClass::Grass)
}

/// An all-grass grid with water on each of `water`.
#[must_use]
pub fn field_with_water(width: u32, height: u32, water: &[GridCoordinate]) -> TileGrid {
    let mut grid = open_field(width, height);
    for &coord in water {
        grid.set_cell(coord, CellClass::Water);
    }
    grid
}

/// An all-grass grid with a water wall down column `x`, open only at row `gap_y`.
#[must_use]
pub fn walled_field(width: u32, height: u32, x: i32, gap_y: i32) -> TileGrid {
    let mut grid = open_field(width, height);
    for y in 0..height as i32 {
        if y != gap_y {
            grid.set_cell(cell(x, y), CellClass::Water);
        }
    }
    grid
}

/// One tick per step and no rest delay, so tick counts equal step counts.
#[must_use]
pub fn quick_config() -> MovementConfig {
    MovementConfig {
        pacing: StepPacing::FixedDuration(I32F32::ONE),
        step_delay: I32F32::ZERO,
        tick_rate: 1,
        ..Default::default()
    }
}

/// A simulation over `grid` with one mover spawned on `start`.
///
/// # Panics
///
/// Panics if `config` is invalid or `start` is not a passable cell.
#[must_use]
pub fn sim_with_mover(
    grid: TileGrid,
    config: MovementConfig,
    start: GridCoordinate,
) -> (Simulation, MoverId) {
    let mut sim = Simulation::new(grid, config).expect("fixture config must be valid");
    let mover = sim
        .spawn_mover(start)
        .expect("fixture start must be passable");
    (sim, mover)
}

/// Tick until every mover is idle or `max_ticks` have passed.
///
/// Returns every event emitted along the way.
pub fn run_until_settled(sim: &mut Simulation, max_ticks: u64) -> Vec<MoverEvent> {
    let mut events = Vec::new();
    for _ in 0..max_ticks {
        events.extend(sim.tick().events);
        if sim.is_settled() {
            break;
        }
    }
    events
}

/// A walking scenario described in RON.
///
/// ```ron
/// PathFixture(
///     name: "pond",
///     rows: [
///         ".....",
///         "..~..",
///         ".....",
///     ],
///     start: (0, 1),
///     target: (4, 1),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PathFixture {
    /// Fixture name for assertion messages.
    pub name: String,
    /// ASCII rows, top row first.
    pub rows: Vec<String>,
    /// Spawn cell.
    pub start: (i32, i32),
    /// Move target.
    pub target: (i32, i32),
}

impl PathFixture {
    /// Parse a fixture from RON.
    ///
    /// # Errors
    ///
    /// Returns the RON error if the text doesn't describe a fixture.
    pub fn from_ron_str(ron: &str) -> Result<Self, ron::error::SpannedError> {
        let fixture: Self = ron::from_str(ron)?;
        tracing::debug!(name = %fixture.name, rows = fixture.rows.len(), "Loaded path fixture");
        Ok(fixture)
    }

    /// Build the fixture's grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridParseError`] if the rows are malformed.
    pub fn grid(&self) -> Result<TileGrid, GridParseError> {
        TileGrid::from_ascii(&self.rows)
    }

    /// Spawn cell as a coordinate.
    #[must_use]
    pub fn start(&self) -> GridCoordinate {
        self.start.into()
    }

    /// Target cell as a coordinate.
    #[must_use]
    pub fn target(&self) -> GridCoordinate {
        self.target.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ratio() {
        assert_eq!(fixed_ratio(1, 4), I32F32::from_num(0.25));
        assert_eq!(fixed_ratio(6, 1), I32F32::from_num(6));
    }

    #[test]
    fn test_walled_field_leaves_gap() {
        let grid = walled_field(6, 6, 3, 2);
        assert_eq!(grid.lookup(cell(3, 2)), Ok(CellClass::Grass));
        assert_eq!(grid.lookup(cell(3, 0)), Ok(CellClass::Water));
        assert_eq!(grid.lookup(cell(3, 5)), Ok(CellClass::Water));
    }

    #[test]
    fn test_path_fixture_from_ron() {
        let fixture = PathFixture::from_ron_str(
            r#"PathFixture(
                name: "pond",
                rows: [".....", "..~..", "....."],
                start: (0, 1),
                target: (4, 1),
            )"#,
        )
        .unwrap();

        let grid = fixture.grid().unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.lookup(cell(2, 1)), Ok(CellClass::Water));
        assert_eq!(fixture.start(), cell(0, 1));
        assert_eq!(fixture.target(), cell(4, 1));
    }

    #[test]
    fn test_quick_config_is_one_tick_per_step() {
        let config = quick_config();
        assert_eq!(config.step_ticks(cell(0, 0), cell(1, 0)), 1);
        assert_eq!(config.delay_ticks(), 0);
    }

    #[test]
    fn test_run_until_settled_walks_to_target() {
        let (mut sim, mover) = sim_with_mover(open_field(8, 8), quick_config(), cell(0, 0));
        sim.command_move(mover, cell(3, 2).to_world()).unwrap();

        let events = run_until_settled(&mut sim, 100);
        assert!(sim.is_settled());
        assert_eq!(sim.mover(mover).unwrap().cell(), cell(3, 2));
        assert!(!events.is_empty());
    }
}
