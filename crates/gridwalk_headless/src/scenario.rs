//! Scenario loading and configuration.
//!
//! Scenarios define the grid, the movement tuning, the starting movers and a
//! schedule of move commands for headless runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridwalk_core::components::MoverId;
use gridwalk_core::config::MovementConfig;
use gridwalk_core::error::WalkError;
use gridwalk_core::grid::{CellClass, GridCoordinate, GridParseError, TileGrid};
use gridwalk_core::math::Vec2Fixed;
use gridwalk_core::simulation::Simulation;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The grid description is malformed.
    #[error("Invalid grid: {0}")]
    InvalidGrid(#[from] GridParseError),
    /// Config or placement rejected by the simulation.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] WalkError),
    /// A scheduled move names a mover that isn't in the scenario.
    #[error("Scheduled move at tick {tick} refers to mover #{index}, but only {count} are defined")]
    UnknownMover {
        /// Tick of the offending move.
        tick: u64,
        /// Index into the mover list.
        index: usize,
        /// Number of movers defined.
        count: usize,
    },
}

/// Where the scenario's grid comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridSource {
    /// The farmland field: grass/dirt rows, a water channel and a pond.
    Farmland { width: u32, height: u32 },
    /// Every cell the same class.
    Filled {
        width: u32,
        height: u32,
        class: CellClass,
    },
    /// ASCII rows, top row first.
    Ascii(Vec<String>),
}

impl Default for GridSource {
    fn default() -> Self {
        Self::Farmland {
            width: 128,
            height: 128,
        }
    }
}

impl GridSource {
    /// Build the tile grid.
    pub fn build(&self) -> Result<TileGrid, ScenarioError> {
        match self {
            Self::Farmland { width, height } => {
                check_dimensions(*width, *height)?;
                Ok(TileGrid::farmland(*width, *height))
            }
            Self::Filled {
                width,
                height,
                class,
            } => {
                check_dimensions(*width, *height)?;
                Ok(TileGrid::filled(*width, *height, *class))
            }
            Self::Ascii(rows) => Ok(TileGrid::from_ascii(rows)?),
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), ScenarioError> {
    if width == 0 || height == 0 {
        return Err(ScenarioError::InvalidGrid(GridParseError::Empty));
    }
    Ok(())
}

/// A move command issued once the simulation reaches `at_tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMove {
    /// Tick at which the command is issued (before that tick advances).
    pub at_tick: u64,
    /// Index into [`Scenario::movers`].
    pub mover: usize,
    /// World target, written as decimal strings: `("8", "2.5")`.
    /// Snapped to the nearest cell when issued.
    #[serde(with = "world_point")]
    pub target: Vec2Fixed,
}

impl ScheduledMove {
    /// A move toward the centre of `cell`.
    #[must_use]
    pub fn to_cell(at_tick: u64, mover: usize, cell: (i32, i32)) -> Self {
        Self {
            at_tick,
            mover,
            target: Vec2Fixed::from_ints(cell.0, cell.1),
        }
    }
}

/// World positions in scenario files, as a pair of decimal strings.
mod world_point {
    use gridwalk_core::math::{fixed_decimal, Fixed, Vec2Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Point(
        #[serde(with = "fixed_decimal")] Fixed,
        #[serde(with = "fixed_decimal")] Fixed,
    );

    pub fn serialize<S>(value: &Vec2Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Point(value.x, value.y).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Point(x, y) = Point::deserialize(deserializer)?;
        Ok(Vec2Fixed::new(x, y))
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Grid to walk on.
    pub grid: GridSource,
    /// Movement tuning.
    pub config: MovementConfig,
    /// Spawn cells, one mover each.
    pub movers: Vec<(i32, i32)>,
    /// Move commands, issued in tick order.
    pub moves: Vec<ScheduledMove>,
    /// Tick limit for `run`.
    pub max_ticks: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Farmland Walk".to_string(),
            description: "One mover walking around the farmland pond".to_string(),
            grid: GridSource::default(),
            config: MovementConfig::default(),
            movers: vec![(15, 17)],
            moves: vec![ScheduledMove::to_cell(0, 0, (15, 23))],
            max_ticks: 2_000,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        tracing::info!(name = %scenario.name, path = %path.display(), "Loaded scenario");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Check the scenario without running it.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.build().map(|_| ())
    }

    /// Build the simulation and spawn the scenario's movers.
    ///
    /// Returns the simulation and the ids of the spawned movers, in the
    /// order they are listed.
    pub fn build(&self) -> Result<(Simulation, Vec<MoverId>), ScenarioError> {
        let grid = self.grid.build()?;
        let mut sim = Simulation::new(grid, self.config.clone())?;

        for scheduled in &self.moves {
            if scheduled.mover >= self.movers.len() {
                return Err(ScenarioError::UnknownMover {
                    tick: scheduled.at_tick,
                    index: scheduled.mover,
                    count: self.movers.len(),
                });
            }
        }

        let ids = self
            .movers
            .iter()
            .map(|&start| sim.spawn_mover(GridCoordinate::from(start)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((sim, ids))
    }

    /// Moves scheduled for `tick`, in file order.
    pub fn moves_at(&self, tick: u64) -> impl Iterator<Item = &ScheduledMove> {
        self.moves.iter().filter(move |m| m.at_tick == tick)
    }
}
