//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Movement must be fully deterministic so recorded command streams replay
//! identically. Sources of non-determinism include:
//!
//! - **Floating-point math**: Interpolation uses fixed-point arithmetic via
//!   [`gridwalk_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Movers are always ticked in sorted id order.
//!
//! - **Wall-clock time**: Durations are converted to whole ticks up front.

use std::thread;

use gridwalk_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(runs, ticks, "Determinism check produced differing hashes");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from the same setup and compare final hashes.
///
/// # Example
///
/// ```
/// use gridwalk_core::grid::{CellClass, GridCoordinate, TileGrid};
/// use gridwalk_core::simulation::Simulation;
/// use gridwalk_test_utils::determinism::verify_simulation_determinism;
///
/// let is_deterministic = verify_simulation_determinism(
///     || {
///         let grid = TileGrid::filled(8, 8, CellClass::Grass);
///         let mut sim = Simulation::new(grid, Default::default()).unwrap();
///         let mover = sim.spawn_mover(GridCoordinate::new(0, 0)).unwrap();
///         sim.command_move(mover, GridCoordinate::new(5, 3).to_world()).unwrap();
///         sim
///     },
///     100,
/// );
/// assert!(is_deterministic);
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run `num_sims` simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> Vec<u64>
where
    F: Fn() -> Simulation + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    })
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let events1 = sim1.tick();
        let events2 = sim2.tick();

        if events1 != events2 || sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Check that a snapshot taken after `split` ticks resumes identically.
///
/// Runs one simulation straight through `split + rest` ticks and another
/// that is snapshotted and restored at `split`, then compares hashes.
pub fn verify_snapshot_determinism<F>(setup_fn: F, split: u64, rest: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut straight = setup_fn();
    let mut resumed = setup_fn();

    for _ in 0..split {
        straight.tick();
        resumed.tick();
    }

    let Ok(bytes) = resumed.snapshot() else {
        return false;
    };
    let Ok(mut resumed) = Simulation::restore(&bytes) else {
        return false;
    };

    for _ in 0..rest {
        straight.tick();
        resumed.tick();
    }

    straight.state_hash() == resumed.state_hash()
}

/// Proptest strategies for grids, coordinates and movement configs.
pub mod strategies {
    use proptest::prelude::*;

    use gridwalk_core::config::{MovementConfig, StepPacing};
    use gridwalk_core::grid::{CellClass, GridCoordinate, TileGrid};

    use crate::fixtures::fixed_ratio;

    /// A coordinate with both components in `-bound..=bound`.
    pub fn arb_coordinate(bound: i32) -> impl Strategy<Value = GridCoordinate> {
        (-bound..=bound, -bound..=bound).prop_map(|(x, y)| GridCoordinate::new(x, y))
    }

    /// A coordinate inside a `width` x `height` grid.
    pub fn arb_cell_in(width: u32, height: u32) -> impl Strategy<Value = GridCoordinate> {
        (0..width as i32, 0..height as i32).prop_map(|(x, y)| GridCoordinate::new(x, y))
    }

    /// A grass grid with roughly `water_percent`% of cells turned to water.
    pub fn arb_grid(width: u32, height: u32, water_percent: u32) -> impl Strategy<Value = TileGrid> {
        let len = (width as usize) * (height as usize);
        proptest::collection::vec(0..100u32, len).prop_map(move |rolls| {
            let mut grid = TileGrid::filled(width, height, CellClass::Grass);
            for (i, roll) in rolls.into_iter().enumerate() {
                if roll < water_percent {
                    let x = (i % width as usize) as i32;
                    let y = (i / width as usize) as i32;
                    grid.set_cell(GridCoordinate::new(x, y), CellClass::Water);
                }
            }
            grid
        })
    }

    /// A valid movement config with small integer timings.
    pub fn arb_config() -> impl Strategy<Value = MovementConfig> {
        (1..8i32, 0..4i32, 1..6u32, prop::bool::ANY).prop_map(
            |(speed, delay_tenths, radius, fixed_duration)| MovementConfig {
                pacing: if fixed_duration {
                    StepPacing::FixedDuration(fixed_ratio(1, speed))
                } else {
                    StepPacing::Speed(fixed_ratio(speed, 1))
                },
                step_delay: fixed_ratio(delay_tenths, 10),
                reroute_radius: radius,
                tick_rate: 20,
            },
        )
    }
}
