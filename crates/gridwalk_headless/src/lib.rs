//! Headless movement runner for scripted testing and CI verification.
//!
//! This crate drives a [`gridwalk_core::simulation::Simulation`] without any
//! graphics. It can be controlled via JSON commands on stdin with state on
//! stdout, or it can play a RON scenario file to completion:
//!
//! - **Scripted testing**: A controller spawns movers and issues moves
//! - **CI verification**: Scenario runs report final state hashes
//! - **Debugging**: ASCII rendering of terrain, queued steps and movers
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, spawn, move, etc.)
//! - **stdout**: Responses and state (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the command and response formats.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p gridwalk_headless
//!
//! # Run a scenario
//! cargo run -p gridwalk_headless -- run --scenario crates/gridwalk_headless/scenarios/pond_detour.ron --render
//!
//! # Check a scenario file
//! cargo run -p gridwalk_headless -- validate crates/gridwalk_headless/scenarios/pond_detour.ron
//! ```

pub mod ascii_visualizer;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use ascii_visualizer::{render_ascii, render_rows, AsciiConfig};
pub use protocol::{Command, Response};
pub use runner::{run_scenario, HeadlessConfig, HeadlessRunner, ScenarioReport};
pub use scenario::{GridSource, Scenario, ScenarioError, ScheduledMove};
