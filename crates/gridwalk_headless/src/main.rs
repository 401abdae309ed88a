//! Headless movement runner.
//!
//! This binary runs the movement simulation without graphics, controlled via
//! JSON on stdin/stdout or by a scenario file.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p gridwalk_headless
//!
//! # Play a scenario and print the report
//! cargo run -p gridwalk_headless -- run --scenario pond_detour.ron --render
//!
//! # Check a scenario file without running it
//! cargo run -p gridwalk_headless -- validate pond_detour.ron
//!
//! # Play a scenario several times and compare final hashes
//! cargo run -p gridwalk_headless -- verify --scenario pond_detour.ron --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information, filtered by `RUST_LOG`
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gridwalk_headless::{
    ascii_visualizer::{render_ascii, AsciiConfig},
    runner::{run_scenario, HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "gridwalk_headless")]
#[command(about = "Headless grid movement runner for scripted testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario's move schedule and print a JSON report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override the scenario's tick limit
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Print the final grid as ASCII art to stderr
        #[arg(long)]
        render: bool,

        /// Disable colored ASCII output
        #[arg(long)]
        no_color: bool,
    },

    /// Check that a scenario file parses and builds
    Validate {
        /// Scenario file to check
        file: PathBuf,
    },

    /// Play a scenario several times and compare final state hashes
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Serve the JSON protocol on stdin/stdout (the default)
    Interactive {
        /// Start from a scenario's grid, config and movers
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            ticks,
            render,
            no_color,
        }) => {
            cmd_run(&scenario, ticks, render, no_color);
        }
        Some(Commands::Validate { file }) => {
            cmd_validate(&file);
        }
        Some(Commands::Verify { scenario, runs }) => {
            cmd_verify(&scenario, runs);
        }
        Some(Commands::Interactive {
            scenario,
            auto_state,
        }) => {
            cmd_interactive(scenario, auto_state);
        }
        None => {
            // Default: interactive mode
            cmd_interactive(None, false);
        }
    }
}

fn load_or_exit(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

/// Play a scenario and print its report
fn cmd_run(path: &Path, ticks: Option<u64>, render: bool, no_color: bool) {
    let scenario = load_or_exit(path);

    let (sim, report) = match run_scenario(&scenario, ticks, |_| {}) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to run scenario: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize report: {}", e);
            std::process::exit(1);
        }
    }

    if render {
        let config = AsciiConfig {
            use_color: !no_color,
            ..Default::default()
        };
        eprint!("{}", render_ascii(&sim, &config));
    }

    eprintln!(
        "{}: {} ticks, {} arrived, {} failed, hash {:016x}",
        report.name,
        report.ticks,
        report.count_events("arrived"),
        report.count_events("move_failed"),
        report.hash
    );
}

/// Check a scenario file
fn cmd_validate(path: &Path) {
    let scenario = load_or_exit(path);

    match scenario.validate() {
        Ok(()) => {
            eprintln!(
                "OK: {} ({} movers, {} scheduled moves)",
                scenario.name,
                scenario.movers.len(),
                scenario.moves.len()
            );
        }
        Err(e) => {
            eprintln!("INVALID: {}", e);
            std::process::exit(1);
        }
    }
}

/// Verify determinism
fn cmd_verify(path: &Path, runs: u32) {
    let scenario = load_or_exit(path);
    tracing::info!("Verifying determinism: {} ({} runs)", scenario.name, runs);

    let mut hashes = Vec::with_capacity(runs as usize);
    for _ in 0..runs {
        match run_scenario(&scenario, None, |_| {}) {
            Ok((_, report)) => hashes.push(report.hash),
            Err(e) => {
                eprintln!("FAIL: Error during verification: {}", e);
                std::process::exit(1);
            }
        }
    }

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        eprintln!("PASS: All {} runs produced identical results", runs);
        if let Some(hash) = hashes.first() {
            eprintln!("  Hash: {:016x}", hash);
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        eprintln!("  Hashes: {:x?}", hashes);
        std::process::exit(1);
    }
}

/// Serve the JSON protocol on stdin/stdout
fn cmd_interactive(scenario: Option<PathBuf>, auto_state: bool) {
    tracing::info!("Starting interactive session");

    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let scenario = scenario.map_or_else(
        || Scenario {
            movers: Vec::new(),
            moves: Vec::new(),
            ..Scenario::default()
        },
        |path| load_or_exit(&path),
    );

    let mut runner = match HeadlessRunner::from_scenario(&scenario, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to build scenario: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runner.run_stdio() {
        tracing::error!(error = %e, "Protocol session failed");
        std::process::exit(1);
    }
}
