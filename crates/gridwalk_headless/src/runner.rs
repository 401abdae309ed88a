//! Headless runner implementation.
//!
//! [`HeadlessRunner`] owns a [`Simulation`] and answers protocol commands.
//! [`run_scenario`] plays a scenario's schedule to completion.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use gridwalk_core::grid::GridCoordinate;
use gridwalk_core::math::{Fixed, Vec2Fixed};
use gridwalk_core::simulation::{MoverEvent, Simulation};

use crate::ascii_visualizer::{render_rows, AsciiConfig};
use crate::protocol::{Command, MoverState, Response};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every `tick` command (vs only on query).
    pub auto_state_output: bool,
}

/// Protocol-driven runner for one simulation.
pub struct HeadlessRunner {
    sim: Simulation,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a runner around an existing simulation.
    pub fn new(sim: Simulation) -> Self {
        Self::with_config(sim, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(sim: Simulation, config: HeadlessConfig) -> Self {
        Self { sim, config }
    }

    /// Create a runner from a scenario's grid, config and movers.
    ///
    /// The scenario's move schedule is not applied; the controller drives
    /// the session.
    pub fn from_scenario(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, ScenarioError> {
        let (sim, _) = scenario.build()?;
        Ok(Self::with_config(sim, config))
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Handle one command and return the responses to send.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let cmd_name = cmd.name();

        match cmd {
            Command::Tick { count } => {
                let mut events = Vec::new();
                for _ in 0..count {
                    events.extend(self.sim.tick().events);
                }
                let mut responses = vec![Response::Events {
                    tick: self.sim.get_tick(),
                    events,
                }];
                if self.config.auto_state_output {
                    responses.push(self.state());
                }
                responses
            }

            Command::Query => vec![self.state()],

            Command::Spawn { x, y } => match self.sim.spawn_mover(GridCoordinate::new(x, y)) {
                Ok(mover_id) => vec![Response::Spawned { mover_id, x, y }],
                Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
            },

            Command::Move { mover_id, x, y } => {
                let Some(target) = world_position(x, y) else {
                    return vec![Response::error(
                        format!("Target ({x}, {y}) is not a representable position"),
                        Some(cmd_name),
                    )];
                };
                match self.sim.command_move(mover_id, target) {
                    Ok(result) => vec![Response::Ack {
                        cmd: cmd_name.to_string(),
                        result: Some(result),
                    }],
                    Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
                }
            }

            Command::Stop { mover_id } => match self.sim.command_stop(mover_id) {
                Ok(()) => vec![Response::ack(cmd_name)],
                Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
            },

            Command::Despawn { mover_id } => match self.sim.despawn_mover(mover_id) {
                Ok(()) => vec![Response::ack(cmd_name)],
                Err(e) => vec![Response::error(e.to_string(), Some(cmd_name))],
            },

            Command::Hash => vec![Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            }],

            Command::Render => vec![Response::Render {
                tick: self.sim.get_tick(),
                rows: render_rows(&self.sim, &AsciiConfig::default()),
            }],

            Command::Quit => vec![Response::Bye],
        }
    }

    /// Run the protocol loop until `quit` or end of input.
    ///
    /// Reads JSON commands from `input`, writes responses to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write!(output, "{}", Response::ready(self.sim.get_tick()).to_json_line())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => {
                    tracing::debug!(cmd = cmd.name(), "Received command");
                    self.handle(cmd)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse command");
                    vec![Response::error(format!("Parse error: {e}"), None)]
                }
            };

            let quit = responses.iter().any(|r| matches!(r, Response::Bye));
            for response in &responses {
                write!(output, "{}", response.to_json_line())?;
            }
            output.flush()?;

            if quit {
                tracing::info!("Session ended by quit command");
                return Ok(());
            }
        }

        tracing::info!("Input closed, ending session");
        Ok(())
    }

    /// Run the protocol loop on stdin/stdout.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    fn state(&self) -> Response {
        Response::State {
            tick: self.sim.get_tick(),
            movers: self
                .sim
                .movers()
                .iter_sorted()
                .map(MoverState::from)
                .collect(),
            hash: self.sim.state_hash(),
        }
    }
}

/// Convert protocol coordinates to a fixed-point world position.
fn world_position(x: f64, y: f64) -> Option<Vec2Fixed> {
    Some(Vec2Fixed::new(
        Fixed::checked_from_num(x)?,
        Fixed::checked_from_num(y)?,
    ))
}

/// Outcome of [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// True if every mover was idle with no moves left to issue.
    pub settled: bool,
    /// Scheduled moves the simulation refused.
    pub rejected_moves: usize,
    /// Every event, in order.
    pub events: Vec<MoverEvent>,
    /// Final mover states.
    pub movers: Vec<MoverState>,
    /// Final state hash.
    pub hash: u64,
}

impl ScenarioReport {
    /// Count of events matching `kind` (e.g. `"arrived"`).
    pub fn count_events(&self, kind: &str) -> usize {
        self.events
            .iter()
            .filter(|e| {
                serde_json::to_value(&e.event)
                    .ok()
                    .and_then(|v| v.get("kind").and_then(|k| k.as_str()).map(|k| k == kind))
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Play a scenario's move schedule.
///
/// Stops after `max_ticks` (or the scenario's own limit), or as soon as all
/// movers are idle and no scheduled moves remain. `on_tick` sees the
/// simulation after every tick.
pub fn run_scenario<F>(
    scenario: &Scenario,
    max_ticks: Option<u64>,
    mut on_tick: F,
) -> Result<(Simulation, ScenarioReport), ScenarioError>
where
    F: FnMut(&Simulation),
{
    let (mut sim, ids) = scenario.build()?;
    let limit = max_ticks.unwrap_or(scenario.max_ticks);
    let last_scheduled = scenario.moves.iter().map(|m| m.at_tick).max();

    tracing::info!(
        name = %scenario.name,
        movers = ids.len(),
        moves = scenario.moves.len(),
        limit,
        "Running scenario"
    );

    let mut events = Vec::new();
    let mut rejected_moves = 0;

    while sim.get_tick() < limit {
        for scheduled in scenario.moves_at(sim.get_tick()) {
            let id = ids[scheduled.mover];
            if let Err(e) = sim.command_move(id, scheduled.target) {
                tracing::warn!(mover = id, error = %e, "Scheduled move rejected");
                rejected_moves += 1;
            }
        }

        events.extend(sim.tick().events);
        on_tick(&sim);

        let schedule_done = last_scheduled.map_or(true, |t| sim.get_tick() > t);
        if schedule_done && sim.is_settled() {
            break;
        }
    }

    let settled = sim.is_settled() && last_scheduled.map_or(true, |t| sim.get_tick() > t);
    if !settled {
        tracing::warn!(ticks = sim.get_tick(), "Scenario hit its tick limit before settling");
    }

    let report = ScenarioReport {
        name: scenario.name.clone(),
        ticks: sim.get_tick(),
        settled,
        rejected_moves,
        events,
        movers: sim.movers().iter_sorted().map(MoverState::from).collect(),
        hash: sim.state_hash(),
    };
    Ok((sim, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{GridSource, ScheduledMove};
    use gridwalk_core::config::{MovementConfig, StepPacing};
    use gridwalk_core::controller::{MotionEvent, MoveRequest};
    use gridwalk_core::grid::{CellClass, TileGrid};

    fn quick() -> MovementConfig {
        MovementConfig {
            pacing: StepPacing::FixedDuration(Fixed::ONE),
            step_delay: Fixed::ZERO,
            tick_rate: 1,
            ..Default::default()
        }
    }

    fn runner() -> HeadlessRunner {
        let grid = TileGrid::filled(8, 4, CellClass::Grass);
        HeadlessRunner::new(Simulation::new(grid, quick()).unwrap())
    }

    fn lines(output: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_spawn_move_tick() {
        let mut runner = runner();

        assert_eq!(
            runner.handle(Command::Spawn { x: 0, y: 0 }),
            vec![Response::Spawned {
                mover_id: 1,
                x: 0,
                y: 0
            }]
        );
        assert_eq!(
            runner.handle(Command::Move {
                mover_id: 1,
                x: 3.0,
                y: 0.2
            }),
            vec![Response::Ack {
                cmd: "move".into(),
                result: Some(MoveRequest::Accepted)
            }]
        );

        let responses = runner.handle(Command::Tick { count: 10 });
        let Response::Events { tick, events } = &responses[0] else {
            panic!("expected events, got {responses:?}");
        };
        assert_eq!(*tick, 10);
        assert!(events
            .iter()
            .any(|e| e.event == MotionEvent::Arrived { at: GridCoordinate::new(3, 0) }));
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn test_errors_are_reported() {
        let mut runner = runner();
        let responses = runner.handle(Command::Move {
            mover_id: 42,
            x: 1.0,
            y: 1.0,
        });
        assert!(matches!(
            &responses[0],
            Response::Error { message, cmd: Some(cmd) } if message.contains("42") && cmd == "move"
        ));

        runner.handle(Command::Spawn { x: 0, y: 0 });
        let responses = runner.handle(Command::Move {
            mover_id: 1,
            x: f64::NAN,
            y: 0.0,
        });
        assert!(matches!(&responses[0], Response::Error { .. }));

        let responses = runner.handle(Command::Move {
            mover_id: 1,
            x: 20.0,
            y: 0.0,
        });
        assert!(matches!(
            &responses[0],
            Response::Error { message, .. } if message.contains("unreachable")
        ));

        for (x, y) in [(-1_100_000_000, 0), (3, 9)] {
            let responses = runner.handle(Command::Spawn { x, y });
            assert!(matches!(
                &responses[0],
                Response::Error { message, cmd: Some(cmd) }
                    if message.contains("Cannot spawn") && cmd == "spawn"
            ));
        }
        assert_eq!(runner.simulation().movers().len(), 1);
    }

    #[test]
    fn test_auto_state_output() {
        let grid = TileGrid::filled(4, 4, CellClass::Grass);
        let mut runner = HeadlessRunner::with_config(
            Simulation::new(grid, quick()).unwrap(),
            HeadlessConfig {
                auto_state_output: true,
            },
        );
        runner.handle(Command::Spawn { x: 1, y: 1 });

        let responses = runner.handle(Command::Tick { count: 2 });
        assert_eq!(responses.len(), 2);
        let Response::State { tick, movers, .. } = &responses[1] else {
            panic!("expected state");
        };
        assert_eq!(*tick, 2);
        assert_eq!(movers[0].cell, (1, 1));
    }

    #[test]
    fn test_protocol_session() {
        let input = [
            r#"{"cmd":"spawn","x":0,"y":1}"#,
            "",
            r#"{"cmd":"move","mover_id":1,"x":2,"y":1}"#,
            "garbage",
            r#"{"cmd":"tick","count":5}"#,
            r#"{"cmd":"render"}"#,
            r#"{"cmd":"hash"}"#,
            r#"{"cmd":"quit"}"#,
            r#"{"cmd":"query"}"#,
        ]
        .join("\n");

        let mut runner = runner();
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();

        let out = lines(&output);
        let types: Vec<_> = out.iter().map(|v| v["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["ready", "spawned", "ack", "error", "events", "render", "state_hash", "bye"]
        );
        assert_eq!(out[2]["result"], "accepted");
        assert_eq!(out[5]["rows"][2], ".+@.....");
        assert_eq!(runner.simulation().get_tick(), 5);
    }

    #[test]
    fn test_run_scenario_to_settle() {
        let scenario = Scenario {
            name: "Two walkers".into(),
            grid: GridSource::Ascii(vec![
                "......".into(),
                "..~...".into(),
                "......".into(),
            ]),
            config: quick(),
            movers: vec![(0, 1), (5, 0)],
            moves: vec![
                ScheduledMove::to_cell(0, 0, (4, 1)),
                ScheduledMove::to_cell(3, 1, (5, 2)),
                ScheduledMove::to_cell(3, 1, (2, 1)),
            ],
            ..Default::default()
        };

        let mut ticks_seen = 0;
        let (sim, report) = run_scenario(&scenario, None, |_| ticks_seen += 1).unwrap();

        assert!(report.settled);
        assert_eq!(report.ticks, ticks_seen);
        assert_eq!(report.rejected_moves, 1);
        assert_eq!(report.count_events("arrived"), 2);
        assert_eq!(report.count_events("reroute_started"), 1);
        assert_eq!(report.movers[0].cell, (4, 1));
        assert_eq!(report.movers[1].cell, (5, 2));
        assert_eq!(report.hash, sim.state_hash());
    }

    #[test]
    fn test_run_scenario_respects_limit() {
        let scenario = Scenario {
            config: quick(),
            ..Default::default()
        };
        let (_, report) = run_scenario(&scenario, Some(3), |_| {}).unwrap();
        assert_eq!(report.ticks, 3);
        assert!(!report.settled);
    }
}
