//! JSON protocol for headless movement sessions.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses and simulation state
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with one or more responses
//! 4. On `quit`, outputs `{"type":"bye"}` and exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"spawn","x":0,"y":0}
//! <- {"type":"spawned","mover_id":1,"x":0,"y":0}
//! -> {"cmd":"move","mover_id":1,"x":4.0,"y":0.0}
//! <- {"type":"ack","cmd":"move","result":"accepted"}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"events","tick":20,"events":[{"mover":1,"kind":"path_planned",...},...]}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":20,"movers":[...],"hash":...}
//! ```

use serde::{Deserialize, Serialize};

use gridwalk_core::controller::{MoveRequest, Mover};
use gridwalk_core::simulation::MoverEvent;

/// Protocol version reported in the `ready` response.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current state without advancing time.
    Query,

    /// Spawn a mover on a cell.
    Spawn { x: i32, y: i32 },

    /// Send a mover toward a world position (snapped to the nearest cell).
    Move { mover_id: u64, x: f64, y: f64 },

    /// Cancel a mover's active request.
    Stop { mover_id: u64 },

    /// Remove a mover.
    Despawn { mover_id: u64 },

    /// Report the state hash (for determinism verification).
    Hash,

    /// Render the grid as ASCII rows.
    Render,

    /// Quit the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack {
        cmd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<MoveRequest>,
    },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// A mover was spawned.
    Spawned { mover_id: u64, x: i32, y: i32 },

    /// Events emitted while ticking.
    Events { tick: u64, events: Vec<MoverEvent> },

    /// Current simulation state.
    State {
        tick: u64,
        movers: Vec<MoverState>,
        hash: u64,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// ASCII rendering, top row first.
    Render { tick: u64, rows: Vec<String> },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single mover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverState {
    pub id: u64,
    /// Settled cell.
    pub cell: (i32, i32),
    /// Interpolated world position.
    pub x: f64,
    pub y: f64,
    /// Movement phase name.
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<(i32, i32)>,
    /// Steps still queued.
    pub pending: usize,
}

impl From<&Mover> for MoverState {
    fn from(mover: &Mover) -> Self {
        let cell = mover.cell();
        let motion = mover.motion();
        Self {
            id: mover.id(),
            cell: (cell.x, cell.y),
            x: mover.position().x.to_num::<f64>(),
            y: mover.position().y.to_num::<f64>(),
            phase: motion.phase.name().to_string(),
            target: motion.target.map(|t| (t.x, t.y)),
            pending: motion.pending.len(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            result: None,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Spawn { .. } => "spawn",
            Self::Move { .. } => "move",
            Self::Stop { .. } => "stop",
            Self::Despawn { .. } => "despawn",
            Self::Hash => "hash",
            Self::Render => "render",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::controller::MotionEvent;
    use gridwalk_core::grid::GridCoordinate;

    #[test]
    fn test_parse_tick_command() {
        let json = r#"{"cmd":"tick","count":60}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 60 }));
    }

    #[test]
    fn test_default_tick_count() {
        let json = r#"{"cmd":"tick"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 1 }));
    }

    #[test]
    fn test_parse_move_command() {
        let json = r#"{"cmd":"move","mover_id":3,"x":4.4,"y":-1}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Move { mover_id: 3, x, y } if x == 4.4 && y == -1.0
        ));
        assert_eq!(cmd.name(), "move");
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"cmd":"attack","mover_id":1}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_serialize_move_ack() {
        let resp = Response::Ack {
            cmd: "move".into(),
            result: Some(MoveRequest::AlreadyThere),
        };
        let json = resp.to_json_line();
        assert!(json.contains(r#""type":"ack""#));
        assert!(json.contains(r#""result":"already_there""#));
        assert!(json.ends_with('\n'));

        let plain = Response::ack("stop").to_json_line();
        assert!(!plain.contains("result"));
    }

    #[test]
    fn test_serialize_events_response() {
        let resp = Response::Events {
            tick: 7,
            events: vec![MoverEvent {
                mover: 2,
                event: MotionEvent::Arrived {
                    at: GridCoordinate::new(4, 0),
                },
            }],
        };
        let json = resp.to_json_line();
        assert!(json.contains(r#""type":"events""#));
        assert!(json.contains(r#""mover":2"#));
        assert!(json.contains(r#""kind":"arrived""#));
        assert!(json.contains(r#""at":{"x":4,"y":0}"#));
    }

    #[test]
    fn test_mover_state_from_mover() {
        let mover = Mover::new(5, GridCoordinate::new(2, 3));
        let state = MoverState::from(&mover);
        assert_eq!(state.id, 5);
        assert_eq!(state.cell, (2, 3));
        assert_eq!((state.x, state.y), (2.0, 3.0));
        assert_eq!(state.phase, "idle");
        assert_eq!(state.target, None);
        assert_eq!(state.pending, 0);
    }
}
