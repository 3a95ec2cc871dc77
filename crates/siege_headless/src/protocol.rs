//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Game state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command; notifications raised by the command are
//!    written first as `event` lines
//! 4. On `quit` (or end of input) the runner outputs `{"type":"bye"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","turn":0,"balance":400}
//! -> {"cmd":"place","unit":"shooter","column":0,"row":2}
//! <- {"type":"event","event":{"event":"unit_spawned",...}}
//! <- {"type":"event","event":{"event":"balance_changed","balance":300}}
//! <- {"type":"ack","cmd":"place","detail":"placed"}
//! -> {"cmd":"advance","count":4}
//! <- ...
//! <- {"type":"state","turn":4,"balance":325,...}
//! -> {"cmd":"render"}
//! <- {"type":"board","text":"..."}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use siege_core::events::GameEvent;
use siege_core::grid::GridPos;
use siege_core::simulation::{Entity, Simulation};
use siege_core::unit_kind::DefenderKind;

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Errors turning a line into something the game can act on.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line was not a valid command.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A unit name did not match any defender kind.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    /// Reading input or writing output failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The game refused a save or load.
    #[error("game error: {0}")]
    Game(#[from] siege_core::error::GameError),
}

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the game by N turns (default: 1).
    Advance {
        /// Turns to run.
        #[serde(default = "default_turn_count")]
        count: u32,
    },

    /// Place a defender.
    Place {
        /// Defender tag, e.g. `"shooter"`.
        unit: String,
        /// Target column.
        column: i32,
        /// Target row.
        row: i32,
    },

    /// Select the defender used by `tile`.
    Select {
        /// Defender tag; absent clears the selection.
        #[serde(default)]
        unit: Option<String>,
    },

    /// Collect a pickup or place the selected defender.
    Tile {
        /// Target column.
        column: i32,
        /// Target row.
        row: i32,
    },

    /// Collect a pickup.
    Collect {
        /// Target column.
        column: i32,
        /// Target row.
        row: i32,
    },

    /// Undo the last command.
    Undo,

    /// Redo the last undone command.
    Redo,

    /// Report the current state without advancing.
    Query,

    /// Render the board as text.
    Render,

    /// Write a RON save file.
    Save {
        /// Destination path.
        path: String,
    },

    /// Load a RON save file.
    Load {
        /// Source path.
        path: String,
    },

    /// Start over from the first level.
    Restart,

    /// Quit the session.
    Quit,
}

const fn default_turn_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current turn.
        turn: u64,
        /// Current balance.
        balance: i32,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
        /// Short result, e.g. `"placed"` or a rejection reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, if the line parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Current game state.
    State(StateReport),

    /// A game notification.
    Event {
        /// The notification.
        event: GameEvent,
    },

    /// Text rendering of the board.
    Board {
        /// Rendered rows.
        text: String,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Snapshot of everything a controller needs to decide its next move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    /// Current turn.
    pub turn: u64,
    /// Current level index.
    pub level: u32,
    /// Current balance.
    pub balance: i32,
    /// Whether the game accepts input.
    pub running: bool,
    /// Selected defender tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    /// Defender tags that can be bought now.
    pub purchasable: Vec<String>,
    /// Every entity in collection order.
    pub entities: Vec<EntityState>,
    /// Whether undo would do anything.
    pub can_undo: bool,
    /// Whether redo would do anything.
    pub can_redo: bool,
    /// State hash for determinism checks.
    pub hash: u64,
}

/// State of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity id.
    pub id: u64,
    /// Type tag.
    pub tag: String,
    /// Column.
    pub column: i32,
    /// Row.
    pub row: i32,
    /// Health, for entities that have it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
}

impl From<&Entity> for EntityState {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            tag: entity.kind.tag().to_string(),
            column: entity.position.column,
            row: entity.position.row,
            health: entity.health.map(|h| h.current),
        }
    }
}

impl StateReport {
    /// Build a report from the simulation and undo availability.
    #[must_use]
    pub fn capture(sim: &Simulation, can_undo: bool, can_redo: bool) -> Self {
        Self {
            turn: sim.turn(),
            level: sim.level(),
            balance: sim.balance(),
            running: sim.is_running(),
            selected: sim.selected().map(|kind| kind.tag().to_string()),
            purchasable: sim
                .purchasable_defenders()
                .into_iter()
                .map(|kind| kind.tag().to_string())
                .collect(),
            entities: sim.entities().iter().map(EntityState::from).collect(),
            can_undo,
            can_redo,
            hash: sim.state_hash(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(turn: u64, balance: i32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            turn,
            balance,
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            detail: None,
        }
    }

    /// Create an acknowledgment with a short result.
    #[must_use]
    pub fn ack_with(cmd: &str, detail: impl Into<String>) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            detail: Some(detail.into()),
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
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Get command name for acknowledgment.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Place { .. } => "place",
            Self::Select { .. } => "select",
            Self::Tile { .. } => "tile",
            Self::Collect { .. } => "collect",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Query => "query",
            Self::Render => "render",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::Restart => "restart",
            Self::Quit => "quit",
        }
    }
}

/// Resolve a defender tag.
pub fn parse_unit(unit: &str) -> Result<DefenderKind, ProtocolError> {
    DefenderKind::from_tag(unit).ok_or_else(|| ProtocolError::UnknownUnit(unit.to_string()))
}

/// Cell from protocol coordinates.
#[must_use]
pub const fn cell(column: i32, row: i32) -> GridPos {
    GridPos::new(column, row)
}
