//! # Siege Core
//!
//! Deterministic simulation core for Lane Siege, a turn-based lane defence
//! game.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No terminal or network IO (save files are the one exception)
//! - No system randomness; a seeded `ChaCha8Rng` is owned by the simulation
//!
//! This separation enables:
//! - Headless drivers and batch autoplay
//! - Undo/redo over full-state snapshots
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Entities, storage and the five-pass turn engine
//! - [`systems`] - Pure per-pass logic used by the turn engine
//! - [`economy`] - Balance, welfare and the per-kind deployment gate
//! - [`history`] - Reversible commands and undo/redo
//! - [`events`] - Notifications and subscribers
//! - [`game`] - Façade tying the above together
//! - [`save`] - Saved games in RON and bincode
//! - [`config`] - Tuning, loaded from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod game;
pub mod grid;
pub mod history;
pub mod save;
pub mod simulation;
pub mod systems;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::GameConfig;
    pub use crate::economy::{DeploymentTable, PlayerEconomy};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{
        EventBus, EventRecorder, GameEvent, RemovalCause, Subscriber, TracingSubscriber,
    };
    pub use crate::game::Game;
    pub use crate::grid::{GridDelta, GridPos, GridSize};
    pub use crate::history::{Command, CommandHistory, CommandOutcome, Snapshot};
    pub use crate::save::{SaveGame, SavedEntity};
    pub use crate::simulation::{
        Entity, EntityStorage, PlacementOutcome, PlacementRejection, Simulation, TileOutcome,
        TurnReport, TurnStatus,
    };
    pub use crate::unit_kind::{AttackerKind, DefenderKind, EntityKind};
}
