//! Reversible commands and linear undo/redo.
//!
//! Every [`Command`] executed through a [`CommandHistory`] owns one
//! [`Snapshot`] of the state it started from. Undo restores that snapshot;
//! redo runs the command again against a fresh snapshot, so production
//! randomness is sampled anew rather than replayed.
//!
//! The selected defender is changed outside the history. Undo keeps the
//! current selection, except for a tile activation, which consumed it.
//!
//! ```
//! use siege_core::grid::GridPos;
//! use siege_core::history::{Command, CommandHistory};
//! use siege_core::simulation::Simulation;
//! use siege_core::unit_kind::DefenderKind;
//!
//! let mut sim = Simulation::default();
//! let mut history = CommandHistory::new();
//!
//! history.execute(&mut sim, Command::PlaceDefender {
//!     kind: DefenderKind::Shooter,
//!     position: GridPos::new(0, 0),
//! });
//! assert_eq!(sim.balance(), 300);
//!
//! assert!(history.undo(&mut sim));
//! assert_eq!(sim.balance(), 400);
//!
//! assert!(history.redo(&mut sim).is_some());
//! assert_eq!(sim.balance(), 300);
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::{DeploymentTable, PlayerEconomy};
use crate::grid::GridPos;
use crate::simulation::{EntityStorage, PlacementOutcome, Simulation, TileOutcome, TurnReport};
use crate::unit_kind::DefenderKind;

/// Deep copy of the reversible simulation state.
///
/// Shares nothing with the live simulation; later turns cannot change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub(crate) entities: EntityStorage,
    pub(crate) economy: PlayerEconomy,
    pub(crate) deployment: DeploymentTable,
    pub(crate) turn: u64,
    pub(crate) level: u32,
    pub(crate) running: bool,
    pub(crate) selected: Option<DefenderKind>,
}

impl Snapshot {
    /// Entities at capture time.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Balance at capture time.
    #[must_use]
    pub const fn balance(&self) -> i32 {
        self.economy.balance
    }

    /// Turn at capture time.
    #[must_use]
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Level at capture time.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

/// A player action that can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Run one turn of the engine.
    AdvanceTurn,
    /// Place a defender of `kind` on `position`.
    PlaceDefender {
        /// Kind to place.
        kind: DefenderKind,
        /// Target cell.
        position: GridPos,
    },
    /// Collect a pickup on `position`, or place the selected defender there.
    ActivateTile {
        /// Target cell.
        position: GridPos,
    },
    /// Collect a pickup on `position`.
    CollectPickup {
        /// Target cell.
        position: GridPos,
    },
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// A turn ran.
    Advanced {
        /// Turn summary.
        report: TurnReport,
    },
    /// A placement was attempted.
    Placement {
        /// Placement result.
        placement: PlacementOutcome,
    },
    /// A tile was activated.
    Tile {
        /// Activation result.
        tile: TileOutcome,
    },
    /// A pickup collection was attempted.
    Collection {
        /// Reward credited, if a pickup was there.
        reward: Option<i32>,
    },
}

impl Command {
    /// Run the forward effect.
    pub fn apply(self, sim: &mut Simulation) -> CommandOutcome {
        match self {
            Self::AdvanceTurn => CommandOutcome::Advanced {
                report: sim.advance_turn(),
            },
            Self::PlaceDefender { kind, position } => CommandOutcome::Placement {
                placement: sim.place_defender(kind, position),
            },
            Self::ActivateTile { position } => CommandOutcome::Tile {
                tile: sim.activate_tile(position),
            },
            Self::CollectPickup { position } => CommandOutcome::Collection {
                reward: sim.collect_pickup(position),
            },
        }
    }
}

/// An executed command and the state it started from.
#[derive(Debug, Clone)]
struct Executed {
    command: Command,
    snapshot: Snapshot,
}

/// Linear undo/redo stacks.
///
/// Commands are recorded even when their forward effect changed nothing.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    undo: Vec<Executed>,
    redo: Vec<Command>,
}

impl CommandHistory {
    /// Create empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot, run `command`, record it and drop the redo path.
    pub fn execute(&mut self, sim: &mut Simulation, command: Command) -> CommandOutcome {
        self.execute_with(sim, command, |sim| command.apply(sim))
    }

    /// Execute [`Command::AdvanceTurn`].
    pub fn advance_turn(&mut self, sim: &mut Simulation) -> TurnReport {
        self.execute_with(sim, Command::AdvanceTurn, Simulation::advance_turn)
    }

    /// Execute [`Command::PlaceDefender`].
    pub fn place_defender(
        &mut self,
        sim: &mut Simulation,
        kind: DefenderKind,
        position: GridPos,
    ) -> PlacementOutcome {
        self.execute_with(sim, Command::PlaceDefender { kind, position }, |sim| {
            sim.place_defender(kind, position)
        })
    }

    /// Execute [`Command::ActivateTile`].
    pub fn activate_tile(&mut self, sim: &mut Simulation, position: GridPos) -> TileOutcome {
        self.execute_with(sim, Command::ActivateTile { position }, |sim| {
            sim.activate_tile(position)
        })
    }

    /// Execute [`Command::CollectPickup`].
    pub fn collect_pickup(&mut self, sim: &mut Simulation, position: GridPos) -> Option<i32> {
        self.execute_with(sim, Command::CollectPickup { position }, |sim| {
            sim.collect_pickup(position)
        })
    }

    /// `forward` must be the forward effect of `command`.
    fn execute_with<T>(
        &mut self,
        sim: &mut Simulation,
        command: Command,
        forward: impl FnOnce(&mut Simulation) -> T,
    ) -> T {
        let result = self.record(sim, command, forward);
        self.redo.clear();
        result
    }

    /// Restore the state before the last executed command. Returns false
    /// when there is nothing to undo.
    pub fn undo(&mut self, sim: &mut Simulation) -> bool {
        let Some(mut executed) = self.undo.pop() else {
            return false;
        };
        tracing::debug!(command = ?executed.command, turn = executed.snapshot.turn, "undo");
        if !matches!(executed.command, Command::ActivateTile { .. }) {
            executed.snapshot.selected = sim.selected();
        }
        sim.restore(executed.snapshot);
        self.redo.push(executed.command);
        true
    }

    /// Re-execute the last undone command. Returns `None` when there is
    /// nothing to redo.
    pub fn redo(&mut self, sim: &mut Simulation) -> Option<CommandOutcome> {
        let command = self.redo.pop()?;
        tracing::debug!(?command, "redo");
        Some(self.record(sim, command, |sim| command.apply(sim)))
    }

    fn record<T>(
        &mut self,
        sim: &mut Simulation,
        command: Command,
        forward: impl FnOnce(&mut Simulation) -> T,
    ) -> T {
        let snapshot = sim.snapshot();
        let result = forward(sim);
        self.undo.push(Executed { command, snapshot });
        result
    }

    /// Whether [`undo`](Self::undo) would do anything.
    #[must_use]
    pub fn is_undo_available(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether [`redo`](Self::redo) would do anything.
    #[must_use]
    pub fn is_redo_available(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable commands.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable commands.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Rebuild from undo entries (oldest first) and the redo stack (next
    /// redo last).
    pub(crate) fn from_parts(undo: Vec<(Command, Snapshot)>, redo: Vec<Command>) -> Self {
        Self {
            undo: undo
                .into_iter()
                .map(|(command, snapshot)| Executed { command, snapshot })
                .collect(),
            redo,
        }
    }

    /// Undo entries, oldest first.
    pub(crate) fn undo_entries(&self) -> impl Iterator<Item = (Command, &Snapshot)> {
        self.undo.iter().map(|e| (e.command, &e.snapshot))
    }

    /// Redo stack, next redo last.
    pub(crate) fn redo_commands(&self) -> &[Command] {
        &self.redo
    }
}
