//! Saved games.
//!
//! A [`SaveGame`] stores the logical state of a game: balance, level,
//! selected defender, turn counter, running flag, deployment cooldowns and
//! every entity. It also stores the undo history (one state per undoable
//! command) and the commands waiting to be redone. Entities are written as
//! tagged records with only the fields their type needs, so the format does
//! not depend on the in-memory component layout.
//!
//! Two encodings are supported: readable RON text for save files and a
//! compact bincode form for embedding.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::economy::{DeploymentTable, PlayerEconomy};
use crate::error::{GameError, Result};
use crate::grid::GridPos;
use crate::history::{Command, CommandHistory, Snapshot};
use crate::simulation::{Entity, EntityStorage, Simulation};
use crate::unit_kind::{AttackerKind, DefenderKind, EntityKind, PICKUP_TAG, PROJECTILE_TAG};

/// Save format version for compatibility.
pub const SAVE_VERSION: u32 = 2;

/// One persisted entity.
///
/// `tag` names the type; the optional fields are required or ignored
/// depending on it:
///
/// | tag | required |
/// |---|---|
/// | attacker tags | `health` |
/// | defender tags | `health`, plus `fire_rate_remaining` for shooters |
/// | `projectile` | `damage` |
/// | `pickup` | `reward` |
///
/// `engaged` is optional for blockers and defaults to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEntity {
    /// Type tag.
    pub tag: String,
    /// Column.
    pub column: i32,
    /// Row.
    pub row: i32,
    /// Current health.
    #[serde(default)]
    pub health: Option<i32>,
    /// Turns left on the fire-rate counter.
    #[serde(default)]
    pub fire_rate_remaining: Option<u32>,
    /// Blocker digesting.
    #[serde(default)]
    pub engaged: Option<bool>,
    /// Projectile damage.
    #[serde(default)]
    pub damage: Option<i32>,
    /// Pickup reward.
    #[serde(default)]
    pub reward: Option<i32>,
}

fn defender_kind(tag: &str) -> Result<DefenderKind> {
    DefenderKind::from_tag(tag).ok_or_else(|| GameError::UnknownUnitTag(tag.to_string()))
}

fn required<T>(value: Option<T>, tag: &str, field: &'static str) -> Result<T> {
    value.ok_or_else(|| GameError::MissingField {
        tag: tag.to_string(),
        field,
    })
}

impl SavedEntity {
    /// Record an entity.
    #[must_use]
    pub fn capture(entity: &Entity) -> Self {
        let mut saved = Self {
            tag: entity.kind.tag().to_string(),
            column: entity.position.column,
            row: entity.position.row,
            health: entity.health.map(|h| h.current),
            fire_rate_remaining: entity.fire_rate.map(|f| f.remaining),
            engaged: entity.bite.map(|b| b.engaged),
            damage: None,
            reward: None,
        };
        match entity.kind {
            EntityKind::Projectile { damage } => saved.damage = Some(damage),
            EntityKind::Pickup { reward } => saved.reward = Some(reward),
            EntityKind::Attacker(_) | EntityKind::Defender(_) => {}
        }
        saved
    }

    /// Rebuild the entity using `config` for everything not persisted.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownUnitTag`] for an unrecognised tag,
    /// [`GameError::MissingField`] when a field the tag needs is absent and
    /// [`GameError::InvalidSavedValue`] for a counter past its rate.
    pub fn restore(&self, config: &GameConfig) -> Result<Entity> {
        let tag = self.tag.as_str();
        let position = GridPos::new(self.column, self.row);

        if let Some(kind) = AttackerKind::from_tag(tag) {
            let mut entity = Entity::attacker(kind, position, config.attackers.get(kind));
            self.restore_health(&mut entity)?;
            return Ok(entity);
        }

        if let Some(kind) = DefenderKind::from_tag(tag) {
            let mut entity = Entity::defender(kind, position, config.defenders.get(kind));
            self.restore_health(&mut entity)?;
            if let Some(fire_rate) = entity.fire_rate.as_mut() {
                let remaining = required(self.fire_rate_remaining, tag, "fire_rate_remaining")?;
                if remaining > fire_rate.rate {
                    return Err(GameError::InvalidSavedValue(format!(
                        "{tag}: fire_rate_remaining {remaining} exceeds rate {}",
                        fire_rate.rate
                    )));
                }
                fire_rate.remaining = remaining;
            }
            if let Some(bite) = entity.bite.as_mut() {
                bite.engaged = self.engaged.unwrap_or(false);
            }
            return Ok(entity);
        }

        match tag {
            PROJECTILE_TAG => Ok(Entity::projectile(
                position,
                required(self.damage, tag, "damage")?,
                config.projectile_speed,
            )),
            PICKUP_TAG => Ok(Entity::pickup(
                position,
                required(self.reward, tag, "reward")?,
            )),
            _ => Err(GameError::UnknownUnitTag(self.tag.clone())),
        }
    }

    fn restore_health(&self, entity: &mut Entity) -> Result<()> {
        let current = required(self.health, &self.tag, "health")?;
        if let Some(health) = entity.health.as_mut() {
            health.current = current;
        }
        Ok(())
    }
}

/// Reversible state at one point of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    /// Player balance.
    pub balance: i32,
    /// Level index.
    pub level: u32,
    /// Tag of the selected defender kind.
    #[serde(default)]
    pub selected: Option<String>,
    /// Turn counter.
    pub turn: u64,
    /// Game in progress.
    pub running: bool,
    /// Next deployable turn per defender tag. Omitted kinds are deployable.
    #[serde(default)]
    pub next_deployable: BTreeMap<String, u64>,
    /// Entities in collection order.
    pub entities: Vec<SavedEntity>,
}

impl SavedState {
    /// Record a snapshot.
    #[must_use]
    pub fn capture(snapshot: &Snapshot) -> Self {
        let next_deployable = DefenderKind::ALL
            .into_iter()
            .map(|kind| (kind, snapshot.deployment.slot(kind).next_deployable))
            .filter(|&(_, turn)| turn > 0)
            .map(|(kind, turn)| (kind.tag().to_string(), turn))
            .collect();

        Self {
            balance: snapshot.economy.balance,
            level: snapshot.level,
            selected: snapshot.selected.map(|kind| kind.tag().to_string()),
            turn: snapshot.turn,
            running: snapshot.running,
            next_deployable,
            entities: snapshot.entities.iter().map(SavedEntity::capture).collect(),
        }
    }

    /// Decode and validate against `config`.
    ///
    /// # Errors
    ///
    /// Fails on a level the configuration does not have, a negative balance
    /// or any entity that does not restore.
    pub(crate) fn to_snapshot(&self, config: &GameConfig) -> Result<Snapshot> {
        if config.level(self.level).is_none() {
            return Err(GameError::InvalidSavedValue(format!(
                "level {} does not exist",
                self.level
            )));
        }
        if self.balance < 0 {
            return Err(GameError::InvalidSavedValue(format!(
                "negative balance {}",
                self.balance
            )));
        }

        let selected = self.selected.as_deref().map(defender_kind).transpose()?;

        let mut deployment = DeploymentTable::from_defenders(&config.defenders);
        for (tag, &turn) in &self.next_deployable {
            deployment.slot_mut(defender_kind(tag)?).next_deployable = turn;
        }

        let mut entities = EntityStorage::new();
        for saved in &self.entities {
            entities.insert(saved.restore(config)?);
        }

        Ok(Snapshot {
            entities,
            economy: PlayerEconomy::new(self.balance),
            deployment,
            turn: self.turn,
            level: self.level,
            running: self.running,
            selected,
        })
    }
}

/// An undoable command and the state it started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedUndo {
    /// The executed command.
    pub command: Command,
    /// State before it ran.
    pub state: SavedState,
}

/// Undo and redo stacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedHistory {
    /// Undo entries, oldest first.
    #[serde(default)]
    pub undo: Vec<SavedUndo>,
    /// Undone commands, next redo last.
    #[serde(default)]
    pub redo: Vec<Command>,
}

impl SavedHistory {
    /// Record a command history.
    #[must_use]
    pub fn capture(history: &CommandHistory) -> Self {
        Self {
            undo: history
                .undo_entries()
                .map(|(command, snapshot)| SavedUndo {
                    command,
                    state: SavedState::capture(snapshot),
                })
                .collect(),
            redo: history.redo_commands().to_vec(),
        }
    }

    fn to_history(&self, config: &GameConfig) -> Result<CommandHistory> {
        let undo = self
            .undo
            .iter()
            .map(|entry| Ok((entry.command, entry.state.to_snapshot(config)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(CommandHistory::from_parts(undo, self.redo.clone()))
    }
}

/// Complete saved game.
///
/// # Example RON
///
/// ```ron
/// SaveGame(
///     version: 2,
///     state: SavedState(
///         balance: 300,
///         level: 0,
///         selected: Some("wall"),
///         turn: 1,
///         running: true,
///         next_deployable: {"shooter": 5},
///         entities: [
///             SavedEntity(tag: "shooter", column: 0, row: 2, health: Some(5),
///                         fire_rate_remaining: Some(1)),
///             SavedEntity(tag: "basic_attacker", column: 13, row: 1, health: Some(5)),
///         ],
///     ),
///     history: SavedHistory(
///         undo: [
///             SavedUndo(
///                 command: place_defender(kind: shooter, position: (column: 0, row: 2)),
///                 state: SavedState(balance: 400, level: 0, turn: 0, running: true,
///                                   entities: [/* ... */]),
///             ),
///             SavedUndo(command: advance_turn, state: SavedState(/* ... */)),
///         ],
///         redo: [],
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Format version.
    pub version: u32,
    /// Current state.
    pub state: SavedState,
    /// Undo and redo stacks. Absent means nothing to undo.
    #[serde(default)]
    pub history: SavedHistory,
}

impl SaveGame {
    /// Record a simulation's persistent state, without history.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        Self {
            version: SAVE_VERSION,
            state: SavedState::capture(&sim.snapshot()),
            history: SavedHistory::default(),
        }
    }

    /// Record a simulation together with its undo history.
    #[must_use]
    pub fn capture_with_history(sim: &Simulation, history: &CommandHistory) -> Self {
        Self {
            history: SavedHistory::capture(history),
            ..Self::capture(sim)
        }
    }

    fn check_version(&self) -> Result<()> {
        if self.version != SAVE_VERSION {
            return Err(GameError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    /// Decode and validate the current state against `config`.
    ///
    /// # Errors
    ///
    /// Fails on a version mismatch or any invalid state field.
    pub(crate) fn to_snapshot(&self, config: &GameConfig) -> Result<Snapshot> {
        self.check_version()?;
        self.state.to_snapshot(config)
    }

    /// Decode and validate the history against `config`.
    ///
    /// # Errors
    ///
    /// Fails on a version mismatch or any invalid undo entry.
    pub(crate) fn to_history(&self, config: &GameConfig) -> Result<CommandHistory> {
        self.check_version()?;
        self.history.to_history(config)
    }

    /// Render as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Parse RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Encode as bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Write RON to a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ron()?).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read RON from a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be read, or a parse
    /// error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }
}
