//! Core simulation: entity model and turn engine.
//!
//! A [`Simulation`] owns the board, the balance, the deployment gate and the
//! seeded random source. Each call to [`Simulation::advance_turn`] runs five
//! passes in a fixed order:
//!
//! 1. **Production**: defenders whose fire rate elapsed fire a projectile,
//!    drop a pickup or detonate.
//! 2. **Movement + collision**: every mover, in collection order, resolves
//!    its first contact and then either moves or is consumed.
//! 3. **Sweep**: entities at zero health or below are removed.
//! 4. **Economy**: the turn counter increments and welfare is paid every
//!    payment period.
//! 5. **Terminal check**: a breach ends the game; an empty board ends the
//!    round.
//!
//! # Determinism
//!
//! The only randomness is a `ChaCha8Rng` seeded from the configuration.
//! Iteration always follows collection order. Two simulations built from the
//! same configuration and fed the same calls have the same
//! [`state_hash`](Simulation::state_hash).
//!
//! # Example
//!
//! ```
//! use siege_core::config::GameConfig;
//! use siege_core::grid::GridPos;
//! use siege_core::simulation::Simulation;
//! use siege_core::unit_kind::DefenderKind;
//!
//! let mut sim = Simulation::new(GameConfig::default()).unwrap();
//! assert_eq!(sim.balance(), 400);
//!
//! let outcome = sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 2));
//! assert!(outcome.is_placed());
//! assert_eq!(sim.balance(), 300);
//!
//! sim.advance_turn();
//! assert_eq!(sim.turn(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Bite, EntityId, FireRate, Health, Movement};
use crate::config::GameConfig;
use crate::data::{AttackerData, DefenderData};
use crate::economy::{welfare_due, DeploymentTable, PlayerEconomy};
use crate::error::Result;
use crate::events::{GameEvent, RemovalCause};
use crate::grid::{GridDelta, GridPos};
use crate::history::Snapshot;
use crate::save::SaveGame;
use crate::systems::{
    blast_targets, dead_entities, first_contact, free_cells, production_tick, round_state,
    Contact, RoundState,
};
use crate::unit_kind::{AttackerKind, DefenderKind, DefenderRole, EntityKind};

/// A board entity.
///
/// The kind tag is closed; capabilities are the optional components it
/// carries. `health` makes it alive, `movement` makes it moveable and
/// `fire_rate` makes it a shooter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, assigned by [`EntityStorage::insert`].
    pub id: EntityId,
    /// Type tag.
    pub kind: EntityKind,
    /// Cell the entity occupies.
    pub position: GridPos,
    /// Health for damageable entities.
    pub health: Option<Health>,
    /// Per-turn displacement for moveable entities.
    pub movement: Option<Movement>,
    /// Production counter for shooters.
    pub fire_rate: Option<FireRate>,
    /// Melee state for blockers.
    pub bite: Option<Bite>,
}

impl Entity {
    /// Create an entity with no components.
    #[must_use]
    pub const fn new(kind: EntityKind, position: GridPos) -> Self {
        Self {
            id: 0,
            kind,
            position,
            health: None,
            movement: None,
            fire_rate: None,
            bite: None,
        }
    }

    /// Create an attacker walking west at its configured speed.
    #[must_use]
    pub fn attacker(kind: AttackerKind, position: GridPos, data: &AttackerData) -> Self {
        Self {
            health: Some(Health::new(data.health)),
            movement: Some(Movement::new(GridDelta::west(data.speed))),
            ..Self::new(EntityKind::Attacker(kind), position)
        }
    }

    /// Create a defender with the components its kind calls for.
    #[must_use]
    pub fn defender(kind: DefenderKind, position: GridPos, data: &DefenderData) -> Self {
        let fire_rate = if kind.is_shooter() {
            data.fire_rate.map(FireRate::new)
        } else {
            None
        };
        let bite =
            matches!(kind.role(), DefenderRole::MeleeBlocker).then_some(Bite::new(data.damage));
        Self {
            health: Some(Health::new(data.health)),
            fire_rate,
            bite,
            ..Self::new(EntityKind::Defender(kind), position)
        }
    }

    /// Create a projectile flying east.
    #[must_use]
    pub fn projectile(position: GridPos, damage: i32, speed: i32) -> Self {
        Self {
            movement: Some(Movement::new(GridDelta::east(speed))),
            ..Self::new(EntityKind::Projectile { damage }, position)
        }
    }

    /// Create a resource pickup.
    #[must_use]
    pub const fn pickup(position: GridPos, reward: i32) -> Self {
        Self::new(EntityKind::Pickup { reward }, position)
    }

    /// Has health.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health.is_some()
    }

    /// Has movement.
    #[must_use]
    pub const fn is_moveable(&self) -> bool {
        self.movement.is_some()
    }

    /// Has a fire-rate counter.
    #[must_use]
    pub const fn is_shooter(&self) -> bool {
        self.fire_rate.is_some()
    }

    /// Subtract health. Entities without health are unaffected.
    pub fn take_damage(&mut self, amount: i32) {
        if let Some(health) = self.health.as_mut() {
            health.take_damage(amount);
        }
    }

    /// Cell this entity would occupy if it moved now. Stationary entities
    /// stay put.
    #[must_use]
    pub fn next_position(&self) -> GridPos {
        self.movement
            .map_or(self.position, |m| m.next_position(self.position))
    }
}

/// Ordered entity collection.
///
/// Order is iteration and tie-break order. Identifiers are assigned from a
/// monotonic counter and new entities are appended, so the collection is
/// always sorted by id and lookups are a binary search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: Vec<Entity>,
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Append an entity and return its new ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.push(entity);
        id
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }

    /// Remove an entity by ID, keeping the order of the rest.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.index_of(id).map(|index| self.entities.remove(index))
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(|index| &mut self.entities[index])
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// IDs in collection order, for passes that add or remove while walking.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    /// Entities in collection order.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterate mutably in collection order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Entities on a cell, in collection order.
    pub fn at(&self, position: GridPos) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.position == position)
    }

    /// A cell is occupied if anything other than a projectile stands on it.
    #[must_use]
    pub fn is_occupied(&self, position: GridPos) -> bool {
        self.at(position).any(|e| !e.kind.is_projectile())
    }

    /// Remove every entity. The ID counter keeps counting.
    pub fn take_all(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.entities)
    }
}

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementRejection {
    /// The game is over or won.
    #[error("no game in progress")]
    NotRunning,
    /// The cell is off the board.
    #[error("cell is off the board")]
    OutOfBounds,
    /// Something other than a projectile stands on the cell.
    #[error("cell is occupied")]
    Occupied,
    /// The kind's shared cooldown has not elapsed.
    #[error("on cooldown until turn {ready_at}")]
    OnCooldown {
        /// First turn on which the kind may be placed.
        ready_at: u64,
    },
    /// The balance does not cover the cost.
    #[error("costs {cost}, balance is {balance}")]
    InsufficientBalance {
        /// Cost of the kind.
        cost: i32,
        /// Current balance.
        balance: i32,
    },
}

/// Result of a placement request. Rejections are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// The defender was placed.
    Placed {
        /// New entity.
        id: EntityId,
    },
    /// Nothing changed.
    Rejected {
        /// Why.
        reason: PlacementRejection,
    },
}

impl PlacementOutcome {
    /// Whether the defender was placed.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }
}

/// Result of activating a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TileOutcome {
    /// A pickup on the tile was collected.
    Collected {
        /// Balance credited.
        reward: i32,
    },
    /// The selected defender was placed, or refused.
    Placement {
        /// Placement result.
        placement: PlacementOutcome,
    },
    /// No pickup on the tile and no defender selected.
    NoSelection,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnStatus {
    /// The game was not running; nothing happened.
    Idle,
    /// Play continues.
    Continuing,
    /// The round was cleared and `level` has started.
    RoundOver {
        /// Level now being played.
        level: u32,
    },
    /// An attacker reached column 0.
    GameOver,
    /// The last level was cleared.
    GameWon,
}

/// Summary of one [`Simulation::advance_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Turn counter after the call.
    pub turn: u64,
    /// How the turn ended.
    pub status: TurnStatus,
}

/// The core game simulation.
///
/// This struct owns all game state. State-change notifications are staged
/// in an outbox and collected with [`drain_events`](Self::drain_events).
#[derive(Debug, Clone)]
pub struct Simulation {
    config: GameConfig,
    entities: EntityStorage,
    economy: PlayerEconomy,
    deployment: DeploymentTable,
    turn: u64,
    level: u32,
    running: bool,
    selected: Option<DefenderKind>,
    rng: ChaCha8Rng,
    events: Vec<GameEvent>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::from_valid_config(GameConfig::default())
    }
}

impl Simulation {
    /// Create a simulation at turn 0 of the first level, with its wave
    /// spawned.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`](crate::error::GameError::InvalidConfig)
    /// if the configuration is inconsistent.
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: GameConfig) -> Self {
        let mut sim = Self {
            economy: PlayerEconomy::new(config.initial_balance),
            deployment: DeploymentTable::from_defenders(&config.defenders),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            entities: EntityStorage::new(),
            turn: 0,
            level: 0,
            running: true,
            selected: None,
            events: Vec::new(),
            config,
        };
        sim.start_round();
        sim
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// All entities.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Current balance.
    #[must_use]
    pub const fn balance(&self) -> i32 {
        self.economy.balance
    }

    /// Deployment gate.
    #[must_use]
    pub const fn deployment(&self) -> &DeploymentTable {
        &self.deployment
    }

    /// Turn counter.
    #[must_use]
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Index of the level being played.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Whether the game is in progress.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Defender kind selected for tile activation.
    #[must_use]
    pub const fn selected(&self) -> Option<DefenderKind> {
        self.selected
    }

    /// Defender kinds that currently pass the deployment gate, in shop order.
    #[must_use]
    pub fn purchasable_defenders(&self) -> Vec<DefenderKind> {
        self.deployment.purchasable(self.turn, &self.economy)
    }

    /// Staged notifications not yet collected.
    #[must_use]
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take every staged notification, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Turn engine
    // ------------------------------------------------------------------

    /// Advance one turn. Does nothing when the game is not running.
    pub fn advance_turn(&mut self) -> TurnReport {
        if !self.running {
            return TurnReport {
                turn: self.turn,
                status: TurnStatus::Idle,
            };
        }

        self.run_production_pass();
        self.run_movement_pass();
        self.run_sweep_pass();
        self.run_economy_tick();
        let status = self.run_terminal_check();

        tracing::debug!(
            turn = self.turn,
            balance = self.economy.balance,
            entities = self.entities.len(),
            state_hash = self.state_hash(),
            "turn advanced"
        );

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        TurnReport {
            turn: self.turn,
            status,
        }
    }

    fn run_production_pass(&mut self) {
        for id in self.entities.ids() {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let position = entity.position;
            let Some((kind, role)) = production_tick(entity) else {
                continue;
            };

            match role {
                DefenderRole::Ranged => {
                    let damage = self.config.defenders.get(kind).damage;
                    let speed = self.config.projectile_speed;
                    self.spawn(Entity::projectile(
                        position.offset(GridDelta::east(1)),
                        damage,
                        speed,
                    ));
                }
                DefenderRole::Producer => self.produce_pickup(),
                DefenderRole::Detonator => self.detonate(id, kind, position),
                DefenderRole::MeleeBlocker | DefenderRole::Barrier => {}
            }
        }
    }

    fn produce_pickup(&mut self) {
        let free = free_cells(self.entities.as_slice(), self.config.grid);
        if free.is_empty() {
            tracing::trace!("no free cell for pickup");
            return;
        }
        let cell = free[self.rng.gen_range(0..free.len())];
        self.spawn(Entity::pickup(cell, self.config.pickup_reward));
    }

    fn detonate(&mut self, id: EntityId, kind: DefenderKind, center: GridPos) {
        let damage = self.config.defenders.get(kind).damage;
        let targets = blast_targets(self.entities.as_slice(), center, self.config.grid);
        tracing::trace!(id, %center, targets = targets.len(), "detonation");
        for target in targets {
            if let Some(entity) = self.entities.get_mut(target) {
                entity.take_damage(damage);
            }
        }
        self.despawn(id, RemovalCause::Detonated);
    }

    fn run_movement_pass(&mut self) {
        for id in self.entities.ids() {
            let Some(mover) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(movement) = mover.movement.as_mut() else {
                continue;
            };
            movement.reset_lock();
            let mover = mover.clone();

            match first_contact(self.entities.as_slice(), &mover, &self.config.attackers) {
                Some((other, contact)) => self.resolve_contact(&mover, other, contact),
                None => {
                    let Some(entity) = self.entities.get_mut(id) else {
                        continue;
                    };
                    let mut position = entity.position;
                    if let Some(movement) = entity.movement.as_mut() {
                        movement.advance(&mut position);
                    }
                    entity.position = position;
                    if entity.kind.is_projectile() && self.config.grid.is_beyond_far_edge(position) {
                        self.despawn(id, RemovalCause::OutOfBounds);
                    }
                }
            }
        }
    }

    fn resolve_contact(&mut self, mover: &Entity, other: EntityId, contact: Contact) {
        tracing::trace!(mover = mover.id, other, ?contact, "contact");
        match contact {
            Contact::ProjectileHit { damage } => {
                if let Some(target) = self.entities.get_mut(other) {
                    target.take_damage(damage);
                }
                self.despawn(mover.id, RemovalCause::Impact);
            }
            Contact::BlockerBite { damage } => {
                if let Some(attacker) = self.entities.get_mut(mover.id) {
                    attacker.take_damage(damage);
                }
                if let Some(blocker) = self.entities.get_mut(other) {
                    if let Some(bite) = blocker.bite.as_mut() {
                        bite.engaged = true;
                    }
                    if let Some(fire_rate) = blocker.fire_rate.as_mut() {
                        fire_rate.reset();
                    }
                }
            }
            Contact::DefenderHit { damage } => {
                if let Some(defender) = self.entities.get_mut(other) {
                    defender.take_damage(damage);
                }
            }
        }
    }

    fn run_sweep_pass(&mut self) {
        for id in dead_entities(self.entities.as_slice()) {
            self.despawn(id, RemovalCause::Died);
        }
    }

    fn run_economy_tick(&mut self) {
        self.turn += 1;
        if welfare_due(self.turn, self.config.payment_period) {
            self.economy.deposit(self.config.welfare);
            self.push_balance();
        }
        self.push_purchasables();
    }

    fn run_terminal_check(&mut self) -> TurnStatus {
        match round_state(self.entities.as_slice()) {
            RoundState::Breached => {
                self.running = false;
                tracing::info!(turn = self.turn, level = self.level, "defences breached");
                self.events.push(GameEvent::GameOver { turn: self.turn });
                TurnStatus::GameOver
            }
            RoundState::Cleared => self.finish_round(),
            RoundState::Ongoing => TurnStatus::Continuing,
        }
    }

    fn finish_round(&mut self) -> TurnStatus {
        let completed = self.level;
        let next = completed + 1;
        if self.config.level(next).is_none() {
            self.running = false;
            tracing::info!(turn = self.turn, "final level cleared");
            self.events.push(GameEvent::GameWon { turn: self.turn });
            return TurnStatus::GameWon;
        }

        self.level = next;
        tracing::info!(turn = self.turn, completed, next, "round over");
        self.events.push(GameEvent::RoundOver {
            completed_level: completed,
            next_level: next,
        });
        self.start_round();
        TurnStatus::RoundOver { level: next }
    }

    /// Clear the board, reset balance and cooldowns, spawn the current
    /// level's wave.
    fn start_round(&mut self) {
        self.clear_board();
        self.economy = PlayerEconomy::new(self.config.initial_balance);
        self.deployment.reset_all();
        self.selected = None;
        self.running = true;
        self.spawn_wave();
        self.push_balance();
        self.push_purchasables();
    }

    fn spawn_wave(&mut self) {
        let Some(level) = self.config.level(self.level).cloned() else {
            return;
        };
        let grid = self.config.grid;
        for kind in AttackerKind::ALL {
            let data = *self.config.attackers.get(kind);
            for _ in 0..level.count(kind) {
                let column =
                    grid.columns + level.spawn_offset + self.rng.gen_range(0..level.spawn_spread);
                let row = self.rng.gen_range(0..grid.rows);
                self.spawn(Entity::attacker(kind, GridPos::new(column, row), &data));
            }
        }
        tracing::debug!(level = self.level, name = %level.name, attackers = level.total(), "wave spawned");
    }

    // ------------------------------------------------------------------
    // Player actions
    // ------------------------------------------------------------------

    /// Check the deployment gate for placing `kind` on `position`.
    ///
    /// # Errors
    ///
    /// Returns the first reason the placement would be refused.
    pub fn check_placement(
        &self,
        kind: DefenderKind,
        position: GridPos,
    ) -> std::result::Result<(), PlacementRejection> {
        if !self.running {
            return Err(PlacementRejection::NotRunning);
        }
        if !self.config.grid.contains(position) {
            return Err(PlacementRejection::OutOfBounds);
        }
        if self.entities.is_occupied(position) {
            return Err(PlacementRejection::Occupied);
        }
        let slot = self.deployment.slot(kind);
        if !slot.is_deployable(self.turn) {
            return Err(PlacementRejection::OnCooldown {
                ready_at: slot.next_deployable,
            });
        }
        if !self.economy.can_afford(slot.cost) {
            return Err(PlacementRejection::InsufficientBalance {
                cost: slot.cost,
                balance: self.economy.balance,
            });
        }
        Ok(())
    }

    /// Place a defender if the gate allows it; otherwise change nothing.
    pub fn place_defender(&mut self, kind: DefenderKind, position: GridPos) -> PlacementOutcome {
        if let Err(reason) = self.check_placement(kind, position) {
            tracing::debug!(%kind, %position, %reason, "placement rejected");
            return PlacementOutcome::Rejected { reason };
        }

        let data = *self.config.defenders.get(kind);
        self.economy.spend(data.cost);
        self.deployment.slot_mut(kind).mark_deployed(self.turn);
        let id = self.spawn(Entity::defender(kind, position, &data));
        self.push_balance();
        self.push_purchasables();
        PlacementOutcome::Placed { id }
    }

    /// Collect the first pickup on `position`. Returns the reward.
    pub fn collect_pickup(&mut self, position: GridPos) -> Option<i32> {
        if !self.running {
            return None;
        }
        let id = self
            .entities
            .at(position)
            .find(|e| e.kind.is_pickup())
            .map(|e| e.id)?;
        let EntityKind::Pickup { reward } = self.despawn(id, RemovalCause::Collected)?.kind else {
            return None;
        };
        self.economy.deposit(reward);
        self.push_balance();
        self.push_purchasables();
        Some(reward)
    }

    /// Select the defender kind placed by [`activate_tile`](Self::activate_tile).
    pub fn select_defender(&mut self, kind: DefenderKind) {
        self.selected = Some(kind);
    }

    /// Clear the selected defender kind.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Collect a pickup on the tile if there is one, otherwise place the
    /// selected defender there. A successful placement clears the selection.
    pub fn activate_tile(&mut self, position: GridPos) -> TileOutcome {
        if let Some(reward) = self.collect_pickup(position) {
            return TileOutcome::Collected { reward };
        }
        let Some(kind) = self.selected else {
            return TileOutcome::NoSelection;
        };
        let placement = self.place_defender(kind, position);
        if placement.is_placed() {
            self.selected = None;
        }
        TileOutcome::Placement { placement }
    }

    /// Start again from the first level with a fresh board and reseeded
    /// randomness.
    pub fn restart(&mut self) {
        self.events.push(GameEvent::Restarted);
        self.clear_board();
        self.entities = EntityStorage::new();
        self.turn = 0;
        self.level = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        tracing::info!("restarted");
        self.start_round();
    }

    /// Append an entity to the collection, bypassing the deployment gate.
    ///
    /// Used to stage scenarios; placement by a player goes through
    /// [`place_defender`](Self::place_defender).
    pub fn spawn_entity(&mut self, entity: Entity) -> EntityId {
        self.spawn(entity)
    }

    /// Remove an entity outright.
    pub fn despawn_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.despawn(id, RemovalCause::Cleared)
    }

    // ------------------------------------------------------------------
    // Snapshots and persistence
    // ------------------------------------------------------------------

    /// Deep copy of the reversible state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.entities.clone(),
            economy: self.economy,
            deployment: self.deployment,
            turn: self.turn,
            level: self.level,
            running: self.running,
            selected: self.selected,
        }
    }

    /// Replace the state with a snapshot and announce the new board.
    ///
    /// The random source is not part of a snapshot and keeps its position.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.clear_board();
        self.entities = snapshot.entities;
        self.economy = snapshot.economy;
        self.deployment = snapshot.deployment;
        self.turn = snapshot.turn;
        self.level = snapshot.level;
        self.running = snapshot.running;
        self.selected = snapshot.selected;

        self.events
            .extend(self.entities.iter().map(|e| GameEvent::UnitSpawned {
                id: e.id,
                kind: e.kind,
                position: e.position,
            }));
        self.push_balance();
        self.push_purchasables();
    }

    /// Capture the persistent state.
    #[must_use]
    pub fn to_save(&self) -> SaveGame {
        SaveGame::capture(self)
    }

    /// Replace the state with a saved game.
    ///
    /// # Errors
    ///
    /// Fails without touching the simulation if the save is malformed or
    /// does not fit the configuration.
    pub fn load_save(&mut self, save: &SaveGame) -> Result<()> {
        let snapshot = match save.to_snapshot(&self.config) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%err, "rejected saved game");
                return Err(err);
            }
        };
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ snapshot.turn);
        self.restore(snapshot);
        tracing::info!(turn = self.turn, level = self.level, "saved game loaded");
        Ok(())
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Covers turn, balance, level, running flag, selection, deployment gate
    /// and every entity in order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        self.economy.balance.hash(&mut hasher);
        self.level.hash(&mut hasher);
        self.running.hash(&mut hasher);
        self.selected.hash(&mut hasher);
        self.deployment.hash(&mut hasher);
        self.entities.len().hash(&mut hasher);
        for entity in self.entities.iter() {
            entity.hash(&mut hasher);
        }
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn spawn(&mut self, entity: Entity) -> EntityId {
        let kind = entity.kind;
        let position = entity.position;
        let id = self.entities.insert(entity);
        self.events.push(GameEvent::UnitSpawned { id, kind, position });
        id
    }

    fn despawn(&mut self, id: EntityId, cause: RemovalCause) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.events.push(GameEvent::UnitRemoved {
            id,
            kind: entity.kind,
            position: entity.position,
            cause,
        });
        Some(entity)
    }

    fn clear_board(&mut self) {
        for entity in self.entities.take_all() {
            self.events.push(GameEvent::UnitRemoved {
                id: entity.id,
                kind: entity.kind,
                position: entity.position,
                cause: RemovalCause::Cleared,
            });
        }
    }

    fn push_balance(&mut self) {
        self.events.push(GameEvent::BalanceChanged {
            balance: self.economy.balance,
        });
    }

    fn push_purchasables(&mut self) {
        let purchasable = self.purchasable_defenders();
        self.events.push(GameEvent::PurchasablesUpdated { purchasable });
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        assert!(self.economy.balance >= 0, "negative balance");
        assert!(
            self.entities.as_slice().windows(2).all(|w| w[0].id < w[1].id),
            "entity collection out of id order"
        );
        for defender in self.entities.iter().filter(|e| e.kind.is_defender()) {
            assert!(
                !self
                    .entities
                    .at(defender.position)
                    .any(|e| e.kind.is_attacker()),
                "attacker shares a cell with defender {}",
                defender.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LevelData;

    /// One level with a single basic attacker far away in row 0.
    fn quiet_config() -> GameConfig {
        GameConfig {
            levels: vec![LevelData {
                name: "quiet".to_string(),
                basic: 1,
                armored: 0,
                spawn_offset: 40,
                spawn_spread: 1,
            }],
            grid: crate::grid::GridSize::new(10, 1),
            ..GameConfig::default()
        }
    }

    fn sim() -> Simulation {
        Simulation::new(quiet_config()).expect("valid config")
    }

    #[test]
    fn test_new_spawns_first_wave() {
        let sim = Simulation::new(GameConfig::default()).expect("valid config");
        let attackers = sim.entities().iter().filter(|e| e.kind.is_attacker()).count();
        assert_eq!(attackers, 3);
        assert_eq!(sim.balance(), 400);
        assert_eq!(sim.turn(), 0);
        assert!(sim.is_running());
        for attacker in sim.entities().iter() {
            assert!(attacker.position.column >= 12);
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.levels.clear();
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_storage_keeps_order_on_remove() {
        let mut storage = EntityStorage::new();
        let a = storage.insert(Entity::pickup(GridPos::new(0, 0), 1));
        let b = storage.insert(Entity::pickup(GridPos::new(1, 0), 1));
        let c = storage.insert(Entity::pickup(GridPos::new(2, 0), 1));
        assert!(storage.remove(b).is_some());
        assert_eq!(storage.ids(), vec![a, c]);
        assert!(storage.get(b).is_none());
        assert_eq!(storage.get(c).map(|e| e.position), Some(GridPos::new(2, 0)));
    }

    #[test]
    fn test_projectiles_do_not_occupy() {
        let mut storage = EntityStorage::new();
        storage.insert(Entity::projectile(GridPos::new(3, 0), 1, 1));
        assert!(!storage.is_occupied(GridPos::new(3, 0)));
        storage.insert(Entity::pickup(GridPos::new(3, 0), 25));
        assert!(storage.is_occupied(GridPos::new(3, 0)));
    }

    #[test]
    fn test_placement_debits_and_starts_cooldown() {
        let mut sim = sim();
        let outcome = sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        assert!(outcome.is_placed());
        assert_eq!(sim.balance(), 300);
        assert_eq!(sim.deployment().slot(DefenderKind::Shooter).next_deployable, 5);
        assert!(!sim.purchasable_defenders().contains(&DefenderKind::Shooter));
    }

    #[test]
    fn test_placement_rejections() {
        let mut sim = sim();
        sim.place_defender(DefenderKind::Wall, GridPos::new(2, 0));

        assert_eq!(
            sim.place_defender(DefenderKind::Shooter, GridPos::new(2, 0)),
            PlacementOutcome::Rejected {
                reason: PlacementRejection::Occupied
            }
        );
        assert_eq!(
            sim.place_defender(DefenderKind::Shooter, GridPos::new(10, 0)),
            PlacementOutcome::Rejected {
                reason: PlacementRejection::OutOfBounds
            }
        );
        assert_eq!(
            sim.place_defender(DefenderKind::Wall, GridPos::new(3, 0)),
            PlacementOutcome::Rejected {
                reason: PlacementRejection::OnCooldown { ready_at: 10 }
            }
        );
        assert_eq!(sim.balance(), 350);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut sim = sim();
        sim.place_defender(DefenderKind::Repeater, GridPos::new(0, 0));
        sim.place_defender(DefenderKind::Detonator, GridPos::new(1, 0));
        assert_eq!(sim.balance(), 50);
        assert_eq!(
            sim.place_defender(DefenderKind::Shooter, GridPos::new(2, 0)),
            PlacementOutcome::Rejected {
                reason: PlacementRejection::InsufficientBalance {
                    cost: 100,
                    balance: 50
                }
            }
        );
    }

    #[test]
    fn test_shooter_fires_projectile_one_cell_ahead() {
        let mut sim = sim();
        sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        sim.advance_turn();
        assert!(!sim.entities().iter().any(|e| e.kind.is_projectile()));

        sim.advance_turn();
        let shots: Vec<_> = sim
            .entities()
            .iter()
            .filter(|e| e.kind.is_projectile())
            .collect();
        assert_eq!(shots.len(), 1);
        // Spawned at column 1, then moved once in the same turn.
        assert_eq!(shots[0].position, GridPos::new(2, 0));
        assert_eq!(shots[0].kind, EntityKind::Projectile { damage: 1 });
    }

    #[test]
    fn test_welfare_every_period() {
        let mut sim = sim();
        for _ in 0..3 {
            sim.advance_turn();
        }
        assert_eq!(sim.balance(), 400);
        sim.advance_turn();
        assert_eq!(sim.balance(), 425);
    }

    #[test]
    fn test_attacker_damages_defender_and_holds() {
        let mut sim = sim();
        let attacker = sim
            .entities()
            .iter()
            .find(|e| e.kind.is_attacker())
            .map(|e| e.id)
            .expect("wave spawned");
        if let Some(e) = sim.entities.get_mut(attacker) {
            e.position = GridPos::new(4, 0);
        }
        let wall = match sim.place_defender(DefenderKind::Wall, GridPos::new(3, 0)) {
            PlacementOutcome::Placed { id } => id,
            PlacementOutcome::Rejected { reason } => panic!("{reason}"),
        };

        sim.advance_turn();
        assert_eq!(sim.entity(attacker).map(|e| e.position), Some(GridPos::new(4, 0)));
        assert_eq!(sim.entity(wall).and_then(|e| e.health).map(|h| h.current), Some(18));
    }

    #[test]
    fn test_blocker_bites_once_then_digests() {
        let mut sim = sim();
        let attacker = sim.entities().ids()[0];
        if let Some(e) = sim.entities.get_mut(attacker) {
            e.position = GridPos::new(4, 0);
        }
        let outcome = sim.place_defender(DefenderKind::Blocker, GridPos::new(3, 0));
        let PlacementOutcome::Placed { id: blocker } = outcome else {
            panic!("placement failed: {outcome:?}");
        };

        sim.advance_turn();
        let health = sim.entity(attacker).and_then(|e| e.health).map(|h| h.current);
        assert_eq!(health, Some(1));
        assert!(sim.entity(blocker).and_then(|e| e.bite).is_some_and(|b| b.engaged));

        // Engaged: the attacker now chews on the blocker instead.
        sim.advance_turn();
        assert_eq!(
            sim.entity(blocker).and_then(|e| e.health).map(|h| h.current),
            Some(4)
        );
    }

    #[test]
    fn test_no_op_when_not_running() {
        let mut sim = sim();
        sim.running = false;
        let hash = sim.state_hash();
        assert_eq!(sim.advance_turn().status, TurnStatus::Idle);
        assert_eq!(
            sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0)),
            PlacementOutcome::Rejected {
                reason: PlacementRejection::NotRunning
            }
        );
        assert_eq!(sim.state_hash(), hash);
    }

    #[test]
    fn test_activate_tile_collects_then_places() {
        let mut sim = sim();
        sim.spawn(Entity::pickup(GridPos::new(5, 0), 25));

        assert_eq!(sim.activate_tile(GridPos::new(5, 0)), TileOutcome::Collected { reward: 25 });
        assert_eq!(sim.balance(), 425);
        assert_eq!(sim.activate_tile(GridPos::new(5, 0)), TileOutcome::NoSelection);

        sim.select_defender(DefenderKind::Producer);
        let outcome = sim.activate_tile(GridPos::new(5, 0));
        assert!(matches!(
            outcome,
            TileOutcome::Placement {
                placement: PlacementOutcome::Placed { .. }
            }
        ));
        assert_eq!(sim.selected(), None);
        assert_eq!(sim.balance(), 375);
    }

    #[test]
    fn test_failed_activation_keeps_selection() {
        let mut sim = sim();
        sim.select_defender(DefenderKind::Shooter);
        sim.place_defender(DefenderKind::Wall, GridPos::new(1, 0));
        let outcome = sim.activate_tile(GridPos::new(1, 0));
        assert!(matches!(
            outcome,
            TileOutcome::Placement {
                placement: PlacementOutcome::Rejected { .. }
            }
        ));
        assert_eq!(sim.selected(), Some(DefenderKind::Shooter));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut sim = sim();
        sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        let snapshot = sim.snapshot();
        let hash = sim.state_hash();

        for _ in 0..6 {
            sim.advance_turn();
        }
        assert_ne!(sim.state_hash(), hash);

        sim.restore(snapshot);
        assert_eq!(sim.state_hash(), hash);
    }

    #[test]
    fn test_restart_matches_fresh_simulation() {
        let fresh = sim();
        let mut played = sim();
        played.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        for _ in 0..7 {
            played.advance_turn();
        }
        played.restart();
        assert_eq!(played.state_hash(), fresh.state_hash());
        assert!(played.drain_events().contains(&GameEvent::Restarted));
    }

    #[test]
    fn test_events_staged_until_drained() {
        let mut sim = sim();
        sim.drain_events();
        sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        let events = sim.drain_events();
        assert!(matches!(events[0], GameEvent::UnitSpawned { .. }));
        assert_eq!(events[1], GameEvent::BalanceChanged { balance: 300 });
        assert!(matches!(events[2], GameEvent::PurchasablesUpdated { .. }));
        assert!(sim.pending_events().is_empty());
    }
}
