//! Test fixtures and helpers.
//!
//! The standard game spawns its wave at random. Scenario tests instead use a
//! *sandbox*: the standard board and tuning with a single sentinel attacker
//! parked far beyond the edge, so the round never ends by itself and tests
//! can stage attackers exactly where they need them.

use siege_core::config::GameConfig;
use siege_core::data::LevelData;
use siege_core::grid::GridPos;
use siege_core::components::EntityId;
use siege_core::simulation::{Entity, Simulation};
use siege_core::unit_kind::{AttackerKind, EntityKind};

/// Column where the sandbox sentinel waits.
pub const SENTINEL_COLUMN: i32 = 1000;

/// Level that parks one basic attacker at [`SENTINEL_COLUMN`].
#[must_use]
pub fn sentinel_level(name: &str) -> LevelData {
    LevelData {
        name: name.to_string(),
        basic: 1,
        armored: 0,
        spawn_offset: SENTINEL_COLUMN,
        spawn_spread: 1,
    }
}

/// Standard tuning with a single sentinel level.
#[must_use]
pub fn sandbox_config() -> GameConfig {
    GameConfig {
        levels: vec![sentinel_level("sandbox")],
        ..GameConfig::default()
    }
}

/// Standard tuning with two sentinel levels.
#[must_use]
pub fn two_level_config() -> GameConfig {
    GameConfig {
        levels: vec![sentinel_level("first"), sentinel_level("second")],
        ..GameConfig::default()
    }
}

/// Sandbox simulation with its staged events already drained.
///
/// # Panics
///
/// Panics if the sandbox configuration is invalid.
#[must_use]
pub fn sandbox() -> Simulation {
    simulation(sandbox_config())
}

/// Simulation for `config` with its staged events already drained.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn simulation(config: GameConfig) -> Simulation {
    let mut sim = Simulation::new(config).expect("fixture config is valid");
    sim.drain_events();
    sim
}

/// Parse a configuration from RON text.
///
/// # Panics
///
/// Panics if the text does not parse or validate.
#[must_use]
pub fn config_from_ron(text: &str) -> GameConfig {
    GameConfig::from_ron_str(text).expect("fixture RON is valid")
}

/// Stage an attacker with the configured stats.
pub fn spawn_attacker(sim: &mut Simulation, kind: AttackerKind, position: GridPos) -> EntityId {
    let data = *sim.config().attackers.get(kind);
    sim.spawn_entity(Entity::attacker(kind, position, &data))
}

/// The sentinel attacker, if still present.
///
/// Anything waiting past the far edge counts as the sentinel.
#[must_use]
pub fn sentinel(sim: &Simulation) -> Option<EntityId> {
    let grid = sim.config().grid;
    sim.entities()
        .iter()
        .find(|e| e.kind.is_attacker() && grid.is_beyond_far_edge(e.position))
        .map(|e| e.id)
}

/// Remove every attacker, so the next turn clears the round.
pub fn remove_attackers(sim: &mut Simulation) {
    let ids: Vec<_> = sim
        .entities()
        .iter()
        .filter(|e| e.kind.is_attacker())
        .map(|e| e.id)
        .collect();
    for id in ids {
        sim.despawn_entity(id);
    }
}

/// Entities of a kind, in collection order.
#[must_use]
pub fn entities_where(sim: &Simulation, pred: impl Fn(&EntityKind) -> bool) -> Vec<&Entity> {
    sim.entities().iter().filter(|e| pred(&e.kind)).collect()
}

/// Current health of an entity.
#[must_use]
pub fn health_of(sim: &Simulation, id: EntityId) -> Option<i32> {
    sim.entity(id).and_then(|e| e.health).map(|h| h.current)
}
