//! Turn engine systems.
//!
//! Systems contain the logic that processes components. Each system does one
//! thing: count down a fire rate, find the first contact for a mover, pick
//! blast targets, find dead entities, judge the round. They read entity
//! slices in collection order and never mutate the collection themselves;
//! [`crate::simulation::Simulation`] applies their results.

use crate::components::EntityId;
use crate::config::AttackerTable;
use crate::grid::{GridPos, GridSize};
use crate::simulation::Entity;
use crate::unit_kind::{DefenderKind, DefenderRole, EntityKind};

/// Resolved interaction between a mover and one other entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// A projectile struck an attacker. The attacker takes `damage` and the
    /// projectile is consumed.
    ProjectileHit {
        /// Damage applied to the attacker.
        damage: i32,
    },
    /// An attacker reached a ready melee blocker. The attacker takes
    /// `damage` and the blocker engages.
    BlockerBite {
        /// Damage applied to the attacker.
        damage: i32,
    },
    /// An attacker reached any other defender, or an engaged blocker. The
    /// defender takes `damage`.
    DefenderHit {
        /// Damage applied to the defender.
        damage: i32,
    },
}

/// Counts down a defender's fire rate for the production pass.
///
/// Returns the defender's kind and role when it should act this turn; the
/// counter has already been reset. Melee blockers never act here: while
/// engaged their counter measures digestion and releases the lock when it
/// elapses, while ready the counter is held.
pub fn production_tick(entity: &mut Entity) -> Option<(DefenderKind, DefenderRole)> {
    let kind = entity.kind.defender()?;
    let fire_rate = entity.fire_rate.as_mut()?;

    match kind.role() {
        DefenderRole::Barrier => None,
        DefenderRole::MeleeBlocker => {
            if let Some(bite) = entity.bite.as_mut() {
                if bite.engaged && fire_rate.tick() {
                    bite.engaged = false;
                    fire_rate.reset();
                    tracing::trace!(id = entity.id, "blocker released");
                }
            }
            None
        }
        role => {
            if fire_rate.tick() {
                fire_rate.reset();
                Some((kind, role))
            } else {
                None
            }
        }
    }
}

/// Type-specific resolution for a mover touching `other`.
///
/// Pairs with no rule (attacker and projectile the other way round,
/// attacker and pickup, two attackers, projectile and defender) yield
/// `None`.
#[must_use]
pub fn contact_between(mover: &Entity, other: &Entity, attackers: &AttackerTable) -> Option<Contact> {
    match (mover.kind, other.kind) {
        (EntityKind::Projectile { damage }, EntityKind::Attacker(_)) => {
            Some(Contact::ProjectileHit { damage })
        }
        (EntityKind::Attacker(kind), EntityKind::Defender(_)) => match other.bite {
            Some(bite) if !bite.engaged => Some(Contact::BlockerBite {
                damage: bite.damage,
            }),
            _ => Some(Contact::DefenderHit {
                damage: attackers.get(kind).damage,
            }),
        },
        _ => None,
    }
}

/// First contact for `mover`, scanning `entities` in collection order.
///
/// A candidate touches the mover if it sits on the mover's intended next
/// cell (will collide) or on its current cell (has collided).
#[must_use]
pub fn first_contact(
    entities: &[Entity],
    mover: &Entity,
    attackers: &AttackerTable,
) -> Option<(EntityId, Contact)> {
    let next = mover.next_position();
    entities
        .iter()
        .filter(|other| other.id != mover.id)
        .filter(|other| other.position == next || other.position == mover.position)
        .find_map(|other| contact_between(mover, other, attackers).map(|c| (other.id, c)))
}

/// Attackers caught in a blast centred on `center`.
///
/// The blast covers the 3×3 block around the centre, clipped to the board.
#[must_use]
pub fn blast_targets(entities: &[Entity], center: GridPos, grid: GridSize) -> Vec<EntityId> {
    let block: Vec<GridPos> = center
        .neighborhood()
        .filter(|cell| grid.contains(*cell))
        .collect();
    entities
        .iter()
        .filter(|e| e.kind.is_attacker() && block.contains(&e.position))
        .map(|e| e.id)
        .collect()
}

/// On-board cells holding no entity at all, row-major.
#[must_use]
pub fn free_cells(entities: &[Entity], grid: GridSize) -> Vec<GridPos> {
    grid.cells()
        .filter(|cell| entities.iter().all(|e| e.position != *cell))
        .collect()
}

/// Alive entities whose health has reached zero or below.
#[must_use]
pub fn dead_entities(entities: &[Entity]) -> Vec<EntityId> {
    entities
        .iter()
        .filter(|e| e.health.is_some_and(|h| h.is_dead()))
        .map(|e| e.id)
        .collect()
}

/// Round state after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// An attacker stands on or past column 0.
    Breached,
    /// No attackers remain.
    Cleared,
    /// Play continues.
    Ongoing,
}

/// Judge the round. A breach wins over an empty board.
#[must_use]
pub fn round_state(entities: &[Entity]) -> RoundState {
    let mut attackers = entities.iter().filter(|e| e.kind.is_attacker()).peekable();
    if attackers.peek().is_none() {
        return RoundState::Cleared;
    }
    if attackers.any(|e| e.position.column <= 0) {
        RoundState::Breached
    } else {
        RoundState::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefenderTable, GameConfig};
    use crate::unit_kind::AttackerKind;

    fn attacker(id: EntityId, column: i32, row: i32) -> Entity {
        let config = GameConfig::default();
        let mut e = Entity::attacker(
            AttackerKind::Basic,
            GridPos::new(column, row),
            config.attackers.get(AttackerKind::Basic),
        );
        e.id = id;
        e
    }

    fn defender(id: EntityId, kind: DefenderKind, column: i32, row: i32) -> Entity {
        let table = DefenderTable::default();
        let mut e = Entity::defender(kind, GridPos::new(column, row), table.get(kind));
        e.id = id;
        e
    }

    fn projectile(id: EntityId, column: i32, row: i32) -> Entity {
        let mut e = Entity::projectile(GridPos::new(column, row), 3, 1);
        e.id = id;
        e
    }

    #[test]
    fn test_shooter_fires_every_rate_turns() {
        let mut shooter = defender(1, DefenderKind::Shooter, 0, 0);
        assert_eq!(production_tick(&mut shooter), None);
        assert_eq!(
            production_tick(&mut shooter),
            Some((DefenderKind::Shooter, DefenderRole::Ranged))
        );
        assert_eq!(production_tick(&mut shooter), None);
    }

    #[test]
    fn test_wall_never_fires() {
        let mut wall = defender(1, DefenderKind::Wall, 0, 0);
        for _ in 0..50 {
            assert_eq!(production_tick(&mut wall), None);
        }
    }

    #[test]
    fn test_ready_blocker_holds_counter() {
        let mut blocker = defender(1, DefenderKind::Blocker, 0, 0);
        let before = blocker.fire_rate;
        for _ in 0..5 {
            assert_eq!(production_tick(&mut blocker), None);
        }
        assert_eq!(blocker.fire_rate, before);
    }

    #[test]
    fn test_engaged_blocker_digests_then_releases() {
        let mut blocker = defender(1, DefenderKind::Blocker, 0, 0);
        if let Some(bite) = blocker.bite.as_mut() {
            bite.engaged = true;
        }
        let rate = blocker.fire_rate.map_or(0, |f| f.rate);
        for _ in 1..rate {
            production_tick(&mut blocker);
            assert!(blocker.bite.is_some_and(|b| b.engaged));
        }
        production_tick(&mut blocker);
        assert!(blocker.bite.is_some_and(|b| !b.engaged));
    }

    #[test]
    fn test_projectile_hits_attacker_on_next_cell() {
        let table = GameConfig::default().attackers;
        let shot = projectile(1, 3, 1);
        let entities = vec![shot.clone(), attacker(2, 4, 1)];
        assert_eq!(
            first_contact(&entities, &shot, &table),
            Some((2, Contact::ProjectileHit { damage: 3 }))
        );
    }

    #[test]
    fn test_projectile_hits_attacker_on_same_cell() {
        let table = GameConfig::default().attackers;
        let shot = projectile(2, 4, 1);
        let entities = vec![attacker(1, 4, 1), shot.clone()];
        assert!(first_contact(&entities, &shot, &table).is_some());
    }

    #[test]
    fn test_attacker_ignores_projectiles_and_pickups() {
        let table = GameConfig::default().attackers;
        let zombie = attacker(1, 5, 2);
        let mut pickup = Entity::pickup(GridPos::new(4, 2), 25);
        pickup.id = 3;
        let entities = vec![zombie.clone(), projectile(2, 4, 2), pickup];
        assert_eq!(first_contact(&entities, &zombie, &table), None);
    }

    #[test]
    fn test_first_match_in_collection_order_wins() {
        let table = GameConfig::default().attackers;
        let shot = projectile(3, 4, 0);
        let entities = vec![attacker(5, 5, 0), attacker(1, 4, 0), shot.clone()];
        assert_eq!(
            first_contact(&entities, &shot, &table).map(|(id, _)| id),
            Some(5)
        );
    }

    #[test]
    fn test_ready_blocker_bites_engaged_blocker_is_hit() {
        let table = GameConfig::default().attackers;
        let zombie = attacker(1, 5, 0);
        let mut blocker = defender(2, DefenderKind::Blocker, 4, 0);

        assert!(matches!(
            contact_between(&zombie, &blocker, &table),
            Some(Contact::BlockerBite { damage: 4 })
        ));

        if let Some(bite) = blocker.bite.as_mut() {
            bite.engaged = true;
        }
        assert!(matches!(
            contact_between(&zombie, &blocker, &table),
            Some(Contact::DefenderHit { damage: 2 })
        ));
    }

    #[test]
    fn test_blast_is_clipped_to_board() {
        let grid = GridSize::new(10, 5);
        let entities = vec![
            attacker(1, 0, 0),
            attacker(2, 1, 1),
            attacker(3, 2, 2),
            attacker(4, -1, 0),
            defender(5, DefenderKind::Wall, 1, 0),
        ];
        assert_eq!(blast_targets(&entities, GridPos::new(0, 0), grid), vec![1, 2]);
    }

    #[test]
    fn test_free_cells_skip_any_occupant() {
        let grid = GridSize::new(2, 1);
        let entities = vec![projectile(1, 0, 0)];
        assert_eq!(free_cells(&entities, grid), vec![GridPos::new(1, 0)]);
    }

    #[test]
    fn test_dead_entities_includes_zero_health() {
        let mut a = attacker(1, 5, 0);
        let b = attacker(2, 5, 1);
        if let Some(h) = a.health.as_mut() {
            h.current = 0;
        }
        assert_eq!(dead_entities(&[a, b]), vec![1]);
    }

    #[test]
    fn test_round_state() {
        assert_eq!(round_state(&[]), RoundState::Cleared);
        assert_eq!(
            round_state(&[defender(1, DefenderKind::Wall, 0, 0)]),
            RoundState::Cleared
        );
        assert_eq!(round_state(&[attacker(1, 3, 0)]), RoundState::Ongoing);
        assert_eq!(
            round_state(&[attacker(1, 3, 0), attacker(2, 0, 4)]),
            RoundState::Breached
        );
    }
}
