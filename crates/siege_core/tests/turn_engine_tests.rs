//! Turn engine tests.
//!
//! Scripted boards built on the sandbox fixture: attackers are staged by
//! hand so every contact, blast and boundary happens on a known turn.

use siege_core::config::GameConfig;
use siege_core::events::{GameEvent, RemovalCause};
use siege_core::grid::GridPos;
use siege_core::simulation::{Entity, PlacementOutcome, TurnStatus};
use siege_core::unit_kind::{AttackerKind, DefenderKind, EntityKind};
use siege_test_utils::fixtures::{
    entities_where, health_of, remove_attackers, sandbox, sandbox_config, sentinel, simulation,
    spawn_attacker, two_level_config,
};

fn removals(events: &[GameEvent], wanted: RemovalCause) -> Vec<EntityKind> {
    events
        .iter()
        .filter_map(|event| match event {
            GameEvent::UnitRemoved { kind, cause, .. } if *cause == wanted => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn projectile_leaving_board_is_removed_same_turn() {
    let mut sim = sandbox();
    let id = sim.spawn_entity(Entity::projectile(GridPos::new(9, 0), 1, 1));
    sim.drain_events();

    sim.advance_turn();

    assert!(sim.entity(id).is_none());
    let events = sim.drain_events();
    assert_eq!(
        removals(&events, RemovalCause::OutOfBounds),
        vec![EntityKind::Projectile { damage: 1 }]
    );
}

#[test]
fn shooter_on_last_column_fires_off_board() {
    let mut config = sandbox_config();
    config.defenders.get_mut(DefenderKind::Shooter).fire_rate = Some(1);
    let mut sim = simulation(config);
    sim.place_defender(DefenderKind::Shooter, GridPos::new(9, 4));
    sim.drain_events();

    sim.advance_turn();

    let events = sim.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::UnitSpawned { kind: EntityKind::Projectile { .. }, .. })));
    assert_eq!(removals(&events, RemovalCause::OutOfBounds).len(), 1);
    assert!(entities_where(&sim, EntityKind::is_projectile).is_empty());
}

#[test]
fn projectile_hits_attacker_it_would_reach() {
    let mut sim = sandbox();
    let target = spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(6, 2));
    sim.spawn_entity(Entity::projectile(GridPos::new(4, 2), 2, 1));
    sim.drain_events();

    // Attacker steps to (5,2); the projectile then sees it on its next cell.
    sim.advance_turn();

    assert_eq!(health_of(&sim, target), Some(3));
    assert_eq!(removals(&sim.drain_events(), RemovalCause::Impact).len(), 1);
}

#[test]
fn detonator_blasts_three_by_three_and_removes_itself() {
    let mut config = sandbox_config();
    config.defenders.get_mut(DefenderKind::Detonator).damage = 3;
    let mut sim = simulation(config);
    sim.place_defender(DefenderKind::Detonator, GridPos::new(5, 2));
    sim.advance_turn();
    sim.advance_turn();

    let inside = [
        spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(6, 2)),
        spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(4, 1)),
        spawn_attacker(&mut sim, AttackerKind::Armored, GridPos::new(6, 3)),
    ];
    let outside = spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(8, 2));
    sim.drain_events();

    sim.advance_turn();

    assert_eq!(health_of(&sim, inside[0]), Some(2));
    assert_eq!(health_of(&sim, inside[1]), Some(2));
    assert_eq!(health_of(&sim, inside[2]), Some(7));
    assert_eq!(health_of(&sim, outside), Some(5));
    assert!(entities_where(&sim, EntityKind::is_defender).is_empty());
    assert_eq!(
        removals(&sim.drain_events(), RemovalCause::Detonated),
        vec![EntityKind::Defender(DefenderKind::Detonator)]
    );
}

#[test]
fn detonator_kills_are_swept_same_turn() {
    let mut sim = sandbox();
    sim.place_defender(DefenderKind::Detonator, GridPos::new(0, 0));
    sim.advance_turn();
    sim.advance_turn();
    let victim = spawn_attacker(&mut sim, AttackerKind::Armored, GridPos::new(1, 1));
    sim.drain_events();

    let report = sim.advance_turn();

    assert!(sim.entity(victim).is_none());
    assert_eq!(report.status, TurnStatus::Continuing);
    assert_eq!(removals(&sim.drain_events(), RemovalCause::Died).len(), 1);
}

#[test]
fn blocker_bites_only_one_of_two_stacked_attackers() {
    let mut sim = sandbox();
    let first = spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(4, 0));
    let second = spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(4, 0));
    let PlacementOutcome::Placed { id: blocker } =
        sim.place_defender(DefenderKind::Blocker, GridPos::new(3, 0))
    else {
        panic!("blocker placement refused");
    };

    sim.advance_turn();

    // Bite of 4 on the first attacker, contact hit of 2 from the second.
    assert_eq!(health_of(&sim, first), Some(1));
    assert_eq!(health_of(&sim, second), Some(5));
    assert_eq!(health_of(&sim, blocker), Some(4));
    for id in [first, second] {
        assert_eq!(sim.entity(id).map(|e| e.position), Some(GridPos::new(4, 0)));
    }
    assert_eq!(
        sim.entity(blocker).and_then(|e| e.bite).map(|b| b.engaged),
        Some(true)
    );
}

#[test]
fn attacker_reaching_column_zero_ends_game_that_turn() {
    let mut sim = sandbox();
    spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(1, 2));
    sim.drain_events();

    let report = sim.advance_turn();

    assert_eq!(report.status, TurnStatus::GameOver);
    assert!(!sim.is_running());
    assert!(sentinel(&sim).is_some(), "other attackers remain");
    assert!(sim
        .drain_events()
        .contains(&GameEvent::GameOver { turn: 1 }));

    let idle = sim.advance_turn();
    assert_eq!(idle.status, TurnStatus::Idle);
    assert_eq!(sim.turn(), 1);
}

#[test]
fn placement_refused_after_loss() {
    let mut sim = sandbox();
    spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(1, 2));
    sim.advance_turn();

    assert!(!sim.place_defender(DefenderKind::Wall, GridPos::new(5, 0)).is_placed());
    assert_eq!(sim.balance(), 400);
}

#[test]
fn cleared_round_moves_to_next_level_and_resets_cooldowns() {
    let mut sim = simulation(two_level_config());
    sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
    sim.place_defender(DefenderKind::Wall, GridPos::new(0, 1));
    assert!(!sim.deployment().is_deployable(DefenderKind::Shooter, sim.turn()));
    remove_attackers(&mut sim);
    sim.drain_events();

    let report = sim.advance_turn();

    assert_eq!(report.status, TurnStatus::RoundOver { level: 1 });
    assert_eq!(sim.level(), 1);
    assert_eq!(sim.turn(), 1, "turn counter is not reset between rounds");
    assert_eq!(sim.balance(), 400);
    for kind in DefenderKind::ALL {
        assert_eq!(sim.deployment().slot(kind).next_deployable, 0);
    }
    assert!(entities_where(&sim, EntityKind::is_defender).is_empty());
    assert!(sentinel(&sim).is_some(), "next wave spawned");

    let events = sim.drain_events();
    assert!(events.contains(&GameEvent::RoundOver {
        completed_level: 0,
        next_level: 1
    }));
    assert!(events.contains(&GameEvent::BalanceChanged { balance: 400 }));
}

#[test]
fn clearing_last_level_wins() {
    let mut sim = sandbox();
    remove_attackers(&mut sim);

    let report = sim.advance_turn();

    assert_eq!(report.status, TurnStatus::GameWon);
    assert!(!sim.is_running());
    assert!(sim.drain_events().contains(&GameEvent::GameWon { turn: 1 }));
}

#[test]
fn breach_takes_priority_over_cleared_board() {
    let mut sim = sandbox();
    remove_attackers(&mut sim);
    spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(0, 0));

    assert_eq!(sim.advance_turn().status, TurnStatus::GameOver);
}

#[test]
fn producer_drops_pickup_on_free_cell() {
    let mut sim = sandbox();
    sim.place_defender(DefenderKind::Producer, GridPos::new(0, 0));
    for _ in 0..4 {
        sim.advance_turn();
    }

    let pickups = entities_where(&sim, EntityKind::is_pickup);
    assert_eq!(pickups.len(), 1);
    let cell = pickups[0].position;
    assert_ne!(cell, GridPos::new(0, 0));
    assert!(sim.config().grid.contains(cell));

    // 350 after placement, 375 after welfare on turn 4, 400 after collecting.
    assert_eq!(sim.collect_pickup(cell), Some(25));
    assert_eq!(sim.balance(), 400);
    assert!(entities_where(&sim, EntityKind::is_pickup).is_empty());
}

#[test]
fn producer_skips_when_board_is_full() {
    let config = GameConfig {
        grid: siege_core::grid::GridSize::new(1, 1),
        ..sandbox_config()
    };
    let mut sim = simulation(config);
    sim.place_defender(DefenderKind::Producer, GridPos::new(0, 0));
    for _ in 0..8 {
        sim.advance_turn();
    }
    assert!(entities_where(&sim, EntityKind::is_pickup).is_empty());
}

#[test]
fn attackers_ignore_pickups() {
    let mut sim = sandbox();
    let attacker = spawn_attacker(&mut sim, AttackerKind::Basic, GridPos::new(5, 0));
    sim.spawn_entity(Entity::pickup(GridPos::new(4, 0), 25));

    sim.advance_turn();

    let moved = sim.entity(attacker).map(|e| e.position);
    assert_eq!(moved, Some(GridPos::new(4, 0)));
}

#[test]
fn purchasables_announced_every_turn() {
    let mut sim = sandbox();
    sim.drain_events();
    sim.advance_turn();
    assert!(sim
        .drain_events()
        .iter()
        .any(|e| matches!(e, GameEvent::PurchasablesUpdated { .. })));
}
