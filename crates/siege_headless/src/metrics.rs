//! Game metrics for autoplay runs.
//!
//! A [`MetricsCollector`] folds the notification stream of one game into a
//! [`GameMetrics`]; [`BatchSummary`] aggregates many of them.

use serde::{Deserialize, Serialize};

use siege_core::events::{GameEvent, RemovalCause};
use siege_core::unit_kind::EntityKind;

/// How a game ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Every level cleared.
    Won,
    /// An attacker broke through.
    Lost,
    /// The turn limit was reached first.
    #[default]
    Unfinished,
}

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Strategy that played.
    pub strategy: String,
    /// Random seed used.
    pub seed: u64,
    /// How the game ended.
    pub outcome: GameOutcome,
    /// Turns played.
    pub turns: u64,
    /// Rounds cleared, including a final winning one.
    pub levels_cleared: u32,
    /// Defenders placed by the player.
    pub defenders_placed: u32,
    /// Placements refused by the deployment gate.
    pub placements_rejected: u32,
    /// Defenders lost to attackers.
    pub defenders_lost: u32,
    /// Attackers killed.
    pub attackers_killed: u32,
    /// Pickups collected.
    pub pickups_collected: u32,
    /// Balance when the game stopped.
    pub final_balance: i32,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new game metrics instance.
    #[must_use]
    pub fn new(game_id: impl Into<String>, strategy: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            strategy: strategy.into(),
            seed,
            ..Default::default()
        }
    }
}

/// Collects metrics during a game.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: GameMetrics,
}

impl MetricsCollector {
    /// Create a new collector.
    #[must_use]
    pub fn new(game_id: &str, strategy: &str, seed: u64) -> Self {
        Self {
            metrics: GameMetrics::new(game_id, strategy, seed),
        }
    }

    /// Fold one notification into the metrics.
    pub fn on_event(&mut self, event: &GameEvent) {
        let m = &mut self.metrics;
        match event {
            GameEvent::UnitSpawned {
                kind: EntityKind::Defender(_),
                ..
            } => m.defenders_placed += 1,
            GameEvent::UnitRemoved { kind, cause, .. } => match (kind, cause) {
                (EntityKind::Attacker(_), RemovalCause::Died) => m.attackers_killed += 1,
                (EntityKind::Defender(_), RemovalCause::Died) => m.defenders_lost += 1,
                (EntityKind::Pickup { .. }, RemovalCause::Collected) => m.pickups_collected += 1,
                _ => {}
            },
            GameEvent::BalanceChanged { balance } => m.final_balance = *balance,
            GameEvent::RoundOver { .. } => m.levels_cleared += 1,
            GameEvent::GameWon { turn } => {
                m.levels_cleared += 1;
                m.outcome = GameOutcome::Won;
                m.turns = *turn;
            }
            GameEvent::GameOver { turn } => {
                m.outcome = GameOutcome::Lost;
                m.turns = *turn;
            }
            GameEvent::Restarted => {
                let fresh = GameMetrics::new(
                    std::mem::take(&mut m.game_id),
                    std::mem::take(&mut m.strategy),
                    m.seed,
                );
                *m = fresh;
            }
            _ => {}
        }
    }

    /// Fold a batch of notifications.
    pub fn on_events<'a>(&mut self, events: impl IntoIterator<Item = &'a GameEvent>) {
        for event in events {
            self.on_event(event);
        }
    }

    /// Count a refused placement.
    pub fn on_placement_rejected(&mut self) {
        self.metrics.placements_rejected += 1;
    }

    /// Finish the game.
    #[must_use]
    pub fn finalize(mut self, turns: u64, balance: i32, state_hash: u64) -> GameMetrics {
        self.metrics.turns = turns;
        self.metrics.final_balance = balance;
        self.metrics.final_state_hash = state_hash;
        self.metrics
    }

    /// Metrics so far.
    #[must_use]
    pub const fn current(&self) -> &GameMetrics {
        &self.metrics
    }
}

/// Summary statistics across multiple games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games won.
    pub wins: u32,
    /// Games lost.
    pub losses: u32,
    /// Games stopped by the turn limit.
    pub unfinished: u32,
    /// Wins over total games.
    pub win_rate: f64,
    /// Average game length in turns.
    pub avg_turns: f64,
    /// Shortest game.
    pub min_turns: u64,
    /// Longest game.
    pub max_turns: u64,
    /// Average rounds cleared.
    pub avg_levels_cleared: f64,
    /// Average attackers killed.
    pub avg_attackers_killed: f64,
    /// Average pickups collected.
    pub avg_pickups_collected: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count =
            |outcome: GameOutcome| games.iter().filter(|g| g.outcome == outcome).count() as u32;
        let total = games.len() as f64;
        let mean = |f: fn(&GameMetrics) -> u64| games.iter().map(f).sum::<u64>() as f64 / total;

        let wins = count(GameOutcome::Won);
        Self {
            total_games: games.len() as u32,
            wins,
            losses: count(GameOutcome::Lost),
            unfinished: count(GameOutcome::Unfinished),
            win_rate: f64::from(wins) / total,
            avg_turns: mean(|g| g.turns),
            min_turns: games.iter().map(|g| g.turns).min().unwrap_or(0),
            max_turns: games.iter().map(|g| g.turns).max().unwrap_or(0),
            avg_levels_cleared: mean(|g| u64::from(g.levels_cleared)),
            avg_attackers_killed: mean(|g| u64::from(g.attackers_killed)),
            avg_pickups_collected: mean(|g| u64::from(g.pickups_collected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::grid::GridPos;
    use siege_core::unit_kind::{AttackerKind, DefenderKind};

    fn removed(kind: EntityKind, cause: RemovalCause) -> GameEvent {
        GameEvent::UnitRemoved {
            id: 1,
            kind,
            position: GridPos::new(0, 0),
            cause,
        }
    }

    #[test]
    fn test_collector_counts_events() {
        let mut collector = MetricsCollector::new("g", "Balanced", 7);
        collector.on_events(&[
            GameEvent::UnitSpawned {
                id: 1,
                kind: EntityKind::Defender(DefenderKind::Wall),
                position: GridPos::new(0, 0),
            },
            removed(EntityKind::Attacker(AttackerKind::Basic), RemovalCause::Died),
            removed(EntityKind::Attacker(AttackerKind::Basic), RemovalCause::Cleared),
            removed(EntityKind::Pickup { reward: 25 }, RemovalCause::Collected),
            removed(EntityKind::Projectile { damage: 1 }, RemovalCause::Impact),
            GameEvent::RoundOver {
                completed_level: 0,
                next_level: 1,
            },
            GameEvent::GameOver { turn: 40 },
        ]);
        collector.on_placement_rejected();

        let metrics = collector.current();
        assert_eq!(metrics.defenders_placed, 1);
        assert_eq!(metrics.attackers_killed, 1);
        assert_eq!(metrics.pickups_collected, 1);
        assert_eq!(metrics.levels_cleared, 1);
        assert_eq!(metrics.placements_rejected, 1);
        assert_eq!(metrics.outcome, GameOutcome::Lost);
        assert_eq!(metrics.turns, 40);
    }

    #[test]
    fn test_win_counts_final_level() {
        let mut collector = MetricsCollector::new("g", "s", 0);
        collector.on_event(&GameEvent::GameWon { turn: 90 });
        let metrics = collector.finalize(90, 120, 5);
        assert_eq!(metrics.levels_cleared, 1);
        assert_eq!(metrics.outcome, GameOutcome::Won);
        assert_eq!(metrics.final_state_hash, 5);
    }

    #[test]
    fn test_summary_from_games() {
        let game = |outcome, turns| GameMetrics {
            outcome,
            turns,
            ..GameMetrics::default()
        };
        let summary = BatchSummary::from_games(&[
            game(GameOutcome::Won, 100),
            game(GameOutcome::Lost, 40),
            game(GameOutcome::Won, 120),
            game(GameOutcome::Unfinished, 200),
        ]);
        assert_eq!(summary.total_games, 4);
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.losses, 1);
        assert_eq!(summary.unfinished, 1);
        assert!((summary.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((summary.avg_turns - 115.0).abs() < f64::EPSILON);
        assert_eq!(summary.min_turns, 40);
        assert_eq!(summary.max_turns, 200);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
