//! Batch autoplay for balance testing.
//!
//! Plays many games with a scripted strategy, one seed per game, in
//! parallel using rayon, and collects metrics for each.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use siege_core::config::GameConfig;
use siege_core::error::Result;
use siege_core::history::CommandOutcome;
use siege_core::simulation::{PlacementOutcome, Simulation};

use crate::metrics::{BatchSummary, GameMetrics, GameOutcome, MetricsCollector};
use crate::strategies::{Strategy, StrategyExecutor};

/// Default turn limit per game.
pub const DEFAULT_MAX_TURNS: u64 = 500;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Maximum turns per game
    pub max_turns: u64,
    /// Strategy every game plays
    pub strategy: Strategy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_turns: DEFAULT_MAX_TURNS,
            strategy: Strategy::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` games with the default strategy
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set turn limit
    pub fn with_max_turns(mut self, max_turns: u64) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Play one game to the end or the turn limit.
///
/// # Errors
///
/// Fails only if `config` (with `seed` applied) is invalid.
pub fn play_game(
    config: &GameConfig,
    strategy: &Strategy,
    seed: u64,
    max_turns: u64,
) -> Result<GameMetrics> {
    let mut sim = Simulation::new(GameConfig {
        seed,
        ..config.clone()
    })?;
    let mut executor = StrategyExecutor::new(strategy.clone());
    let mut collector = MetricsCollector::new(&format!("game_{seed}"), executor.name(), seed);
    collector.on_events(&sim.drain_events());

    while sim.is_running() && sim.turn() < max_turns {
        for command in executor.decide(&sim) {
            if let CommandOutcome::Placement { placement } = command.apply(&mut sim) {
                match placement {
                    PlacementOutcome::Placed { .. } => executor.advance_build_order(),
                    PlacementOutcome::Rejected { reason } => {
                        debug!(seed, %reason, "autoplay placement rejected");
                        collector.on_placement_rejected();
                    }
                }
            }
        }
        sim.advance_turn();
        collector.on_events(&sim.drain_events());
    }

    let metrics = collector.finalize(sim.turn(), sim.balance(), sim.state_hash());
    debug!(seed, outcome = ?metrics.outcome, turns = metrics.turns, "game finished");
    Ok(metrics)
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig, game_config: &GameConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        games = config.game_count,
        strategy = %config.strategy.name,
        seed_start = config.seed_start,
        "starting batch run"
    );

    let play = |i: u32| {
        let seed = config.seed_start.wrapping_add(u64::from(i));
        play_game(game_config, &config.strategy, seed, config.max_turns).map_err(|e| {
            warn!(game = i, seed, %e, "game failed");
            BatchError {
                game_index: i,
                seed,
                message: e.to_string(),
            }
        })
    };

    let pool = (config.parallel_games > 0)
        .then(|| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel_games as usize)
                .build()
                .ok()
        })
        .flatten();
    let results: Vec<std::result::Result<GameMetrics, BatchError>> = match &pool {
        Some(pool) => pool.install(|| (0..config.game_count).into_par_iter().map(play).collect()),
        None => (0..config.game_count).into_par_iter().map(play).collect(),
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_ok());
    let games: Vec<GameMetrics> = games.into_iter().filter_map(|r| r.ok()).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(|r| r.err()).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        wins = summary.wins,
        losses = summary.losses,
        duration_seconds,
        "batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Play the same seed `runs` times and check every game ends identically.
pub fn verify_determinism(game_config: &GameConfig, strategy: &Strategy, seed: u64, runs: u32) -> bool {
    let results: Vec<GameMetrics> = (0..runs)
        .filter_map(|_| play_game(game_config, strategy, seed, DEFAULT_MAX_TURNS).ok())
        .collect();
    if results.len() != runs as usize {
        return false;
    }
    results.windows(2).all(|w| w[0] == w[1])
}

/// Default location for batch results.
#[must_use]
pub fn default_results_path() -> PathBuf {
    PathBuf::from("results").join("autoplay.json")
}
