//! Scripted strategies for headless playtesting.
//!
//! A [`Strategy`] is a build order plus a few placement preferences. The
//! [`StrategyExecutor`] turns it into core commands each turn, greedily:
//! collect every pickup, then buy the next item of the build order as soon
//! as the deployment gate allows it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use siege_core::grid::GridPos;
use siege_core::history::Command;
use siege_core::simulation::{Entity, Simulation};
use siege_core::unit_kind::{DefenderKind, DefenderRole};

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The build order is empty.
    #[error("Strategy '{0}' has an empty build order")]
    EmptyBuildOrder(String),
}

/// A complete autoplay strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Defenders to buy, in order. Repeats from the start when exhausted.
    pub build_order: Vec<DefenderKind>,
    /// Collect pickups as soon as they appear.
    #[serde(default = "default_true")]
    pub collect_pickups: bool,
    /// Rightmost column for walls and blockers.
    #[serde(default = "default_front_column")]
    pub front_column: i32,
    /// Balance kept back after every purchase.
    #[serde(default)]
    pub reserve: i32,
}

const fn default_true() -> bool {
    true
}

const fn default_front_column() -> i32 {
    6
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            name: "Balanced".to_string(),
            description: "Producers early, shooters in every lane, blockers up front".to_string(),
            build_order: vec![
                DefenderKind::Producer,
                DefenderKind::Shooter,
                DefenderKind::Producer,
                DefenderKind::Shooter,
                DefenderKind::Wall,
                DefenderKind::Repeater,
                DefenderKind::Blocker,
                DefenderKind::Shooter,
            ],
            collect_pickups: true,
            front_column: default_front_column(),
            reserve: 0,
        }
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Self = ron::from_str(ron)?;
        if strategy.build_order.is_empty() {
            return Err(StrategyError::EmptyBuildOrder(strategy.name));
        }
        Ok(strategy)
    }

    /// Walls in front, shooters behind, no producers.
    #[must_use]
    pub fn turtle() -> Self {
        Self {
            name: "Turtle".to_string(),
            description: "Walls first, then shooters".to_string(),
            build_order: vec![
                DefenderKind::Wall,
                DefenderKind::Shooter,
                DefenderKind::Wall,
                DefenderKind::Shooter,
            ],
            collect_pickups: true,
            front_column: 4,
            reserve: 0,
        }
    }

    /// Producers until the board pays for itself.
    #[must_use]
    pub fn economic() -> Self {
        Self {
            name: "Economic".to_string(),
            description: "Three producers before any defence".to_string(),
            build_order: vec![
                DefenderKind::Producer,
                DefenderKind::Producer,
                DefenderKind::Producer,
                DefenderKind::Repeater,
                DefenderKind::Shooter,
                DefenderKind::Detonator,
            ],
            collect_pickups: true,
            front_column: default_front_column(),
            reserve: 0,
        }
    }

    /// Built-in strategy by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "balanced" => Some(Self::default()),
            "turtle" => Some(Self::turtle()),
            "economic" => Some(Self::economic()),
            _ => None,
        }
    }
}

/// Executes a strategy against a simulation.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    cursor: usize,
    placed: u32,
}

impl StrategyExecutor {
    /// Create an executor at the start of the build order.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            cursor: 0,
            placed: 0,
        }
    }

    /// Strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.strategy.name
    }

    /// Defenders placed so far.
    #[must_use]
    pub const fn placed(&self) -> u32 {
        self.placed
    }

    /// Next build order item.
    #[must_use]
    pub fn next_item(&self) -> Option<DefenderKind> {
        let order = &self.strategy.build_order;
        if order.is_empty() {
            return None;
        }
        Some(order[self.cursor % order.len()])
    }

    /// Commands to issue before the next turn.
    ///
    /// Pickups come first so their reward can fund the purchase.
    #[must_use]
    pub fn decide(&self, sim: &Simulation) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut balance = sim.balance();

        if self.strategy.collect_pickups {
            for pickup in sim.entities().iter().filter(|e| e.kind.is_pickup()) {
                commands.push(Command::CollectPickup {
                    position: pickup.position,
                });
                balance += sim.config().pickup_reward;
            }
        }

        if let Some(kind) = self.next_item() {
            let slot = sim.deployment().slot(kind);
            let affordable = balance - slot.cost >= self.strategy.reserve;
            if affordable && slot.is_deployable(sim.turn()) {
                if let Some(position) = self.choose_cell(sim, kind) {
                    commands.push(Command::PlaceDefender { kind, position });
                }
            }
        }

        commands
    }

    /// Record that the last decided placement went through.
    pub fn advance_build_order(&mut self) {
        self.cursor += 1;
        self.placed += 1;
    }

    /// Where to put `kind`, or `None` if no cell suits it.
    #[must_use]
    pub fn choose_cell(&self, sim: &Simulation, kind: DefenderKind) -> Option<GridPos> {
        let grid = sim.config().grid;
        let row = self.pressured_row(sim);
        let free = |pos: &GridPos| grid.contains(*pos) && !sim.entities().is_occupied(*pos);

        match kind.role() {
            DefenderRole::Producer => grid.cells().filter(|p| p.column <= 1).find(|p| free(p)),
            DefenderRole::Ranged => (0..grid.columns)
                .map(|column| GridPos::new(column, row))
                .find(|p| free(p)),
            DefenderRole::Barrier | DefenderRole::MeleeBlocker => {
                let front = self.strategy.front_column.min(grid.columns - 1);
                (0..=front)
                    .rev()
                    .map(|column| GridPos::new(column, row))
                    .find(|p| free(p))
            }
            DefenderRole::Detonator => {
                // Aim where the nearest attacker will be when the fuse runs out.
                let target = nearest_attacker(sim)?;
                let fuse = sim.config().defenders.get(kind).fire_rate.unwrap_or(1);
                let lead = i32::try_from(fuse).unwrap_or(i32::MAX).saturating_sub(1);
                let pos = GridPos::new(target.position.column - lead, target.position.row);
                free(&pos).then_some(pos)
            }
        }
    }

    /// Row whose nearest attacker is closest to the defended edge. With no
    /// attacker on the board, rows are filled in turn.
    fn pressured_row(&self, sim: &Simulation) -> i32 {
        match nearest_attacker(sim) {
            Some(attacker) => attacker.position.row,
            None => {
                let rows = sim.config().grid.rows.max(1);
                i32::try_from(self.placed).unwrap_or(0) % rows
            }
        }
    }
}

fn nearest_attacker(sim: &Simulation) -> Option<&Entity> {
    sim.entities()
        .iter()
        .filter(|e| e.kind.is_attacker())
        .min_by_key(|e| (e.position.column, e.position.row))
}
