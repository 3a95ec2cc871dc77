//! Game tuning configuration.
//!
//! A [`GameConfig`] holds every number the simulation consumes: board size,
//! economy constants, per-kind unit stats and the level table. The built-in
//! [`Default`] is the standard game; alternative tunings are loaded from RON.
//!
//! ```
//! use siege_core::config::GameConfig;
//! use siege_core::unit_kind::DefenderKind;
//!
//! let config = GameConfig::default();
//! config.validate().unwrap();
//! assert_eq!(config.initial_balance, 400);
//! assert_eq!(config.defenders.get(DefenderKind::Shooter).cost, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{AttackerData, DefenderData, LevelData};
use crate::error::{GameError, Result};
use crate::grid::GridSize;
use crate::unit_kind::{AttackerKind, DefenderKind, DefenderRole};

/// Stats for every defender kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenderTable {
    /// Ranged single-shot defender.
    pub shooter: DefenderData,
    /// Ranged rapid defender.
    pub repeater: DefenderData,
    /// Pickup producer.
    pub producer: DefenderData,
    /// Barrier.
    pub wall: DefenderData,
    /// One-shot area blast.
    pub detonator: DefenderData,
    /// Melee blocker.
    pub blocker: DefenderData,
}

impl DefenderTable {
    /// Stats for a kind.
    #[must_use]
    pub const fn get(&self, kind: DefenderKind) -> &DefenderData {
        match kind {
            DefenderKind::Shooter => &self.shooter,
            DefenderKind::Repeater => &self.repeater,
            DefenderKind::Producer => &self.producer,
            DefenderKind::Wall => &self.wall,
            DefenderKind::Detonator => &self.detonator,
            DefenderKind::Blocker => &self.blocker,
        }
    }

    /// Mutable stats for a kind.
    pub fn get_mut(&mut self, kind: DefenderKind) -> &mut DefenderData {
        match kind {
            DefenderKind::Shooter => &mut self.shooter,
            DefenderKind::Repeater => &mut self.repeater,
            DefenderKind::Producer => &mut self.producer,
            DefenderKind::Wall => &mut self.wall,
            DefenderKind::Detonator => &mut self.detonator,
            DefenderKind::Blocker => &mut self.blocker,
        }
    }
}

impl Default for DefenderTable {
    fn default() -> Self {
        Self {
            shooter: DefenderData {
                cost: 100,
                cooldown: 5,
                health: 5,
                fire_rate: Some(2),
                damage: 1,
            },
            repeater: DefenderData {
                cost: 200,
                cooldown: 7,
                health: 5,
                fire_rate: Some(1),
                damage: 2,
            },
            producer: DefenderData {
                cost: 50,
                cooldown: 5,
                health: 4,
                fire_rate: Some(4),
                damage: 0,
            },
            wall: DefenderData {
                cost: 50,
                cooldown: 10,
                health: 20,
                fire_rate: None,
                damage: 0,
            },
            detonator: DefenderData {
                cost: 150,
                cooldown: 5,
                health: 1,
                fire_rate: Some(3),
                damage: 100,
            },
            blocker: DefenderData {
                cost: 150,
                cooldown: 7,
                health: 6,
                fire_rate: Some(3),
                damage: 4,
            },
        }
    }
}

/// Stats for every attacker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerTable {
    /// Standard attacker.
    pub basic: AttackerData,
    /// Armored attacker.
    pub armored: AttackerData,
}

impl AttackerTable {
    /// Stats for a kind.
    #[must_use]
    pub const fn get(&self, kind: AttackerKind) -> &AttackerData {
        match kind {
            AttackerKind::Basic => &self.basic,
            AttackerKind::Armored => &self.armored,
        }
    }
}

impl Default for AttackerTable {
    fn default() -> Self {
        Self {
            basic: AttackerData {
                health: 5,
                damage: 2,
                speed: 1,
            },
            armored: AttackerData {
                health: 10,
                damage: 2,
                speed: 1,
            },
        }
    }
}

/// Complete simulation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board dimensions.
    #[serde(default)]
    pub grid: GridSize,
    /// Balance at the start of every round.
    pub initial_balance: i32,
    /// Welfare is paid every `payment_period` turns.
    pub payment_period: u64,
    /// Balance credited each payment period.
    pub welfare: i32,
    /// Balance credited when a pickup is collected.
    pub pickup_reward: i32,
    /// Cells a projectile travels per turn.
    #[serde(default = "default_projectile_speed")]
    pub projectile_speed: i32,
    /// Seed for production and wave placement randomness.
    #[serde(default)]
    pub seed: u64,
    /// Defender stats.
    pub defenders: DefenderTable,
    /// Attacker stats.
    pub attackers: AttackerTable,
    /// Rounds, played in order.
    pub levels: Vec<LevelData>,
}

/// Default projectile speed.
const fn default_projectile_speed() -> i32 {
    1
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            initial_balance: 400,
            payment_period: 4,
            welfare: 25,
            pickup_reward: 25,
            projectile_speed: default_projectile_speed(),
            seed: 0,
            defenders: DefenderTable::default(),
            attackers: AttackerTable::default(),
            levels: vec![
                LevelData {
                    name: "Level 1".to_string(),
                    basic: 3,
                    armored: 0,
                    spawn_offset: 2,
                    spawn_spread: 6,
                },
                LevelData {
                    name: "Level 2".to_string(),
                    basic: 4,
                    armored: 2,
                    spawn_offset: 2,
                    spawn_spread: 8,
                },
                LevelData {
                    name: "Level 3".to_string(),
                    basic: 6,
                    armored: 4,
                    spawn_offset: 2,
                    spawn_spread: 10,
                },
            ],
        }
    }
}

impl GameConfig {
    /// Load and validate a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate a configuration from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Render this configuration as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GameError::InvalidConfig(msg));

        if self.grid.columns < 1 || self.grid.rows < 1 {
            return invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.columns, self.grid.rows
            ));
        }
        if self.initial_balance < 0 {
            return invalid("initial_balance must be non-negative".to_string());
        }
        if self.payment_period == 0 {
            return invalid("payment_period must be at least 1".to_string());
        }
        if self.welfare < 0 || self.pickup_reward < 0 {
            return invalid("welfare and pickup_reward must be non-negative".to_string());
        }
        if self.projectile_speed < 1 {
            return invalid("projectile_speed must be at least 1".to_string());
        }

        for kind in DefenderKind::ALL {
            let data = self.defenders.get(kind);
            if data.cost < 0 {
                return invalid(format!("{kind}: cost must be non-negative"));
            }
            if data.health < 1 {
                return invalid(format!("{kind}: health must be positive"));
            }
            match (kind.role(), data.fire_rate) {
                (DefenderRole::Barrier, _) => {}
                (_, None) => return invalid(format!("{kind}: fire_rate is required")),
                (_, Some(0)) => return invalid(format!("{kind}: fire_rate must be at least 1")),
                (_, Some(_)) => {}
            }
            if data.damage < 0 {
                return invalid(format!("{kind}: damage must be non-negative"));
            }
        }

        for kind in AttackerKind::ALL {
            let data = self.attackers.get(kind);
            if data.health < 1 || data.speed < 1 || data.damage < 0 {
                return invalid(format!(
                    "{kind}: health and speed must be positive, damage non-negative"
                ));
            }
        }

        if self.levels.is_empty() {
            return invalid("at least one level is required".to_string());
        }
        for level in &self.levels {
            if level.total() == 0 {
                return invalid(format!("{}: level has no attackers", level.name));
            }
            if level.spawn_spread < 1 || level.spawn_offset < 0 {
                return invalid(format!(
                    "{}: spawn_spread must be ≥ 1 and spawn_offset ≥ 0",
                    level.name
                ));
            }
        }

        Ok(())
    }

    /// Level data by index.
    #[must_use]
    pub fn level(&self, index: u32) -> Option<&LevelData> {
        self.levels.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = GameConfig::default();
        let text = config.to_ron().unwrap();
        let parsed = GameConfig::from_ron_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_empty_levels() {
        let mut config = GameConfig::default();
        config.levels.clear();
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_shooter_without_fire_rate() {
        let mut config = GameConfig::default();
        config.defenders.get_mut(DefenderKind::Shooter).fire_rate = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wall_may_omit_fire_rate() {
        let config = GameConfig::default();
        assert!(config.defenders.get(DefenderKind::Wall).fire_rate.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_payment_period() {
        let mut config = GameConfig::default();
        config.payment_period = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = GameConfig::from_ron_str("(initial_balance: )").unwrap_err();
        assert!(matches!(err, GameError::RonParse(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = GameConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, GameError::Io { .. }));
    }
}
