//! Level (round) definitions.

use serde::{Deserialize, Serialize};

use crate::unit_kind::AttackerKind;

/// One round's attacker wave.
///
/// Attackers are spawned off-board at column
/// `columns + spawn_offset + rand(0..spawn_spread)` on a random row, so the
/// player has a few turns to build an economy before they arrive.
///
/// # Example RON
///
/// ```ron
/// LevelData(
///     name: "Level 2",
///     basic: 4,
///     armored: 2,
///     spawn_offset: 2,
///     spawn_spread: 6,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    /// Display name.
    pub name: String,

    /// Number of basic attackers.
    #[serde(default)]
    pub basic: u32,

    /// Number of armored attackers.
    #[serde(default)]
    pub armored: u32,

    /// Minimum distance past the far edge at which attackers spawn.
    #[serde(default)]
    pub spawn_offset: i32,

    /// Width of the random spawn band (must be ≥ 1).
    #[serde(default = "default_spread")]
    pub spawn_spread: i32,
}

/// Default spawn band width.
const fn default_spread() -> i32 {
    1
}

impl LevelData {
    /// Number of attackers of a kind in this wave.
    #[must_use]
    pub const fn count(&self, kind: AttackerKind) -> u32 {
        match kind {
            AttackerKind::Basic => self.basic,
            AttackerKind::Armored => self.armored,
        }
    }

    /// Total attackers in this wave.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.basic + self.armored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let level = LevelData {
            name: "test".to_string(),
            basic: 3,
            armored: 2,
            spawn_offset: 0,
            spawn_spread: 1,
        };
        assert_eq!(level.count(AttackerKind::Basic), 3);
        assert_eq!(level.count(AttackerKind::Armored), 2);
        assert_eq!(level.total(), 5);
    }

    #[test]
    fn test_defaults_from_ron() {
        let level: LevelData = ron::from_str("(name: \"L\", basic: 1)").expect("valid RON");
        assert_eq!(level.armored, 0);
        assert_eq!(level.spawn_spread, 1);
    }
}
