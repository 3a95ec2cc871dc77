//! Unit tuning records.

use serde::{Deserialize, Serialize};

/// Tuning for one defender kind.
///
/// # Example RON
///
/// ```ron
/// DefenderData(
///     cost: 100,
///     cooldown: 5,
///     health: 5,
///     fire_rate: Some(2),
///     damage: 1,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenderData {
    /// Balance debited on placement.
    pub cost: i32,

    /// Turns before another defender of this kind may be placed.
    pub cooldown: u32,

    /// Maximum health points.
    pub health: i32,

    /// Turns between productions (None for kinds that never fire).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_rate: Option<u32>,

    /// Projectile damage, blast damage or bite damage depending on role.
    #[serde(default)]
    pub damage: i32,
}

impl DefenderData {
    /// Check whether this kind ever produces anything.
    #[must_use]
    pub const fn fires(&self) -> bool {
        self.fire_rate.is_some()
    }
}

/// Tuning for one attacker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerData {
    /// Maximum health points.
    pub health: i32,

    /// Damage dealt to a defender each turn the attacker pushes against it.
    pub damage: i32,

    /// Cells advanced per turn.
    #[serde(default = "default_speed")]
    pub speed: i32,
}

/// Default attacker speed.
const fn default_speed() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defender_data_from_ron() {
        let data: DefenderData =
            ron::from_str("(cost: 50, cooldown: 10, health: 20)").expect("valid RON");
        assert_eq!(data.cost, 50);
        assert_eq!(data.fire_rate, None);
        assert_eq!(data.damage, 0);
        assert!(!data.fires());
    }

    #[test]
    fn test_attacker_speed_defaults_to_one() {
        let data: AttackerData = ron::from_str("(health: 5, damage: 2)").expect("valid RON");
        assert_eq!(data.speed, 1);
    }
}
