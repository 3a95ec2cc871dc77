//! Closed set of unit kinds.
//!
//! Every entity on the board carries exactly one [`EntityKind`] tag built
//! from the kinds below. Behaviour is dispatched by matching on
//! these enums; there is no open-ended type query anywhere in the engine.
//!
//! Each kind also owns a stable string tag used by save files and the
//! headless protocol:
//!
//! ```
//! use siege_core::unit_kind::DefenderKind;
//!
//! assert_eq!(DefenderKind::Shooter.tag(), "shooter");
//! assert_eq!(DefenderKind::from_tag("detonator"), Some(DefenderKind::Detonator));
//! assert_eq!(DefenderKind::from_tag("dragon"), None);
//! ```

use serde::{Deserialize, Serialize};

/// Player-placeable defender types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DefenderKind {
    /// Ranged defender firing a single projectile down its lane.
    Shooter,
    /// Faster-firing, harder-hitting ranged defender.
    Repeater,
    /// Periodically drops a resource pickup somewhere on the board.
    Producer,
    /// High-health barrier with no production.
    Wall,
    /// One-shot 3×3 area blast after a short fuse.
    Detonator,
    /// Melee defender that bites the first attacker to reach it, then digests.
    Blocker,
}

/// How a defender acts when its fire-rate counter elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefenderRole {
    /// Spawns a projectile one cell ahead.
    Ranged,
    /// Spawns a resource pickup on a free cell.
    Producer,
    /// Blasts its neighbourhood and removes itself.
    Detonator,
    /// Bites on contact; the counter times its digestion.
    MeleeBlocker,
    /// Never fires.
    Barrier,
}

impl DefenderKind {
    /// Every defender kind in shop order.
    pub const ALL: [Self; 6] = [
        Self::Shooter,
        Self::Producer,
        Self::Wall,
        Self::Repeater,
        Self::Detonator,
        Self::Blocker,
    ];

    /// Behavioural role of this kind.
    #[must_use]
    pub const fn role(self) -> DefenderRole {
        match self {
            Self::Shooter | Self::Repeater => DefenderRole::Ranged,
            Self::Producer => DefenderRole::Producer,
            Self::Wall => DefenderRole::Barrier,
            Self::Detonator => DefenderRole::Detonator,
            Self::Blocker => DefenderRole::MeleeBlocker,
        }
    }

    /// Whether this kind carries a fire-rate counter.
    #[must_use]
    pub const fn is_shooter(self) -> bool {
        !matches!(self.role(), DefenderRole::Barrier)
    }

    /// Stable string tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Shooter => "shooter",
            Self::Repeater => "repeater",
            Self::Producer => "producer",
            Self::Wall => "wall",
            Self::Detonator => "detonator",
            Self::Blocker => "blocker",
        }
    }

    /// Parse a string tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Single-character glyph for text boards.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Shooter => 'P',
            Self::Repeater => 'R',
            Self::Producer => 'S',
            Self::Wall => 'W',
            Self::Detonator => 'C',
            Self::Blocker => 'B',
        }
    }
}

impl std::fmt::Display for DefenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Hostile unit types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AttackerKind {
    /// Standard attacker.
    Basic,
    /// Attacker with extra health.
    Armored,
}

impl AttackerKind {
    /// Every attacker kind.
    pub const ALL: [Self; 2] = [Self::Basic, Self::Armored];

    /// Stable string tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Basic => "basic_attacker",
            Self::Armored => "armored_attacker",
        }
    }

    /// Parse a string tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Single-character glyph for text boards.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Basic => 'Z',
            Self::Armored => 'A',
        }
    }
}

impl std::fmt::Display for AttackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag used for projectile records.
pub const PROJECTILE_TAG: &str = "projectile";

/// Tag used for resource pickup records.
pub const PICKUP_TAG: &str = "pickup";

/// Closed type tag of a board entity, with the few fixed values that belong
/// to the tag rather than to a capability component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Hostile unit walking toward column 0.
    Attacker(AttackerKind),
    /// Player-placed stationary unit.
    Defender(DefenderKind),
    /// Shot travelling toward the far edge.
    Projectile {
        /// Damage applied to the first attacker hit.
        damage: i32,
    },
    /// Resource token waiting to be collected.
    Pickup {
        /// Balance credited on collection.
        reward: i32,
    },
}

impl EntityKind {
    /// Check for an attacking-side unit.
    #[must_use]
    pub const fn is_attacker(&self) -> bool {
        matches!(self, Self::Attacker(_))
    }

    /// Check for a player-placed unit.
    #[must_use]
    pub const fn is_defender(&self) -> bool {
        matches!(self, Self::Defender(_))
    }

    /// Check for a projectile.
    #[must_use]
    pub const fn is_projectile(&self) -> bool {
        matches!(self, Self::Projectile { .. })
    }

    /// Check for a resource pickup.
    #[must_use]
    pub const fn is_pickup(&self) -> bool {
        matches!(self, Self::Pickup { .. })
    }

    /// Defender kind, if this is a defender.
    #[must_use]
    pub const fn defender(&self) -> Option<DefenderKind> {
        match self {
            Self::Defender(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Stable string tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Attacker(kind) => kind.tag(),
            Self::Defender(kind) => kind.tag(),
            Self::Projectile { .. } => PROJECTILE_TAG,
            Self::Pickup { .. } => PICKUP_TAG,
        }
    }

    /// Single-character glyph for text boards.
    #[must_use]
    pub const fn glyph(&self) -> char {
        match self {
            Self::Attacker(kind) => kind.glyph(),
            Self::Defender(kind) => kind.glyph(),
            Self::Projectile { .. } => '*',
            Self::Pickup { .. } => '$',
        }
    }
}
