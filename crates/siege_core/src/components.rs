//! Capability components.
//!
//! Components are pure data with small helpers. An entity's capabilities are
//! exactly the components it carries:
//!
//! - [`Health`] makes it *alive*: it can take damage and is swept at ≤ 0.
//! - [`Movement`] makes it *moveable*: it has a per-turn displacement and a
//!   lock that allows at most one move per turn.
//! - [`FireRate`] makes it a *shooter*: it acts whenever the counter elapses.
//! - [`Bite`] marks a melee blocker and tracks whether it is digesting.

use serde::{Deserialize, Serialize};

use crate::grid::{GridDelta, GridPos};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Health component.
///
/// Health is signed: damage may drive it below zero. Whether the entity is
/// removed is decided by the turn engine's sweep, not by the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: i32,
    /// Maximum health points.
    pub max: i32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Subtract `amount` from current health. No clamping.
    pub fn take_damage(&mut self, amount: i32) {
        self.current -= amount;
    }

    /// Check if the entity should be swept (health ≤ 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// Movement component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movement {
    /// Displacement applied on each move.
    pub velocity: GridDelta,
    /// Set once the entity has moved this turn.
    pub locked: bool,
}

impl Movement {
    /// Create an unlocked movement component.
    #[must_use]
    pub const fn new(velocity: GridDelta) -> Self {
        Self {
            velocity,
            locked: false,
        }
    }

    /// Cell the entity would occupy after moving from `from`.
    #[must_use]
    pub const fn next_position(&self, from: GridPos) -> GridPos {
        from.offset(self.velocity)
    }

    /// Allow one more move this turn.
    pub fn reset_lock(&mut self) {
        self.locked = false;
    }

    /// Move `position` once, then lock. Returns whether a move happened.
    pub fn advance(&mut self, position: &mut GridPos) -> bool {
        if self.locked {
            return false;
        }
        *position = self.next_position(*position);
        self.locked = true;
        true
    }
}

/// Fire-rate counter for periodic production.
///
/// The counter starts at `rate` and counts down once per turn; the shooter is
/// ready on the turn it reaches zero and is then reset to `rate`.
///
/// ```
/// use siege_core::components::FireRate;
///
/// let mut rate = FireRate::new(2);
/// assert!(!rate.tick());
/// assert!(rate.tick());
/// rate.reset();
/// assert_eq!(rate.remaining, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FireRate {
    /// Turns left before the next shot.
    pub remaining: u32,
    /// Configured period in turns.
    pub rate: u32,
}

impl FireRate {
    /// Create a counter that first fires after `rate` turns.
    #[must_use]
    pub const fn new(rate: u32) -> Self {
        Self {
            remaining: rate,
            rate,
        }
    }

    /// Count down one turn and report readiness.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    /// Restart the countdown.
    pub fn reset(&mut self) {
        self.remaining = self.rate;
    }
}

/// Melee blocker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bite {
    /// Damage dealt to the attacker on contact.
    pub damage: i32,
    /// Locked onto a victim and digesting; cannot bite again until released.
    pub engaged: bool,
}

impl Bite {
    /// Create a ready blocker.
    #[must_use]
    pub const fn new(damage: i32) -> Self {
        Self {
            damage,
            engaged: false,
        }
    }
}
