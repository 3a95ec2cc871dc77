//! Economy and deployment gate.
//!
//! The player holds a single scalar balance. Each defender kind has a fixed
//! cost, a fixed re-deployment cooldown and one `next_deployable` turn shared
//! by every instance of that kind. The gate lives in a [`DeploymentTable`]
//! owned by the simulation, so independent simulations never share cooldowns.
//!
//! All calculations use integer math for deterministic simulation.

use serde::{Deserialize, Serialize};

use crate::config::DefenderTable;
use crate::unit_kind::DefenderKind;

/// Player balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerEconomy {
    /// Current balance. Never negative at observable boundaries.
    pub balance: i32,
}

impl PlayerEconomy {
    /// Create an economy with a starting balance.
    #[must_use]
    pub const fn new(balance: i32) -> Self {
        Self { balance }
    }

    /// Check if the player can afford a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: i32) -> bool {
        self.balance >= cost
    }

    /// Spend if affordable. Returns true if the transaction succeeded.
    pub fn spend(&mut self, cost: i32) -> bool {
        if self.can_afford(cost) {
            self.balance -= cost;
            true
        } else {
            false
        }
    }

    /// Credit the balance.
    pub fn deposit(&mut self, amount: i32) {
        self.balance += amount;
    }
}

/// Check whether welfare is paid on reaching `turn`.
#[must_use]
pub const fn welfare_due(turn: u64, period: u64) -> bool {
    period != 0 && turn % period == 0
}

/// Cost, cooldown and shared availability for one defender kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentSlot {
    /// Balance debited on placement.
    pub cost: i32,
    /// Turns between placements of this kind.
    pub cooldown: u64,
    /// First turn on which this kind may be placed again.
    pub next_deployable: u64,
}

impl DeploymentSlot {
    /// Create a slot that is immediately deployable.
    #[must_use]
    pub const fn new(cost: i32, cooldown: u64) -> Self {
        Self {
            cost,
            cooldown,
            next_deployable: 0,
        }
    }

    /// `turn ≥ next_deployable`.
    #[must_use]
    pub const fn is_deployable(&self, turn: u64) -> bool {
        turn >= self.next_deployable
    }

    /// Affordable and off cooldown.
    #[must_use]
    pub const fn is_purchasable(&self, turn: u64, economy: &PlayerEconomy) -> bool {
        economy.can_afford(self.cost) && self.is_deployable(turn)
    }

    /// Start the cooldown after a placement on `turn`.
    pub fn mark_deployed(&mut self, turn: u64) {
        self.next_deployable = turn + self.cooldown;
    }
}

/// Deployment gate for every defender kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentTable {
    slots: [DeploymentSlot; 6],
}

/// Position of a kind's slot in the table.
const fn slot_index(kind: DefenderKind) -> usize {
    match kind {
        DefenderKind::Shooter => 0,
        DefenderKind::Repeater => 1,
        DefenderKind::Producer => 2,
        DefenderKind::Wall => 3,
        DefenderKind::Detonator => 4,
        DefenderKind::Blocker => 5,
    }
}

impl DeploymentTable {
    /// Build a fresh table from defender tuning; every kind is deployable.
    #[must_use]
    pub fn from_defenders(defenders: &DefenderTable) -> Self {
        let mut slots = [DeploymentSlot::new(0, 0); 6];
        for kind in DefenderKind::ALL {
            let data = defenders.get(kind);
            slots[slot_index(kind)] = DeploymentSlot::new(data.cost, u64::from(data.cooldown));
        }
        Self { slots }
    }

    /// Slot for a kind.
    #[must_use]
    pub const fn slot(&self, kind: DefenderKind) -> &DeploymentSlot {
        &self.slots[slot_index(kind)]
    }

    /// Mutable slot for a kind.
    pub fn slot_mut(&mut self, kind: DefenderKind) -> &mut DeploymentSlot {
        &mut self.slots[slot_index(kind)]
    }

    /// `turn ≥ next_deployable` for the kind.
    #[must_use]
    pub const fn is_deployable(&self, kind: DefenderKind, turn: u64) -> bool {
        self.slot(kind).is_deployable(turn)
    }

    /// Affordable and off cooldown.
    #[must_use]
    pub const fn is_purchasable(
        &self,
        kind: DefenderKind,
        turn: u64,
        economy: &PlayerEconomy,
    ) -> bool {
        self.slot(kind).is_purchasable(turn, economy)
    }

    /// Every kind currently purchasable, in shop order.
    #[must_use]
    pub fn purchasable(&self, turn: u64, economy: &PlayerEconomy) -> Vec<DefenderKind> {
        DefenderKind::ALL
            .into_iter()
            .filter(|&kind| self.is_purchasable(kind, turn, economy))
            .collect()
    }

    /// Reset every kind's `next_deployable` to zero (round transition).
    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            slot.next_deployable = 0;
        }
    }
}
