//! Notification layer.
//!
//! Every observable state change is published as a [`GameEvent`] to the
//! registered [`Subscriber`]s, synchronously and in registration order,
//! before the call that caused the change returns. The simulation only
//! stages events; [`crate::game::Game`] drains and fans them out.
//!
//! ```
//! use siege_core::events::{EventBus, EventRecorder, GameEvent};
//!
//! let mut bus = EventBus::new();
//! let recorder = EventRecorder::new();
//! bus.subscribe(Box::new(recorder.clone()), &[GameEvent::BalanceChanged { balance: 400 }]);
//! bus.publish(&GameEvent::Restarted);
//!
//! assert_eq!(
//!     recorder.events(),
//!     vec![GameEvent::BalanceChanged { balance: 400 }, GameEvent::Restarted]
//! );
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::grid::GridPos;
use crate::unit_kind::{DefenderKind, EntityKind};

/// Why an entity left the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// Health reached zero or below in the sweep.
    Died,
    /// Projectile struck an attacker.
    Impact,
    /// Projectile passed the far edge.
    OutOfBounds,
    /// Detonator consumed by its own blast.
    Detonated,
    /// Pickup collected by the player.
    Collected,
    /// Board cleared by a round transition, restart, undo or load.
    Cleared,
}

/// Closed set of state-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// An entity entered the board.
    UnitSpawned {
        /// New entity.
        id: EntityId,
        /// Its type tag.
        kind: EntityKind,
        /// Where it appeared.
        position: GridPos,
    },
    /// An entity left the board.
    UnitRemoved {
        /// Removed entity.
        id: EntityId,
        /// Its type tag.
        kind: EntityKind,
        /// Its last position.
        position: GridPos,
        /// Why it was removed.
        cause: RemovalCause,
    },
    /// The player's balance changed.
    BalanceChanged {
        /// New balance.
        balance: i32,
    },
    /// Purchasability of every defender type was re-evaluated.
    PurchasablesUpdated {
        /// Kinds that currently pass the deployment gate, in shop order.
        purchasable: Vec<DefenderKind>,
    },
    /// All attackers of a round were eliminated and the next level started.
    RoundOver {
        /// Level that was just cleared.
        completed_level: u32,
        /// Level now being played.
        next_level: u32,
    },
    /// An attacker reached column 0.
    GameOver {
        /// Turn on which the game was lost.
        turn: u64,
    },
    /// The final level was cleared.
    GameWon {
        /// Turn on which the game was won.
        turn: u64,
    },
    /// The game was reset to its first level.
    Restarted,
}

/// Receiver of published events.
///
/// Implementations must return promptly; delivery is synchronous.
pub trait Subscriber {
    /// Handle one event.
    fn on_event(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> Subscriber for F {
    fn on_event(&mut self, event: &GameEvent) {
        self(event);
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Ordered list of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Box<dyn Subscriber>)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber after sending it `catch_up`.
    ///
    /// The catch-up events go to the new subscriber only.
    pub fn subscribe(
        &mut self,
        mut subscriber: Box<dyn Subscriber>,
        catch_up: &[GameEvent],
    ) -> SubscriberId {
        for event in catch_up {
            subscriber.on_event(event);
        }
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Deliver one event to every subscriber in registration order.
    pub fn publish(&mut self, event: &GameEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber.on_event(event);
        }
    }

    /// Deliver a batch, each event to every subscriber before the next event.
    pub fn publish_all<I: IntoIterator<Item = GameEvent>>(&mut self, events: I) {
        for event in events {
            self.publish(&event);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check for no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Subscriber that stores every event it receives.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to the bus.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Check for no recorded events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Subscriber for EventRecorder {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Subscriber that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSubscriber;

impl Subscriber for TracingSubscriber {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::UnitSpawned { id, kind, position } => {
                tracing::trace!(id, kind = kind.tag(), %position, "unit spawned");
            }
            GameEvent::UnitRemoved {
                id,
                kind,
                position,
                cause,
            } => {
                tracing::trace!(id, kind = kind.tag(), %position, ?cause, "unit removed");
            }
            GameEvent::BalanceChanged { balance } => {
                tracing::debug!(balance, "balance changed");
            }
            GameEvent::PurchasablesUpdated { purchasable } => {
                tracing::debug!(?purchasable, "purchasables updated");
            }
            GameEvent::RoundOver {
                completed_level,
                next_level,
            } => {
                tracing::info!(completed_level, next_level, "round over");
            }
            GameEvent::GameOver { turn } => tracing::info!(turn, "game over"),
            GameEvent::GameWon { turn } => tracing::info!(turn, "game won"),
            GameEvent::Restarted => tracing::info!("restarted"),
        }
    }
}
