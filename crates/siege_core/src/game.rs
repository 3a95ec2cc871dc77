//! Game façade.
//!
//! [`Game`] ties the simulation, the command history and the event bus
//! together. Every state-changing call runs to completion and then delivers
//! the notifications it produced to all subscribers before returning.
//!
//! ```
//! use siege_core::events::{EventRecorder, GameEvent};
//! use siege_core::game::Game;
//! use siege_core::grid::GridPos;
//! use siege_core::unit_kind::DefenderKind;
//!
//! let mut game = Game::default();
//! let recorder = EventRecorder::new();
//! game.subscribe(Box::new(recorder.clone()));
//! assert_eq!(recorder.take(), vec![GameEvent::BalanceChanged { balance: 400 }]);
//!
//! game.place(DefenderKind::Producer, GridPos::new(0, 0));
//! assert_eq!(game.simulation().balance(), 350);
//! assert!(recorder.events().contains(&GameEvent::BalanceChanged { balance: 350 }));
//!
//! game.undo();
//! assert_eq!(game.simulation().balance(), 400);
//! ```

use std::path::Path;

use crate::config::GameConfig;
use crate::error::Result;
use crate::events::{EventBus, GameEvent, Subscriber, SubscriberId};
use crate::grid::GridPos;
use crate::history::CommandHistory;
use crate::save::SaveGame;
use crate::simulation::{PlacementOutcome, Simulation, TileOutcome, TurnReport};
use crate::unit_kind::DefenderKind;

/// A playable game: simulation, undo history and subscribers.
#[derive(Debug)]
pub struct Game {
    sim: Simulation,
    history: CommandHistory,
    bus: EventBus,
}

impl Default for Game {
    fn default() -> Self {
        Self::from_simulation(Simulation::default())
    }
}

impl Game {
    /// Start a game at the first level.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`](crate::error::GameError::InvalidConfig)
    /// if the configuration is inconsistent.
    pub fn new(config: GameConfig) -> Result<Self> {
        Ok(Self::from_simulation(Simulation::new(config)?))
    }

    fn from_simulation(mut sim: Simulation) -> Self {
        // Nobody is listening yet; subscribers catch up on subscribe.
        sim.drain_events();
        Self {
            sim,
            history: CommandHistory::new(),
            bus: EventBus::new(),
        }
    }

    /// Read-only view of the simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Register a subscriber. It first receives the current balance.
    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        let catch_up = GameEvent::BalanceChanged {
            balance: self.sim.balance(),
        };
        self.bus.subscribe(subscriber, &[catch_up])
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn flush(&mut self) {
        let events = self.sim.drain_events();
        self.bus.publish_all(events);
    }

    /// Advance one turn through the undo history.
    pub fn advance_turn(&mut self) -> TurnReport {
        let report = self.history.advance_turn(&mut self.sim);
        self.flush();
        report
    }

    /// Place a defender through the undo history.
    pub fn place(&mut self, kind: DefenderKind, position: GridPos) -> PlacementOutcome {
        let placement = self.history.place_defender(&mut self.sim, kind, position);
        self.flush();
        placement
    }

    /// Collect a pickup or place the selected defender, through the undo
    /// history.
    pub fn activate_tile(&mut self, position: GridPos) -> TileOutcome {
        let tile = self.history.activate_tile(&mut self.sim, position);
        self.flush();
        tile
    }

    /// Collect a pickup through the undo history.
    pub fn collect(&mut self, position: GridPos) -> Option<i32> {
        let reward = self.history.collect_pickup(&mut self.sim, position);
        self.flush();
        reward
    }

    /// Select the defender kind used by [`activate_tile`](Self::activate_tile).
    pub fn select_defender(&mut self, kind: DefenderKind) {
        self.sim.select_defender(kind);
    }

    /// Clear the selected defender kind.
    pub fn clear_selection(&mut self) {
        self.sim.clear_selection();
    }

    /// Undo the last command. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.sim);
        self.flush();
        undone
    }

    /// Redo the last undone command. Returns false if there was nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.sim).is_some();
        self.flush();
        redone
    }

    /// Whether [`undo`](Self::undo) would do anything.
    #[must_use]
    pub fn is_undo_available(&self) -> bool {
        self.history.is_undo_available()
    }

    /// Whether [`redo`](Self::redo) would do anything.
    #[must_use]
    pub fn is_redo_available(&self) -> bool {
        self.history.is_redo_available()
    }

    /// Start over from the first level. History is cleared.
    pub fn restart(&mut self) {
        self.sim.restart();
        self.history.clear();
        self.flush();
    }

    /// Capture the current state and the undo history for saving.
    #[must_use]
    pub fn to_save(&self) -> SaveGame {
        SaveGame::capture_with_history(&self.sim, &self.history)
    }

    /// Replace the current state and history with a saved game.
    ///
    /// Either the whole save is applied or nothing changes. On success
    /// subscribers are sent the restored board.
    ///
    /// # Errors
    ///
    /// Returns the decoding error; the game is left untouched.
    pub fn load_save(&mut self, save: &SaveGame) -> Result<()> {
        let history = save.to_history(self.sim.config())?;
        self.sim.load_save(save)?;
        self.history = history;
        self.flush();
        Ok(())
    }

    /// Write the current state to a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_save().save(path)
    }

    /// Load a RON save file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded; the game is
    /// left untouched.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let save = SaveGame::load(path)?;
        self.load_save(&save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventRecorder, RemovalCause};

    fn game_with_recorder() -> (Game, EventRecorder) {
        let mut game = Game::default();
        let recorder = EventRecorder::new();
        game.subscribe(Box::new(recorder.clone()));
        recorder.take();
        (game, recorder)
    }

    #[test]
    fn test_subscribe_catches_up_with_balance() {
        let mut game = Game::default();
        game.place(DefenderKind::Shooter, GridPos::new(0, 0));
        let recorder = EventRecorder::new();
        game.subscribe(Box::new(recorder.clone()));
        assert_eq!(recorder.events(), vec![GameEvent::BalanceChanged { balance: 300 }]);
    }

    #[test]
    fn test_events_delivered_before_return() {
        let (mut game, recorder) = game_with_recorder();
        game.place(DefenderKind::Shooter, GridPos::new(0, 0));
        let events = recorder.take();
        assert!(matches!(events[0], GameEvent::UnitSpawned { .. }));
        assert_eq!(events[1], GameEvent::BalanceChanged { balance: 300 });
    }

    #[test]
    fn test_rejected_placement_emits_nothing() {
        let (mut game, recorder) = game_with_recorder();
        game.place(DefenderKind::Shooter, GridPos::new(0, 0));
        recorder.take();
        let outcome = game.place(DefenderKind::Shooter, GridPos::new(1, 0));
        assert!(!outcome.is_placed());
        assert!(recorder.is_empty());
        assert!(game.is_undo_available());
    }

    #[test]
    fn test_undo_announces_cleared_and_restored_board() {
        let (mut game, recorder) = game_with_recorder();
        game.place(DefenderKind::Wall, GridPos::new(3, 3));
        recorder.take();

        assert!(game.undo());
        let events = recorder.take();
        let cleared = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    GameEvent::UnitRemoved {
                        cause: RemovalCause::Cleared,
                        ..
                    }
                )
            })
            .count();
        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameEvent::UnitSpawned { .. }))
            .count();
        assert_eq!(cleared, 4);
        assert_eq!(spawned, 3);
        assert!(events.contains(&GameEvent::BalanceChanged { balance: 400 }));
    }

    #[test]
    fn test_restart_clears_history() {
        let (mut game, recorder) = game_with_recorder();
        game.place(DefenderKind::Wall, GridPos::new(3, 3));
        game.advance_turn();
        game.restart();

        assert!(!game.is_undo_available());
        assert_eq!(game.simulation().turn(), 0);
        assert_eq!(game.simulation().balance(), 400);
        assert!(recorder.events().contains(&GameEvent::Restarted));
    }

    #[test]
    fn test_load_keeps_subscribers_and_replaces_history() {
        let (mut game, recorder) = game_with_recorder();
        let save = game.to_save();
        game.place(DefenderKind::Wall, GridPos::new(3, 3));
        recorder.take();

        game.load_save(&save).expect("valid save");
        assert!(!game.is_undo_available());
        assert_eq!(game.simulation().balance(), 400);
        assert!(recorder
            .events()
            .contains(&GameEvent::BalanceChanged { balance: 400 }));
    }

    #[test]
    fn test_undo_after_load() {
        let mut game = Game::default();
        game.place(DefenderKind::Shooter, GridPos::new(0, 2));
        game.advance_turn();
        game.advance_turn();
        let save = game.to_save();

        let (mut loaded, recorder) = game_with_recorder();
        loaded.load_save(&save).expect("valid save");
        assert_eq!(loaded.simulation().turn(), 2);
        assert!(loaded.is_undo_available());
        assert!(!loaded.is_redo_available());

        assert!(loaded.undo());
        assert_eq!(loaded.simulation().turn(), 1);
        assert!(loaded.undo());
        assert!(loaded.undo());
        assert!(!loaded.undo());
        assert_eq!(loaded.simulation().turn(), 0);
        assert_eq!(loaded.simulation().balance(), 400);
        assert!(recorder
            .events()
            .contains(&GameEvent::BalanceChanged { balance: 400 }));

        assert!(loaded.redo());
        assert_eq!(loaded.simulation().balance(), 300);
        assert_eq!(loaded.to_save().history.redo.len(), 2);
    }

    #[test]
    fn test_load_with_bad_history_leaves_game_untouched() {
        let mut source = Game::default();
        source.place(DefenderKind::Wall, GridPos::new(1, 1));
        let mut save = source.to_save();
        save.history.undo[0].state.level = 9;

        let (mut game, recorder) = game_with_recorder();
        game.advance_turn();
        recorder.take();
        let hash = game.simulation().state_hash();

        assert!(game.load_save(&save).is_err());
        assert_eq!(game.simulation().state_hash(), hash);
        assert_eq!(game.simulation().turn(), 1);
        assert!(game.is_undo_available());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_failed_file_load_leaves_game_untouched() {
        let (mut game, recorder) = game_with_recorder();
        game.place(DefenderKind::Wall, GridPos::new(3, 3));
        recorder.take();
        let hash = game.simulation().state_hash();

        assert!(game.load("/definitely/not/here.ron").is_err());
        assert_eq!(game.simulation().state_hash(), hash);
        assert!(game.is_undo_available());
        assert!(recorder.is_empty());
    }
}
