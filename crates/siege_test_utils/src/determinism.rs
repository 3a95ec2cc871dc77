//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Undo, redo, saved games and headless replays all assume the engine is a
//! pure function of its configuration and the commands applied to it.
//! Sources of non-determinism include:
//!
//! - **System randomness**: production and wave placement draw from the
//!   simulation's own seeded `ChaCha8Rng`, never from the OS.
//!
//! - **`HashMap` iteration order**: entities live in a `Vec` sorted by id
//!   and every pass walks it in that order.
//!
//! - **Snapshot aliasing**: a snapshot that shares storage with the live
//!   state would change under later turns.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual passes (contacts, blasts, production)
//! 2. **Property tests**: random command sequences replay identically
//! 3. **Integration tests**: full scripted rounds are reproducible

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use siege_core::config::GameConfig;
use siege_core::history::{Command, CommandHistory};
use siege_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps taken per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// All distinct hashes (one for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run ended in the same state.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation several times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `steps` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one step
/// * `hash` - Computes the state hash
///
/// # Example
///
/// ```
/// use siege_core::simulation::Simulation;
/// use siege_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     40,
///     Simulation::default,
///     |sim| {
///         sim.advance_turn();
///     },
///     Simulation::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Advance two simulations built from `config` and compare final hashes.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn verify_simulation_determinism(config: &GameConfig, turns: u64) -> bool {
    verify_determinism(
        2,
        turns,
        || Simulation::new(config.clone()).expect("valid config"),
        |sim| {
            sim.advance_turn();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Apply the same command script to two fresh simulations through a
/// [`CommandHistory`] and compare the final hashes.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn verify_command_determinism(config: &GameConfig, commands: &[Command]) -> bool {
    let run = || {
        let mut sim = Simulation::new(config.clone()).expect("valid config");
        let mut history = CommandHistory::new();
        for command in commands {
            history.execute(&mut sim, *command);
        }
        sim.state_hash()
    };
    run() == run()
}

/// Compare two runs turn by turn and report the first turn that differs.
///
/// Returns `None` if the runs never diverge.
pub fn find_first_divergence<F>(setup_fn: F, turns: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        first.advance_turn();
        second.advance_turn();

        if first.state_hash() != second.state_hash() {
            tracing::debug!(turn, "simulations diverged");
            return Some(turn);
        }
    }

    None
}

/// Check that a saved game survives both encodings and reloads into an
/// equivalent simulation.
///
/// Entity ids are not part of a save, so equivalence is judged on the
/// re-captured save rather than on the state hash.
#[must_use]
pub fn verify_save_round_trip(sim: &Simulation) -> bool {
    let save = sim.to_save();

    let Ok(text) = save.to_ron() else {
        return false;
    };
    let Ok(bytes) = save.to_bytes() else {
        return false;
    };
    let (Ok(from_text), Ok(from_bytes)) = (
        siege_core::save::SaveGame::from_ron_str(&text),
        siege_core::save::SaveGame::from_bytes(&bytes),
    ) else {
        return false;
    };
    if from_text != save || from_bytes != save {
        return false;
    }

    let Ok(mut restored) = Simulation::new(sim.config().clone()) else {
        return false;
    };
    if restored.load_save(&from_text).is_err() {
        return false;
    }
    restored.to_save() == save
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for the turn engine.
///
/// These generate random but reproducible player input for property-based
/// tests of determinism and undo/redo.
pub mod strategies {
    use proptest::prelude::*;
    use siege_core::grid::{GridPos, GridSize};
    use siege_core::history::Command;
    use siege_core::unit_kind::{AttackerKind, DefenderKind};

    /// A cell on the standard board, with a one-cell margin so that
    /// out-of-bounds input is exercised too.
    pub fn arb_grid_pos() -> impl Strategy<Value = GridPos> {
        arb_grid_pos_within(GridSize::default())
    }

    /// A cell on a board of `size`, with a one-cell margin.
    pub fn arb_grid_pos_within(size: GridSize) -> impl Strategy<Value = GridPos> {
        (-1..=size.columns, -1..=size.rows).prop_map(|(column, row)| GridPos::new(column, row))
    }

    /// Any defender kind.
    pub fn arb_defender_kind() -> impl Strategy<Value = DefenderKind> {
        proptest::sample::select(DefenderKind::ALL.to_vec())
    }

    /// Any attacker kind.
    pub fn arb_attacker_kind() -> impl Strategy<Value = AttackerKind> {
        proptest::sample::select(AttackerKind::ALL.to_vec())
    }

    /// A single player command, biased towards advancing.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            4 => Just(Command::AdvanceTurn),
            2 => (arb_defender_kind(), arb_grid_pos())
                .prop_map(|(kind, position)| Command::PlaceDefender { kind, position }),
            1 => arb_grid_pos().prop_map(|position| Command::ActivateTile { position }),
            1 => arb_grid_pos().prop_map(|position| Command::CollectPickup { position }),
        ]
    }

    /// A script of up to `max_len` commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        prop::collection::vec(arb_command(), 0..max_len)
    }
}
