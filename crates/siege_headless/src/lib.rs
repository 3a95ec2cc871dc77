//! Headless Lane Siege driver for scripted play and CI verification.
//!
//! This crate drives the simulation without graphics, controlled via JSON
//! commands on stdin with game state output on stdout. This enables:
//!
//! - **Scripted play**: a controller process plays the game line by line
//! - **Balance testing**: greedy strategies play many seeds in parallel
//! - **Config checks**: tuning files are validated before use
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (advance, place, undo, ...)
//! - **stdout**: Responses and notifications (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"advance","count":10}' | cargo run -p siege_headless
//!
//! # Play 200 seeded games with the turtle strategy
//! cargo run -p siege_headless -- autoplay --games 200 --strategy turtle
//!
//! # Check a tuning file
//! cargo run -p siege_headless -- validate tuning.ron
//! ```

pub mod ascii_visualizer;
pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod strategies;

pub use ascii_visualizer::{render_board, AsciiConfig};
pub use batch::{play_game, run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, GameMetrics, GameOutcome, MetricsCollector};
pub use protocol::{Command, ProtocolError, Response, StateReport};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use strategies::{Strategy, StrategyExecutor};
