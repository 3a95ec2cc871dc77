//! Headless Lane Siege runner.
//!
//! This binary runs the game without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted controllers, CI testing, and balance
//! runs.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p siege_headless
//!
//! # Interactive with a custom tuning file and a saved game
//! cargo run -p siege_headless -- --config tuning.ron run --load save.ron
//!
//! # Batch autoplay
//! cargo run -p siege_headless -- autoplay --games 500 --output results/autoplay.json
//!
//! # Validate a tuning file
//! cargo run -p siege_headless -- validate tuning.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use siege_core::config::GameConfig;
use siege_headless::{
    ascii_visualizer::AsciiConfig,
    batch::{run_batch, BatchConfig, DEFAULT_MAX_TURNS},
    runner::{HeadlessConfig, HeadlessRunner},
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless Lane Siege runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game tuning file (RON); the built-in tuning is used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive game
    Run {
        /// Saved game to load on startup
        #[arg(short, long)]
        load: Option<PathBuf>,

        /// Output state after every state-changing command
        #[arg(long)]
        auto_state: bool,

        /// Do not write notification lines
        #[arg(long)]
        quiet_events: bool,

        /// Use ANSI colors in rendered boards
        #[arg(long)]
        color: bool,
    },

    /// Play many seeded games with a scripted strategy
    Autoplay {
        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        games: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Turn limit per game
        #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
        max_turns: u64,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Built-in strategy name or path to a RON strategy file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Write full results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a tuning file and report the first problem
    Validate {
        /// Tuning file (RON)
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the protocol
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Validate { path }) => cmd_validate(&path),
        command => {
            let config = match load_config(cli.config.as_deref()) {
                Ok(config) => config,
                Err(message) => {
                    eprintln!("FATAL: {message}");
                    return ExitCode::FAILURE;
                }
            };
            match command {
                Some(Commands::Run {
                    load,
                    auto_state,
                    quiet_events,
                    color,
                }) => cmd_run(config, load, auto_state, quiet_events, color),
                Some(Commands::Autoplay {
                    games,
                    seed,
                    max_turns,
                    parallel,
                    strategy,
                    output,
                }) => cmd_autoplay(&config, games, seed, max_turns, parallel, &strategy, output),
                Some(Commands::Validate { .. }) | None => {
                    cmd_run(config, None, false, false, false)
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GameConfig, String> {
    match path {
        Some(path) => {
            let config = GameConfig::load(path)
                .map_err(|e| format!("cannot load config '{}': {e}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded tuning");
            Ok(config)
        }
        None => Ok(GameConfig::default()),
    }
}

/// Run a single interactive game
fn cmd_run(
    config: GameConfig,
    load: Option<PathBuf>,
    auto_state: bool,
    quiet_events: bool,
    color: bool,
) -> ExitCode {
    tracing::info!("Starting interactive session");

    let headless = HeadlessConfig {
        auto_state_output: auto_state,
        echo_events: !quiet_events,
        load_path: load,
        ascii: AsciiConfig {
            use_color: color,
            ..AsciiConfig::default()
        },
    };

    let mut runner = match HeadlessRunner::new(config, headless) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match runner.run(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            ExitCode::FAILURE
        }
    }
}

/// Play a batch of games
fn cmd_autoplay(
    config: &GameConfig,
    games: u32,
    seed: u64,
    max_turns: u64,
    parallel: u32,
    strategy: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let strategy = match Strategy::preset(strategy) {
        Some(preset) => preset,
        None => match Strategy::load(strategy) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("FATAL: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let batch = BatchConfig {
        game_count: games,
        parallel_games: parallel,
        seed_start: seed,
        max_turns,
        strategy,
    };
    let results = run_batch(batch, config);

    if let Some(path) = output {
        if let Err(e) = results.save(&path) {
            tracing::error!(error = %e, path = %path.display(), "Failed to save results");
            eprintln!("FATAL: Failed to save results: {e}");
            return ExitCode::FAILURE;
        }
        tracing::info!(path = %path.display(), "results written");
    }

    match serde_json::to_string_pretty(&results.summary) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    }

    if results.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        eprintln!("{} game(s) failed", results.errors.len());
        ExitCode::FAILURE
    }
}

/// Validate a tuning file
fn cmd_validate(path: &Path) -> ExitCode {
    match GameConfig::load(path) {
        Ok(config) => {
            println!(
                "OK: {}x{} board, {} level(s), initial balance {}",
                config.grid.columns,
                config.grid.rows,
                config.levels.len(),
                config.initial_balance
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("INVALID: {e}");
            ExitCode::FAILURE
        }
    }
}
