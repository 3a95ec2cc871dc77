//! Headless game runner implementation.
//!
//! A synchronous read-eval loop over JSON lines. Each input line is handled
//! to completion: the notifications it raised are written as `event` lines,
//! then the command's own response.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use siege_core::config::GameConfig;
use siege_core::events::{EventRecorder, TracingSubscriber};
use siege_core::game::Game;
use siege_core::simulation::{PlacementOutcome, TileOutcome};

use crate::ascii_visualizer::{render_board, AsciiConfig};
use crate::protocol::{cell, parse_unit, Command, ProtocolError, Response, StateReport};

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Output state after every state-changing command (vs only on
    /// `advance` and `query`).
    pub auto_state_output: bool,
    /// Write game notifications as `event` lines.
    pub echo_events: bool,
    /// Save file to load on startup.
    pub load_path: Option<PathBuf>,
    /// Board rendering for `render`.
    pub ascii: AsciiConfig,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            auto_state_output: false,
            echo_events: true,
            load_path: None,
            ascii: AsciiConfig::default(),
        }
    }
}

/// Headless runner for controller-driven play.
pub struct HeadlessRunner {
    game: Game,
    events: EventRecorder,
    config: HeadlessConfig,
}

impl std::fmt::Debug for HeadlessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessRunner")
            .field("game", &self.game)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HeadlessRunner {
    /// Create a runner for a new game.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the startup save cannot be
    /// loaded.
    pub fn new(game_config: GameConfig, config: HeadlessConfig) -> Result<Self, ProtocolError> {
        let mut game = Game::new(game_config)?;
        let events = EventRecorder::new();
        game.subscribe(Box::new(TracingSubscriber));
        game.subscribe(Box::new(events.clone()));
        events.take();

        if let Some(path) = &config.load_path {
            game.load(path)?;
            events.take();
            tracing::info!(path = %path.display(), "loaded startup save");
        }

        Ok(Self {
            game,
            events,
            config,
        })
    }

    /// The game being driven.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Run the session until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading input or writing output fails;
    /// bad commands are answered with `error` lines.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), ProtocolError> {
        let sim = self.game.simulation();
        write_response(&mut output, &Response::ready(sim.turn(), sim.balance()))?;
        tracing::info!("session started");

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (responses, quit) = self.handle_line(line);
            for response in &responses {
                write_response(&mut output, response)?;
            }
            if quit {
                tracing::info!("session ended by controller");
                return Ok(());
            }
        }

        write_response(&mut output, &Response::Bye)?;
        tracing::info!("session ended at end of input");
        Ok(())
    }

    /// Handle one input line. Returns the responses to write and whether the
    /// session should end.
    pub fn handle_line(&mut self, line: &str) -> (Vec<Response>, bool) {
        match Command::from_json(line) {
            Ok(cmd) => {
                let quit = cmd == Command::Quit;
                (self.handle(cmd), quit)
            }
            Err(e) => {
                tracing::debug!(%e, line, "unparseable command");
                (vec![Response::error(e.to_string(), None)], false)
            }
        }
    }

    /// Handle one command.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        tracing::debug!(cmd = name, "handling command");

        let result = self.execute(cmd);
        let mut responses: Vec<Response> = if self.config.echo_events {
            self.events
                .take()
                .into_iter()
                .map(|event| Response::Event { event })
                .collect()
        } else {
            self.events.take();
            Vec::new()
        };

        match result {
            Ok(mut replies) => responses.append(&mut replies),
            Err(e) => {
                tracing::warn!(cmd = name, %e, "command failed");
                responses.push(Response::error(e.to_string(), Some(name)));
            }
        }
        responses
    }

    fn state(&self) -> Response {
        Response::State(StateReport::capture(
            self.game.simulation(),
            self.game.is_undo_available(),
            self.game.is_redo_available(),
        ))
    }

    fn with_state(&self, ack: Response) -> Vec<Response> {
        if self.config.auto_state_output {
            vec![ack, self.state()]
        } else {
            vec![ack]
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Vec<Response>, ProtocolError> {
        let name = cmd.name();
        let replies = match cmd {
            Command::Advance { count } => {
                for _ in 0..count {
                    if !self.game.simulation().is_running() {
                        break;
                    }
                    self.game.advance_turn();
                }
                vec![self.state()]
            }

            Command::Place { unit, column, row } => {
                let kind = parse_unit(&unit)?;
                let outcome = self.game.place(kind, cell(column, row));
                self.with_state(Response::ack_with(name, placement_detail(&outcome)))
            }

            Command::Select { unit } => {
                match unit {
                    Some(unit) => self.game.select_defender(parse_unit(&unit)?),
                    None => self.game.clear_selection(),
                }
                vec![Response::ack(name)]
            }

            Command::Tile { column, row } => {
                let detail = match self.game.activate_tile(cell(column, row)) {
                    TileOutcome::Collected { reward } => format!("collected {reward}"),
                    TileOutcome::Placement { placement } => placement_detail(&placement),
                    TileOutcome::NoSelection => "no selection".to_string(),
                };
                self.with_state(Response::ack_with(name, detail))
            }

            Command::Collect { column, row } => {
                let detail = match self.game.collect(cell(column, row)) {
                    Some(reward) => format!("collected {reward}"),
                    None => "nothing to collect".to_string(),
                };
                self.with_state(Response::ack_with(name, detail))
            }

            Command::Undo => {
                let detail = if self.game.undo() { "undone" } else { "nothing to undo" };
                self.with_state(Response::ack_with(name, detail))
            }

            Command::Redo => {
                let detail = if self.game.redo() { "redone" } else { "nothing to redo" };
                self.with_state(Response::ack_with(name, detail))
            }

            Command::Query => vec![self.state()],

            Command::Render => vec![Response::Board {
                text: render_board(self.game.simulation(), &self.config.ascii),
            }],

            Command::Save { path } => {
                self.game.save(&path)?;
                vec![Response::ack_with(name, path)]
            }

            Command::Load { path } => {
                self.game.load(&path)?;
                self.with_state(Response::ack_with(name, path))
            }

            Command::Restart => {
                self.game.restart();
                self.with_state(Response::ack(name))
            }

            Command::Quit => vec![Response::Bye],
        };
        Ok(replies)
    }
}

fn placement_detail(outcome: &PlacementOutcome) -> String {
    match outcome {
        PlacementOutcome::Placed { .. } => "placed".to_string(),
        PlacementOutcome::Rejected { reason } => format!("rejected: {reason}"),
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> Result<(), ProtocolError> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()?;
    Ok(())
}
