//! ASCII board renderer.
//!
//! Renders the lane board as text for terminal review and for the `render`
//! protocol command. Column 0 (the defended edge) is on the left; attackers
//! waiting past the far edge are summarised per row on the right.

use siege_core::simulation::{Entity, Simulation};
use siege_core::unit_kind::{AttackerKind, DefenderKind, EntityKind};

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Print the header line (turn, level, balance).
    pub show_header: bool,
    /// Count attackers waiting beyond the board.
    pub show_incoming: bool,
    /// Show the glyph legend.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_header: true,
            show_incoming: true,
            show_legend: false,
            use_color: false,
        }
    }
}

const EMPTY: char = '.';
const RESET: &str = "\x1b[0m";

fn kind_color(kind: &EntityKind) -> &'static str {
    match kind {
        EntityKind::Attacker(_) => "\x1b[31m",
        EntityKind::Defender(_) => "\x1b[32m",
        EntityKind::Projectile { .. } => "\x1b[36m",
        EntityKind::Pickup { .. } => "\x1b[33m",
    }
}

/// Draw priority when several entities share a cell.
const fn draw_rank(kind: &EntityKind) -> u8 {
    match kind {
        EntityKind::Attacker(_) => 0,
        EntityKind::Defender(_) => 1,
        EntityKind::Pickup { .. } => 2,
        EntityKind::Projectile { .. } => 3,
    }
}

fn cell_entity<'a>(entities: &[&'a Entity]) -> Option<&'a Entity> {
    entities.iter().copied().min_by_key(|e| draw_rank(&e.kind))
}

/// Render the board.
#[must_use]
pub fn render_board(sim: &Simulation, config: &AsciiConfig) -> String {
    let grid = sim.config().grid;
    let mut out = String::new();

    if config.show_header {
        let status = if sim.is_running() { "" } else { "  [stopped]" };
        out.push_str(&format!(
            "Turn {}  Level {}/{}  Balance {}{}\n",
            sim.turn(),
            sim.level() + 1,
            sim.config().levels.len(),
            sim.balance(),
            status
        ));
    }

    for row in 0..grid.rows {
        let in_row: Vec<&Entity> = sim
            .entities()
            .iter()
            .filter(|e| e.position.row == row)
            .collect();
        out.push_str(&format!("{row:>2} |"));

        for column in 0..grid.columns {
            let here: Vec<&Entity> = in_row
                .iter()
                .copied()
                .filter(|e| e.position.column == column)
                .collect();
            match cell_entity(&here) {
                Some(entity) if config.use_color => {
                    out.push_str(kind_color(&entity.kind));
                    out.push(entity.kind.glyph());
                    out.push_str(RESET);
                }
                Some(entity) => out.push(entity.kind.glyph()),
                None => out.push(EMPTY),
            }
        }
        out.push('|');

        if config.show_incoming {
            let waiting = in_row
                .iter()
                .filter(|e| e.kind.is_attacker() && grid.is_beyond_far_edge(e.position))
                .count();
            if waiting > 0 {
                out.push_str(&format!(" <{waiting}"));
            }
        }
        out.push('\n');
    }

    if config.show_legend {
        out.push_str(&legend());
    }

    out
}

/// Glyph legend.
#[must_use]
pub fn legend() -> String {
    let mut parts: Vec<String> = DefenderKind::ALL
        .iter()
        .map(|kind| format!("{}={}", kind.glyph(), kind.tag()))
        .collect();
    parts.extend(
        AttackerKind::ALL
            .iter()
            .map(|kind| format!("{}={}", kind.glyph(), kind.tag())),
    );
    parts.push("*=projectile".to_string());
    parts.push("$=pickup".to_string());
    format!("{}\n", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::grid::GridPos;

    fn plain() -> AsciiConfig {
        AsciiConfig {
            show_header: false,
            show_incoming: false,
            ..AsciiConfig::default()
        }
    }

    #[test]
    fn test_render_dimensions() {
        let sim = Simulation::default();
        let text = render_board(&sim, &plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], " 0 |..........|");
    }

    #[test]
    fn test_render_defender_glyph() {
        let mut sim = Simulation::default();
        sim.place_defender(DefenderKind::Wall, GridPos::new(2, 1));
        let text = render_board(&sim, &plain());
        assert_eq!(text.lines().nth(1), Some(" 1 |..W.......|"));
    }

    #[test]
    fn test_incoming_counts_total_wave() {
        let sim = Simulation::default();
        let text = render_board(
            &sim,
            &AsciiConfig {
                show_header: false,
                ..AsciiConfig::default()
            },
        );
        let waiting: usize = text
            .lines()
            .filter_map(|line| line.split('<').nth(1))
            .map(|n| n.parse::<usize>().unwrap())
            .sum();
        assert_eq!(waiting, 3);
    }

    #[test]
    fn test_header_and_legend() {
        let sim = Simulation::default();
        let text = render_board(
            &sim,
            &AsciiConfig {
                show_legend: true,
                ..AsciiConfig::default()
            },
        );
        assert!(text.starts_with("Turn 0  Level 1/3  Balance 400\n"));
        assert!(text.contains("W=wall"));
        assert!(text.contains("Z=basic_attacker"));
    }

    #[test]
    fn test_color_wraps_glyph() {
        let mut sim = Simulation::default();
        sim.place_defender(DefenderKind::Shooter, GridPos::new(0, 0));
        let text = render_board(
            &sim,
            &AsciiConfig {
                use_color: true,
                ..plain()
            },
        );
        assert!(text.contains("\x1b[32mP\x1b[0m"));
    }
}
