//! ASCII grid visualizer.
//!
//! Renders the terrain, each mover's pending steps and last planned line,
//! and the movers themselves for quick terminal review. Row 0 is drawn at
//! the bottom.

use std::collections::HashMap;

use gridwalk_core::grid::{CellClass, GridCoordinate, GridQuery};
use gridwalk_core::simulation::Simulation;

/// Glyph for a mover.
pub const MOVER_GLYPH: char = '@';
/// Glyph for a queued step.
pub const PENDING_GLYPH: char = '*';
/// Glyph for a cell on the last planned line that is no longer queued.
pub const LINE_GLYPH: char = '+';

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Draw pending steps and last lines.
    pub show_paths: bool,
    /// Show the legend below the grid.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_paths: true,
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const WHITE: &str = "\x1b[37m";
    pub const GRAY: &str = "\x1b[90m";
}

fn glyph_color(glyph: char) -> &'static str {
    match glyph {
        MOVER_GLYPH => colors::YELLOW,
        PENDING_GLYPH => colors::CYAN,
        LINE_GLYPH => colors::WHITE,
        _ => match CellClass::from_glyph(glyph) {
            Some(CellClass::Water) => colors::BLUE,
            Some(CellClass::Grass) => colors::GREEN,
            Some(CellClass::Stone) => colors::WHITE,
            _ => colors::GRAY,
        },
    }
}

/// Overlay glyphs keyed by cell. Later layers win.
fn overlays(sim: &Simulation, config: &AsciiConfig) -> HashMap<GridCoordinate, char> {
    let mut overlay = HashMap::new();

    for mover in sim.movers().iter_sorted() {
        if config.show_paths {
            for &cell in mover.last_line() {
                overlay.insert(cell, LINE_GLYPH);
            }
        }
    }
    for mover in sim.movers().iter_sorted() {
        if config.show_paths {
            for &cell in mover.pending_steps() {
                overlay.insert(cell, PENDING_GLYPH);
            }
        }
    }
    for mover in sim.movers().iter_sorted() {
        overlay.insert(mover.cell(), MOVER_GLYPH);
    }

    overlay
}

/// Render the grid as plain rows, top row first.
pub fn render_rows(sim: &Simulation, config: &AsciiConfig) -> Vec<String> {
    let grid = sim.grid();
    let overlay = overlays(sim, config);

    (0..grid.height() as i32)
        .rev()
        .map(|y| {
            (0..grid.width() as i32)
                .map(|x| {
                    let cell = GridCoordinate::new(x, y);
                    overlay
                        .get(&cell)
                        .copied()
                        .unwrap_or_else(|| grid.classify(cell).glyph())
                })
                .collect()
        })
        .collect()
}

/// Render the simulation as framed ASCII art.
pub fn render_ascii(sim: &Simulation, config: &AsciiConfig) -> String {
    let rows = render_rows(sim, config);
    let width = sim.grid().width() as usize;
    let mut output = String::new();

    let (bold, reset) = if config.use_color {
        (colors::BOLD, colors::RESET)
    } else {
        ("", "")
    };

    output.push_str(&format!(
        "{bold}══ Tick: {} │ Movers: {} ══{reset}\n",
        sim.get_tick(),
        sim.movers().len(),
    ));

    output.push('╔');
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");

    for row in &rows {
        output.push('║');
        for ch in row.chars() {
            if config.use_color && ch != ' ' {
                output.push_str(glyph_color(ch));
                output.push(ch);
                output.push_str(colors::RESET);
            } else {
                output.push(ch);
            }
        }
        output.push_str("║\n");
    }

    output.push('╚');
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");

    if config.show_legend {
        output.push_str(&format!(
            "{MOVER_GLYPH}=mover {PENDING_GLYPH}=pending {LINE_GLYPH}=last line \
             .=grass ,=dirt #=stone ~=water ==path\n"
        ));
        for mover in sim.movers().iter_sorted() {
            let motion = mover.motion();
            let target = motion
                .target
                .map_or_else(|| "-".to_string(), |t| t.to_string());
            output.push_str(&format!(
                "  #{} at {} [{}] target {} pending {}\n",
                mover.id(),
                mover.cell(),
                motion.phase.name(),
                target,
                motion.pending.len(),
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::config::{MovementConfig, StepPacing};
    use gridwalk_core::grid::TileGrid;
    use gridwalk_core::math::Fixed;

    fn quick() -> MovementConfig {
        MovementConfig {
            pacing: StepPacing::FixedDuration(Fixed::ONE),
            step_delay: Fixed::ZERO,
            tick_rate: 1,
            ..Default::default()
        }
    }

    fn plain() -> AsciiConfig {
        AsciiConfig {
            use_color: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_terrain_rows_top_first() {
        let grid = TileGrid::from_ascii(&["~..", ",# "]).unwrap();
        let sim = Simulation::new(grid, quick()).unwrap();
        assert_eq!(render_rows(&sim, &plain()), vec!["~..", ",# "]);
    }

    #[test]
    fn test_mover_and_pending_overlay() {
        let grid = TileGrid::filled(6, 2, CellClass::Grass);
        let mut sim = Simulation::new(grid, quick()).unwrap();
        let mover = sim.spawn_mover(GridCoordinate::new(0, 0)).unwrap();
        sim.command_move(mover, GridCoordinate::new(4, 0).to_world())
            .unwrap();

        assert_eq!(render_rows(&sim, &plain()), vec!["......", "@....."]);

        // Planned, first step underway: (1, 0) left the queue.
        sim.tick();
        assert_eq!(render_rows(&sim, &plain()), vec!["......", "@+***."]);

        sim.tick();
        assert_eq!(render_rows(&sim, &plain()), vec!["......", ".@+**."]);
    }

    #[test]
    fn test_paths_can_be_hidden() {
        let grid = TileGrid::filled(4, 1, CellClass::Dirt);
        let mut sim = Simulation::new(grid, quick()).unwrap();
        let mover = sim.spawn_mover(GridCoordinate::new(0, 0)).unwrap();
        sim.command_move(mover, GridCoordinate::new(3, 0).to_world())
            .unwrap();
        sim.tick();

        let config = AsciiConfig {
            show_paths: false,
            ..plain()
        };
        assert_eq!(render_rows(&sim, &config), vec!["@,,,"]);
    }

    #[test]
    fn test_framed_render() {
        let grid = TileGrid::filled(3, 2, CellClass::Water);
        let mut sim = Simulation::new(grid, quick()).unwrap();
        sim.grid_mut()
            .set_cell(GridCoordinate::new(1, 1), CellClass::Path);
        sim.spawn_mover(GridCoordinate::new(1, 1)).unwrap();

        let art = render_ascii(&sim, &plain());
        assert!(art.contains("Tick: 0"));
        assert!(art.contains("║~@~║"));
        assert!(art.contains("║~~~║"));
        assert!(art.contains("#1 at (1, 1) [idle]"));
        assert!(!art.contains('\x1b'));

        let colored = render_ascii(&sim, &AsciiConfig::default());
        assert!(colored.contains('\x1b'));
    }
}
