//! fruitmatch: match-3 tile puzzle in the terminal, on top of the headless engine.

mod app;
mod headless;
mod input;
mod score;
mod theme;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use fruitmatch::{EngineConfig, LevelLayout};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Presentation options derived from the CLI.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How long each resolution step is shown before the engine is told to continue.
    pub step_ms: u64,
    pub no_animation: bool,
    pub frame_rate: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref(), args.headless.is_some())?;

    let layout = match &args.level {
        Some(path) => LevelLayout::load(path)
            .with_context(|| format!("cannot load level {}", path.display()))?,
        None => LevelLayout::default_level(),
    };
    let engine_config = args.engine_config();

    if let Some(moves) = args.headless {
        return headless::run(&layout, &engine_config, moves);
    }

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        step_ms: args.step_ms,
        no_animation: args.no_animation,
        frame_rate: args.frame_rate,
    };
    let mut app = App::new(layout, engine_config, config, theme)?;
    app.run()
}

/// Headless runs log to stderr; the TUI only logs when given a file, so the alternate
/// screen stays clean. `RUST_LOG` overrides the default `info` filter.
fn init_tracing(log_file: Option<&Path>, headless: bool) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("cannot create log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .with(filter())
            .init();
    } else if headless {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter())
            .init();
    }
    Ok(())
}

/// Match-3 tile puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "fruitmatch",
    version,
    about = "Match-3 tile puzzle in the terminal. Swap neighbouring tiles to line up three or more; clear obstacles by matching next to them.",
    long_about = "fruitmatch is a match-3 puzzle played on shaped boards with multi-cell obstacles.\n\n\
        Swap two neighbouring tiles to make a row or column of three or more of the same kind. \
        Matched tiles vanish, tiles above fall (sliding around obstacles) and new ones drop in. \
        A match next to an obstacle chips it; when its hits run out the obstacle opens up.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor    Enter / Space  Select, then an arrow swaps\n  \
        ? / Tab        Hint           R              Restart\n  P              Pause          Q / Esc        Quit\n\n\
        Use --level to load a JSON level ({\"name\", \"grid\": [[0|1|2, ...]], \"obstacle_hits\"})."
)]
pub struct Args {
    /// JSON level file. Uses the built-in Orchard board if not set.
    #[arg(short, long, value_name = "FILE")]
    pub level: Option<PathBuf>,

    /// Seed for the tile generator. Same seed and moves replay the same game.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Number of distinct tile kinds (3..=12).
    #[arg(long, default_value = "5", value_name = "N")]
    pub palette_size: u8,

    /// Hits each obstacle takes before it opens, unless the level sets its own.
    #[arg(long, default_value = "1", value_name = "N")]
    pub obstacle_hits: u32,

    /// Force-resolve a move if no step completes within this many ms.
    #[arg(long, default_value = "5000", value_name = "MS")]
    pub watchdog_ms: u64,

    /// How long each resolution step (swap, clear, fall) is shown.
    #[arg(long, default_value = "180", value_name = "MS")]
    pub step_ms: u64,

    /// Skip step animations; resolutions complete on the next frame.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Play N hinted moves without a terminal UI and print the result.
    #[arg(long, value_name = "MOVES")]
    pub headless: Option<u32>,

    /// Write logs to this file (the TUI is otherwise silent).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            palette_size: self.palette_size,
            obstacle_hits: self.obstacle_hits,
            watchdog_timeout: Duration::from_millis(self.watchdog_ms),
            seed: self.seed.unwrap_or(defaults.seed),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_to_engine_config() {
        let args = Args::parse_from([
            "fruitmatch",
            "--seed",
            "7",
            "--palette-size",
            "6",
            "--watchdog-ms",
            "250",
        ]);
        let config = args.engine_config();
        assert_eq!(config.seed, 7);
        assert_eq!(config.palette_size, 6);
        assert_eq!(config.watchdog_timeout, Duration::from_millis(250));
        assert_eq!(config.obstacle_hits, 1);
        assert!(args.headless.is_none());
    }
}
