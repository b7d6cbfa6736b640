//! Headless auto-play: drives the engine with its own hints and prints a summary.

use std::time::Instant;

use anyhow::{Context, Result};
use fruitmatch::{Engine, EngineConfig, LevelLayout};
use tracing::{debug, info, warn};

use crate::score::Scoreboard;

/// Play up to `moves` hinted moves, settling each resolution synchronously.
pub fn run(layout: &LevelLayout, config: &EngineConfig, moves: u32) -> Result<()> {
    let mut engine = Engine::load_level(layout, config).context("failed to load level")?;
    let mut board = Scoreboard::default();
    println!("{}", engine.board());

    for turn in 1..=moves {
        let Some((from, dir)) = engine.hint() else {
            warn!(turn, "no move creates a match; stopping");
            break;
        };
        let now = Instant::now();
        engine
            .request_move(from, dir, now)
            .with_context(|| format!("hinted move {from} {dir:?} was rejected"))?;
        let outcome = engine.settle(now);
        let events = engine.drain_events();
        debug!(turn, %from, ?dir, events = events.len(), ?outcome, "move resolved");
        board.record_all(&events);
    }

    let diag = engine.diagnostics();
    info!(
        score = board.score,
        moves = board.moves,
        watchdog_trips = diag.watchdog_trips,
        inconsistencies = diag.inconsistencies,
        "headless run finished"
    );
    println!("{}", engine.board());
    println!(
        "score {}  moves {}  reverted {}  tiles {}  obstacles {}  best cascade {}  obstacles left {}",
        board.score,
        board.moves,
        board.reverted,
        board.tiles_cleared,
        board.obstacles_cleared,
        board.best_cascade,
        engine.board().regions().count(),
    );
    Ok(())
}
