//! The resolution loop: move validation, the phase state machine and the step barrier.
//!
//! The engine never advances on its own. After a move is accepted the caller animates
//! the drained events and calls [`Engine::complete_step`] once per barrier; a headless
//! caller uses [`Engine::settle`]. [`Engine::check_watchdog`] force-resolves a
//! resolution whose caller stopped stepping.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::board::{Board, CellState, Topology};
use super::config::EngineConfig;
use super::error::{Inconsistency, LevelError, MoveRejection};
use super::events::{Event, Resolution};
use super::gravity;
use super::layout::LevelLayout;
use super::matcher::{find_matches, is_in_run, runs_through};
use super::resolver::{apply_hits, eliminate};
use super::rng::TileRng;
use super::types::{Direction, Pos};

/// Where the engine is in a resolution. `Validating` and `Matching` are only held inside
/// a single call; callers observe `Idle`, `Swapped`, `Eliminating` and `Falling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Swapped,
    Matching,
    Eliminating,
    Falling,
}

/// Counters for absorbed failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub watchdog_trips: u32,
    pub inconsistencies: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingMove {
    from: Pos,
    to: Pos,
}

#[derive(Debug, Clone)]
pub struct Engine {
    board: Board,
    rng: TileRng,
    config: EngineConfig,
    phase: Phase,
    events: Vec<Event>,
    pending: Option<PendingMove>,
    rounds: u32,
    eliminated: usize,
    /// Time of the last accepted move or step while busy.
    last_progress: Option<Instant>,
    last_resolution: Option<Resolution>,
    diagnostics: Diagnostics,
}

impl Engine {
    /// Validate the configuration, build the board and fill it with no runs of three.
    pub fn load_level(layout: &LevelLayout, config: &EngineConfig) -> Result<Self, LevelError> {
        config.validate()?;
        let mut rng = TileRng::new(config.seed, config.palette_size);
        let mut board = Board::from_layout(layout, config.obstacle_hits);
        board.fill_without_runs(&mut rng);
        info!(
            level = %layout.name,
            rows = board.rows(),
            cols = board.cols(),
            obstacles = layout.obstacles().len(),
            playable = board.playable_count(),
            seed = config.seed,
            "level loaded"
        );
        Ok(Self::with_rng(board, rng, config.clone()))
    }

    /// Wrap an already-populated board. Spawns use the configured seed and palette.
    pub fn from_board(board: Board, config: EngineConfig) -> Result<Self, LevelError> {
        config.validate()?;
        let rng = TileRng::new(config.seed, config.palette_size);
        Ok(Self::with_rng(board, rng, config))
    }

    fn with_rng(board: Board, rng: TileRng, config: EngineConfig) -> Self {
        Self {
            board,
            rng,
            config,
            phase: Phase::Idle,
            events: Vec::new(),
            pending: None,
            rounds: 0,
            eliminated: 0,
            last_progress: None,
            last_resolution: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Outcome of the most recent finished resolution.
    pub fn last_resolution(&self) -> Option<Resolution> {
        self.last_resolution
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<CellState> {
        self.board.cell_state(Pos::new(row, col))
    }

    /// Take every event emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Legality of swapping `from` with its neighbour in `dir`. Returns the destination.
    pub fn validate_move(&self, from: Pos, dir: Direction) -> Result<Pos, MoveRejection> {
        let to = from
            .step(dir)
            .filter(|&p| self.board.in_bounds(p))
            .ok_or(MoveRejection::OutOfBounds)?;
        let (Some(src), Some(dst)) = (self.board.topology(from), self.board.topology(to)) else {
            return Err(MoveRejection::OutOfBounds);
        };
        if src == Topology::Void || dst == Topology::Void {
            return Err(MoveRejection::NotPlayable);
        }
        if !self.board.is_occupied(from) {
            return Err(MoveRejection::NoTile);
        }
        if matches!(dst, Topology::Obstacle(_)) {
            return Err(MoveRejection::NotPlayable);
        }
        if !self.board.is_occupied(to) {
            return Err(MoveRejection::NoTile);
        }
        Ok(to)
    }

    /// Swap the tile at `from` with its neighbour in `dir` and start a resolution.
    /// Requests while a resolution is in progress are dropped with `Busy`.
    pub fn request_move(
        &mut self,
        from: Pos,
        dir: Direction,
        now: Instant,
    ) -> Result<(), MoveRejection> {
        if self.phase != Phase::Idle {
            debug!(%from, ?dir, phase = ?self.phase, "move dropped while busy");
            return Err(MoveRejection::Busy);
        }
        self.phase = Phase::Validating;
        let to = match self.validate_move(from, dir) {
            Ok(to) => to,
            Err(reason) => {
                self.phase = Phase::Idle;
                debug!(%from, ?dir, %reason, "move rejected");
                return Err(reason);
            }
        };

        self.board.swap(from, to);
        self.push_swap_events(from, to);
        self.pending = Some(PendingMove { from, to });
        self.rounds = 0;
        self.eliminated = 0;
        self.last_progress = Some(now);
        self.phase = Phase::Swapped;
        debug!(%from, %to, "swap applied");
        Ok(())
    }

    /// The presentation finished animating the current step; advance one barrier.
    /// Returns the new phase.
    pub fn complete_step(&mut self, now: Instant) -> Phase {
        match self.phase {
            Phase::Swapped | Phase::Falling => self.match_step(),
            Phase::Eliminating => self.fall_step(),
            Phase::Idle | Phase::Validating | Phase::Matching => {
                warn!(issue = %Inconsistency::UnexpectedStep, phase = ?self.phase, "step ignored");
            }
        }
        self.last_progress = (self.phase != Phase::Idle).then_some(now);
        self.phase
    }

    /// Drive steps until the engine is idle. Returns the outcome if a resolution finished.
    pub fn settle(&mut self, now: Instant) -> Option<Resolution> {
        if self.phase == Phase::Idle {
            return None;
        }
        while self.phase != Phase::Idle {
            self.complete_step(now);
        }
        self.last_resolution
    }

    /// Force-resolve if the engine has been busy without a step for longer than the
    /// configured timeout. Returns true when it fired.
    pub fn check_watchdog(&mut self, now: Instant) -> bool {
        let Some(since) = self.last_progress else {
            return false;
        };
        if self.phase == Phase::Idle
            || now.saturating_duration_since(since) <= self.config.watchdog_timeout
        {
            return false;
        }
        self.diagnostics.watchdog_trips += 1;
        warn!(
            phase = ?self.phase,
            waited_ms = now.saturating_duration_since(since).as_millis() as u64,
            trips = self.diagnostics.watchdog_trips,
            "watchdog fired; force-resolving"
        );
        self.settle(now);
        true
    }

    /// A swap that would create a match, scanning cells in `(row, col)` order.
    pub fn hint(&self) -> Option<(Pos, Direction)> {
        let mut probe = self.board.clone();
        for from in self.board.positions() {
            for dir in [Direction::Right, Direction::Down] {
                let Ok(to) = self.validate_move(from, dir) else {
                    continue;
                };
                probe.swap(from, to);
                let hit = is_in_run(&probe, from) || is_in_run(&probe, to);
                probe.swap(from, to);
                if hit {
                    return Some((from, dir));
                }
            }
        }
        None
    }

    /// No legal swap creates a match.
    pub fn is_dead_board(&self) -> bool {
        self.hint().is_none()
    }

    fn push_swap_events(&mut self, a: Pos, b: Pos) {
        // After the swap `b` holds what was at `a` and vice versa.
        if let Some(tile) = self.board.tile(b) {
            self.events.push(Event::TileMoved { from: a, to: b, tile });
        }
        if let Some(tile) = self.board.tile(a) {
            self.events.push(Event::TileMoved { from: b, to: a, tile });
        }
    }

    fn match_step(&mut self) {
        self.phase = Phase::Matching;
        // The first round only counts runs the swap made.
        let matched = match self.pending {
            Some(m) if self.rounds == 0 => runs_through(&self.board, &[m.from, m.to]),
            _ => find_matches(&self.board),
        };

        if matched.is_empty() {
            if self.rounds == 0 {
                self.revert();
            } else {
                self.finish(Resolution::Stable {
                    rounds: self.rounds,
                    eliminated: self.eliminated,
                });
            }
            return;
        }
        if self.rounds >= self.config.max_cascade_rounds {
            self.record(Inconsistency::CascadeBoundExceeded {
                rounds: self.rounds,
            });
            self.finish(Resolution::Stable {
                rounds: self.rounds,
                eliminated: self.eliminated,
            });
            return;
        }

        let target_hint = match self.pending {
            Some(m) if self.rounds == 0 && matched.contains(&m.to) => Some(m.to),
            _ => matched.first().copied(),
        };
        let elimination = eliminate(&mut self.board, &matched);
        self.rounds += 1;
        self.eliminated += elimination.cleared.len();
        debug!(
            round = self.rounds,
            cleared = elimination.cleared.len(),
            regions_hit = elimination.hits.len(),
            "tiles eliminated"
        );
        self.events.push(Event::TilesEliminated {
            cells: elimination.cleared,
            target_hint,
        });

        let depleted = apply_hits(&mut self.board, &elimination.hits, &mut self.events);
        if !depleted.is_empty() {
            for issue in self.board.inconsistencies() {
                self.record(issue);
            }
        }
        self.phase = Phase::Eliminating;
    }

    fn fall_step(&mut self) {
        let report = gravity::fill(&mut self.board, &mut self.rng, &mut self.events);
        if report.inconsistency.is_some() {
            self.diagnostics.inconsistencies += 1;
        }
        self.phase = Phase::Falling;
    }

    fn revert(&mut self) {
        if let Some(PendingMove { from, to }) = self.pending {
            self.board.swap(from, to);
            self.push_swap_events(to, from);
        }
        self.finish(Resolution::Reverted);
    }

    fn finish(&mut self, resolution: Resolution) {
        info!(?resolution, "resolution complete");
        self.events.push(Event::ResolutionComplete { resolution });
        self.last_resolution = Some(resolution);
        self.pending = None;
        self.phase = Phase::Idle;
    }

    fn record(&mut self, issue: Inconsistency) {
        self.diagnostics.inconsistencies += 1;
        error!(%issue, "inconsistent state");
    }
}
