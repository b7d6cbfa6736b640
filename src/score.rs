//! Running totals derived from engine events. The engine keeps no score of its own.

use fruitmatch::{Event, Resolution};

const POINTS_PER_TILE: u64 = 10;
const OBSTACLE_BONUS: u64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub score: u64,
    /// Moves that produced at least one elimination.
    pub moves: u32,
    pub reverted: u32,
    pub tiles_cleared: u64,
    pub obstacles_cleared: u32,
    pub best_cascade: u32,
    /// Elimination rounds seen in the resolution in progress.
    round: u32,
}

impl Scoreboard {
    /// Fold one event in. Later cascade rounds multiply the tile points.
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::TilesEliminated { cells, .. } => {
                self.round += 1;
                let n = cells.len() as u64;
                self.tiles_cleared += n;
                self.score += n * POINTS_PER_TILE * u64::from(self.round);
            }
            Event::ObstacleDepleted { .. } => {
                self.obstacles_cleared += 1;
                self.score += OBSTACLE_BONUS;
            }
            Event::ResolutionComplete { resolution } => {
                match *resolution {
                    Resolution::Reverted => self.reverted += 1,
                    Resolution::Stable { rounds, .. } => {
                        self.moves += 1;
                        self.best_cascade = self.best_cascade.max(rounds);
                    }
                }
                self.round = 0;
            }
            Event::TileMoved { .. } | Event::ObstacleHit { .. } | Event::TileSpawned { .. } => {}
        }
    }

    pub fn record_all<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for e in events {
            self.record(e);
        }
    }
}
