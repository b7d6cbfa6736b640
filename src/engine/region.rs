//! Obstacle regions: rectangular blockers with a hit counter.

use super::types::{Pos, RegionId};

/// A live obstacle region. Removed from the board's active set exactly once, when
/// `remaining_hits` reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleRegion {
    pub id: RegionId,
    pub anchor: Pos,
    pub width: usize,
    pub height: usize,
    remaining_hits: u32,
}

impl ObstacleRegion {
    pub fn new(id: RegionId, anchor: Pos, width: usize, height: usize, hits: u32) -> Self {
        Self {
            id,
            anchor,
            width,
            height,
            remaining_hits: hits,
        }
    }

    pub fn remaining_hits(&self) -> u32 {
        self.remaining_hits
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining_hits == 0
    }

    /// Apply `hits`, clamping at zero. Returns the remaining count. The counter never grows.
    pub fn absorb(&mut self, hits: u32) -> u32 {
        self.remaining_hits = self.remaining_hits.saturating_sub(hits);
        self.remaining_hits
    }

    /// Member cells in row-major order.
    pub fn cells(&self) -> Vec<Pos> {
        (self.anchor.row..self.anchor.row + self.height)
            .flat_map(|row| {
                (self.anchor.col..self.anchor.col + self.width).map(move |col| Pos::new(row, col))
            })
            .collect()
    }
}
