//! State-change events emitted during a resolution, in emission order.

use super::types::{Pos, RegionId, TileType};

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The swap made no match and was undone.
    Reverted,
    /// At least one elimination round ran and the board settled.
    Stable { rounds: u32, eliminated: usize },
}

/// One observable change. Presentation animates these; it never edits the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TileMoved {
        from: Pos,
        to: Pos,
        tile: TileType,
    },
    TilesEliminated {
        cells: Vec<Pos>,
        /// Cell the cleared tiles should gather towards.
        target_hint: Option<Pos>,
    },
    ObstacleHit {
        region: RegionId,
        remaining_hits: u32,
    },
    ObstacleDepleted {
        region: RegionId,
        cells: Vec<Pos>,
    },
    TileSpawned {
        cell: Pos,
        tile: TileType,
    },
    ResolutionComplete {
        resolution: Resolution,
    },
}
