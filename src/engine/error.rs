//! Error taxonomy: configuration errors at load, rejected moves, and internal inconsistencies.

use thiserror::Error;

use super::types::{Pos, RegionId};

/// Why a level could not be loaded. Nothing is partially loaded when this is returned.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("invalid layout: {0}")]
    InvalidLayout(#[from] LayoutIssue),
    #[error("palette size {0} is outside 3..={max}", max = super::config::MAX_PALETTE_SIZE)]
    InvalidPalette(u8),
    #[error("obstacle hit count must be at least 1")]
    InvalidHits,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("level file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The specific shape problem behind [`LevelError::InvalidLayout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutIssue {
    #[error("layout has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown marker {value} at {pos}")]
    UnknownMarker { pos: Pos, value: u8 },
    #[error("obstacle block containing {pos} is not a rectangle")]
    NonRectangularObstacle { pos: Pos },
    #[error("obstacle anchored at {anchor} extends outside the board")]
    ObstacleOutOfBounds { anchor: Pos },
    #[error("obstacles overlap at {pos}")]
    ObstacleOverlap { pos: Pos },
    #[error("obstacle anchored at {anchor} covers void cell {pos}")]
    ObstacleOnVoid { anchor: Pos, pos: Pos },
    #[error("obstacle anchored at {anchor} has zero extent")]
    ObstacleZeroSized { anchor: Pos },
}

/// Reason a move request was refused. The board is never changed by a rejected move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("cell is outside the board")]
    OutOfBounds,
    #[error("cell is void or an obstacle")]
    NotPlayable,
    #[error("a resolution is still in progress")]
    Busy,
    #[error("cell holds no tile")]
    NoTile,
}

/// Invariant violations detected while resolving. These are logged and absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("region {region} lists member {pos} that is not an obstacle cell of that region")]
    RegionMemberMismatch { region: RegionId, pos: Pos },
    #[error("cell {pos} references region {region} which is not active")]
    DanglingRegion { region: RegionId, pos: Pos },
    #[error("gravity did not settle within {passes} passes; {unfilled} cells spawned in place")]
    FillBoundExceeded { passes: usize, unfilled: usize },
    #[error("cascade exceeded {rounds} rounds; remaining matches left on the board")]
    CascadeBoundExceeded { rounds: u32 },
    #[error("step completion received while idle")]
    UnexpectedStep,
}
