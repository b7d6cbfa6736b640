//! Headless match-3 engine: shaped boards, multi-cell obstacles, gravity with diagonal flow.

pub mod engine;

pub use engine::{
    Board, CellState, Direction, Engine, EngineConfig, Event, LevelError, LevelLayout,
    MoveRejection, Phase, Pos, Resolution,
};
