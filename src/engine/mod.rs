//! Headless match-3 core.
//!
//! The board is owned by one [`Engine`]. Moves come in through
//! [`Engine::request_move`], state changes go out as [`Event`]s, and the caller paces
//! the resolution by calling [`Engine::complete_step`] after each animation.

pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod gravity;
pub mod layout;
pub mod machine;
pub mod matcher;
pub mod region;
pub mod resolver;
pub mod rng;
pub mod types;

pub use board::{Board, CellState, Topology};
pub use config::EngineConfig;
pub use error::{Inconsistency, LayoutIssue, LevelError, MoveRejection};
pub use events::{Event, Resolution};
pub use layout::{LevelFile, LevelLayout, ObstacleSpec};
pub use machine::{Diagnostics, Engine, Phase};
pub use types::{Direction, Pos, RegionId, TileType};
