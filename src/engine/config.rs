//! Engine configuration.

use std::time::Duration;

use super::error::LevelError;

pub const MIN_PALETTE_SIZE: u8 = 3;
pub const MAX_PALETTE_SIZE: u8 = 12;

/// Tunables for one engine instance. Built by the binary from CLI args.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of distinct tile kinds.
    pub palette_size: u8,
    /// Hits an obstacle region absorbs before depleting, unless the level overrides it.
    pub obstacle_hits: u32,
    /// Longest the engine may stay busy without a `complete_step` before it force-resolves.
    pub watchdog_timeout: Duration,
    /// Seed for the tile generator; same seed and same moves give the same event log.
    pub seed: u64,
    /// Cascade rounds after which re-matching stops.
    pub max_cascade_rounds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            palette_size: 5,
            obstacle_hits: 1,
            watchdog_timeout: Duration::from_secs(5),
            seed: 0x5EED_F00D,
            max_cascade_rounds: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), LevelError> {
        if !(MIN_PALETTE_SIZE..=MAX_PALETTE_SIZE).contains(&self.palette_size) {
            return Err(LevelError::InvalidPalette(self.palette_size));
        }
        if self.obstacle_hits == 0 {
            return Err(LevelError::InvalidHits);
        }
        Ok(())
    }
}
