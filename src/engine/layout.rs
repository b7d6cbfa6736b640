//! Level layouts: the 0/1/2 grid format, obstacle block detection and JSON level files.
//!
//! A layout grid is a rectangle of small integers:
//!
//! - `0` void (not part of the board)
//! - `1` playable
//! - `2` obstacle member
//!
//! Obstacle regions are the 4-connected blocks of `2` markers; every block must be a
//! filled rectangle. [`LevelLayout::to_grid`] reproduces the input grid exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{LayoutIssue, LevelError};
use super::types::Pos;

pub const MARK_VOID: u8 = 0;
pub const MARK_PLAYABLE: u8 = 1;
pub const MARK_OBSTACLE: u8 = 2;

/// A rectangular obstacle placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleSpec {
    pub anchor: Pos,
    pub width: usize,
    pub height: usize,
}

impl ObstacleSpec {
    pub fn new(anchor: Pos, width: usize, height: usize) -> Self {
        Self {
            anchor,
            width,
            height,
        }
    }

    /// Member cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        (self.anchor.row..self.anchor.row + self.height).flat_map(move |row| {
            (self.anchor.col..self.anchor.col + self.width).map(move |col| Pos::new(row, col))
        })
    }
}

/// Board shape plus obstacle placements, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLayout {
    pub name: String,
    rows: usize,
    cols: usize,
    /// `true` where the cell is part of the board (playable or obstacle), row-major.
    present: Vec<bool>,
    obstacles: Vec<ObstacleSpec>,
    /// Level-wide hit count; overrides the engine config when set.
    pub obstacle_hits: Option<u32>,
}

/// On-disk form of a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default)]
    pub name: String,
    pub grid: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_hits: Option<u32>,
}

impl LevelLayout {
    /// Build from a topology mask (`true` = on the board) and explicit obstacle rectangles.
    pub fn new(
        mask: &[Vec<bool>],
        obstacles: Vec<ObstacleSpec>,
    ) -> Result<Self, LayoutIssue> {
        let (rows, cols) = dimensions(mask)?;
        let present = mask.iter().flatten().copied().collect();
        let mut layout = Self {
            name: String::new(),
            rows,
            cols,
            present,
            obstacles,
            obstacle_hits: None,
        };
        layout.obstacles.sort_by_key(|o| o.anchor);
        layout.validate()?;
        Ok(layout)
    }

    /// Parse the 0/1/2 grid, deriving obstacle regions from contiguous `2` blocks.
    pub fn from_grid(grid: &[Vec<u8>]) -> Result<Self, LayoutIssue> {
        let (rows, cols) = dimensions(grid)?;
        for (r, line) in grid.iter().enumerate() {
            for (c, &value) in line.iter().enumerate() {
                if value > MARK_OBSTACLE {
                    return Err(LayoutIssue::UnknownMarker {
                        pos: Pos::new(r, c),
                        value,
                    });
                }
            }
        }

        let mut seen = vec![false; rows * cols];
        let mut obstacles = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                if grid[r][c] != MARK_OBSTACLE || seen[r * cols + c] {
                    continue;
                }
                // Flood the block, tracking its bounding box.
                let mut stack = vec![Pos::new(r, c)];
                seen[r * cols + c] = true;
                let mut size = 0usize;
                let (mut top, mut left, mut bottom, mut right) = (r, c, r, c);
                while let Some(p) = stack.pop() {
                    size += 1;
                    top = top.min(p.row);
                    bottom = bottom.max(p.row);
                    left = left.min(p.col);
                    right = right.max(p.col);
                    for n in p.neighbours() {
                        if n.row < rows
                            && n.col < cols
                            && grid[n.row][n.col] == MARK_OBSTACLE
                            && !seen[n.row * cols + n.col]
                        {
                            seen[n.row * cols + n.col] = true;
                            stack.push(n);
                        }
                    }
                }
                let (height, width) = (bottom - top + 1, right - left + 1);
                if size != width * height {
                    return Err(LayoutIssue::NonRectangularObstacle { pos: Pos::new(r, c) });
                }
                obstacles.push(ObstacleSpec::new(Pos::new(top, left), width, height));
            }
        }

        let mask: Vec<Vec<bool>> = grid
            .iter()
            .map(|line| line.iter().map(|&v| v != MARK_VOID).collect())
            .collect();
        Self::new(&mask, obstacles)
    }

    /// The 0/1/2 grid for this layout.
    pub fn to_grid(&self) -> Vec<Vec<u8>> {
        let mut grid: Vec<Vec<u8>> = (0..self.rows)
            .map(|r| {
                (0..self.cols)
                    .map(|c| {
                        if self.present[r * self.cols + c] {
                            MARK_PLAYABLE
                        } else {
                            MARK_VOID
                        }
                    })
                    .collect()
            })
            .collect();
        for spec in &self.obstacles {
            for p in spec.cells() {
                grid[p.row][p.col] = MARK_OBSTACLE;
            }
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True when the cell is on the board (playable or obstacle). False outside bounds.
    pub fn is_present(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.cols && self.present[pos.row * self.cols + pos.col]
    }

    /// Obstacles sorted by anchor (row-major); region ids follow this order.
    pub fn obstacles(&self) -> &[ObstacleSpec] {
        &self.obstacles
    }

    /// Overlap, bounds and void checks for explicit obstacle lists.
    fn validate(&self) -> Result<(), LayoutIssue> {
        let mut claimed = vec![false; self.rows * self.cols];
        for spec in &self.obstacles {
            let anchor = spec.anchor;
            if spec.width == 0 || spec.height == 0 {
                return Err(LayoutIssue::ObstacleZeroSized { anchor });
            }
            if anchor.row + spec.height > self.rows || anchor.col + spec.width > self.cols {
                return Err(LayoutIssue::ObstacleOutOfBounds { anchor });
            }
            for pos in spec.cells() {
                let idx = pos.row * self.cols + pos.col;
                if !self.present[idx] {
                    return Err(LayoutIssue::ObstacleOnVoid { anchor, pos });
                }
                if claimed[idx] {
                    return Err(LayoutIssue::ObstacleOverlap { pos });
                }
                claimed[idx] = true;
            }
        }
        Ok(())
    }

    pub fn from_file(file: LevelFile) -> Result<Self, LevelError> {
        let mut layout = Self::from_grid(&file.grid)?;
        if file.obstacle_hits == Some(0) {
            return Err(LevelError::InvalidHits);
        }
        layout.name = file.name;
        layout.obstacle_hits = file.obstacle_hits;
        Ok(layout)
    }

    pub fn to_file(&self) -> LevelFile {
        LevelFile {
            name: self.name.clone(),
            grid: self.to_grid(),
            obstacle_hits: self.obstacle_hits,
        }
    }

    pub fn from_json(s: &str) -> Result<Self, LevelError> {
        let file: LevelFile = serde_json::from_str(s)?;
        Self::from_file(file)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    /// Read a JSON level file from disk.
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// The 9×9 rounded board with two 2×2 obstacles.
    pub fn default_level() -> Self {
        const GRID: [[u8; 9]; 9] = [
            [0, 0, 1, 1, 1, 1, 1, 0, 0],
            [0, 1, 1, 1, 1, 1, 1, 1, 0],
            [1, 1, 1, 1, 1, 1, 1, 1, 1],
            [1, 1, 1, 1, 1, 1, 1, 1, 1],
            [1, 2, 2, 1, 1, 1, 2, 2, 1],
            [1, 2, 2, 1, 1, 1, 2, 2, 1],
            [1, 1, 1, 1, 1, 1, 1, 1, 1],
            [0, 1, 1, 1, 1, 1, 1, 1, 0],
            [0, 0, 1, 1, 1, 1, 1, 0, 0],
        ];
        let grid: Vec<Vec<u8>> = GRID.iter().map(|r| r.to_vec()).collect();
        match Self::from_grid(&grid) {
            Ok(mut layout) => {
                layout.name = "Orchard".to_string();
                layout
            }
            Err(e) => unreachable!("built-in level is valid: {e}"),
        }
    }
}

fn dimensions<T>(grid: &[Vec<T>]) -> Result<(usize, usize), LayoutIssue> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Err(LayoutIssue::Empty);
    }
    for (row, line) in grid.iter().enumerate() {
        if line.len() != cols {
            return Err(LayoutIssue::Ragged {
                row,
                expected: cols,
                found: line.len(),
            });
        }
    }
    Ok((rows, cols))
}
