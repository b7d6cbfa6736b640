//! Board topology and grid state.
//!
//! Cells are stored in a flat row-major `Vec`. Topology is fixed at load except for the
//! obstacle → playable transition when a region depletes. Only playable cells carry tiles.

use std::collections::BTreeMap;
use std::fmt;

use super::error::{Inconsistency, LayoutIssue};
use super::layout::{LevelLayout, MARK_OBSTACLE, MARK_PLAYABLE, MARK_VOID};
use super::region::ObstacleRegion;
use super::rng::TileRng;
use super::types::{Pos, RegionId, TileType};

/// Fixed classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Void,
    Playable,
    Obstacle(RegionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    topology: Topology,
    tile: Option<TileType>,
}

/// Snapshot of one cell for presentation sync and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Void,
    Empty,
    Tile(TileType),
    Obstacle { region: RegionId, remaining_hits: u32 },
}

/// Topology, occupancy and the active obstacle set. Exclusively owned by one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    regions: BTreeMap<RegionId, ObstacleRegion>,
}

impl Board {
    /// Empty board (no tiles) with the layout's topology and regions.
    pub fn from_layout(layout: &LevelLayout, default_hits: u32) -> Self {
        let (rows, cols) = (layout.rows(), layout.cols());
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let topology = if layout.is_present(Pos::new(row, col)) {
                    Topology::Playable
                } else {
                    Topology::Void
                };
                cells.push(Cell {
                    topology,
                    tile: None,
                });
            }
        }

        let hits = layout.obstacle_hits.unwrap_or(default_hits).max(1);
        let mut regions = BTreeMap::new();
        for (i, spec) in layout.obstacles().iter().enumerate() {
            let id = RegionId(i as u16);
            for p in spec.cells() {
                cells[p.row * cols + p.col].topology = Topology::Obstacle(id);
            }
            regions.insert(
                id,
                ObstacleRegion::new(id, spec.anchor, spec.width, spec.height, hits),
            );
        }

        Self {
            rows,
            cols,
            cells,
            regions,
        }
    }

    /// Build a board from a text picture, one string per row:
    /// `' '` void, `'.'` empty playable, `'#'` obstacle, `'0'..='9'` / `'a'..='z'` tile kinds.
    /// Adjacent `'#'` cells form one region, as in the 0/1/2 grid format.
    pub fn from_ascii(picture: &[&str], hits: u32) -> Result<Self, LayoutIssue> {
        let grid: Vec<Vec<u8>> = picture
            .iter()
            .map(|line| {
                line.chars()
                    .map(|ch| match ch {
                        ' ' => MARK_VOID,
                        '#' => MARK_OBSTACLE,
                        _ => MARK_PLAYABLE,
                    })
                    .collect()
            })
            .collect();
        let layout = LevelLayout::from_grid(&grid)?;
        let mut board = Self::from_layout(&layout, hits);
        for (row, line) in picture.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if let Some(kind) = ch.to_digit(36) {
                    board.set_tile(Pos::new(row, col), Some(TileType(kind as u8)));
                }
            }
        }
        Ok(board)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols).then(|| pos.row * self.cols + pos.col)
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        self.index(pos).is_some()
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Pos::new(row, col)))
    }

    pub fn topology(&self, pos: Pos) -> Option<Topology> {
        self.index(pos).map(|i| self.cells[i].topology)
    }

    pub fn tile(&self, pos: Pos) -> Option<TileType> {
        self.index(pos).and_then(|i| self.cells[i].tile)
    }

    pub fn is_playable(&self, pos: Pos) -> bool {
        self.topology(pos) == Some(Topology::Playable)
    }

    /// Playable and occupied.
    pub fn is_occupied(&self, pos: Pos) -> bool {
        self.is_playable(pos) && self.tile(pos).is_some()
    }

    /// Playable and empty: a cell waiting for fill.
    pub fn is_vacant(&self, pos: Pos) -> bool {
        self.is_playable(pos) && self.tile(pos).is_none()
    }

    /// Tile kind if the cell can take part in a run.
    pub fn matchable(&self, pos: Pos) -> Option<TileType> {
        if self.is_playable(pos) {
            self.tile(pos)
        } else {
            None
        }
    }

    /// Set occupancy of a playable cell. Returns false (and changes nothing) otherwise.
    pub fn set_tile(&mut self, pos: Pos, tile: Option<TileType>) -> bool {
        match self.index(pos) {
            Some(i) if self.cells[i].topology == Topology::Playable => {
                self.cells[i].tile = tile;
                true
            }
            _ => false,
        }
    }

    /// Remove and return the tile at `pos`.
    pub fn take_tile(&mut self, pos: Pos) -> Option<TileType> {
        let i = self.index(pos)?;
        self.cells[i].tile.take()
    }

    /// Exchange the occupants of two cells. Self-inverse; does no legality checks.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if let (Some(i), Some(j)) = (self.index(a), self.index(b)) {
            let tmp = self.cells[i].tile;
            self.cells[i].tile = self.cells[j].tile;
            self.cells[j].tile = tmp;
        }
    }

    pub fn cell_state(&self, pos: Pos) -> Option<CellState> {
        let cell = self.cells[self.index(pos)?];
        Some(match cell.topology {
            Topology::Void => CellState::Void,
            Topology::Playable => cell.tile.map_or(CellState::Empty, CellState::Tile),
            Topology::Obstacle(region) => CellState::Obstacle {
                region,
                remaining_hits: self.regions.get(&region).map_or(0, ObstacleRegion::remaining_hits),
            },
        })
    }

    /// Owning region of an obstacle cell that is still active.
    pub fn region_at(&self, pos: Pos) -> Option<RegionId> {
        match self.topology(pos)? {
            Topology::Obstacle(id) if self.regions.contains_key(&id) => Some(id),
            _ => None,
        }
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut ObstacleRegion> {
        self.regions.get_mut(&id)
    }

    /// Active regions in id order.
    pub fn regions(&self) -> impl Iterator<Item = &ObstacleRegion> {
        self.regions.values()
    }

    /// Retire a region: its cells become playable and empty. Returns those cells, or
    /// None if the region was already retired.
    pub fn retire_region(&mut self, id: RegionId) -> Option<Vec<Pos>> {
        let region = self.regions.remove(&id)?;
        let cells = region.cells();
        for &p in &cells {
            if let Some(i) = self.index(p) {
                if self.cells[i].topology == Topology::Obstacle(id) {
                    self.cells[i] = Cell {
                        topology: Topology::Playable,
                        tile: None,
                    };
                }
            }
        }
        Some(cells)
    }

    pub fn playable_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.topology == Topology::Playable)
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.topology == Topology::Playable && c.tile.is_some())
            .count()
    }

    /// Fill every empty playable cell so that no run of three exists.
    /// Scans row-major and excludes any kind that would complete a run with the two
    /// cells to the left or the two cells above.
    pub fn fill_without_runs(&mut self, rng: &mut TileRng) {
        for pos in self.positions().collect::<Vec<_>>() {
            if !self.is_vacant(pos) {
                continue;
            }
            let mut exclude = Vec::with_capacity(2);
            if pos.col >= 2 {
                let a = self.matchable(Pos::new(pos.row, pos.col - 1));
                let b = self.matchable(Pos::new(pos.row, pos.col - 2));
                if let (Some(a), Some(b)) = (a, b) {
                    if a == b {
                        exclude.push(a);
                    }
                }
            }
            if pos.row >= 2 {
                let a = self.matchable(Pos::new(pos.row - 1, pos.col));
                let b = self.matchable(Pos::new(pos.row - 2, pos.col));
                if let (Some(a), Some(b)) = (a, b) {
                    if a == b {
                        exclude.push(a);
                    }
                }
            }
            let tile = rng.next_tile_excluding(&exclude);
            self.set_tile(pos, Some(tile));
        }
    }

    /// Cross-check region records against cell topology.
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();
        for region in self.regions.values() {
            for pos in region.cells() {
                if self.topology(pos) != Some(Topology::Obstacle(region.id)) {
                    found.push(Inconsistency::RegionMemberMismatch {
                        region: region.id,
                        pos,
                    });
                }
            }
        }
        for pos in self.positions() {
            if let Some(Topology::Obstacle(region)) = self.topology(pos) {
                if !self.regions.contains_key(&region) {
                    found.push(Inconsistency::DanglingRegion { region, pos });
                }
            }
        }
        found
    }
}

impl fmt::Display for Board {
    /// Same alphabet as [`Board::from_ascii`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let ch = match self.cell_state(Pos::new(row, col)) {
                    Some(CellState::Void) | None => ' ',
                    Some(CellState::Empty) => '.',
                    Some(CellState::Obstacle { .. }) => '#',
                    Some(CellState::Tile(t)) => char::from_digit(u32::from(t.0), 36).unwrap_or('?'),
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
