//! Elimination of matched tiles, obstacle hit attribution and region depletion.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::board::Board;
use super::events::Event;
use super::types::{Pos, RegionId};

/// Result of clearing one match set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Elimination {
    /// Cells whose tiles were destroyed, `(row, col)` order.
    pub cleared: Vec<Pos>,
    /// Hits accumulated per region during this pass.
    pub hits: BTreeMap<RegionId, u32>,
}

/// Clear every matched tile and tally obstacle hits against the current layout.
///
/// A tile touching the same region through two member cells still counts one hit.
pub fn eliminate(board: &mut Board, matched: &BTreeSet<Pos>) -> Elimination {
    let mut out = Elimination::default();
    for &pos in matched {
        if board.take_tile(pos).is_none() {
            continue;
        }
        out.cleared.push(pos);
        let mut touched: Vec<RegionId> = Vec::with_capacity(4);
        for n in pos.neighbours() {
            if let Some(id) = board.region_at(n) {
                if !touched.contains(&id) {
                    touched.push(id);
                }
            }
        }
        for id in touched {
            *out.hits.entry(id).or_insert(0) += 1;
        }
    }
    out
}

/// Apply accumulated hits. Emits `ObstacleHit` per region in id order, each followed by
/// `ObstacleDepleted` when the counter reaches zero. Regions already retired are skipped.
/// Returns the regions depleted by this call.
pub fn apply_hits(
    board: &mut Board,
    hits: &BTreeMap<RegionId, u32>,
    events: &mut Vec<Event>,
) -> Vec<RegionId> {
    let mut depleted = Vec::new();
    for (&id, &count) in hits {
        let Some(region) = board.region_mut(id) else {
            continue;
        };
        let remaining = region.absorb(count);
        let spent = region.is_depleted();
        debug!(region = %id, hits = count, remaining, "obstacle hit");
        events.push(Event::ObstacleHit {
            region: id,
            remaining_hits: remaining,
        });
        if spent {
            if let Some(cells) = board.retire_region(id) {
                debug!(region = %id, cells = cells.len(), "obstacle depleted");
                events.push(Event::ObstacleDepleted { region: id, cells });
                depleted.push(id);
            }
        }
    }
    depleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::CellState;

    fn set(cells: &[(usize, usize)]) -> BTreeSet<Pos> {
        cells.iter().map(|&(r, c)| Pos::new(r, c)).collect()
    }

    #[test]
    fn test_clears_and_counts() {
        let mut b = Board::from_ascii(&["1112", "2323"], 1).unwrap();
        let e = eliminate(&mut b, &set(&[(0, 0), (0, 1), (0, 2)]));
        assert_eq!(e.cleared.len(), 3);
        assert!(e.hits.is_empty());
        assert_eq!(b.cell_state(Pos::new(0, 1)), Some(CellState::Empty));
    }

    #[test]
    fn test_hits_accumulate_per_region() {
        let mut b = Board::from_ascii(&["##1", "##1", "111"], 3).unwrap();
        let e = eliminate(&mut b, &set(&[(0, 2), (1, 2), (2, 2), (2, 0), (2, 1)]));
        // (2, 2) only touches playable cells.
        assert_eq!(e.hits.get(&RegionId(0)), Some(&4));
    }

    #[test]
    fn test_tile_between_regions_hits_both() {
        let mut b = Board::from_ascii(&["#1#", "212"], 1).unwrap();
        let e = eliminate(&mut b, &set(&[(0, 1)]));
        assert_eq!(e.hits.get(&RegionId(0)), Some(&1));
        assert_eq!(e.hits.get(&RegionId(1)), Some(&1));
    }

    #[test]
    fn test_depletion_after_attribution() {
        let mut b = Board::from_ascii(&["##1", "##1", "221"], 1).unwrap();
        let e = eliminate(&mut b, &set(&[(0, 2), (1, 2), (2, 2)]));
        assert_eq!(e.hits.get(&RegionId(0)), Some(&2));
        let mut events = Vec::new();
        let depleted = apply_hits(&mut b, &e.hits, &mut events);
        assert_eq!(depleted, vec![RegionId(0)]);
        assert_eq!(
            events[0],
            Event::ObstacleHit {
                region: RegionId(0),
                remaining_hits: 0
            }
        );
        assert!(matches!(&events[1], Event::ObstacleDepleted { cells, .. } if cells.len() == 4));
        assert!(b.is_vacant(Pos::new(0, 0)));
        assert!(b.is_vacant(Pos::new(1, 1)));
    }

    #[test]
    fn test_hits_on_retired_region_are_noops() {
        let mut b = Board::from_ascii(&["#1"], 1).unwrap();
        b.retire_region(RegionId(0));
        let mut hits = BTreeMap::new();
        hits.insert(RegionId(0), 2);
        let mut events = Vec::new();
        assert!(apply_hits(&mut b, &hits, &mut events).is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_multi_hit_region_survives() {
        let mut b = Board::from_ascii(&["#1"], 3).unwrap();
        let mut hits = BTreeMap::new();
        hits.insert(RegionId(0), 1);
        let mut events = Vec::new();
        apply_hits(&mut b, &hits, &mut events);
        assert_eq!(
            b.cell_state(Pos::new(0, 0)),
            Some(CellState::Obstacle {
                region: RegionId(0),
                remaining_hits: 2
            })
        );
    }
}
