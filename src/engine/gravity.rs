//! Gravity refill: straight fall, diagonal flow around obstacles, and spawning.
//!
//! Each pass moves any tile at most one cell. Passes repeat until no playable cell is
//! empty. A waiting cell always waits on a cell in a higher row, so every empty cell is
//! eventually reached from a spawn point and the loop terminates; the pass bound only
//! guards against a broken board.

use tracing::{debug, error};

use super::board::{Board, Topology};
use super::error::Inconsistency;
use super::events::Event;
use super::rng::TileRng;
use super::types::{Direction, Pos};

/// Summary of one refill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub passes: usize,
    pub moved: usize,
    pub spawned: usize,
    /// Set when the pass bound was hit or the fill stalled.
    pub inconsistency: Option<Inconsistency>,
}

/// Upper bound on passes for a board of this size.
pub fn pass_bound(board: &Board) -> usize {
    board.rows() * board.cols() * (board.rows() + 2) + 1
}

/// Run fill passes until every playable cell holds a tile.
pub fn fill(board: &mut Board, rng: &mut TileRng, events: &mut Vec<Event>) -> FillReport {
    let mut report = FillReport::default();
    let bound = pass_bound(board);
    while has_vacancy(board) {
        if report.passes >= bound || !fill_pass(board, rng, events, &mut report) {
            let unfilled = spawn_in_place(board, rng, events, &mut report);
            let issue = Inconsistency::FillBoundExceeded {
                passes: report.passes,
                unfilled,
            };
            error!(%issue, "gravity fill did not settle");
            report.inconsistency = Some(issue);
            break;
        }
        report.passes += 1;
    }
    debug!(
        passes = report.passes,
        moved = report.moved,
        spawned = report.spawned,
        "fill settled"
    );
    report
}

fn has_vacancy(board: &Board) -> bool {
    board.positions().any(|p| board.is_vacant(p))
}

/// What can feed an empty cell from above.
enum Source {
    /// Top row, void above, or an obstacle with nothing playable diagonally above.
    Spawn,
    Straight(Pos),
    /// Obstacle above; flow in diagonally once the straight pass is quiet.
    AroundObstacle,
    /// Playable cell above is itself still empty.
    Wait,
}

fn source_for(board: &Board, pos: Pos) -> Source {
    let Some(above) = pos.step(Direction::Up) else {
        return Source::Spawn;
    };
    match board.topology(above) {
        None | Some(Topology::Void) => Source::Spawn,
        Some(Topology::Playable) => {
            if board.is_occupied(above) {
                Source::Straight(above)
            } else {
                Source::Wait
            }
        }
        Some(Topology::Obstacle(_)) => {
            if diagonals_above(pos).into_iter().flatten().any(|d| board.is_playable(d)) {
                Source::AroundObstacle
            } else {
                Source::Spawn
            }
        }
    }
}

/// Above-left then above-right.
fn diagonals_above(pos: Pos) -> [Option<Pos>; 2] {
    let up = pos.step(Direction::Up);
    [
        up.and_then(|p| p.step(Direction::Left)),
        up.and_then(|p| p.step(Direction::Right)),
    ]
}

/// One pass. Returns whether anything changed.
fn fill_pass(
    board: &mut Board,
    rng: &mut TileRng,
    events: &mut Vec<Event>,
    report: &mut FillReport,
) -> bool {
    let mut changed = false;

    // Straight fall and spawns, bottom row first so a column shifts one step per pass.
    for row in (0..board.rows()).rev() {
        for col in 0..board.cols() {
            let pos = Pos::new(row, col);
            if !board.is_vacant(pos) {
                continue;
            }
            match source_for(board, pos) {
                Source::Straight(from) => {
                    move_tile(board, from, pos, events);
                    report.moved += 1;
                    changed = true;
                }
                Source::Spawn => {
                    spawn(board, rng, pos, events);
                    report.spawned += 1;
                    changed = true;
                }
                Source::AroundObstacle | Source::Wait => {}
            }
        }
    }
    if changed {
        return true;
    }

    // Nothing can fall straight: let tiles slide diagonally under obstacles.
    for row in (0..board.rows()).rev() {
        for col in 0..board.cols() {
            let pos = Pos::new(row, col);
            if !board.is_vacant(pos) || !matches!(source_for(board, pos), Source::AroundObstacle) {
                continue;
            }
            if let Some(from) = diagonals_above(pos)
                .into_iter()
                .flatten()
                .find(|&d| board.is_occupied(d))
            {
                move_tile(board, from, pos, events);
                report.moved += 1;
                changed = true;
            }
        }
    }
    changed
}

fn move_tile(board: &mut Board, from: Pos, to: Pos, events: &mut Vec<Event>) {
    if let Some(tile) = board.take_tile(from) {
        board.set_tile(to, Some(tile));
        events.push(Event::TileMoved { from, to, tile });
    }
}

fn spawn(board: &mut Board, rng: &mut TileRng, cell: Pos, events: &mut Vec<Event>) {
    let tile = rng.next_tile();
    board.set_tile(cell, Some(tile));
    events.push(Event::TileSpawned { cell, tile });
}

fn spawn_in_place(
    board: &mut Board,
    rng: &mut TileRng,
    events: &mut Vec<Event>,
    report: &mut FillReport,
) -> usize {
    let vacant: Vec<Pos> = board.positions().filter(|&p| board.is_vacant(p)).collect();
    for &p in &vacant {
        spawn(board, rng, p, events);
        report.spawned += 1;
    }
    vacant.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::TileType;

    fn run(picture: &[&str]) -> (Board, Vec<Event>, FillReport) {
        let mut board = Board::from_ascii(picture, 1).unwrap();
        let mut rng = TileRng::new(1, 4);
        let mut events = Vec::new();
        let report = fill(&mut board, &mut rng, &mut events);
        (board, events, report)
    }

    fn moves(events: &[Event]) -> Vec<(Pos, Pos)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::TileMoved { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_straight_fall_then_spawn() {
        let (board, events, report) = run(&["1", ".", "."]);
        assert_eq!(board.tile(Pos::new(2, 0)), Some(TileType(1)));
        assert_eq!(report.spawned, 2);
        assert_eq!(report.inconsistency, None);
        assert_eq!(board.occupied_count(), 3);
        assert_eq!(moves(&events)[0], (Pos::new(0, 0), Pos::new(1, 0)));
    }

    #[test]
    fn test_already_full_is_noop() {
        let (_, events, report) = run(&["12", "21"]);
        assert!(events.is_empty());
        assert_eq!(report.passes, 0);
    }

    #[test]
    fn test_diagonal_flow_under_obstacle() {
        // (2, 1) sits under the obstacle; it is fed from (1, 0) before anything spawns there.
        let (board, events, report) = run(&["1#2", "3#4", "5.6"]);
        assert_eq!(report.inconsistency, None);
        assert_eq!(board.occupied_count(), 7);
        assert_eq!(moves(&events)[0], (Pos::new(1, 0), Pos::new(2, 1)));
        assert_eq!(board.tile(Pos::new(2, 1)), Some(TileType(3)));
    }

    #[test]
    fn test_spawn_under_obstacle_without_playable_diagonals() {
        let (board, events, _) = run(&[" # ", " . "]);
        assert!(board.is_occupied(Pos::new(1, 1)));
        assert!(matches!(events[0], Event::TileSpawned { cell, .. } if cell == Pos::new(1, 1)));
    }

    #[test]
    fn test_void_above_column_spawns_only() {
        let (_, events, report) = run(&[" ", ".", ".", ".", "1"]);
        assert_eq!(report.spawned, 3);
        // Spawned tiles shuffle down inside the gap; nothing comes from above it.
        assert!(moves(&events).iter().all(|(from, _)| from.row >= 1));
    }

    #[test]
    fn test_depleted_region_cells_fill() {
        let mut board = Board::from_ascii(&["12", "##", "##", "34"], 1).unwrap();
        board.retire_region(crate::engine::types::RegionId(0));
        let mut rng = TileRng::new(3, 4);
        let mut events = Vec::new();
        let report = fill(&mut board, &mut rng, &mut events);
        assert_eq!(board.occupied_count(), 8);
        assert_eq!(report.inconsistency, None);
        assert_eq!(board.tile(Pos::new(2, 0)), Some(TileType(1)));
        assert_eq!(board.tile(Pos::new(2, 1)), Some(TileType(2)));
    }

    #[test]
    fn test_settles_within_passes_proportional_to_height() {
        let pictures: [&[&str]; 2] = [
            &[
                ".....", ".....", ".#...", ".....", "...#.", ".....", ".##..", ".....",
            ],
            &["......", ".#..#.", "......", ".#..#.", "......", "......"],
        ];
        for picture in pictures {
            let (board, _, report) = run(picture);
            assert_eq!(report.inconsistency, None, "{picture:?}");
            assert_eq!(board.occupied_count(), board.playable_count());
            assert!(
                report.passes <= 3 * board.rows(),
                "{} passes for {} rows",
                report.passes,
                board.rows()
            );
        }

        let mut board = Board::from_layout(&crate::engine::LevelLayout::default_level(), 1);
        let mut rng = TileRng::new(9, 5);
        let report = fill(&mut board, &mut rng, &mut Vec::new());
        assert_eq!(report.inconsistency, None);
        assert!(report.passes <= 3 * board.rows());
    }
}
