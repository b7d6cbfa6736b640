//! Run detection: horizontal and vertical lines of three or more equal tiles.

use std::collections::BTreeSet;

use super::board::Board;
use super::types::{Direction, Pos};

/// Shortest line that counts as a match.
pub const MIN_RUN: usize = 3;

/// Every tile that belongs to a run, in `(row, col)` order. Rows and columns are
/// scanned separately and unioned, so a tile at a crossing appears once.
/// Any cell that is not playable or holds no tile breaks a run.
pub fn find_matches(board: &Board) -> BTreeSet<Pos> {
    let mut matched = BTreeSet::new();
    for row in 0..board.rows() {
        scan_line(board, (0..board.cols()).map(|col| Pos::new(row, col)), &mut matched);
    }
    for col in 0..board.cols() {
        scan_line(board, (0..board.rows()).map(|row| Pos::new(row, col)), &mut matched);
    }
    matched
}

fn scan_line(board: &Board, line: impl Iterator<Item = Pos>, out: &mut BTreeSet<Pos>) {
    let mut run: Vec<Pos> = Vec::new();
    let mut kind = None;
    for pos in line {
        let here = board.matchable(pos);
        if here.is_some() && here == kind {
            run.push(pos);
            continue;
        }
        if run.len() >= MIN_RUN {
            out.extend(run.iter().copied());
        }
        run.clear();
        kind = here;
        if here.is_some() {
            run.push(pos);
        }
    }
    if run.len() >= MIN_RUN {
        out.extend(run);
    }
}

/// Cells of the run through `pos` along one axis, `pos` first. Empty if not matchable.
fn run_through(board: &Board, pos: Pos, axis: [Direction; 2]) -> Vec<Pos> {
    let Some(kind) = board.matchable(pos) else {
        return Vec::new();
    };
    let mut run = vec![pos];
    for dir in axis {
        let mut cur = pos;
        while let Some(next) = cur.step(dir) {
            if board.matchable(next) != Some(kind) {
                break;
            }
            run.push(next);
            cur = next;
        }
    }
    run
}

const AXES: [[Direction; 2]; 2] = [
    [Direction::Left, Direction::Right],
    [Direction::Up, Direction::Down],
];

/// True if `pos` is part of a horizontal or vertical run.
pub fn is_in_run(board: &Board, pos: Pos) -> bool {
    AXES.into_iter()
        .any(|axis| run_through(board, pos, axis).len() >= MIN_RUN)
}

/// Every run that passes through one of `cells`, merged. Runs elsewhere on the board
/// are ignored; a swap can only create runs through the two cells it touched.
pub fn runs_through(board: &Board, cells: &[Pos]) -> BTreeSet<Pos> {
    let mut matched = BTreeSet::new();
    for &pos in cells {
        for axis in AXES {
            let run = run_through(board, pos, axis);
            if run.len() >= MIN_RUN {
                matched.extend(run);
            }
        }
    }
    matched
}
