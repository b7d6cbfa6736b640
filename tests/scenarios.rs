use std::time::Instant;

use fruitmatch::engine::RegionId;
use fruitmatch::engine::matcher::find_matches;
use fruitmatch::{
    Board, CellState, Direction, Engine, EngineConfig, Event, LevelLayout, Phase, Pos, Resolution,
};

fn engine(picture: &[&str], hits: u32) -> Engine {
    Engine::from_board(Board::from_ascii(picture, hits).unwrap(), EngineConfig::default())
        .unwrap()
}

/// First legal swap on the board that does not create a match.
fn dud_move(engine: &Engine) -> (Pos, Direction) {
    let board = engine.board();
    for from in board.positions() {
        for dir in Direction::ALL {
            let Ok(to) = engine.validate_move(from, dir) else {
                continue;
            };
            if board.tile(from) == board.tile(to) {
                continue;
            }
            let mut probe = board.clone();
            probe.swap(from, to);
            if find_matches(&probe).is_empty() {
                return (from, dir);
            }
        }
    }
    panic!("no dud move on board");
}

#[test]
fn failed_swap_on_default_level_reverts() {
    let mut e = Engine::load_level(&LevelLayout::default_level(), &EngineConfig::default()).unwrap();
    let before = e.board().clone();
    let (from, dir) = dud_move(&e);
    let now = Instant::now();

    e.request_move(from, dir, now).unwrap();
    assert_ne!(e.board(), &before);
    assert_eq!(e.complete_step(now), Phase::Idle);

    let events = e.drain_events();
    let moved = events
        .iter()
        .filter(|ev| matches!(ev, Event::TileMoved { .. }))
        .count();
    assert_eq!(moved, 4);
    assert_eq!(
        events.last(),
        Some(&Event::ResolutionComplete {
            resolution: Resolution::Reverted
        })
    );
    assert_eq!(e.board(), &before);
}

#[test]
fn swap_elsewhere_leaves_existing_run_and_reverts() {
    // Diagonal stripes with one run of three at row 4, columns 3 to 5.
    let mut e = engine(
        &[
            "012012012",
            "120120120",
            "201201201",
            "012012012",
            "120333120",
            "201201201",
            "012012012",
            "120120120",
            "201201201",
        ],
        1,
    );
    let before = e.board().clone();
    let mut swapped = before.clone();
    swapped.swap(Pos::new(0, 0), Pos::new(0, 1));
    assert_eq!(find_matches(&swapped), find_matches(&before));

    let now = Instant::now();
    e.request_move(Pos::new(0, 0), Direction::Right, now).unwrap();
    assert_eq!(e.settle(now), Some(Resolution::Reverted));
    assert!(!e
        .drain_events()
        .iter()
        .any(|ev| matches!(ev, Event::TilesEliminated { .. })));
    assert_eq!(e.board(), &before);
    assert_eq!(
        find_matches(e.board()).into_iter().collect::<Vec<_>>(),
        vec![Pos::new(4, 3), Pos::new(4, 4), Pos::new(4, 5)]
    );
}

#[test]
fn match_beside_obstacle_depletes_and_refills() {
    let mut e = engine(&["23##", "4511", "3142"], 1);
    let now = Instant::now();
    e.request_move(Pos::new(1, 1), Direction::Down, now).unwrap();
    e.drain_events();

    assert_eq!(e.complete_step(now), Phase::Eliminating);
    let events = e.drain_events();
    assert_eq!(
        events[0],
        Event::TilesEliminated {
            cells: vec![Pos::new(1, 1), Pos::new(1, 2), Pos::new(1, 3)],
            target_hint: Some(Pos::new(1, 1)),
        }
    );
    assert_eq!(
        events[1],
        Event::ObstacleHit {
            region: RegionId(0),
            remaining_hits: 0
        }
    );
    assert_eq!(
        events[2],
        Event::ObstacleDepleted {
            region: RegionId(0),
            cells: vec![Pos::new(0, 2), Pos::new(0, 3)],
        }
    );
    assert_eq!(e.cell_at(0, 2), Some(CellState::Empty));

    assert_eq!(e.complete_step(now), Phase::Falling);
    let spawned = e
        .drain_events()
        .iter()
        .filter(|ev| matches!(ev, Event::TileSpawned { .. }))
        .count();
    assert_eq!(spawned, 5);
    assert_eq!(e.board().occupied_count(), 12);
    assert_eq!(e.board().regions().count(), 0);

    assert!(matches!(e.settle(now), Some(Resolution::Stable { .. })));
    assert!(e.board().inconsistencies().is_empty());
}

#[test]
fn obstacle_with_spare_hits_survives() {
    let mut e = engine(&["23##", "4511", "3142"], 3);
    let now = Instant::now();
    e.request_move(Pos::new(1, 1), Direction::Down, now).unwrap();
    e.complete_step(now);
    let events = e.drain_events();
    assert!(events.contains(&Event::ObstacleHit {
        region: RegionId(0),
        remaining_hits: 1
    }));
    assert!(!events
        .iter()
        .any(|ev| matches!(ev, Event::ObstacleDepleted { .. })));
    assert_eq!(
        e.cell_at(0, 3),
        Some(CellState::Obstacle {
            region: RegionId(0),
            remaining_hits: 1
        })
    );
}

#[test]
fn column_under_void_refills_by_spawning() {
    let mut e = engine(&["2 3", "312", "413", "251"], 1);
    let now = Instant::now();
    e.request_move(Pos::new(3, 2), Direction::Left, now).unwrap();
    e.drain_events();

    e.complete_step(now);
    let eliminated = e.drain_events();
    assert!(matches!(
        &eliminated[0],
        Event::TilesEliminated { cells, .. }
            if cells == &vec![Pos::new(1, 1), Pos::new(2, 1), Pos::new(3, 1)]
    ));

    e.complete_step(now);
    let fall = e.drain_events();
    let spawns: Vec<Pos> = fall
        .iter()
        .filter_map(|ev| match ev {
            Event::TileSpawned { cell, .. } => Some(*cell),
            _ => None,
        })
        .collect();
    assert_eq!(spawns.len(), 3);
    assert!(spawns.iter().all(|p| p.col == 1));
    for ev in &fall {
        if let Event::TileMoved { from, to, .. } = ev {
            assert_eq!(from.col, 1);
            assert!(from.row >= 1);
            assert_eq!(to.row, from.row + 1);
        }
    }
    assert_eq!(e.board().occupied_count(), e.board().playable_count());
}

#[test]
fn busy_engine_drops_requests() {
    let mut e = engine(&["23##", "4511", "3142"], 1);
    let now = Instant::now();
    e.request_move(Pos::new(1, 1), Direction::Down, now).unwrap();
    let snapshot = e.board().clone();
    assert_eq!(
        e.request_move(Pos::new(0, 0), Direction::Right, now),
        Err(fruitmatch::MoveRejection::Busy)
    );
    assert_eq!(e.board(), &snapshot);
    assert_eq!(e.phase(), Phase::Swapped);
}
