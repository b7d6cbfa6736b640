use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::{Duration, Instant};

use fruitmatch::engine::matcher::find_matches;
use fruitmatch::engine::{LayoutIssue, RegionId};
use fruitmatch::{Engine, EngineConfig, Event, LevelError, LevelLayout, Resolution};

fn courtyard() -> LevelLayout {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("levels/courtyard.json");
    LevelLayout::load(&path).unwrap()
}

fn config(seed: u64, palette_size: u8) -> EngineConfig {
    EngineConfig {
        seed,
        palette_size,
        ..EngineConfig::default()
    }
}

/// Play up to `moves` hinted moves, settling each one. Returns the full event log.
fn autoplay(engine: &mut Engine, moves: usize) -> Vec<Event> {
    let mut log = Vec::new();
    let now = Instant::now();
    for _ in 0..moves {
        let Some((from, dir)) = engine.hint() else {
            break;
        };
        engine.request_move(from, dir, now).unwrap();
        let outcome = engine.settle(now);
        assert!(matches!(outcome, Some(Resolution::Stable { .. })));
        assert!(engine.is_idle());
        log.extend(engine.drain_events());
    }
    log
}

#[test]
fn freshly_loaded_boards_hold_no_matches() {
    for layout in [LevelLayout::default_level(), courtyard()] {
        for seed in 0..25 {
            for palette in [3, 5, 12] {
                let e = Engine::load_level(&layout, &config(seed, palette)).unwrap();
                assert!(find_matches(e.board()).is_empty(), "seed {seed} palette {palette}");
                assert_eq!(e.board().occupied_count(), e.board().playable_count());
            }
        }
    }
}

#[test]
fn every_resolution_leaves_a_full_quiet_board() {
    for seed in 0..8 {
        let mut e = Engine::load_level(&courtyard(), &config(seed, 4)).unwrap();
        autoplay(&mut e, 25);
        assert_eq!(e.board().occupied_count(), e.board().playable_count());
        assert!(find_matches(e.board()).is_empty());
        assert!(e.board().inconsistencies().is_empty());
        assert_eq!(e.diagnostics().inconsistencies, 0);
    }
}

#[test]
fn obstacle_counters_only_go_down() {
    for seed in 0..8 {
        let mut e = Engine::load_level(&courtyard(), &config(seed, 3)).unwrap();
        let mut regions = e.board().regions().count();
        let mut last: BTreeMap<RegionId, u32> =
            e.board().regions().map(|r| (r.id, r.remaining_hits())).collect();
        let mut retired = BTreeSet::new();

        for ev in autoplay(&mut e, 40) {
            match ev {
                Event::ObstacleHit {
                    region,
                    remaining_hits,
                } => {
                    assert!(!retired.contains(&region), "hit after depletion");
                    let prev = last.insert(region, remaining_hits).unwrap();
                    assert!(remaining_hits < prev);
                }
                Event::ObstacleDepleted { region, .. } => {
                    assert_eq!(last.get(&region), Some(&0));
                    assert!(retired.insert(region));
                    regions -= 1;
                }
                _ => {}
            }
        }
        assert_eq!(e.board().regions().count(), regions);
    }
}

#[test]
fn eliminated_cells_are_unique_per_round() {
    let mut e = Engine::load_level(&LevelLayout::default_level(), &config(11, 3)).unwrap();
    for ev in autoplay(&mut e, 30) {
        if let Event::TilesEliminated { cells, target_hint } = ev {
            let set: BTreeSet<_> = cells.iter().copied().collect();
            assert_eq!(set.len(), cells.len());
            assert!(cells.len() >= 3);
            assert!(target_hint.is_some_and(|t| set.contains(&t)));
        }
    }
}

#[test]
fn same_seed_same_moves_same_log() {
    let run = || {
        let mut e = Engine::load_level(&courtyard(), &config(99, 5)).unwrap();
        let log = autoplay(&mut e, 15);
        (log, e.board().clone())
    };
    let (log_a, board_a) = run();
    let (log_b, board_b) = run();
    assert_eq!(log_a, log_b);
    assert_eq!(board_a, board_b);
}

#[test]
fn watchdog_settles_an_abandoned_move() {
    let cfg = EngineConfig {
        watchdog_timeout: Duration::from_millis(50),
        ..config(3, 5)
    };
    let mut e = Engine::load_level(&LevelLayout::default_level(), &cfg).unwrap();
    let (from, dir) = e.hint().unwrap();
    let start = Instant::now();
    e.request_move(from, dir, start).unwrap();
    e.complete_step(start + Duration::from_millis(10));

    assert!(!e.check_watchdog(start + Duration::from_millis(40)));
    assert!(e.check_watchdog(start + Duration::from_millis(100)));
    assert!(e.is_idle());
    assert_eq!(e.diagnostics().watchdog_trips, 1);
    assert_eq!(e.board().occupied_count(), e.board().playable_count());
    assert!(find_matches(e.board()).is_empty());
    assert!(matches!(
        e.drain_events().last(),
        Some(Event::ResolutionComplete { .. })
    ));
}

#[test]
fn level_grid_round_trips() {
    let layout = courtyard();
    assert_eq!(layout.name, "Courtyard");
    assert_eq!(layout.obstacle_hits, Some(2));
    assert_eq!(layout.obstacles().len(), 2);
    let again = LevelLayout::from_grid(&layout.to_grid()).unwrap();
    assert_eq!(again.to_grid(), layout.to_grid());

    let json = layout.to_json().unwrap();
    assert_eq!(LevelLayout::from_json(&json).unwrap(), layout);
}

#[test]
fn level_file_hits_override_config() {
    let e = Engine::load_level(&courtyard(), &EngineConfig::default()).unwrap();
    assert!(e.board().regions().all(|r| r.remaining_hits() == 2));
}

#[test]
fn bad_levels_fail_whole() {
    let l_shape = r#"{"grid": [[1, 2, 2], [0, 2, 1]]}"#;
    assert!(matches!(
        LevelLayout::from_json(l_shape),
        Err(LevelError::InvalidLayout(LayoutIssue::NonRectangularObstacle { .. }))
    ));
    assert!(matches!(
        LevelLayout::from_json("{\"grid\": [[1, 1], [1]]}"),
        Err(LevelError::InvalidLayout(LayoutIssue::Ragged { .. }))
    ));
    assert!(matches!(
        LevelLayout::from_json("not json"),
        Err(LevelError::Json(_))
    ));
    let big = EngineConfig {
        palette_size: 13,
        ..EngineConfig::default()
    };
    assert!(matches!(
        Engine::load_level(&LevelLayout::default_level(), &big),
        Err(LevelError::InvalidPalette(13))
    ));
}
