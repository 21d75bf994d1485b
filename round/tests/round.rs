use std::time::Duration;

use vortex_core::{CellIndex, Level, RoundError, RoundPhase, ROUND_DURATION};
use vortex_round::{query, RoundEngine};
use vortex_system_target_selection::{Config, RepeatPolicy, TargetSelector};

fn seeded_engine(seed: u64) -> RoundEngine {
    RoundEngine::new(TargetSelector::from_config(Config::new(
        RepeatPolicy::Allow,
        Some(seed),
    )))
}

fn miss_for(target: CellIndex, cell_count: u32) -> CellIndex {
    CellIndex::new((target.get() + 1) % cell_count)
}

#[test]
fn hitting_the_target_scores_and_picks_a_new_target() {
    let mut engine = seeded_engine(42);
    let state = engine.start_round(1).expect("start level 1");
    assert_eq!(state.side, 2);
    assert_eq!(state.cell_count(), 4);

    let target = state.target.expect("target");
    let outcome = engine.apply_hit(target).expect("hit");

    assert!(outcome.correct);
    assert!(outcome.target.get() < 4, "new target must stay on the 2x2 grid");
    assert_eq!(query::hits(&engine), 1);
    assert_eq!(query::target(&engine), Some(outcome.target));
}

#[test]
fn misses_never_change_hits_time_or_target() {
    let mut engine = seeded_engine(7);
    let state = engine.start_round(2).expect("start level 2");
    let target = state.target.expect("target");

    for _ in 0..10 {
        let outcome = engine.apply_hit(miss_for(target, state.cell_count())).expect("miss");
        assert!(!outcome.correct);
        assert_eq!(outcome.target, target);
    }

    let outside = engine.apply_hit(CellIndex::new(500)).expect("tap outside grid");
    assert!(!outside.correct);
    assert_eq!(query::hits(&engine), 0);
    assert_eq!(query::remaining(&engine), ROUND_DURATION);
}

#[test]
fn hits_count_only_taps_on_the_current_target() {
    let mut engine = seeded_engine(2024);
    let state = engine.start_round(4).expect("start level 4");
    let cells = state.cell_count();
    let mut expected = 0;

    for step in 0..60 {
        let target = query::target(&engine).expect("running");
        let cell = if step % 3 == 0 { miss_for(target, cells) } else { target };
        let outcome = engine.apply_hit(cell).expect("tap");
        if cell == target {
            expected += 1;
        }
        assert_eq!(outcome.correct, cell == target);
    }

    assert_eq!(query::hits(&engine), expected);
}

#[test]
fn ticks_count_down_and_flag_low_time() {
    let mut engine = seeded_engine(1);
    let _ = engine.start_round(1).expect("start");

    let outcome = engine.apply_tick(Duration::from_millis(3_000)).expect("tick");
    assert_eq!(outcome.remaining, Duration::from_millis(2_000));
    assert!(!outcome.low_time, "exactly two seconds left is not low time");
    assert!(!outcome.expired());

    let outcome = engine.apply_tick(Duration::from_millis(100)).expect("tick");
    assert!(outcome.low_time);
    assert!(!outcome.expired());
    assert_eq!(query::phase(&engine), RoundPhase::Running);
}

#[test]
fn countdown_reaching_zero_expires_with_result() {
    let mut engine = seeded_engine(5);
    let level = Level::new(3).expect("level");
    let _ = engine.start_level(level, 10);
    let target = query::target(&engine).expect("target");
    let _ = engine.apply_hit(target).expect("hit");

    let mut result = None;
    for _ in 0..60 {
        let outcome = engine.apply_tick(Duration::from_millis(100)).expect("tick");
        if let Some(finished) = outcome.result {
            result = Some(finished);
            break;
        }
    }

    let result = result.expect("fifty ticks of 100ms exhaust a five second round");
    assert_eq!(result.level, level);
    assert_eq!(result.hits_this_level, 1);
    assert_eq!(result.accumulated_score_before, 10);
    assert_eq!(result.total_score, 11);
    assert_eq!(query::phase(&engine), RoundPhase::Expired);
}

#[test]
fn expired_round_rejects_ticks_and_hits() {
    let mut engine = seeded_engine(9);
    let _ = engine.start_round(1).expect("start");
    let outcome = engine.apply_tick(Duration::from_secs(60)).expect("tick");
    assert!(outcome.expired());

    assert_eq!(
        engine.apply_tick(Duration::from_millis(1)),
        Err(RoundError::InvalidState {
            operation: "tick",
            phase: RoundPhase::Expired,
        })
    );
    assert!(matches!(
        engine.apply_hit(CellIndex::new(0)),
        Err(RoundError::InvalidState { .. })
    ));
    assert!(engine.expire().is_err());
}

#[test]
fn forced_expiry_matches_tick_expiry_shape() {
    let mut engine = seeded_engine(77);
    let level = Level::new(2).expect("level");
    let _ = engine.start_level(level, 4);
    let target = query::target(&engine).expect("target");
    let _ = engine.apply_hit(target).expect("hit");
    let _ = engine.apply_tick(Duration::from_millis(1_200)).expect("tick");

    let result = engine.expire().expect("expire");
    assert_eq!(result.level, level);
    assert_eq!(result.hits_this_level, 1);
    assert_eq!(result.total_score, 5);
    assert_eq!(engine.end_round().expect("end"), result);
}

#[test]
fn restarting_discards_previous_round() {
    let mut engine = seeded_engine(13);
    let _ = engine.start_round(4).expect("start");
    let target = query::target(&engine).expect("target");
    let _ = engine.apply_hit(target).expect("hit");
    let _ = engine.apply_tick(Duration::from_millis(4_000)).expect("tick");

    let state = engine.start_round(1).expect("restart");
    assert_eq!(state.hits, 0);
    assert_eq!(state.side, 2);
    assert_eq!(state.remaining, ROUND_DURATION);
    assert_eq!(query::result(&engine), None);
}
