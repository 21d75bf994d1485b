use std::time::Duration;

use vortex_core::{CellIndex, Command, Event, Level, RoundError, RoundPhase};
use vortex_round::{self as round, query, RoundEngine};
use vortex_system_target_selection::{Config, RepeatPolicy, TargetSelector};

const SEED: u64 = 0x7a11_e5ee_d000_0001;

#[test]
fn deterministic_replay_produces_identical_event_stream() {
    let first = replay(SEED);
    let second = replay(SEED);

    assert_eq!(first, second, "replay diverged between runs");
    assert!(
        matches!(first.last(), Some(Event::RoundExpired { .. })),
        "script should end with the round expiring"
    );
}

#[test]
fn replay_counts_every_target_hit() {
    let events = replay(SEED);
    let hits = events
        .iter()
        .filter(|event| matches!(event, Event::TargetHit { .. }))
        .count();

    let Some(Event::RoundExpired { result }) = events.last() else {
        panic!("missing expiry event");
    };
    assert_eq!(result.hits_this_level as usize, hits);
    assert_eq!(result.total_score, 3 + hits as i64);
}

#[test]
fn rejected_commands_leave_events_untouched() {
    let mut engine = RoundEngine::new(TargetSelector::from_config(Config::default()));
    let mut events = Vec::new();

    let outcome = round::apply(
        &mut engine,
        Command::Hit {
            cell: CellIndex::new(0),
        },
        &mut events,
    );

    assert_eq!(
        outcome,
        Err(RoundError::InvalidState {
            operation: "hit",
            phase: RoundPhase::Idle,
        })
    );
    assert!(events.is_empty());
}

/// Plays a level-3 round that alternates a miss and a hit between ticks.
fn replay(seed: u64) -> Vec<Event> {
    let mut engine = RoundEngine::new(TargetSelector::from_config(Config::new(
        RepeatPolicy::Allow,
        Some(seed),
    )));
    let mut log = Vec::new();

    round::apply(
        &mut engine,
        Command::StartRound {
            level: Level::new(3).expect("level"),
            carried_score: 3,
        },
        &mut log,
    )
    .expect("start");

    while query::phase(&engine) == RoundPhase::Running {
        let target = query::target(&engine).expect("running round has a target");
        let miss = CellIndex::new((target.get() + 5) % 16);
        round::apply(&mut engine, Command::Hit { cell: miss }, &mut log).expect("miss");
        round::apply(&mut engine, Command::Hit { cell: target }, &mut log).expect("hit");
        round::apply(
            &mut engine,
            Command::Tick {
                dt: Duration::from_millis(350),
            },
            &mut log,
        )
        .expect("tick");
    }

    log
}
