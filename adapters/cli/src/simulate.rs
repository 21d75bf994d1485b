//! Scripted, reproducible rounds.

use std::time::Duration;

use anyhow::{Context, Result};
use vortex_core::{Command, Event, Level, LevelResult, TICK_INTERVAL};
use vortex_round::{apply, query, RoundEngine};
use vortex_system_target_selection::{Config, TargetSelector};

/// Event stream and outcome of a scripted round.
#[derive(Debug)]
pub(crate) struct Simulation {
    /// Every event the round emitted, in order.
    pub(crate) events: Vec<Event>,
    /// Result emitted when the countdown ran out.
    pub(crate) result: LevelResult,
}

/// Plays one round where the target is tapped `reaction` after it appears.
///
/// The clock is fed in [`TICK_INTERVAL`] steps, so the event stream carries
/// the countdown updates a player would see.
///
/// `reaction` must be non-zero, otherwise the countdown never advances.
pub(crate) fn run_script(level: Level, selector: Config, reaction: Duration) -> Result<Simulation> {
    anyhow::ensure!(!reaction.is_zero(), "reaction time must be positive");

    let mut engine = RoundEngine::new(TargetSelector::from_config(selector));
    let mut events = Vec::new();
    apply(
        &mut engine,
        Command::StartRound {
            level,
            carried_score: 0,
        },
        &mut events,
    )?;

    'round: loop {
        let mut waited = Duration::ZERO;
        while waited < reaction {
            let dt = TICK_INTERVAL.min(reaction - waited);
            apply(&mut engine, Command::Tick { dt }, &mut events)?;
            if matches!(events.last(), Some(Event::RoundExpired { .. })) {
                break 'round;
            }
            waited += dt;
        }
        let cell = query::target(&engine).context("running round lost its target")?;
        apply(&mut engine, Command::Hit { cell }, &mut events)?;
    }

    let result = query::result(&engine).context("expired round has no result")?;
    Ok(Simulation { events, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_system_target_selection::RepeatPolicy;

    fn seeded(seed: u64) -> Config {
        Config::new(RepeatPolicy::Allow, Some(seed))
    }

    #[test]
    fn every_tap_before_expiry_scores() {
        let level = Level::new(2).expect("level");
        let simulation = run_script(level, seeded(9), Duration::from_millis(300)).expect("run");

        // Sixteen taps land by 4.8 s; the countdown runs out before the next.
        assert_eq!(simulation.result.hits_this_level, 16);
        assert_eq!(simulation.result.total_score, 16);
        let ticks = simulation
            .events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::TimeRemaining { .. } | Event::RoundExpired { .. }
                )
            })
            .count();
        assert_eq!(ticks, 50, "one tick per interval of the countdown");
        assert!(matches!(
            simulation.events.first(),
            Some(Event::RoundStarted { .. })
        ));
        assert!(matches!(
            simulation.events.last(),
            Some(Event::RoundExpired { .. })
        ));
    }

    #[test]
    fn same_seed_replays_identically() {
        let level = Level::LAST;
        let first = run_script(level, seeded(77), Duration::from_millis(450)).expect("run");
        let second = run_script(level, seeded(77), Duration::from_millis(450)).expect("run");
        assert_eq!(first.events, second.events);
    }

    #[test]
    fn zero_reaction_is_rejected() {
        assert!(run_script(Level::FIRST, seeded(1), Duration::ZERO).is_err());
    }
}
