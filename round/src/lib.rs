#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative round state management for Vortex.
//!
//! A [`RoundEngine`] owns exactly one timed level at a time. It moves through
//! `Idle -> Running -> Expired`; expiry is terminal for the round and a fresh
//! start discards whatever state the previous round left behind.

use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use vortex_core::{
    is_low_time, CellIndex, Command, Event, HitOutcome, Level, LevelResult, RoundError,
    RoundPhase, RoundState, Score, TickOutcome, ROUND_DURATION,
};
use vortex_system_target_selection::TargetSelector;

#[derive(Debug, Clone)]
struct Round {
    level: Level,
    target: CellIndex,
    remaining: Duration,
    hits: u32,
    carried_score: Score,
    result: Option<LevelResult>,
}

impl Round {
    fn snapshot(&self) -> RoundState {
        RoundState {
            level: self.level,
            side: self.level.side(),
            target: if self.result.is_some() {
                None
            } else {
                Some(self.target)
            },
            remaining: self.remaining,
            hits: self.hits,
        }
    }

    fn finish(&mut self) -> LevelResult {
        let result = LevelResult::new(self.level, self.hits, self.carried_score);
        self.result = Some(result);
        result
    }
}

/// Represents the authoritative state of the round being played.
#[derive(Debug)]
pub struct RoundEngine<R = ChaCha8Rng> {
    selector: TargetSelector<R>,
    phase: RoundPhase,
    round: Option<Round>,
}

impl<R: Rng> RoundEngine<R> {
    /// Creates an idle engine that draws targets from the provided selector.
    #[must_use]
    pub fn new(selector: TargetSelector<R>) -> Self {
        Self {
            selector,
            phase: RoundPhase::Idle,
            round: None,
        }
    }

    /// Starts a round for a raw level number with no carried score.
    ///
    /// Fails with [`RoundError::InvalidLevel`] when the level is outside 1..=4.
    pub fn start_round(&mut self, level: u32) -> Result<RoundState, RoundError> {
        let level = Level::new(level)?;
        Ok(self.start_level(level, 0))
    }

    /// Starts a round for a raw level number on top of an accumulated score.
    pub fn start_round_carrying(
        &mut self,
        level: u32,
        accumulated: Score,
    ) -> Result<RoundState, RoundError> {
        let level = Level::new(level)?;
        Ok(self.start_level(level, accumulated))
    }

    /// Starts a round for a validated level, carrying the play-through score in.
    ///
    /// Any previous round is discarded, including one that is still running.
    pub fn start_level(&mut self, level: Level, carried_score: Score) -> RoundState {
        if self.phase == RoundPhase::Running {
            debug!(level = %level, "discarding running round for a fresh start");
        }

        let target = self.selector.next(level.side(), None);
        let round = Round {
            level,
            target,
            remaining: ROUND_DURATION,
            hits: 0,
            carried_score,
            result: None,
        };
        let state = round.snapshot();
        self.round = Some(round);
        self.phase = RoundPhase::Running;
        debug!(level = %level, side = level.side(), target = %target, carried_score, "round started");
        state
    }

    /// Advances the countdown by `dt`, expiring the round once it reaches zero.
    pub fn apply_tick(&mut self, dt: Duration) -> Result<TickOutcome, RoundError> {
        let round = self.running_round_mut("tick")?;
        round.remaining = round.remaining.saturating_sub(dt);
        let remaining = round.remaining;

        if !remaining.is_zero() {
            return Ok(TickOutcome {
                remaining,
                low_time: is_low_time(remaining),
                result: None,
            });
        }

        let result = round.finish();
        self.phase = RoundPhase::Expired;
        debug!(level = %result.level, hits = result.hits_this_level, "round expired on tick");
        Ok(TickOutcome {
            remaining,
            low_time: true,
            result: Some(result),
        })
    }

    /// Registers a tap. Only a tap on the target counts; misses change nothing.
    pub fn apply_hit(&mut self, cell: CellIndex) -> Result<HitOutcome, RoundError> {
        let Self {
            selector,
            phase,
            round,
        } = self;
        let round = match (*phase, round.as_mut()) {
            (RoundPhase::Running, Some(round)) => round,
            (phase, _) => {
                return Err(RoundError::InvalidState {
                    operation: "hit",
                    phase,
                })
            }
        };

        if cell != round.target {
            return Ok(HitOutcome {
                correct: false,
                target: round.target,
            });
        }

        round.hits = round.hits.saturating_add(1);
        round.target = selector.next(round.level.side(), Some(round.target));
        Ok(HitOutcome {
            correct: true,
            target: round.target,
        })
    }

    /// Ends a running round immediately without waiting for the countdown.
    pub fn expire(&mut self) -> Result<LevelResult, RoundError> {
        let round = self.running_round_mut("expire")?;
        let result = round.finish();
        self.phase = RoundPhase::Expired;
        debug!(level = %result.level, hits = result.hits_this_level, "round expired early");
        Ok(result)
    }

    /// Returns the result of the current round, expiring it first if needed.
    ///
    /// Calling this again after expiry yields the same result.
    pub fn end_round(&mut self) -> Result<LevelResult, RoundError> {
        match (self.phase, self.round.as_ref().and_then(|round| round.result)) {
            (RoundPhase::Running, _) => self.expire(),
            (RoundPhase::Expired, Some(result)) => Ok(result),
            (phase, _) => Err(RoundError::InvalidState {
                operation: "end the round",
                phase,
            }),
        }
    }

    /// Discards the current round without producing a result.
    pub fn abandon(&mut self) {
        if self.phase == RoundPhase::Running {
            debug!("running round abandoned");
        }
        self.round = None;
        self.phase = RoundPhase::Idle;
    }

    fn running_round_mut(&mut self, operation: &'static str) -> Result<&mut Round, RoundError> {
        match (self.phase, self.round.as_mut()) {
            (RoundPhase::Running, Some(round)) => Ok(round),
            (phase, _) => Err(RoundError::InvalidState { operation, phase }),
        }
    }
}

/// Applies the provided command to the engine, broadcasting resulting events.
///
/// Contract violations are reported as errors and leave both the engine and
/// `out_events` untouched.
pub fn apply<R: Rng>(
    engine: &mut RoundEngine<R>,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), RoundError> {
    match command {
        Command::StartRound {
            level,
            carried_score,
        } => {
            let state = engine.start_level(level, carried_score);
            out_events.push(Event::RoundStarted { state });
        }
        Command::Tick { dt } => {
            let outcome = engine.apply_tick(dt)?;
            match outcome.result {
                Some(result) => out_events.push(Event::RoundExpired { result }),
                None => out_events.push(Event::TimeRemaining {
                    remaining: outcome.remaining,
                    low_time: outcome.low_time,
                }),
            }
        }
        Command::Hit { cell } => {
            let outcome = engine.apply_hit(cell)?;
            if outcome.correct {
                out_events.push(Event::TargetHit {
                    cell,
                    next_target: outcome.target,
                    hits: query::hits(engine),
                });
            } else {
                out_events.push(Event::TargetMissed {
                    cell,
                    target: outcome.target,
                });
            }
        }
        Command::Expire => {
            let result = engine.expire()?;
            out_events.push(Event::RoundExpired { result });
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the round state.
pub mod query {
    use std::time::Duration;

    use super::RoundEngine;
    use vortex_core::{CellIndex, Level, LevelResult, RoundPhase, RoundState};

    /// Lifecycle phase of the engine.
    #[must_use]
    pub fn phase<R>(engine: &RoundEngine<R>) -> RoundPhase {
        engine.phase
    }

    /// Captures a snapshot of the current or most recently finished round.
    #[must_use]
    pub fn state<R>(engine: &RoundEngine<R>) -> Option<RoundState> {
        engine.round.as_ref().map(super::Round::snapshot)
    }

    /// Level of the current or most recently finished round.
    #[must_use]
    pub fn level<R>(engine: &RoundEngine<R>) -> Option<Level> {
        engine.round.as_ref().map(|round| round.level)
    }

    /// Grid side length of the current or most recently finished round.
    #[must_use]
    pub fn side<R>(engine: &RoundEngine<R>) -> Option<u32> {
        level(engine).map(Level::side)
    }

    /// Active target, absent unless a round is running.
    #[must_use]
    pub fn target<R>(engine: &RoundEngine<R>) -> Option<CellIndex> {
        match engine.phase {
            RoundPhase::Running => engine.round.as_ref().map(|round| round.target),
            _ => None,
        }
    }

    /// Time left on the countdown; zero when no round exists.
    #[must_use]
    pub fn remaining<R>(engine: &RoundEngine<R>) -> Duration {
        engine
            .round
            .as_ref()
            .map_or(Duration::ZERO, |round| round.remaining)
    }

    /// Correct taps registered in the current round.
    #[must_use]
    pub fn hits<R>(engine: &RoundEngine<R>) -> u32 {
        engine.round.as_ref().map_or(0, |round| round.hits)
    }

    /// Result emitted by the round, once it has expired.
    #[must_use]
    pub fn result<R>(engine: &RoundEngine<R>) -> Option<LevelResult> {
        engine.round.as_ref().and_then(|round| round.result)
    }
}
