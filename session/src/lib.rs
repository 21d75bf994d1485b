#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session coordinator that strings rounds together into a play-through.
//!
//! A play-through starts on any unlocked level and continues level by level
//! until the final level or until the player stops. The score carries over
//! between levels: each round adds its hits onto the running total, and the
//! total is what gets offered to the leaderboard of the level just finished.
//! Only starting a new play-through resets it.

use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};
use vortex_core::{CellIndex, HitOutcome, Level, LevelResult, Rank, RoundError, RoundState, Score};
use vortex_round::{query, RoundEngine};
use vortex_system_leaderboard::{Leaderboard, ScoreStore, StoreError};
use vortex_system_progress::{record_completion, ProgressError, ProgressStore};

/// Errors raised while coordinating a play-through.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The round engine rejected the operation.
    #[error(transparent)]
    Round(#[from] RoundError),
    /// The leaderboard store failed.
    #[error("leaderboard unavailable")]
    Leaderboard(#[from] StoreError),
    /// The progress store failed.
    #[error("progress unavailable")]
    Progress(#[from] ProgressError),
    /// The requested level has not been unlocked yet.
    #[error("level {level} is locked; highest unlocked level is {unlocked}")]
    LevelLocked {
        /// Level that was requested.
        level: Level,
        /// Highest level currently unlocked.
        unlocked: Level,
    },
    /// No play-through is active.
    #[error("no play-through in progress")]
    NoPlayThrough,
    /// The current level is still being played.
    #[error("the current round has not finished")]
    RoundInProgress,
    /// A qualifying score is waiting for the player's name.
    #[error("a qualifying score is waiting for a name")]
    SubmissionPending,
    /// No qualifying score is waiting for a name.
    #[error("no score is waiting for a name")]
    NoPendingSubmission,
    /// The final level was completed; the play-through can only finish.
    #[error("the final level has been completed")]
    FinalLevelReached,
}

/// Everything the caller needs to present the end of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelReport {
    /// Summary emitted by the round.
    pub result: LevelResult,
    /// Level that became available because of this result, if any.
    pub newly_unlocked: Option<Level>,
    /// Whether the total qualifies for the finished level's leaderboard.
    /// When set, the caller must supply a name via [`Session::submit_name`].
    pub qualifies: bool,
    /// Whether another level follows in this play-through.
    pub can_continue: bool,
}

/// Outcome of feeding a clock tick through the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Time left on the countdown.
    pub remaining: Duration,
    /// Whether the low-time warning should be shown.
    pub low_time: bool,
    /// Populated when the tick finished the level.
    pub report: Option<LevelReport>,
}

/// Final figures of a play-through that the player ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayThroughSummary {
    /// Last level played.
    pub final_level: Level,
    /// Score accumulated across every level of the play-through.
    pub total_score: Score,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Playing,
    AwaitingName(LevelResult),
    LevelComplete(LevelResult),
}

fn completed_result(stage: Stage) -> Result<LevelResult, SessionError> {
    match stage {
        Stage::Playing => Err(SessionError::RoundInProgress),
        Stage::AwaitingName(_) => Err(SessionError::SubmissionPending),
        Stage::LevelComplete(result) => Ok(result),
    }
}

#[derive(Clone, Copy, Debug)]
struct PlayThrough {
    level: Level,
    accumulated_score: Score,
    stage: Stage,
}

/// Orchestrates rounds, progress and leaderboard across a play-through.
#[derive(Debug)]
pub struct Session<S, P, R = ChaCha8Rng> {
    leaderboard: Leaderboard<S>,
    progress: P,
    round: RoundEngine<R>,
    play: Option<PlayThrough>,
}

impl<S, P, R> Session<S, P, R>
where
    S: ScoreStore,
    P: ProgressStore,
    R: Rng,
{
    /// Assembles a session from its collaborators.
    #[must_use]
    pub fn new(leaderboard: Leaderboard<S>, progress: P, round: RoundEngine<R>) -> Self {
        Self {
            leaderboard,
            progress,
            round,
            play: None,
        }
    }

    /// Starts a new play-through on `level` with the score reset to zero.
    ///
    /// Any play-through in progress is abandoned without a result.
    pub fn begin(&mut self, level: Level) -> Result<RoundState, SessionError> {
        let unlocked = self.progress.unlocked_level()?;
        if level > unlocked {
            return Err(SessionError::LevelLocked { level, unlocked });
        }
        if self.play.is_some() {
            debug!("abandoning previous play-through");
        }

        let state = self.round.start_level(level, 0);
        self.play = Some(PlayThrough {
            level,
            accumulated_score: 0,
            stage: Stage::Playing,
        });
        info!(level = %level, "play-through started");
        Ok(state)
    }

    /// Feeds a clock tick into the running round.
    pub fn tick(&mut self, dt: Duration) -> Result<TickReport, SessionError> {
        let _ = self.play_through()?;
        let outcome = self.round.apply_tick(dt)?;
        let report = match outcome.result {
            Some(result) => Some(self.complete_level(result)?),
            None => None,
        };
        Ok(TickReport {
            remaining: outcome.remaining,
            low_time: outcome.low_time,
            report,
        })
    }

    /// Registers a tap on the running round.
    pub fn hit(&mut self, cell: CellIndex) -> Result<HitOutcome, SessionError> {
        let _ = self.play_through()?;
        Ok(self.round.apply_hit(cell)?)
    }

    /// Ends the running round early, as an external timeout would.
    pub fn expire(&mut self) -> Result<LevelReport, SessionError> {
        let _ = self.play_through()?;
        let result = self.round.expire()?;
        self.complete_level(result)
    }

    /// Records the qualifying score under `name` and returns its rank.
    ///
    /// The submission is attempted once. A store failure is returned to the
    /// caller, but the level still counts as complete: stores keep the entry
    /// in memory and write it out with their next successful write.
    pub fn submit_name(&mut self, name: &str) -> Result<Option<Rank>, SessionError> {
        let play = self.play_through()?;
        let Stage::AwaitingName(result) = play.stage else {
            return Err(SessionError::NoPendingSubmission);
        };

        let submitted = self
            .leaderboard
            .submit(result.level, name, result.total_score);
        self.set_stage(Stage::LevelComplete(result));
        Ok(submitted?)
    }

    /// Drops a pending qualifying score without recording it.
    pub fn discard_submission(&mut self) -> Result<(), SessionError> {
        let play = self.play_through()?;
        let Stage::AwaitingName(result) = play.stage else {
            return Err(SessionError::NoPendingSubmission);
        };
        debug!(level = %result.level, score = result.total_score, "submission discarded");
        self.set_stage(Stage::LevelComplete(result));
        Ok(())
    }

    /// Starts the next level, carrying the accumulated score forward.
    pub fn continue_play_through(&mut self) -> Result<RoundState, SessionError> {
        let play = self.play_through()?;
        let result = completed_result(play.stage)?;
        let next = result.level.next().ok_or(SessionError::FinalLevelReached)?;

        let state = self.round.start_level(next, play.accumulated_score);
        self.play = Some(PlayThrough {
            level: next,
            accumulated_score: play.accumulated_score,
            stage: Stage::Playing,
        });
        info!(level = %next, carried_score = play.accumulated_score, "play-through continued");
        Ok(state)
    }

    /// Ends the play-through after a completed level.
    pub fn finish(&mut self) -> Result<PlayThroughSummary, SessionError> {
        let play = self.play_through()?;
        let result = completed_result(play.stage)?;
        let summary = PlayThroughSummary {
            final_level: result.level,
            total_score: play.accumulated_score,
        };
        self.round.abandon();
        self.play = None;
        info!(level = %summary.final_level, total_score = summary.total_score, "play-through finished");
        Ok(summary)
    }

    /// Discards the play-through and any running round without a result.
    pub fn abandon(&mut self) {
        if self.play.take().is_some() {
            debug!("play-through abandoned");
        }
        self.round.abandon();
    }

    /// Level currently being played or just completed.
    #[must_use]
    pub fn current_level(&self) -> Option<Level> {
        self.play.map(|play| play.level)
    }

    /// Score carried by the play-through, zero when none is active.
    ///
    /// While a level is being played this is the score carried into it; once
    /// the level completes it includes that level's hits.
    #[must_use]
    pub fn accumulated_score(&self) -> Score {
        self.play.map_or(0, |play| play.accumulated_score)
    }

    /// Whether a qualifying score is waiting for a name.
    #[must_use]
    pub fn awaiting_name(&self) -> bool {
        matches!(
            self.play.map(|play| play.stage),
            Some(Stage::AwaitingName(_))
        )
    }

    /// Result of the level most recently completed in this play-through.
    #[must_use]
    pub fn last_result(&self) -> Option<LevelResult> {
        match self.play?.stage {
            Stage::Playing => None,
            Stage::AwaitingName(result) | Stage::LevelComplete(result) => Some(result),
        }
    }

    /// Snapshot of the running or last finished round.
    #[must_use]
    pub fn round_state(&self) -> Option<RoundState> {
        query::state(&self.round)
    }

    /// Provides read-only access to the leaderboard.
    #[must_use]
    pub fn leaderboard(&self) -> &Leaderboard<S> {
        &self.leaderboard
    }

    /// Provides read-only access to the progress store.
    #[must_use]
    pub fn progress(&self) -> &P {
        &self.progress
    }

    fn play_through(&self) -> Result<PlayThrough, SessionError> {
        self.play.ok_or(SessionError::NoPlayThrough)
    }

    fn set_stage(&mut self, stage: Stage) {
        if let Some(play) = self.play.as_mut() {
            play.stage = stage;
        }
    }

    /// Runs the end-of-level bookkeeping for a freshly expired round: unlock
    /// the next level, then check the leaderboard.
    ///
    /// The play-through records the completed level before any store is
    /// touched, so a failing store still leaves the session able to continue.
    fn complete_level(&mut self, result: LevelResult) -> Result<LevelReport, SessionError> {
        if let Some(play) = self.play.as_mut() {
            play.accumulated_score = result.total_score;
        }
        self.set_stage(Stage::LevelComplete(result));

        let newly_unlocked = record_completion(&mut self.progress, result.level)?;
        let qualifies = self
            .leaderboard
            .qualifies(result.level, result.total_score)?;
        if qualifies {
            self.set_stage(Stage::AwaitingName(result));
        }
        info!(
            level = %result.level,
            hits = result.hits_this_level,
            total_score = result.total_score,
            qualifies,
            "level complete"
        );

        Ok(LevelReport {
            result,
            newly_unlocked,
            qualifies,
            can_continue: !result.level.is_final(),
        })
    }
}
