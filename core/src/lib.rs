#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Vortex reaction game.
//!
//! This crate defines the vocabulary that connects adapters, the
//! authoritative round engine, and the pure systems around it. Adapters
//! submit [`Command`] values describing player input and clock progress, the
//! round engine executes those commands via its `apply` entry point, and then
//! broadcasts [`Event`] values describing what changed. Leaderboard and
//! progress systems only ever see plain data from this crate: a finished
//! round is summarised as a [`LevelResult`] and a stored score as a
//! [`ScoreEntry`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the countdown that bounds a single round.
pub const ROUND_DURATION: Duration = Duration::from_millis(5_000);

/// Remaining time below which adapters should present the low-time warning.
pub const LOW_TIME_THRESHOLD: Duration = Duration::from_millis(2_000);

/// Cadence at which adapters are expected to feed clock ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum number of entries retained per level leaderboard.
pub const LEADERBOARD_CAPACITY: usize = 25;

/// Name recorded for submissions that arrive without a usable player name.
pub const DEFAULT_PLAYER_NAME: &str = "Guest";

/// Points accumulated by a player. Scores are never negative in practice but
/// use a wide signed integer so arithmetic never needs overflow handling.
pub type Score = i64;

/// Reports whether the remaining round time should trigger the low-time warning.
#[must_use]
pub fn is_low_time(remaining: Duration) -> bool {
    remaining < LOW_TIME_THRESHOLD
}

/// Difficulty tier of a round. Valid levels range from 1 through 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Easiest level and the one unlocked on a fresh install.
    pub const FIRST: Level = Level(1);
    /// Final level; completing it ends a play-through.
    pub const LAST: Level = Level(4);

    /// Validates and wraps a raw level number.
    pub fn new(value: u32) -> Result<Self, InvalidLevel> {
        u8::try_from(value)
            .map_err(|_| InvalidLevel { value })
            .and_then(Self::try_from)
    }

    /// Retrieves the numeric representation of the level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Number of cells along each edge of the level's square grid.
    #[must_use]
    pub const fn side(self) -> u32 {
        self.0 as u32 + 1
    }

    /// Total number of cells on the level's grid.
    #[must_use]
    pub const fn cell_count(self) -> u32 {
        self.side() * self.side()
    }

    /// Level that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Level> {
        Level::new(u32::from(self.0) + 1).ok()
    }

    /// Reports whether this is the last level of a play-through.
    #[must_use]
    pub const fn is_final(self) -> bool {
        self.0 == Self::LAST.0
    }

    /// Iterates every playable level in ascending order.
    pub fn all() -> impl Iterator<Item = Level> {
        (Self::FIRST.0..=Self::LAST.0).map(Level)
    }
}

impl TryFrom<u8> for Level {
    type Error = InvalidLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidLevel {
                value: u32::from(value),
            })
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a level number falls outside the playable range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("level {value} is outside the playable range 1..=4")]
pub struct InvalidLevel {
    value: u32,
}

impl InvalidLevel {
    /// The rejected level number.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

/// Flat index of a grid cell, counted row by row from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex(u32);

impl CellIndex {
    /// Creates a new cell index with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the cell index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether the cell lies on a square grid with the given side length.
    #[must_use]
    pub const fn is_within(&self, side: u32) -> bool {
        self.0 < side * side
    }

    /// Zero-based column of the cell on a grid with the given side length.
    #[must_use]
    pub const fn column(&self, side: u32) -> u32 {
        self.0 % side
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based position within a leaderboard view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(u32);

impl Rank {
    /// Creates a rank from a 1-based position.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Derives the rank for a zero-based position in an ordered sequence.
    #[must_use]
    pub fn from_position(position: usize) -> Self {
        Self(u32::try_from(position).map_or(u32::MAX, |index| index.saturating_add(1)))
    }

    /// Retrieves the 1-based position.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic identifier assigned by score stores in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// Creates a new entry identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A stored leaderboard row. Rows are never mutated once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Insertion identifier; earlier submissions carry smaller identifiers.
    pub id: EntryId,
    /// Player name recorded with the score.
    pub name: String,
    /// Total score of the play-through when it was submitted.
    pub score: Score,
    /// Level at which the submitted play-through ended.
    pub level: Level,
}

/// A leaderboard row paired with its position in a particular view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedEntry {
    /// Position within the view the entry was read from.
    pub rank: Rank,
    /// Player name recorded with the score.
    pub name: String,
    /// Recorded score.
    pub score: Score,
    /// Level the score was recorded for.
    pub level: Level,
}

/// Immutable summary emitted when a round expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    /// Level the round was played on.
    pub level: Level,
    /// Correct taps registered during the round.
    pub hits_this_level: u32,
    /// Score carried into the round from earlier levels of the play-through.
    pub accumulated_score_before: Score,
    /// Carried score plus the hits of this round.
    pub total_score: Score,
}

impl LevelResult {
    /// Builds a result, deriving the total from the carried score and hits.
    #[must_use]
    pub fn new(level: Level, hits_this_level: u32, accumulated_score_before: Score) -> Self {
        Self {
            level,
            hits_this_level,
            accumulated_score_before,
            total_score: accumulated_score_before + Score::from(hits_this_level),
        }
    }
}

/// Lifecycle stage of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// No round has been started yet.
    Idle,
    /// The countdown is active and taps are accepted.
    Running,
    /// The countdown reached zero or was cut short; the round is finished.
    Expired,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Read-only snapshot of a round's state used for queries and presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundState {
    /// Level being played.
    pub level: Level,
    /// Number of cells along each grid edge.
    pub side: u32,
    /// Cell the player must tap next, absent once the round has expired.
    pub target: Option<CellIndex>,
    /// Time left on the countdown.
    pub remaining: Duration,
    /// Correct taps registered so far.
    pub hits: u32,
}

impl RoundState {
    /// Total number of cells on the round's grid.
    #[must_use]
    pub const fn cell_count(&self) -> u32 {
        self.side * self.side
    }
}

/// Result of feeding a clock tick into a running round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    /// Time left on the countdown after the tick.
    pub remaining: Duration,
    /// Whether the remaining time is below the low-time threshold.
    pub low_time: bool,
    /// Populated when the tick exhausted the countdown.
    pub result: Option<LevelResult>,
}

impl TickOutcome {
    /// Reports whether the tick ended the round.
    #[must_use]
    pub const fn expired(&self) -> bool {
        self.result.is_some()
    }
}

/// Result of a tap on a running round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitOutcome {
    /// Whether the tapped cell was the target.
    pub correct: bool,
    /// Target after the tap; a fresh pick on a hit, unchanged on a miss.
    pub target: CellIndex,
}

/// Commands that express every permissible round mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Starts a fresh round, discarding any previous round state.
    StartRound {
        /// Level to play.
        level: Level,
        /// Score carried in from earlier levels of the play-through.
        carried_score: Score,
    },
    /// Advances the round countdown by the provided delta time.
    Tick {
        /// Wall-clock time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Registers a tap on the provided cell.
    Hit {
        /// Cell the player tapped.
        cell: CellIndex,
    },
    /// Ends the round immediately, as if the countdown had reached zero.
    Expire,
}

/// Events broadcast by the round engine after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a new round started.
    RoundStarted {
        /// Snapshot of the freshly started round.
        state: RoundState,
    },
    /// Reports the countdown after a tick that did not end the round.
    TimeRemaining {
        /// Time left on the countdown.
        remaining: Duration,
        /// Whether the low-time warning should be shown.
        low_time: bool,
    },
    /// Confirms a correct tap.
    TargetHit {
        /// Cell that was tapped.
        cell: CellIndex,
        /// Target picked to replace the one that was hit.
        next_target: CellIndex,
        /// Correct taps registered so far.
        hits: u32,
    },
    /// Reports a tap on a cell other than the target.
    TargetMissed {
        /// Cell that was tapped.
        cell: CellIndex,
        /// Target that remains active.
        target: CellIndex,
    },
    /// Announces that the round ended.
    RoundExpired {
        /// Summary of the finished round.
        result: LevelResult,
    },
}

/// Errors raised when a round operation violates the round contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RoundError {
    /// A round was requested for a level outside the playable range.
    #[error(transparent)]
    InvalidLevel(#[from] InvalidLevel),
    /// The operation is not permitted in the round's current phase.
    #[error("cannot {operation} while the round is {phase}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// Phase the round was in.
        phase: RoundPhase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_grows_with_level() {
        for level in Level::all() {
            assert_eq!(level.side(), u32::from(level.get()) + 1);
            assert_eq!(level.cell_count(), level.side() * level.side());
        }
        assert_eq!(Level::FIRST.cell_count(), 4);
        assert_eq!(Level::LAST.cell_count(), 25);
    }

    #[test]
    fn level_rejects_out_of_range_values() {
        assert_eq!(Level::new(0), Err(InvalidLevel { value: 0 }));
        assert_eq!(Level::new(5).map_err(|error| error.value()), Err(5));
        assert_eq!(Level::new(258).map_err(|error| error.value()), Err(258));
        assert_eq!(Level::new(u32::MAX).map_err(|error| error.value()), Err(u32::MAX));
        assert!(Level::new(1).is_ok());
        assert!(Level::new(4).is_ok());
    }

    #[test]
    fn next_stops_after_final_level() {
        assert_eq!(Level::FIRST.next(), Level::new(2).ok());
        assert_eq!(Level::LAST.next(), None);
        assert!(Level::LAST.is_final());
        assert!(!Level::FIRST.is_final());
    }

    #[test]
    fn level_deserialization_validates_range() {
        let level: Level = serde_json::from_str("3").expect("deserialize");
        assert_eq!(level.get(), 3);
        assert!(serde_json::from_str::<Level>("9").is_err());
        assert_eq!(serde_json::to_string(&Level::LAST).expect("serialize"), "4");
    }

    #[test]
    fn level_result_accumulates_hits_onto_carried_score() {
        let level = Level::new(2).expect("level");
        let result = LevelResult::new(level, 3, 5);
        assert_eq!(result.total_score, 8);
        assert_eq!(result.accumulated_score_before, 5);
    }

    #[test]
    fn low_time_threshold_is_strict() {
        assert!(!is_low_time(Duration::from_millis(2_000)));
        assert!(is_low_time(Duration::from_millis(1_999)));
    }

    #[test]
    fn cell_index_maps_to_grid_coordinates() {
        let cell = CellIndex::new(7);
        assert_eq!(cell.column(3), 1);
        assert!(cell.is_within(3));
        assert!(!cell.is_within(2));
    }

    #[test]
    fn rank_from_position_is_one_based() {
        assert_eq!(Rank::from_position(0), Rank::new(1));
        assert_eq!(Rank::from_position(24).get(), 25);
    }
}
