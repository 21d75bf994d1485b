#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Leaderboard system that ranks play-through scores per level.
//!
//! Each level keeps at most [`LEADERBOARD_CAPACITY`] entries ordered by score
//! descending, with earlier submissions ranking above later ones on equal
//! scores. Ranks are never stored; every read numbers its rows afresh. The
//! ranking rules live here while persistence sits behind [`ScoreStore`].

mod store;

pub use store::{JsonScoreStore, MemoryScoreStore, ScoreStore, StoreError};

use tracing::{debug, info};
use vortex_core::{
    Level, Rank, RankedEntry, Score, ScoreEntry, DEFAULT_PLAYER_NAME, LEADERBOARD_CAPACITY,
};

/// Substitutes the default name for empty or whitespace-only submissions.
/// Any other name is kept exactly as given.
#[must_use]
pub fn normalize_player_name(name: &str) -> String {
    if name.trim().is_empty() {
        DEFAULT_PLAYER_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

/// Ranking engine layered over a score store.
#[derive(Debug)]
pub struct Leaderboard<S> {
    store: S,
}

impl<S: ScoreStore> Leaderboard<S> {
    /// Creates a leaderboard backed by the provided store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Provides read-only access to the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Score a submission must strictly exceed to enter a full level table.
    ///
    /// Returns `None` while the level still has free slots.
    pub fn lowest_qualifying_score(&self, level: Level) -> Result<Option<Score>, StoreError> {
        let top = self.store.fetch_top(Some(level), LEADERBOARD_CAPACITY)?;
        if top.len() < LEADERBOARD_CAPACITY {
            return Ok(None);
        }
        Ok(top.last().map(|entry| entry.score))
    }

    /// Decides whether `score` would earn a place on the level's table.
    ///
    /// Any score qualifies while the table has free slots. Once full, the
    /// score must be strictly greater than the lowest ranked entry.
    pub fn qualifies(&self, level: Level, score: Score) -> Result<bool, StoreError> {
        let qualifies = match self.lowest_qualifying_score(level)? {
            None => true,
            Some(lowest) => score > lowest,
        };
        debug!(level = %level, score, qualifies, "qualification checked");
        Ok(qualifies)
    }

    /// Records a score and returns the rank it landed on.
    ///
    /// Overflowing entries are evicted from the bottom of the table, latest
    /// submission first among equal scores. When the submitted entry is the
    /// one evicted, `None` is returned.
    ///
    /// Eviction runs even when the store reports a failed insert, since the
    /// row may still have been kept. The insert error is returned first.
    pub fn submit(
        &mut self,
        level: Level,
        name: &str,
        score: Score,
    ) -> Result<Option<Rank>, StoreError> {
        let name = normalize_player_name(name);
        let inserted = self.store.insert(&name, score, level);
        let evicted = self.evict_overflow(level);
        let id = inserted?;
        evicted?;

        let rank = self
            .store
            .fetch_top(Some(level), LEADERBOARD_CAPACITY)?
            .iter()
            .position(|entry| entry.id == id)
            .map(Rank::from_position);

        match rank {
            Some(rank) => info!(level = %level, name = %name, score, rank = %rank, "score recorded"),
            None => info!(level = %level, name = %name, score, "score fell off the table"),
        }
        Ok(rank)
    }

    /// Ranked view of a level, or of every level when `level` is `None`.
    ///
    /// The global view interleaves levels purely by score. `limit` is capped
    /// at [`LEADERBOARD_CAPACITY`].
    pub fn top(&self, level: Option<Level>, limit: usize) -> Result<Vec<RankedEntry>, StoreError> {
        let rows = self
            .store
            .fetch_top(level, limit.min(LEADERBOARD_CAPACITY))?;
        Ok(rank_rows(rows))
    }

    /// Ranked view using the full table capacity.
    pub fn top_default(&self, level: Option<Level>) -> Result<Vec<RankedEntry>, StoreError> {
        self.top(level, LEADERBOARD_CAPACITY)
    }

    fn evict_overflow(&mut self, level: Level) -> Result<(), StoreError> {
        loop {
            let count = self.store.count(level)?;
            if count <= LEADERBOARD_CAPACITY {
                return Ok(());
            }
            let rows = self.store.fetch_top(Some(level), count)?;
            let Some(lowest) = rows.last() else {
                return Ok(());
            };
            if !self.store.remove(lowest.id)? {
                return Ok(());
            }
            info!(level = %level, name = %lowest.name, score = lowest.score, "evicted lowest entry");
        }
    }
}

fn rank_rows(rows: Vec<ScoreEntry>) -> Vec<RankedEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(position, entry)| RankedEntry {
            rank: Rank::from_position(position),
            name: entry.name,
            score: entry.score,
            level: entry.level,
        })
        .collect()
}
