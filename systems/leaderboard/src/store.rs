//! Storage capability behind the leaderboard and the stores that implement it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use vortex_core::{EntryId, Level, Score, ScoreEntry};

/// Errors raised by score stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file exists but could not be read.
    #[error("failed to read score table at {path}")]
    Read {
        /// Location of the score table.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The backing file could not be written.
    #[error("failed to write score table at {path}")]
    Write {
        /// Location of the score table.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The backing file does not contain a valid score table.
    #[error("score table at {path} is malformed")]
    Malformed {
        /// Location of the score table.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The score table could not be encoded.
    #[error("failed to encode score table")]
    Encode(#[source] serde_json::Error),
}

/// Minimal capability a durable score table must provide.
///
/// Implementations own the insertion order: identifiers handed out by
/// [`ScoreStore::insert`] must increase monotonically.
pub trait ScoreStore {
    /// Returns at most `limit` entries ordered by score descending, earlier
    /// insertions first among equal scores. `None` reads every level at once.
    fn fetch_top(&self, level: Option<Level>, limit: usize) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Appends a new row and returns the identifier assigned to it.
    fn insert(&mut self, name: &str, score: Score, level: Level) -> Result<EntryId, StoreError>;

    /// Number of rows stored for the level.
    fn count(&self, level: Level) -> Result<usize, StoreError>;

    /// Deletes a row, reporting whether it existed.
    fn remove(&mut self, id: EntryId) -> Result<bool, StoreError>;
}

/// Volatile score table kept entirely in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryScoreStore {
    next_id: u64,
    scores: Vec<ScoreEntry>,
}

impl MemoryScoreStore {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.scores
    }

    fn ranked(&self, level: Option<Level>, limit: usize) -> Vec<ScoreEntry> {
        let mut rows: Vec<ScoreEntry> = self
            .scores
            .iter()
            .filter(|entry| level.map_or(true, |level| entry.level == level))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit);
        rows
    }

    fn push(&mut self, name: &str, score: Score, level: Level) -> EntryId {
        // Rows loaded from disk may carry ids beyond a stale counter.
        let floor = self
            .scores
            .iter()
            .map(|entry| entry.id.get().saturating_add(1))
            .max()
            .unwrap_or(1);
        let id = EntryId::new(self.next_id.max(floor));
        self.next_id = id.get().saturating_add(1);
        self.scores.push(ScoreEntry {
            id,
            name: name.to_owned(),
            score,
            level,
        });
        id
    }

    fn delete(&mut self, id: EntryId) -> bool {
        let before = self.scores.len();
        self.scores.retain(|entry| entry.id != id);
        self.scores.len() != before
    }
}

impl ScoreStore for MemoryScoreStore {
    fn fetch_top(&self, level: Option<Level>, limit: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        Ok(self.ranked(level, limit))
    }

    fn insert(&mut self, name: &str, score: Score, level: Level) -> Result<EntryId, StoreError> {
        Ok(self.push(name, score, level))
    }

    fn count(&self, level: Level) -> Result<usize, StoreError> {
        Ok(self
            .scores
            .iter()
            .filter(|entry| entry.level == level)
            .count())
    }

    fn remove(&mut self, id: EntryId) -> Result<bool, StoreError> {
        Ok(self.delete(id))
    }
}

/// Score table persisted as a JSON document.
///
/// Every mutation is applied in memory first and then written out. A failed
/// write is reported to the caller but the in-memory table keeps the change.
#[derive(Debug)]
pub struct JsonScoreStore {
    path: PathBuf,
    table: MemoryScoreStore,
}

impl JsonScoreStore {
    /// Opens the table at `path`. A missing file is treated as an empty table.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => MemoryScoreStore::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        debug!(path = %path.display(), rows = table.scores.len(), "score table opened");
        Ok(Self { path, table })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(&self.table).map_err(StoreError::Encode)?;
        let written = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
        .and_then(|()| fs::write(&self.path, encoded));

        written.map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "score table write failed");
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl ScoreStore for JsonScoreStore {
    fn fetch_top(&self, level: Option<Level>, limit: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        Ok(self.table.ranked(level, limit))
    }

    fn insert(&mut self, name: &str, score: Score, level: Level) -> Result<EntryId, StoreError> {
        let id = self.table.push(name, score, level);
        self.persist()?;
        Ok(id)
    }

    fn count(&self, level: Level) -> Result<usize, StoreError> {
        self.table.count(level)
    }

    fn remove(&mut self, id: EntryId) -> Result<bool, StoreError> {
        if !self.table.delete(id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }
}
