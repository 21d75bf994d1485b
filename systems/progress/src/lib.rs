#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Progress system tracking the highest level a player has unlocked.
//!
//! The unlocked level only ever moves forward. Stores silently ignore
//! requests to lower it, so callers never need to read before writing.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use vortex_core::Level;

/// Errors raised by progress stores.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// The preferences file exists but could not be read.
    #[error("failed to read progress at {path}")]
    Read {
        /// Location of the preferences file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The preferences file could not be written.
    #[error("failed to write progress at {path}")]
    Write {
        /// Location of the preferences file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The preferences file is not valid JSON of the expected shape.
    #[error("progress at {path} is malformed")]
    Malformed {
        /// Location of the preferences file.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The preferences could not be encoded.
    #[error("failed to encode progress")]
    Encode(#[source] serde_json::Error),
}

/// Key-value persistence for the unlocked level.
pub trait ProgressStore {
    /// Highest unlocked level; [`Level::FIRST`] when nothing was recorded.
    fn unlocked_level(&self) -> Result<Level, ProgressError>;

    /// Raises the unlocked level. Values at or below the current one are ignored.
    fn set_unlocked_level(&mut self, level: Level) -> Result<(), ProgressError>;
}

/// Volatile progress kept in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryProgressStore {
    unlocked: Level,
}

impl MemoryProgressStore {
    /// Creates a store with only the first level unlocked.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            unlocked: Level::FIRST,
        }
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn unlocked_level(&self) -> Result<Level, ProgressError> {
        Ok(self.unlocked)
    }

    fn set_unlocked_level(&mut self, level: Level) -> Result<(), ProgressError> {
        self.unlocked = self.unlocked.max(level);
        Ok(())
    }
}

/// On-disk layout: the unlocked level lives under the `GamePrefs` namespace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(rename = "GamePrefs", default)]
    game: GamePreferences,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct GamePreferences {
    #[serde(default = "first_level")]
    unlocked_level: u32,
}

impl Default for GamePreferences {
    fn default() -> Self {
        Self {
            unlocked_level: first_level(),
        }
    }
}

fn first_level() -> u32 {
    u32::from(Level::FIRST.get())
}

/// Clamps a raw persisted value into the playable range.
fn level_from_raw(raw: u32) -> Level {
    let clamped = raw.clamp(first_level(), u32::from(Level::LAST.get()));
    Level::new(clamped).unwrap_or(Level::FIRST)
}

/// Progress persisted as a small JSON preferences document.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    unlocked: Level,
}

impl JsonProgressStore {
    /// Opens the preferences at `path`. A missing file means level 1.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProgressError> {
        let path = path.into();
        let preferences: PreferencesFile = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| ProgressError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => PreferencesFile::default(),
            Err(source) => return Err(ProgressError::Read { path, source }),
        };
        let unlocked = level_from_raw(preferences.game.unlocked_level);
        debug!(path = %path.display(), unlocked = %unlocked, "progress opened");
        Ok(Self { path, unlocked })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), ProgressError> {
        let preferences = PreferencesFile {
            game: GamePreferences {
                unlocked_level: u32::from(self.unlocked.get()),
            },
        };
        let encoded =
            serde_json::to_string_pretty(&preferences).map_err(ProgressError::Encode)?;
        let written = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
        .and_then(|()| fs::write(&self.path, encoded));

        written.map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "progress write failed");
            ProgressError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl ProgressStore for JsonProgressStore {
    fn unlocked_level(&self) -> Result<Level, ProgressError> {
        Ok(self.unlocked)
    }

    fn set_unlocked_level(&mut self, level: Level) -> Result<(), ProgressError> {
        if level <= self.unlocked {
            return Ok(());
        }
        self.unlocked = level;
        self.persist()
    }
}

/// Applies the unlock rule for a finished level.
///
/// Finishing any level but the last unlocks its successor. Returns the level
/// that became newly available, or `None` when nothing changed.
pub fn record_completion<P>(store: &mut P, finished: Level) -> Result<Option<Level>, ProgressError>
where
    P: ProgressStore + ?Sized,
{
    let Some(next) = finished.next() else {
        return Ok(None);
    };
    if next <= store.unlocked_level()? {
        return Ok(None);
    }

    store.set_unlocked_level(next)?;
    info!(finished = %finished, unlocked = %next, "level unlocked");
    Ok(Some(next))
}

/// Reports whether a level may be started.
pub fn is_unlocked<P>(store: &P, level: Level) -> Result<bool, ProgressError>
where
    P: ProgressStore + ?Sized,
{
    Ok(level <= store.unlocked_level()?)
}

/// Lock state of a single level, as shown on a level selection screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelAvailability {
    /// Level described by the entry.
    pub level: Level,
    /// Whether the level may be started.
    pub unlocked: bool,
}

/// Lock state of every level in ascending order.
pub fn level_availability<P>(store: &P) -> Result<Vec<LevelAvailability>, ProgressError>
where
    P: ProgressStore + ?Sized,
{
    let unlocked = store.unlocked_level()?;
    Ok(Level::all()
        .map(|level| LevelAvailability {
            level,
            unlocked: level <= unlocked,
        })
        .collect())
}
