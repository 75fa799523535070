//! Durable playback progress store
//!
//! Maps a normalized relative file key to its [`ProgressRecord`]. The whole mapping
//! lives in one JSON object on disk and is rewritten on every update.
//!
//! # Concurrency
//!
//! A single mutex per store instance guards every read-parse and every
//! read-modify-write cycle, so concurrent writers are fully serialized and no
//! update is lost. The lock has no timeout.
//!
//! # Durability
//!
//! Writes go to a sibling temp file which is flushed and then renamed over the
//! store file. A corrupt or empty file is treated as an empty mapping and logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Fraction of the duration past which a file counts as played
pub const COMPLETION_THRESHOLD: f64 = 0.95;

/// Per-file playback state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub position: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub played: bool,
}

impl ProgressRecord {
    /// Apply a playback report on top of the previously stored record
    ///
    /// Negative or non-finite values are clamped to 0. Reaching the completion
    /// threshold of a positive duration rewinds to 0 and marks the file played;
    /// once played, a file stays played.
    pub fn advance(previous: Option<&ProgressRecord>, position: f64, duration: f64) -> Self {
        let mut position = clamp_seconds(position);
        let duration = clamp_seconds(duration);
        let mut played = previous.map(|record| record.played).unwrap_or(false);

        if duration > 0.0 && position >= duration * COMPLETION_THRESHOLD {
            position = 0.0;
            played = true;
        }

        Self {
            position,
            duration,
            played,
        }
    }
}

fn clamp_seconds(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

type Snapshot = BTreeMap<String, ProgressRecord>;

/// File-backed progress map shared by all request handlers
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub const FILE_NAME: &'static str = "progress.json";

    /// Open the store inside `data_dir`, creating the directory and an empty file if absent
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(Self::FILE_NAME);
        if !path.exists() {
            fs::write(&path, "{}")?;
            debug!(path = %path.display(), "Created empty progress file");
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the record for `key`
    pub fn get(&self, key: &str) -> Result<Option<ProgressRecord>> {
        let _guard = self.guard();
        Ok(self.load()?.remove(key))
    }

    /// Replace the record for `key` as a whole
    ///
    /// Negative and non-finite values are stored as 0, the same clamping a
    /// playback report gets.
    pub fn set(&self, key: &str, position: f64, duration: f64, played: bool) -> Result<()> {
        let record = ProgressRecord {
            position: clamp_seconds(position),
            duration: clamp_seconds(duration),
            played,
        };

        let _guard = self.guard();
        let mut snapshot = self.load()?;
        snapshot.insert(key.to_string(), record);
        self.save(&snapshot)
    }

    /// Apply a playback report for `key` in one critical section and return the stored record
    pub fn record_playback(&self, key: &str, position: f64, duration: f64) -> Result<ProgressRecord> {
        let _guard = self.guard();
        let mut snapshot = self.load()?;
        let record = ProgressRecord::advance(snapshot.get(key), position, duration);
        snapshot.insert(key.to_string(), record);
        self.save(&snapshot)?;

        debug!(
            key = %key,
            position = record.position,
            duration = record.duration,
            played = record.played,
            "Progress recorded"
        );
        Ok(record)
    }

    /// Full mapping as currently persisted
    pub fn snapshot(&self) -> Result<BTreeMap<String, ProgressRecord>> {
        let _guard = self.guard();
        self.load()
    }

    // The guarded data lives on disk, so a panic in another holder leaves nothing
    // half-updated in memory.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) -> Result<Snapshot> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_snapshot(&content, &self.path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::Internal(format!("Failed to serialize progress: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn parse_snapshot(content: &str, path: &Path) -> Snapshot {
    if content.trim().is_empty() {
        return Snapshot::new();
    }

    let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(content) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Progress file is corrupt, treating as empty"
            );
            return Snapshot::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<ProgressRecord>(value) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping malformed progress record");
                None
            }
        })
        .collect()
}
