//! Directory catalog over the media root
//!
//! Lists subdirectories and audio files of a confined directory and annotates
//! each audio file with its played flag from the progress store. Every entry is
//! confined on its own, so a symlink leading out of the root never shows up.

use crate::paths::{ConfinedPath, MediaRoot};
use crate::progress::{ProgressRecord, ProgressStore};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Audio extensions served and listed (matched case-insensitively)
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac", "opus"];

/// Names starting with this marker are never listed
pub const HIDDEN_PREFIX: char = '.';

/// True if the path's extension is in the audio allow-list
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A navigable directory (also used for breadcrumbs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
}

/// A playable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEntry {
    pub name: String,
    pub path: String,
    pub played: bool,
}

/// Contents of one directory, computed per request
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryListing {
    /// Normalized key of the listed directory ("" for the root)
    pub path: String,
    pub directories: Vec<DirectoryEntry>,
    pub audio_files: Vec<AudioEntry>,
}

/// Read access to the media tree plus progress lookups keyed by confined paths
#[derive(Debug, Clone)]
pub struct Catalog {
    root: MediaRoot,
    progress: Arc<ProgressStore>,
}

impl Catalog {
    pub fn new(root: MediaRoot, progress: Arc<ProgressStore>) -> Self {
        Self { root, progress }
    }

    pub fn root(&self) -> &MediaRoot {
        &self.root
    }

    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    /// List a directory: subdirectories and audio files, each sorted case-insensitively
    pub fn list(&self, relative_dir: &str) -> Result<DirectoryListing> {
        let directory = self.root.confine(relative_dir)?;
        if !directory.absolute().is_dir() {
            return Err(Error::NotFound("Directory not found".to_string()));
        }

        // One snapshot per listing keeps played flags consistent within the page
        let progress = self.progress.snapshot()?;

        let mut directories = Vec::new();
        let mut audio_files = Vec::new();

        for entry in fs::read_dir(directory.absolute())? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                debug!(entry = ?entry.path(), "Skipping non UTF-8 file name");
                continue;
            };
            if name.starts_with(HIDDEN_PREFIX) {
                continue;
            }

            let Some(confined) = self.root.resolve_within(&join_key(directory.relative(), &name)) else {
                debug!(name = %name, "Skipping entry that resolves outside media root");
                continue;
            };
            // Follows symlinks; broken links have no metadata and are skipped
            let Ok(metadata) = fs::metadata(confined.absolute()) else {
                continue;
            };

            if metadata.is_dir() {
                directories.push(DirectoryEntry {
                    name,
                    path: confined.relative().to_string(),
                });
            } else if metadata.is_file() && is_audio_file(confined.absolute()) {
                let played = progress
                    .get(confined.relative())
                    .map(|record| record.played)
                    .unwrap_or(false);
                audio_files.push(AudioEntry {
                    name,
                    path: confined.relative().to_string(),
                    played,
                });
            }
        }

        directories.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));
        audio_files.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));

        Ok(DirectoryListing {
            path: directory.relative().to_string(),
            directories,
            audio_files,
        })
    }

    /// Confine and validate a playable file
    ///
    /// `NotFound` unless it is an existing regular file, `UnsupportedType` unless
    /// its extension is allow-listed.
    pub fn audio_file(&self, relative: &str) -> Result<ConfinedPath> {
        let file = self.root.confine(relative)?;
        if !file.absolute().is_file() {
            return Err(Error::NotFound("Audio file not found".to_string()));
        }
        if !is_audio_file(file.absolute()) {
            return Err(Error::UnsupportedType);
        }
        Ok(file)
    }

    /// Stored progress for a playable file, zeroed when nothing was recorded yet
    pub fn progress(&self, relative: &str) -> Result<ProgressRecord> {
        let file = self.audio_file(relative)?;
        Ok(self.progress.get(file.relative())?.unwrap_or_default())
    }

    /// Apply a playback report for a playable file and return what was stored
    pub fn record_progress(&self, relative: &str, position: f64, duration: f64) -> Result<ProgressRecord> {
        let file = self.audio_file(relative)?;
        self.progress.record_playback(file.relative(), position, duration)
    }
}

fn join_key(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", directory, name)
    }
}

fn sort_key(name: &str) -> (String, &str) {
    (name.to_lowercase(), name)
}

/// Ancestor chain from the root down to `relative`, as (name, cumulative path) pairs
///
/// Expects a normalized key such as [`ConfinedPath::relative`]; the root itself
/// yields an empty chain.
pub fn breadcrumbs(relative: &str) -> Vec<DirectoryEntry> {
    let mut crumbs = Vec::new();
    let mut accumulated = String::new();
    for part in relative.split('/').filter(|part| !part.is_empty()) {
        if !accumulated.is_empty() {
            accumulated.push('/');
        }
        accumulated.push_str(part);
        crumbs.push(DirectoryEntry {
            name: part.to_string(),
            path: accumulated.clone(),
        });
    }
    crumbs
}

/// Key of the enclosing directory; `None` at the root
pub fn parent_path(relative: &str) -> Option<String> {
    let trimmed = relative.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default(),
    )
}
