//! Path confinement onto the media root
//!
//! Every user-supplied relative path passes through [`MediaRoot::confine`] before
//! any filesystem access or progress lookup. The returned [`ConfinedPath`] carries
//! the normalized relative key that the progress store and catalog use, so two
//! spellings of the same file always address the same record.

use crate::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// The single directory tree the server may read from
///
/// Holds the canonical form of the root; immutable once opened.
#[derive(Debug, Clone)]
pub struct MediaRoot {
    root: PathBuf,
}

/// A path proven to be the media root or one of its descendants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    absolute: PathBuf,
    relative: String,
}

impl MediaRoot {
    /// Open (creating if absent) the media root and canonicalize it
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let root = fs::canonicalize(path)?;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Media root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Canonical absolute path of the root
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Short label for display: the root's final component, or the full path
    pub fn display_name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// Resolve an untrusted relative path, rejecting anything outside the root
    ///
    /// The candidate is joined onto the root and resolved component by component:
    /// existing prefixes are canonicalized (following symlinks), a missing tail is
    /// normalized lexically. The result must be the root itself or have the root as
    /// an ancestor in its component chain.
    pub fn confine(&self, relative: &str) -> Result<ConfinedPath> {
        self.resolve_within(relative).ok_or_else(|| {
            warn!(requested = %relative, "Rejected path outside media root");
            Error::PathEscape
        })
    }

    /// Same check as [`MediaRoot::confine`] without logging, for paths the server built itself
    pub(crate) fn resolve_within(&self, relative: &str) -> Option<ConfinedPath> {
        let resolved = resolve(&self.root.join(relative));

        // Path::starts_with compares whole components, so "/media2" is not under "/media"
        if !resolved.starts_with(&self.root) {
            return None;
        }

        let relative = relative_key(&self.root, &resolved);
        Some(ConfinedPath {
            absolute: resolved,
            relative,
        })
    }
}

impl ConfinedPath {
    /// Absolute filesystem path
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Normalized forward-slash key relative to the root ("" for the root)
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.absolute.file_name().and_then(|name| name.to_str())
    }
}

/// Resolve `.`/`..` and symlinks like a non-strict canonicalize
///
/// Canonicalization failures (missing file, loop, non-directory prefix) leave the
/// component in lexical form; the containment check runs on the result either way.
fn resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                if let Ok(canonical) = fs::canonicalize(&resolved) {
                    resolved = canonical;
                }
            }
        }
    }
    resolved
}

fn relative_key(root: &Path, resolved: &Path) -> String {
    resolved
        .strip_prefix(root)
        .map(|rest| {
            rest.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
