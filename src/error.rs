//! Typed errors for planning and reconciling profile links.
//!
//! The core modules (`planner`, `reconciler`, `profiles`) return
//! [`LinkError`]; command handlers convert to [`anyhow::Error`] via `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while planning, installing, or removing profile links.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The profile directory (or one of its subdirectories) could not be read.
    #[error("failed to read profile directory {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The path given as a profile root is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// The profile's `.dotprof.json` exists but could not be read.
    #[error("failed to read profile config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile's `.dotprof.json` is not valid.
    #[error("invalid profile config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A mapping's `match` pattern is not a valid regular expression.
    #[error("invalid mapping pattern '{pattern}': {source}")]
    InvalidMapping {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The profile directory could not be fully removed.
    #[error("failed to remove profile directory {}: {source}", path.display())]
    DirectoryDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A symlink (or the entry occupying a link destination) could not be removed.
    #[error("failed to remove {}: {source}", path.display())]
    LinkDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A symlink could not be created.
    #[error("failed to link {} -> {}: {source}", dest.display(), src.display())]
    LinkCreate {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing file could not be backed up before being replaced.
    #[error("failed to back up {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No profile directory exists for the given name.
    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),

    /// The profile name contains characters that are not allowed.
    #[error("invalid profile name '{name}': {reason}")]
    InvalidProfileName { name: String, reason: &'static str },
}
