//! The record of which profile is projected into the home directory.
//!
//! Stored as JSON in `<base>/state.json`. Every change goes through
//! [`update`], which holds an exclusive `fs2` lock across the whole
//! read-modify-write so concurrent `dotprof` runs cannot interleave.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The profile whose links are currently in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProfile {
    pub name: String,
    /// Profile directory the links were made from. Unlinking on the next
    /// switch checks ownership against this root, even if the base
    /// directory has moved since.
    pub root: PathBuf,
    /// Number of planned links when the profile was last linked
    pub links: usize,
    pub linked_at: DateTime<Utc>,
}

impl ActiveProfile {
    pub fn new(name: &str, root: PathBuf, links: usize) -> Self {
        Self {
            name: name.to_string(),
            root,
            links,
            linked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveProfile>,
}

impl State {
    /// Read the state file without locking. A missing or empty file is the
    /// empty state.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read state file: {:?}", path)),
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content)
            .with_context(|| format!("Failed to parse state file: {:?}", path))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_name() == Some(name)
    }
}

/// Exclusive lock on the state file, released on drop
struct StateLock {
    file: File,
}

impl StateLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open state file: {:?}", path))?;

        // Blocks until the other writer is done
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock state file: {:?}", path))?;

        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Lock the state file, let `f` change the state, and write it back.
///
/// Returns whatever `f` returns.
pub fn update<T>(path: &Path, f: impl FnOnce(&mut State) -> T) -> Result<T> {
    let mut lock = StateLock::acquire(path)?;

    let mut content = String::new();
    lock.file
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read state file: {:?}", path))?;
    let mut state = State::parse(&content, path)?;

    let out = f(&mut state);

    let json = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
    let write = |file: &mut File| -> std::io::Result<()> {
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    };
    write(&mut lock.file).with_context(|| format!("Failed to write state file: {:?}", path))?;

    debug!(active = ?state.active_name(), "state saved");
    Ok(out)
}
