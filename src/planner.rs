//! Link planning.
//!
//! Walks a profile directory and mirrors every entry under the home
//! directory, or wherever the profile's `.dotprof.json` routes it. The plan
//! is a pure function of the profile tree: no filesystem entry is created or
//! modified here.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::LinkError;
use crate::mappings::{ProfileConfig, Route, Router};

/// Entries that hold profile metadata and are never linked. Matched by file
/// name at any depth; a reserved directory excludes its whole subtree.
pub const RESERVED_ENTRIES: &[&str] = &[
    ".git",
    ".gitignore",
    crate::mappings::CONFIG_FILE,
    "README",
    "README.md",
    "LICENSE",
    "LICENSE.md",
];

/// A planned link: `dest` should be a symlink pointing at `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkInfo {
    /// Absolute path inside the profile directory
    pub source: PathBuf,
    /// Absolute path of the link, normally inside the home directory
    pub dest: PathBuf,
}

impl LinkInfo {
    /// `~/`-relative destination for display, or the full path outside home
    pub fn display_dest(&self, home_dir: &Path) -> String {
        match self.dest.strip_prefix(home_dir) {
            Ok(rel) => format!("~/{}", rel.display()),
            Err(_) => self.dest.display().to_string(),
        }
    }
}

/// Whether a file name is reserved for profile metadata
pub fn is_reserved(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| RESERVED_ENTRIES.contains(&n))
}

/// Compute the links that should exist while the profile at `profile_dir` is
/// active, applying the profile's `.dotprof.json` if it has one.
///
/// # Errors
/// [`LinkError::NotADirectory`] if `profile_dir` is not a directory, a
/// config error for a bad `.dotprof.json`, or [`LinkError::Traversal`] if
/// `profile_dir` or any directory below it cannot be read.
pub fn plan(profile_dir: &Path, home_dir: &Path) -> Result<Vec<LinkInfo>, LinkError> {
    if profile_dir.exists() && !profile_dir.is_dir() {
        return Err(LinkError::NotADirectory {
            path: profile_dir.to_path_buf(),
        });
    }
    let config = ProfileConfig::load(profile_dir)?;
    let router = Router::new(&config, home_dir, std::env::consts::OS)?;
    plan_with(profile_dir, &router)
}

/// Plan `profile_dir` with an already compiled [`Router`].
///
/// One [`LinkInfo`] is emitted per file and directory below `profile_dir`,
/// in file-name order at every level, so a directory always precedes its
/// contents. Symlinks inside the profile are planned but not followed.
///
/// Skipped entries drop out together with their subtree. Redirected
/// directories carry their contents along. A directory with a skipped or
/// redirected entry somewhere below it is not planned itself, so its
/// remaining contents are linked one by one instead of through it.
pub fn plan_with(profile_dir: &Path, router: &Router) -> Result<Vec<LinkInfo>, LinkError> {
    let traversal = |source| LinkError::Traversal {
        path: profile_dir.to_path_buf(),
        source,
    };

    let mut planned: Vec<(PathBuf, bool, LinkInfo)> = Vec::new();
    let mut split: HashSet<PathBuf> = HashSet::new();
    let mut redirected: Vec<(PathBuf, PathBuf)> = Vec::new();

    let mut walker = WalkDir::new(profile_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_reserved(e.file_name()));

    // A missing or unreadable root is yielded as an error even with min_depth(1)
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(traversal)?;
        let Ok(rel) = entry.path().strip_prefix(profile_dir) else {
            continue;
        };
        let rel = rel.to_path_buf();
        let is_dir = entry.file_type().is_dir();

        let dest = match router.route(&rel, is_dir) {
            Route::Skip => {
                trace!(entry = %rel.display(), "skipped by mapping");
                mark_ancestors(&rel, &mut split);
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
            Route::To(dest) => {
                mark_ancestors(&rel, &mut split);
                if is_dir {
                    redirected.push((rel.clone(), dest.clone()));
                }
                dest
            }
            Route::Default => redirected
                .iter()
                .rev()
                .find_map(|(dir, dest)| rel.strip_prefix(dir).ok().map(|rest| dest.join(rest)))
                .unwrap_or_else(|| router.target_dir().join(&rel)),
        };

        let link = LinkInfo {
            source: entry.path().to_path_buf(),
            dest,
        };
        trace!(source = %link.source.display(), dest = %link.dest.display(), "planned");
        planned.push((rel, is_dir, link));
    }

    let links: Vec<LinkInfo> = planned
        .into_iter()
        .filter(|(rel, is_dir, _)| !(*is_dir && split.contains(rel)))
        .map(|(_, _, link)| link)
        .collect();

    debug!(profile = %profile_dir.display(), count = links.len(), "link plan computed");
    Ok(links)
}

/// Record every proper ancestor of `rel` as a directory that must not be linked whole
fn mark_ancestors(rel: &Path, split: &mut HashSet<PathBuf>) {
    for ancestor in rel.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        split.insert(ancestor.to_path_buf());
    }
}
