//! Link reconciliation.
//!
//! Applies a link plan to the filesystem: [`install`] makes the planned
//! links exist, [`remove_profile_links`] tears down the links that still
//! belong to a profile. The symlink at each destination is the only record
//! of which profile owns that path, so removal inspects it before touching
//! anything and leaves links that another profile has since taken over.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

use crate::backup::backup_existing;
use crate::error::LinkError;
use crate::planner::LinkInfo;

/// How removal decides that a link belongs to the profile being removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ownership {
    /// The link target lies inside the profile's root directory
    #[default]
    Prefix,
    /// The link target contains the profile name anywhere in its path.
    /// Matches links created by older tools, but a short name can match
    /// unrelated paths.
    NameSubstring,
}

/// Invocation mode for the reconciler
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Report planned mutations without performing them
    pub dry_run: bool,
    /// Report mutations as they are performed
    pub verbose: bool,
    /// Replace real files that occupy a link destination
    pub overwrite: bool,
    pub ownership: Ownership,
    /// Where replaced files are copied before being removed; no backup if unset
    pub backups_dir: Option<PathBuf>,
}

impl Options {
    fn reports(&self) -> bool {
        self.dry_run || self.verbose
    }
}

/// The profile a removal acts on
#[derive(Debug, Clone, Copy)]
pub struct ProfileRef<'a> {
    pub name: &'a str,
    pub root: &'a Path,
}

impl ProfileRef<'_> {
    /// Whether the symlink at `dest`, pointing at `target`, belongs to this profile
    pub fn owns(&self, dest: &Path, target: &Path, ownership: Ownership) -> bool {
        match ownership {
            Ownership::NameSubstring => target.to_string_lossy().contains(self.name),
            Ownership::Prefix => {
                let resolved = if target.is_absolute() {
                    normalize(target)
                } else {
                    normalize(&dest.parent().unwrap_or(Path::new("")).join(target))
                };
                resolved.starts_with(normalize(self.root))
            }
        }
    }
}

/// Lexically resolve `.` and `..` components. The target of a dangling link
/// cannot be canonicalized, so this never touches the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// What currently occupies a link destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Nothing exists at the path
    Missing,
    /// A regular file or directory, not a symlink
    NotALink { is_dir: bool },
    /// A symlink whose target cannot be read
    Broken,
    /// A symlink whose target does not exist
    Dangling { target: PathBuf },
    /// A symlink to an existing path
    Valid { target: PathBuf },
}

impl LinkStatus {
    pub fn detect(path: &Path) -> Self {
        // symlink_metadata does not follow the final component
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                return Self::Missing;
            }
            Err(_) => return Self::Broken,
        };

        if !meta.file_type().is_symlink() {
            return Self::NotALink {
                is_dir: meta.is_dir(),
            };
        }

        match fs::read_link(path) {
            Ok(target) if path.exists() => Self::Valid { target },
            Ok(target) => Self::Dangling { target },
            Err(_) => Self::Broken,
        }
    }
}

/// A single step taken (or, in dry-run mode, planned) by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// A new link was created
    Linked { source: PathBuf, dest: PathBuf },
    /// An existing symlink was pointed at a new source
    Relinked {
        source: PathBuf,
        dest: PathBuf,
        previous: Option<PathBuf>,
    },
    /// The link already points at the planned source
    Unchanged { dest: PathBuf },
    /// A real file was copied aside before being replaced
    BackedUp { path: PathBuf, backup: PathBuf },
    /// A real file or directory blocks the destination and was left alone
    Skipped { dest: PathBuf },
    /// A link owned by the removed profile, or a broken one, was deleted
    Removed { dest: PathBuf },
    /// A link now owned by another profile was left alone
    Kept { dest: PathBuf, target: PathBuf },
    /// The profile's directory was deleted
    ProfileDeleted { path: PathBuf },
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linked { source, dest } => {
                write!(f, "Linking {} -> {}", dest.display(), source.display())
            }
            Self::Relinked {
                source,
                dest,
                previous: Some(previous),
            } => write!(
                f,
                "Relinking {} -> {} (was {})",
                dest.display(),
                source.display(),
                previous.display()
            ),
            Self::Relinked { source, dest, .. } => {
                write!(f, "Relinking {} -> {}", dest.display(), source.display())
            }
            Self::Unchanged { dest } => write!(f, "Already linked {}", dest.display()),
            Self::BackedUp { path, backup } => {
                write!(f, "Backed up {} to {}", path.display(), backup.display())
            }
            Self::Skipped { dest } => write!(
                f,
                "{} exists and is not a symlink, refusing to replace it",
                dest.display()
            ),
            Self::Removed { dest } => write!(f, "Removing symlink {}", dest.display()),
            Self::Kept { dest, target } => write!(
                f,
                "Keeping {} (now points to {})",
                dest.display(),
                target.display()
            ),
            Self::ProfileDeleted { path } => {
                write!(f, "Removed profile directory {}", path.display())
            }
        }
    }
}

/// Receives the actions the reconciler reports
pub trait Reporter {
    fn report(&mut self, action: &LinkAction, dry_run: bool);
}

impl Reporter for Vec<LinkAction> {
    fn report(&mut self, action: &LinkAction, _dry_run: bool) {
        self.push(action.clone());
    }
}

/// How a planned link compares to what is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkHealth {
    /// The symlink points at the planned source
    Linked,
    /// Reached through a linked parent directory
    ViaParent,
    /// A real directory whose contents are linked individually
    Merged,
    Missing,
    /// A symlink pointing somewhere else, usually another profile
    Elsewhere { target: PathBuf },
    /// A symlink whose target is gone or unreadable
    Dangling,
    /// A real file occupies the destination
    Blocked,
}

/// Compare every planned link against the filesystem without changing anything
pub fn inspect(links: &[LinkInfo]) -> Vec<LinkHealth> {
    let mut covered = Covered::default();
    links
        .iter()
        .map(|link| {
            if covered.contains(&link.dest) {
                return LinkHealth::ViaParent;
            }
            match LinkStatus::detect(&link.dest) {
                LinkStatus::Valid { target } if target == link.source => {
                    covered.push(&link.dest);
                    LinkHealth::Linked
                }
                LinkStatus::Valid { target } => LinkHealth::Elsewhere { target },
                LinkStatus::Dangling { .. } | LinkStatus::Broken => LinkHealth::Dangling,
                LinkStatus::Missing => LinkHealth::Missing,
                LinkStatus::NotALink { is_dir: true } if link.source.is_dir() => {
                    LinkHealth::Merged
                }
                LinkStatus::NotALink { .. } => LinkHealth::Blocked,
            }
        })
        .collect()
}

/// Counts of what [`install`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub linked: usize,
    pub relinked: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub backed_up: usize,
}

/// Counts of what [`remove_profile_links`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub removed: usize,
    pub kept: usize,
    pub skipped: usize,
    pub absent: usize,
}

/// Destinations linked (or removed) earlier in this run. Planned entries
/// below one of them resolve through that link and must not be touched.
#[derive(Debug, Default)]
struct Covered(Vec<PathBuf>);

impl Covered {
    fn contains(&self, dest: &Path) -> bool {
        self.0.iter().any(|c| dest.starts_with(c))
    }

    fn push(&mut self, dest: &Path) {
        self.0.push(dest.to_path_buf());
    }
}

fn emit(reporter: &mut dyn Reporter, opts: &Options, action: LinkAction) {
    debug!(dry_run = opts.dry_run, "{action}");
    if opts.reports() {
        reporter.report(&action, opts.dry_run);
    }
}

/// Make every planned link exist.
///
/// Existing symlinks are repointed, real directories that mirror a profile
/// directory are descended into, and real files are only replaced (after a
/// backup) when [`Options::overwrite`] is set.
///
/// # Errors
/// Stops at the first link that cannot be created or cleared.
pub fn install(
    links: &[LinkInfo],
    opts: &Options,
    reporter: &mut dyn Reporter,
) -> Result<InstallSummary, LinkError> {
    let mut summary = InstallSummary::default();
    let mut covered = Covered::default();

    for link in links {
        if covered.contains(&link.dest) {
            trace!(dest = %link.dest.display(), "covered by a parent link");
            continue;
        }

        let previous = match LinkStatus::detect(&link.dest) {
            LinkStatus::Missing => None,
            LinkStatus::Valid { target } if target == link.source => {
                summary.unchanged += 1;
                emit(reporter, opts, LinkAction::Unchanged {
                    dest: link.dest.clone(),
                });
                covered.push(&link.dest);
                continue;
            }
            LinkStatus::Valid { target } | LinkStatus::Dangling { target } => {
                if !opts.dry_run {
                    remove_link(&link.dest)?;
                }
                Some(Some(target))
            }
            LinkStatus::Broken => {
                if !opts.dry_run {
                    remove_link(&link.dest)?;
                }
                Some(None)
            }
            LinkStatus::NotALink { is_dir: true } if link.source.is_dir() => {
                trace!(dest = %link.dest.display(), "linking directory contents");
                continue;
            }
            LinkStatus::NotALink { is_dir } => {
                if !opts.overwrite {
                    summary.skipped += 1;
                    debug!(dest = %link.dest.display(), "destination is not a symlink, skipping");
                    reporter.report(
                        &LinkAction::Skipped {
                            dest: link.dest.clone(),
                        },
                        opts.dry_run,
                    );
                    continue;
                }
                if !opts.dry_run {
                    if let Some(backups_dir) = &opts.backups_dir {
                        let backup = backup_existing(&link.dest, backups_dir)?;
                        summary.backed_up += 1;
                        emit(reporter, opts, LinkAction::BackedUp {
                            path: link.dest.clone(),
                            backup,
                        });
                    }
                    remove_entry(&link.dest, is_dir)?;
                }
                None
            }
        };

        if !opts.dry_run {
            make_symlink(&link.source, &link.dest)?;
        }
        covered.push(&link.dest);

        let action = match previous {
            None => {
                summary.linked += 1;
                LinkAction::Linked {
                    source: link.source.clone(),
                    dest: link.dest.clone(),
                }
            }
            Some(previous) => {
                summary.relinked += 1;
                LinkAction::Relinked {
                    source: link.source.clone(),
                    dest: link.dest.clone(),
                    previous,
                }
            }
        };
        emit(reporter, opts, action);
    }

    Ok(summary)
}

/// Remove the planned links that still belong to `owner`.
///
/// A destination is removed when its symlink is broken or dangling, or when
/// it still points into `owner`. Links that now point into another profile,
/// real files, and already-missing paths are left as they are, so running
/// this twice is harmless.
///
/// # Errors
/// Returns [`LinkError::LinkDelete`] for the first link that cannot be
/// deleted; links removed before it stay removed.
pub fn remove_profile_links(
    links: &[LinkInfo],
    owner: ProfileRef<'_>,
    opts: &Options,
    reporter: &mut dyn Reporter,
) -> Result<RemovalSummary, LinkError> {
    let mut summary = RemovalSummary::default();
    let mut covered = Covered::default();

    for link in links {
        if covered.contains(&link.dest) {
            continue;
        }

        match LinkStatus::detect(&link.dest) {
            LinkStatus::Missing => {
                summary.absent += 1;
                trace!(dest = %link.dest.display(), "already absent");
            }
            LinkStatus::NotALink { is_dir: true } => {
                trace!(dest = %link.dest.display(), "real directory, checking contents");
            }
            LinkStatus::NotALink { is_dir: false } => {
                summary.skipped += 1;
                emit(reporter, opts, LinkAction::Skipped {
                    dest: link.dest.clone(),
                });
            }
            LinkStatus::Valid { target } if !owner.owns(&link.dest, &target, opts.ownership) => {
                summary.kept += 1;
                emit(reporter, opts, LinkAction::Kept {
                    dest: link.dest.clone(),
                    target,
                });
                // Entries below resolve into the other profile's tree
                covered.push(&link.dest);
            }
            LinkStatus::Valid { .. } | LinkStatus::Dangling { .. } | LinkStatus::Broken => {
                emit(reporter, opts, LinkAction::Removed {
                    dest: link.dest.clone(),
                });
                if !opts.dry_run {
                    remove_link(&link.dest)?;
                }
                covered.push(&link.dest);
                summary.removed += 1;
            }
        }
    }

    Ok(summary)
}

/// Delete a symlink without following it. Already gone counts as success.
fn remove_link(path: &Path) -> Result<(), LinkError> {
    let result = fs::remove_file(path);

    // Directory symlinks are directories to the Windows API
    #[cfg(windows)]
    let result = result.or_else(|_| fs::remove_dir(path));

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LinkError::LinkDelete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn remove_entry(path: &Path, is_dir: bool) -> Result<(), LinkError> {
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| LinkError::LinkDelete {
        path: path.to_path_buf(),
        source,
    })
}

fn make_symlink(source: &Path, dest: &Path) -> Result<(), LinkError> {
    let to_err = |source_err| LinkError::LinkCreate {
        src: source.to_path_buf(),
        dest: dest.to_path_buf(),
        source: source_err,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(to_err)?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(source, dest).map_err(to_err)?;

    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, dest).map_err(to_err)?;
        } else {
            std::os::windows::fs::symlink_file(source, dest).map_err(to_err)?;
        }
    }

    Ok(())
}
