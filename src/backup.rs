//! Safety copies of files that a profile link is about to replace.
//!
//! Backups are named `<file-name>.<timestamp>.bak` and rotated per file name.

use chrono::{NaiveDateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::LinkError;

/// Number of backups to keep per file name
pub const MAX_BACKUPS: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%.3f";

/// Copy `path` (file or directory) into `backups_dir`, returning the backup path.
pub fn backup_existing(path: &Path, backups_dir: &Path) -> Result<PathBuf, LinkError> {
    let to_err = |source| LinkError::Backup {
        path: path.to_path_buf(),
        source,
    };

    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());

    fs::create_dir_all(backups_dir).map_err(to_err)?;

    let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
    let backup_path = backups_dir.join(format!("{prefix}.{timestamp}.bak"));

    if path.is_dir() {
        copy_dir_recursive(path, &backup_path).map_err(to_err)?;
    } else {
        fs::copy(path, &backup_path).map_err(to_err)?;
    }
    debug!(from = %path.display(), to = %backup_path.display(), "backed up");

    cleanup_old_backups(backups_dir, &prefix, &backup_path).map_err(to_err)?;
    Ok(backup_path)
}

/// Recursively copy a directory and all its contents to a new location.
///
/// Symlinks inside `src` are recreated as symlinks, dangling ones included.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;

    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, dst)?;

    #[cfg(windows)]
    {
        if src.is_dir() {
            std::os::windows::fs::symlink_dir(&target, dst)?;
        } else {
            std::os::windows::fs::symlink_file(&target, dst)?;
        }
    }

    Ok(())
}

/// Whether `file_name` is a backup of an entry named `prefix`
fn is_backup_of(file_name: &str, prefix: &str) -> bool {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(".bak"))
        .is_some_and(|stamp| NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok())
}

fn cleanup_old_backups(backups_dir: &Path, prefix: &str, fresh: &Path) -> io::Result<()> {
    let mut backups: Vec<_> = fs::read_dir(backups_dir)?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| is_backup_of(n, prefix))
        })
        .collect();

    if backups.len() <= MAX_BACKUPS {
        return Ok(());
    }

    // Timestamped names sort oldest first
    backups.sort_by_key(|b| b.file_name());

    let to_remove = backups.len() - MAX_BACKUPS;
    for entry in backups.iter().take(to_remove) {
        let path = entry.path();
        if path == fresh {
            continue;
        }
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!(path = %path.display(), "rotated out old backup");
    }

    Ok(())
}
