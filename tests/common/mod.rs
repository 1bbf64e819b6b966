// Shared helpers for integration tests.
//
// Each test gets its own temp directory holding a dotprof base directory and
// a fake home directory, so nothing outside the temp directory is touched.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use dotprof::paths::Paths;
use dotprof::reconciler::LinkAction;
use tempfile::TempDir;

/// An isolated dotprof installation backed by a [`TempDir`].
pub struct TestEnv {
    _temp: TempDir,
    pub paths: Paths,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let paths = Paths::with_dirs(temp.path().join("dotprof"), temp.path().join("home"));
        paths.ensure_dirs().expect("create dotprof dirs");
        fs::create_dir_all(&paths.home_dir).expect("create home dir");
        Self { _temp: temp, paths }
    }

    /// Create profile `name` with the given relative files.
    pub fn profile(&self, name: &str, files: &[&str]) -> PathBuf {
        let root = self.paths.profile_dir(name);
        for rel in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
            fs::write(&path, format!("{name}:{rel}")).expect("write profile file");
        }
        fs::create_dir_all(&root).expect("create profile dir");
        root
    }

    pub fn home(&self, rel: &str) -> PathBuf {
        self.paths.home_dir.join(rel)
    }

    pub fn link_target(&self, rel: &str) -> Option<PathBuf> {
        fs::read_link(self.home(rel)).ok()
    }

    pub fn exists_at(&self, rel: &str) -> bool {
        fs::symlink_metadata(self.home(rel)).is_ok()
    }

    /// Every symlink under the home directory whose target does not exist
    pub fn dangling_links(&self) -> Vec<PathBuf> {
        let mut dangling = Vec::new();
        collect_dangling(&self.paths.home_dir, &mut dangling);
        dangling
    }
}

fn collect_dangling(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = fs::symlink_metadata(&path) else {
            continue;
        };
        if meta.file_type().is_symlink() {
            if !path.exists() {
                out.push(path);
            }
        } else if meta.is_dir() {
            collect_dangling(&path, out);
        }
    }
}

/// Drop write permission on `dir`. Returns false, leaving `dir` writable,
/// when the permission is not enforced for this process (e.g. root).
#[cfg(unix)]
pub fn make_read_only(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).expect("chmod 555");
    let check = dir.join(".write-check");
    if fs::write(&check, "").is_ok() {
        let _ = fs::remove_file(&check);
        make_writable(dir);
        return false;
    }
    true
}

#[cfg(unix)]
pub fn make_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).expect("chmod 755");
}

pub fn sink() -> Vec<LinkAction> {
    Vec::new()
}
