//! Test utilities shared across test modules

use std::fs;
use std::path::PathBuf;

use crate::paths::Paths;
use tempfile::TempDir;

/// Create a Paths struct for testing using a temporary directory
///
/// The base directory lives at `<tmp>/dotprof` and the home directory at
/// `<tmp>/home`, so links never leave the temp directory.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_dirs(temp_dir.path().join("dotprof"), temp_dir.path().join("home"))
}

/// Write `files` (relative path, contents) into a new profile directory
pub fn write_profile(paths: &Paths, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = paths.profile_dir(name);
    fs::create_dir_all(&dir).unwrap();
    for (rel, contents) in files {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}
