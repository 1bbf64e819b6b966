use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Overrides the dotprof base directory
pub const DIR_ENV: &str = "DOTPROF_DIR";
/// Overrides the directory profiles are linked into
pub const HOME_ENV: &str = "DOTPROF_HOME";

/// All computed paths used by dotprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// $DOTPROF_DIR, $XDG_CONFIG_HOME/dotprof or ~/.config/dotprof
    pub base_dir: PathBuf,
    /// <base>/profiles
    pub profiles_dir: PathBuf,
    /// <base>/backups
    pub backups_dir: PathBuf,
    /// <base>/state.json
    pub state_file: PathBuf,
    /// Where profile links are projected, normally ~
    pub home_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;

        let home_dir = env_path(HOME_ENV).unwrap_or_else(|| base_dirs.home_dir().to_path_buf());
        let base_dir = env_path(DIR_ENV).unwrap_or_else(|| {
            env_path("XDG_CONFIG_HOME")
                .unwrap_or_else(|| base_dirs.home_dir().join(".config"))
                .join("dotprof")
        });

        Ok(Self::with_dirs(base_dir, home_dir))
    }

    /// Build the layout from an explicit base and home directory
    pub fn with_dirs(base_dir: PathBuf, home_dir: PathBuf) -> Self {
        Self {
            profiles_dir: base_dir.join("profiles"),
            backups_dir: base_dir.join("backups"),
            state_file: base_dir.join("state.json"),
            base_dir,
            home_dir,
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    /// Name of the profile a path inside the profiles directory belongs to
    pub fn owning_profile<'a>(&self, path: &'a Path) -> Option<&'a str> {
        path.strip_prefix(&self.profiles_dir)
            .ok()
            .and_then(|p| p.components().next())
            .and_then(|c| c.as_os_str().to_str())
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.profiles_dir).with_context(|| {
            format!(
                "Failed to create profiles directory: {:?}",
                self.profiles_dir
            )
        })?;
        std::fs::create_dir_all(&self.backups_dir).with_context(|| {
            format!("Failed to create backups directory: {:?}", self.backups_dir)
        })?;
        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_profile_dir_path() {
        let paths = Paths::with_dirs(PathBuf::from("/cfg/dotprof"), PathBuf::from("/home/u"));
        assert_eq!(paths.profile_dir("work"), PathBuf::from("/cfg/dotprof/profiles/work"));
        assert_eq!(paths.state_file, PathBuf::from("/cfg/dotprof/state.json"));
    }

    #[test]
    fn test_owning_profile() {
        let paths = Paths::with_dirs(PathBuf::from("/cfg/dotprof"), PathBuf::from("/home/u"));
        let target = paths.profile_dir("home").join(".config/nvim/init.vim");
        assert_eq!(paths.owning_profile(&target), Some("home"));
        assert_eq!(paths.owning_profile(Path::new("/etc/vimrc")), None);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base");
        let home = temp.path().join("home");
        unsafe {
            std::env::set_var(DIR_ENV, &base);
            std::env::set_var(HOME_ENV, &home);
        }

        let paths = Paths::new().unwrap();

        unsafe {
            std::env::remove_var(DIR_ENV);
            std::env::remove_var(HOME_ENV);
        }
        assert_eq!(paths.base_dir, base);
        assert_eq!(paths.home_dir, home);
        assert_eq!(paths.profiles_dir, base.join("profiles"));
    }

    #[test]
    #[serial]
    fn test_xdg_config_home_fallback() {
        let temp = TempDir::new().unwrap();
        let previous = std::env::var_os("XDG_CONFIG_HOME");
        unsafe {
            std::env::remove_var(DIR_ENV);
            std::env::set_var("XDG_CONFIG_HOME", temp.path());
        }

        let paths = Paths::new().unwrap();

        unsafe {
            match previous {
                Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }
        assert_eq!(paths.base_dir, temp.path().join("dotprof"));
    }
}
