//! Per-profile link routing.
//!
//! A profile may carry a `.dotprof.json` at its root:
//!
//! ```json
//! {
//!   "target_dir": "~",
//!   "mappings": [
//!     { "match": "^\\.config/secrets/", "skip": true },
//!     { "match": "^bin/$", "target_dir": "~/.local" },
//!     { "match": "^\\.vimrc$", "dest": ".config/vim/vimrc", "target_os": ["linux", "macos"] }
//!   ]
//! }
//! ```
//!
//! Patterns are regular expressions matched against the entry's path
//! relative to the profile root, `/`-separated, with a trailing `/` for
//! directories. When several mappings match, the last one wins. Mappings
//! with a `target_os` only apply on those operating systems.

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::LinkError;

/// Name of the per-profile config file, relative to the profile root
pub const CONFIG_FILE: &str = ".dotprof.json";

/// Contents of a profile's `.dotprof.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    /// Where links are projected instead of the home directory
    #[serde(default)]
    pub target_dir: Option<PathBuf>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    #[serde(rename = "match")]
    pub pattern: String,
    /// Leave matching entries unlinked
    #[serde(default)]
    pub skip: bool,
    /// Link the matching entry at exactly this path. Relative paths resolve
    /// against the profile's target directory.
    #[serde(default)]
    pub dest: Option<PathBuf>,
    /// Link the matching entry at the same relative path under this directory
    #[serde(default)]
    pub target_dir: Option<PathBuf>,
    #[serde(default)]
    pub target_os: Option<TargetOs>,
}

/// One OS name or a list of them, as in `"linux"` or `["linux", "macos"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetOs {
    One(String),
    Many(Vec<String>),
}

impl TargetOs {
    fn includes(&self, os: &str) -> bool {
        match self {
            Self::One(name) => os_eq(name, os),
            Self::Many(names) => names.iter().any(|name| os_eq(name, os)),
        }
    }
}

/// Compare a configured OS name with `std::env::consts::OS`
fn os_eq(configured: &str, os: &str) -> bool {
    let configured = configured.to_ascii_lowercase();
    configured == os || (configured == "darwin" && os == "macos")
}

impl ProfileConfig {
    /// Read `<profile_dir>/.dotprof.json`; a profile without one gets the defaults
    pub fn load(profile_dir: &Path) -> Result<Self, LinkError> {
        let path = profile_dir.join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(LinkError::ConfigRead { path, source }),
        };

        let config: Self = serde_json::from_str(&content)
            .map_err(|source| LinkError::ConfigParse { path: path.clone(), source })?;
        debug!(path = %path.display(), mappings = config.mappings.len(), "loaded profile config");
        Ok(config)
    }
}

/// Where a single profile entry goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The usual place under the target directory
    Default,
    Skip,
    To(PathBuf),
}

#[derive(Debug)]
enum Action {
    Keep,
    Skip,
    Dest(PathBuf),
    TargetDir(PathBuf),
}

#[derive(Debug)]
struct Mapping {
    regex: Regex,
    action: Action,
}

/// A profile's mappings compiled for one home directory and OS
#[derive(Debug)]
pub struct Router {
    target_dir: PathBuf,
    mappings: Vec<Mapping>,
}

impl Router {
    /// Compile `config`, dropping mappings meant for other operating systems
    pub fn new(config: &ProfileConfig, home_dir: &Path, os: &str) -> Result<Self, LinkError> {
        let target_dir = config
            .target_dir
            .as_deref()
            .map_or_else(|| home_dir.to_path_buf(), |dir| expand(dir, home_dir, home_dir));

        let mut mappings = Vec::with_capacity(config.mappings.len() + 1);
        for mapping in &config.mappings {
            if mapping.target_os.as_ref().is_some_and(|t| !t.includes(os)) {
                continue;
            }
            let regex = Regex::new(&mapping.pattern).map_err(|source| {
                LinkError::InvalidMapping {
                    pattern: mapping.pattern.clone(),
                    source,
                }
            })?;
            let action = if mapping.skip {
                Action::Skip
            } else if let Some(dest) = &mapping.dest {
                Action::Dest(expand(dest, home_dir, &target_dir))
            } else if let Some(dir) = &mapping.target_dir {
                Action::TargetDir(expand(dir, home_dir, home_dir))
            } else {
                Action::Keep
            };
            mappings.push(Mapping { regex, action });
        }

        // `.gitignore` is reserved for the profile repository itself
        let gitignore = Regex::new(r"(^|/)\.ggitignore$").map_err(|source| {
            LinkError::InvalidMapping {
                pattern: ".ggitignore".to_string(),
                source,
            }
        })?;
        mappings.push(Mapping {
            regex: gitignore,
            action: Action::Dest(target_dir.join(".gitignore")),
        });

        Ok(Self {
            target_dir,
            mappings,
        })
    }

    /// Routing with no configured mappings
    pub fn plain(home_dir: &Path) -> Result<Self, LinkError> {
        Self::new(&ProfileConfig::default(), home_dir, std::env::consts::OS)
    }

    /// The directory entries are projected into by default
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Route the entry at `rel` (relative to the profile root)
    pub fn route(&self, rel: &Path, is_dir: bool) -> Route {
        let key = match_key(rel, is_dir);
        let Some(mapping) = self.mappings.iter().rev().find(|m| m.regex.is_match(&key)) else {
            return Route::Default;
        };
        match &mapping.action {
            Action::Keep => Route::Default,
            Action::Skip => Route::Skip,
            Action::Dest(dest) => Route::To(dest.clone()),
            Action::TargetDir(dir) => Route::To(dir.join(rel)),
        }
    }
}

fn match_key(rel: &Path, is_dir: bool) -> String {
    let mut key = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if is_dir {
        key.push('/');
    }
    key
}

/// Resolve a configured path: `~` is the home directory, relative paths sit under `base`
fn expand(path: &Path, home_dir: &Path, base: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if rest.as_os_str().is_empty() {
            home_dir.to_path_buf()
        } else {
            home_dir.join(rest)
        }
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
