//! Profile directories.
//!
//! A profile is a named directory under `<base>/profiles/`. Creating and
//! filling profiles happens outside dotprof; this module lists, validates,
//! and deletes them.

use anyhow::Result;
use std::fs;
use tracing::debug;

use crate::error::LinkError;
use crate::paths::Paths;

const MAX_NAME_LEN: usize = 64;

/// List available profiles
pub fn list_profiles(paths: &Paths) -> Result<Vec<String>> {
    let mut profiles = Vec::new();
    if paths.profiles_dir.exists() {
        for entry in fs::read_dir(&paths.profiles_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                profiles.push(name.to_string());
            }
        }
    }
    profiles.sort();
    Ok(profiles)
}

/// Check if a profile exists
pub fn profile_exists(paths: &Paths, name: &str) -> bool {
    paths.profile_dir(name).is_dir()
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens, so a name
/// can never escape the profiles directory.
pub fn validate_profile_name(name: &str) -> Result<(), LinkError> {
    let invalid = |reason| LinkError::InvalidProfileName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("name cannot be longer than 64 characters"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "only alphanumeric characters, hyphens (-), and underscores (_) are allowed",
        ));
    }

    Ok(())
}

/// Validate `name` and require its directory to exist
pub fn require_profile(paths: &Paths, name: &str) -> Result<(), LinkError> {
    validate_profile_name(name)?;
    if !profile_exists(paths, name) {
        return Err(LinkError::ProfileNotFound(name.to_string()));
    }
    Ok(())
}

/// Recursively delete a profile's directory
pub fn delete_profile_dir(paths: &Paths, name: &str) -> Result<(), LinkError> {
    let profile_dir = paths.profile_dir(name);
    debug!(path = %profile_dir.display(), "removing profile directory");

    fs::remove_dir_all(&profile_dir).map_err(|source| LinkError::DirectoryDelete {
        path: profile_dir,
        source,
    })
}
