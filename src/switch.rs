//! Profile switching and removal.
//!
//! This module composes the planner, the reconciler, and the state file into
//! the operations the CLI exposes:
//! - Switching: unlink the previous profile, link the new one, record it.
//! - Removing: delete the profile directory, then prune the links that still
//!   point into it.
//! - Relinking the current profile.

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::error::LinkError;
use crate::paths::Paths;
use crate::planner::{LinkInfo, plan};
use crate::profiles::{delete_profile_dir, require_profile};
use crate::reconciler::{
    InstallSummary, LinkAction, Options, ProfileRef, RemovalSummary, Reporter, install,
    remove_profile_links,
};
use crate::state::{self, ActiveProfile, State};

/// What a switch did to each profile involved
#[derive(Debug, Clone, Default)]
pub struct SwitchSummary {
    /// The profile that was current before the switch, if it was unlinked
    pub previous: Option<String>,
    pub unlinked: RemovalSummary,
    pub linked: InstallSummary,
}

/// Plan the links for profile `name` into the configured home directory
pub fn plan_profile(paths: &Paths, name: &str) -> Result<Vec<LinkInfo>, LinkError> {
    require_profile(paths, name)?;
    plan(&paths.profile_dir(name), &paths.home_dir)
}

/// Switch to a specific profile
pub fn switch_to_profile(
    paths: &Paths,
    name: &str,
    opts: &Options,
    reporter: &mut dyn Reporter,
) -> Result<SwitchSummary> {
    let links = plan_profile(paths, name)?;
    let state = State::load(&paths.state_file)?;
    let mut summary = SwitchSummary::default();

    // 1. Drop links still owned by the previous profile
    if let Some(previous) = &state.active
        && previous.name != name
        && previous.root.is_dir()
    {
        let previous_links = plan(&previous.root, &paths.home_dir)?;
        let owner = ProfileRef {
            name: &previous.name,
            root: &previous.root,
        };
        summary.unlinked = remove_profile_links(&previous_links, owner, opts, reporter)
            .with_context(|| format!("Failed to unlink profile '{}'", previous.name))?;
        summary.previous = Some(previous.name.clone());
    }

    // 2. Link the new profile
    summary.linked = install(&links, opts, reporter)
        .with_context(|| format!("Failed to link profile '{}'", name))?;

    // 3. Record the new profile
    if !opts.dry_run {
        let record = ActiveProfile::new(name, paths.profile_dir(name), links.len());
        state::update(&paths.state_file, |s| s.active = Some(record))?;
    }

    info!(profile = name, linked = summary.linked.linked, "switched profile");
    Ok(summary)
}

/// Re-link the current profile, e.g. after files were added to it
pub fn relink_current(
    paths: &Paths,
    opts: &Options,
    reporter: &mut dyn Reporter,
) -> Result<(String, InstallSummary)> {
    let state = State::load(&paths.state_file)?;
    let Some(name) = state.active.map(|a| a.name) else {
        bail!("No profile is active.\nHint: Activate one with 'dotprof use <name>'.");
    };

    let links = plan_profile(paths, &name)?;
    let summary = install(&links, opts, reporter)
        .with_context(|| format!("Failed to link profile '{}'", name))?;

    if !opts.dry_run {
        let record = ActiveProfile::new(&name, paths.profile_dir(&name), links.len());
        state::update(&paths.state_file, |s| s.active = Some(record))?;
    }
    Ok((name, summary))
}

/// Remove a profile and the links that still point into it.
///
/// The profile directory is deleted first. If that fails no link has been
/// touched; once it succeeds, links are pruned and the first failure stops
/// the operation with earlier removals kept.
pub fn remove_profile(
    paths: &Paths,
    name: &str,
    opts: &Options,
    reporter: &mut dyn Reporter,
) -> Result<RemovalSummary> {
    // Plan while the directory still exists
    let links = plan_profile(paths, name)?;
    let profile_root = paths.profile_dir(name);

    if opts.dry_run {
        reporter.report(
            &LinkAction::ProfileDeleted {
                path: profile_root.clone(),
            },
            true,
        );
    } else {
        delete_profile_dir(paths, name)?;
        if opts.verbose {
            reporter.report(
                &LinkAction::ProfileDeleted {
                    path: profile_root.clone(),
                },
                false,
            );
        }
    }

    let owner = ProfileRef {
        name,
        root: &profile_root,
    };
    let summary = remove_profile_links(&links, owner, opts, reporter)?;
    debug!(profile = name, ?summary, "pruned profile links");

    if !opts.dry_run {
        state::update(&paths.state_file, |s| {
            if s.is_active(name) {
                s.active = None;
            }
        })?;
    }

    info!(profile = name, removed = summary.removed, "removed profile");
    Ok(summary)
}
