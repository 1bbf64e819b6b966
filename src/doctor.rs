//! Diagnostic tool for dotprof.
//!
//! This module implements the `dotprof doctor` command, which checks:
//! - Existence of required directories.
//! - The state file and the profile it names.
//! - Every planned link of the active profile.
//!
//! It reports issues to the user with a pass/fail/warn status.

use crate::paths::Paths;
use crate::profiles::{list_profiles, profile_exists};
use crate::reconciler::{LinkHealth, inspect};
use crate::state::State;
use crate::switch::plan_profile;
use crate::ui::Ui;

/// Run the doctor diagnostics, returning whether every check passed
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("dotprof Doctor");
    ui.newline();

    let mut healthy = true;

    healthy &= check_step(ui, "Directories", || {
        let mut ok = true;
        for (label, dir) in [("Base", &paths.base_dir), ("Profiles", &paths.profiles_dir)] {
            if dir.is_dir() {
                ui.println(format!("  {} {} directory: {}", ui.icon_ok(), label, dir.display()));
            } else {
                ui.println(format!(
                    "  {} {} directory missing: {}",
                    ui.icon_err(),
                    label,
                    dir.display()
                ));
                ok = false;
            }
        }
        if !paths.home_dir.is_dir() {
            ui.println(format!(
                "  {} Home directory missing: {}",
                ui.icon_err(),
                paths.home_dir.display()
            ));
            ok = false;
        }
        ok
    });

    healthy &= check_step(ui, "Profiles", || match list_profiles(paths) {
        Ok(profiles) if profiles.is_empty() => {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            true
        }
        Ok(profiles) => {
            ui.println(format!("  {} {} profile(s): {}", ui.icon_ok(), profiles.len(), profiles.join(", ")));
            true
        }
        Err(e) => {
            ui.println(format!("  {} Failed to list profiles: {}", ui.icon_err(), e));
            false
        }
    });

    let state = match State::load(&paths.state_file) {
        Ok(state) => Some(state),
        Err(e) => {
            ui.println(ui.bold("Checking State File..."));
            ui.println(format!("  {} State file corrupt: {}", ui.icon_err(), e));
            ui.newline();
            healthy = false;
            None
        }
    };

    let Some(active) = state.and_then(|s| s.active) else {
        ui.println(format!("{} No active profile", ui.icon_info()));
        return healthy;
    };
    let current = active.name.as_str();

    healthy &= check_step(ui, "Active Profile", || {
        if !profile_exists(paths, current) {
            ui.println(format!("  {} '{}' is recorded as active but its directory is MISSING", ui.icon_err(), current));
            return false;
        }
        ui.println(format!("  {} '{}' exists", ui.icon_ok(), current));
        let expected = paths.profile_dir(current);
        if active.root != expected {
            ui.println(format!(
                "  {} Linked from {}, now found at {}. Run 'dotprof link' to repair",
                ui.icon_warn(),
                active.root.display(),
                expected.display()
            ));
        }
        true
    });

    healthy &= check_step(ui, "Links", || check_links(paths, current, active.links, ui));

    healthy
}

fn check_links(paths: &Paths, name: &str, recorded: usize, ui: &Ui) -> bool {
    let links = match plan_profile(paths, name) {
        Ok(links) => links,
        Err(e) => {
            ui.println(format!("  {} {}", ui.icon_err(), e));
            return false;
        }
    };

    let mut ok = true;
    let mut in_place = 0;
    for (link, health) in links.iter().zip(inspect(&links)) {
        let dest = link.display_dest(&paths.home_dir);
        match health {
            LinkHealth::Linked | LinkHealth::ViaParent | LinkHealth::Merged => in_place += 1,
            LinkHealth::Missing => {
                ui.println(format!("  {} {} is not linked", ui.icon_warn(), dest));
            }
            LinkHealth::Elsewhere { target } => match paths.owning_profile(&target) {
                Some(owner) => ui.println(format!(
                    "  {} {} is linked by profile '{}'",
                    ui.icon_warn(),
                    dest,
                    owner
                )),
                None => ui.println(format!(
                    "  {} {} points to {}",
                    ui.icon_warn(),
                    dest,
                    target.display()
                )),
            },
            LinkHealth::Dangling => {
                ui.println(format!("  {} {} is a BROKEN symlink", ui.icon_err(), dest));
                ok = false;
            }
            LinkHealth::Blocked => {
                ui.println(format!("  {} {} is a real file, not a link", ui.icon_err(), dest));
                ok = false;
            }
        }
    }

    ui.println(format!("  {} {}/{} planned links in place", ui.icon_info(), in_place, links.len()));
    if recorded != links.len() {
        ui.println(format!(
            "  {} Profile had {} entries when linked and has {} now",
            ui.icon_warn(),
            recorded,
            links.len()
        ));
    }
    if in_place < links.len() || recorded != links.len() {
        ui.println(format!("  {} Run 'dotprof link' to repair", ui.icon_info()));
    }
    ok
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(format!("  {} Issues detected!", ui.icon_err()));
    }
    ui.newline();
    success
}
