//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs` and
//! coordinates `crate::switch` (the operations), `crate::state`, and
//! `crate::ui` (everything the user sees).

use anyhow::{Result, bail};
use comfy_table::Color;

use crate::doctor::run_doctor;
use crate::paths::Paths;
use crate::profiles::list_profiles;
use crate::reconciler::{InstallSummary, LinkHealth, Options, inspect};
use crate::state::State;
use crate::switch::{plan_profile, relink_current, remove_profile, switch_to_profile};
use crate::ui::Ui;

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui) -> Result<()> {
    let profiles = list_profiles(paths)?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println(format!(
            "Create a directory under {} to add one.",
            paths.profiles_dir.display()
        ));
        return Ok(());
    }

    let state = State::load(&paths.state_file).unwrap_or_default();

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Entries"),
        ui.header_cell("Status"),
    ]);

    for name in &profiles {
        let is_active = state.is_active(name);
        let entries = plan_profile(paths, name)
            .map(|links| links.len().to_string())
            .unwrap_or_else(|_| "?".to_string());

        table.add_row(vec![
            ui.cell(if is_active { ui.icon_ok() } else { " " }),
            ui.cell(name),
            ui.cell(entries),
            if is_active {
                ui.colored_cell("active", Color::Green)
            } else {
                ui.cell("-")
            },
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Show the current profile and how many of its links are in place
pub fn current(paths: &Paths, ui: &Ui) -> Result<()> {
    let state = State::load(&paths.state_file).unwrap_or_default();

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.table();
    let Some(active) = &state.active else {
        table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        ui.println(table.to_string());
        return Ok(());
    };
    let name = active.name.as_str();

    table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(name)]);
    table.add_row(vec![
        ui.cell("Last linked:"),
        ui.cell(active.linked_at.format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);
    table.add_row(vec![ui.cell("Source:"), ui.cell(active.root.display().to_string())]);
    table.add_row(vec![ui.cell("Home:"), ui.cell(paths.home_dir.display().to_string())]);

    match plan_profile(paths, name) {
        Ok(links) => {
            let health = inspect(&links);
            let in_place = health
                .iter()
                .filter(|h| {
                    matches!(
                        h,
                        LinkHealth::Linked | LinkHealth::ViaParent | LinkHealth::Merged
                    )
                })
                .count();
            let links_cell = if in_place == links.len() {
                ui.colored_cell(format!("{}/{} in place", in_place, links.len()), Color::Green)
            } else {
                ui.colored_cell(format!("{}/{} in place", in_place, links.len()), Color::Yellow)
            };
            table.add_row(vec![ui.cell("Links:"), links_cell]);
            if links.len() != active.links {
                table.add_row(vec![
                    ui.cell(""),
                    ui.colored_cell(
                        format!(
                            "{} entries when linked, {} now; run 'dotprof link'",
                            active.links,
                            links.len()
                        ),
                        Color::Yellow,
                    ),
                ]);
            }
        }
        Err(e) => {
            table.add_row(vec![
                ui.cell("Links:"),
                ui.colored_cell(e.to_string(), Color::Red),
            ]);
        }
    }

    ui.println(table.to_string());
    Ok(())
}

/// Show the link plan for a profile and the state of each destination
pub fn show_plan(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let links = plan_profile(paths, name)?;

    ui.section(format!("Plan for '{}' into {}", name, paths.home_dir.display()));
    ui.newline();

    if links.is_empty() {
        ui.warn("Profile is empty.");
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Destination"),
        ui.header_cell("Source"),
        ui.header_cell("Status"),
    ]);

    let profile_dir = paths.profile_dir(name);
    for (link, health) in links.iter().zip(inspect(&links)) {
        let source = link.source.strip_prefix(&profile_dir).unwrap_or(&link.source);
        table.add_row(vec![
            ui.cell(link.display_dest(&paths.home_dir)),
            ui.cell(source.display().to_string()),
            ui.health_cell(&health),
        ]);
    }

    ui.println(table.to_string());
    Ok(())
}

fn print_install_summary(ui: &Ui, summary: &InstallSummary) {
    if summary.skipped > 0 {
        ui.warn(format!(
            "{} destination(s) hold real files. Re-run with --overwrite to replace them (a backup is kept).",
            summary.skipped
        ));
    }
    ui.println(ui.dim(format!(
        "{} linked, {} relinked, {} unchanged, {} backed up",
        summary.linked, summary.relinked, summary.unchanged, summary.backed_up
    )));
}

/// Switch to a profile
pub fn use_profile(paths: &Paths, name: &str, opts: &Options, ui: &Ui) -> Result<()> {
    paths.ensure_dirs()?;

    // Reported actions would be interleaved with the spinner
    let spinner = if opts.dry_run || opts.verbose {
        None
    } else {
        Some(ui.spinner(format!("Switching to profile '{}'...", name)))
    };

    let mut reporter = ui.clone();
    let result = switch_to_profile(paths, name, opts, &mut reporter);

    match (&result, &spinner) {
        (Ok(_), Some(pb)) => ui.spinner_finish(pb, true, format!("Active profile: {}", name)),
        (Err(e), Some(pb)) => ui.spinner_finish(pb, false, format!("Failed to switch: {}", e)),
        (Ok(_), None) if opts.dry_run => ui.info(format!("Dry run: '{}' was not activated", name)),
        (Ok(_), None) => ui.ok(format!("Active profile: {}", name)),
        (Err(_), None) => {}
    }

    let summary = result?;
    if let Some(previous) = &summary.previous {
        ui.println(ui.dim(format!(
            "Unlinked '{}': {} removed, {} kept",
            previous, summary.unlinked.removed, summary.unlinked.kept
        )));
    }
    print_install_summary(ui, &summary.linked);
    Ok(())
}

/// Re-link the current profile
pub fn link(paths: &Paths, opts: &Options, ui: &Ui) -> Result<()> {
    let mut reporter = ui.clone();
    let (name, summary) = relink_current(paths, opts, &mut reporter)?;
    ui.ok(format!("Linked profile '{}'", name));
    print_install_summary(ui, &summary);
    Ok(())
}

/// Remove a profile and the links that still point into it
pub fn remove(paths: &Paths, name: &str, opts: &Options, ui: &Ui) -> Result<()> {
    let mut reporter = ui.clone();
    let summary = remove_profile(paths, name, opts, &mut reporter)?;

    if opts.dry_run {
        ui.info(format!(
            "Dry run: '{}' was not removed ({} link(s) would be removed)",
            name, summary.removed
        ));
        return Ok(());
    }

    ui.ok(format!("Removed profile '{}'", name));
    ui.println(ui.dim(format!(
        "{} link(s) removed, {} kept by another profile",
        summary.removed, summary.kept
    )));
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if run_doctor(paths, ui) {
        Ok(())
    } else {
        bail!("doctor found problems");
    }
}
