// Integration tests for switching between and removing profiles.
#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::symlink;

use common::{TestEnv, make_read_only, make_writable, sink};
use dotprof::error::LinkError;
use dotprof::planner::plan;
use dotprof::reconciler::{LinkAction, Options, Ownership, ProfileRef, remove_profile_links};
use dotprof::state::State;
use dotprof::switch::{remove_profile, switch_to_profile};

fn defaults() -> Options {
    Options::default()
}

#[test]
fn removing_old_profile_keeps_links_taken_over_by_new_profile() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc"]);
    let home = env.profile("home", &[".vimrc"]);

    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    assert_eq!(env.link_target(".vimrc"), Some(work.join(".vimrc")));

    switch_to_profile(&env.paths, "home", &defaults(), &mut sink()).unwrap();
    assert_eq!(env.link_target(".vimrc"), Some(home.join(".vimrc")));

    let summary = remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert!(!work.exists());
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.kept, 1);
    assert_eq!(env.link_target(".vimrc"), Some(home.join(".vimrc")));
}

#[test]
fn links_overwritten_outside_a_switch_are_kept_too() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc"]);
    let home = env.profile("home", &[".vimrc"]);
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    // Another tool repoints the link without going through dotprof
    fs::remove_file(env.home(".vimrc")).unwrap();
    symlink(home.join(".vimrc"), env.home(".vimrc")).unwrap();

    remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert!(!work.exists());
    assert_eq!(env.link_target(".vimrc"), Some(home.join(".vimrc")));
}

#[test]
fn removing_active_profile_leaves_no_dangling_links() {
    let env = TestEnv::new();
    let work = env.profile(
        "work",
        &[".vimrc", ".bashrc", ".config/nvim/init.vim", ".local/bin/tool"],
    );
    fs::create_dir_all(env.home(".local")).unwrap();
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    assert!(env.exists_at(".local/bin"));

    let summary = remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert!(!work.exists());
    assert_eq!(summary.removed, 4);
    for rel in [".vimrc", ".bashrc", ".config", ".local/bin"] {
        assert!(!env.exists_at(rel), "{rel} should be gone");
    }
    assert!(env.home(".local").is_dir());
    assert!(env.dangling_links().is_empty());
    assert!(State::load(&env.paths.state_file).unwrap().active.is_none());
}

#[test]
fn removal_twice_is_harmless() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc", ".config/git/config"]);
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    let links = plan(&work, &env.paths.home_dir).unwrap();

    remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    let owner = ProfileRef {
        name: "work",
        root: &work,
    };
    let second = remove_profile_links(&links, owner, &defaults(), &mut sink()).unwrap();
    assert_eq!(second.removed, 0);
    assert_eq!(second.kept, 0);
    assert!(env.dangling_links().is_empty());
}

#[test]
fn removing_a_missing_profile_fails_without_touching_links() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc"]);
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    let err = remove_profile(&env.paths, "wrok", &defaults(), &mut sink()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LinkError>(),
        Some(LinkError::ProfileNotFound(_))
    ));
    assert_eq!(env.link_target(".vimrc"), Some(work.join(".vimrc")));
}

#[test]
fn dangling_links_are_removed_whatever_their_origin() {
    let env = TestEnv::new();
    env.profile("work", &[".vimrc", ".bashrc"]);
    symlink("/nonexistent/other/.vimrc", env.home(".vimrc")).unwrap();
    symlink("/nonexistent/other/.bashrc", env.home(".bashrc")).unwrap();

    let summary = remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert_eq!(summary.removed, 2);
    assert!(env.dangling_links().is_empty());
}

#[test]
fn dry_run_reports_every_removable_link_and_changes_nothing() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc", ".bashrc", ".zshrc"]);
    let home = env.profile("home", &[".zshrc"]);
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    fs::remove_file(env.home(".zshrc")).unwrap();
    symlink(home.join(".zshrc"), env.home(".zshrc")).unwrap();

    let opts = Options {
        dry_run: true,
        ..defaults()
    };
    let mut actions = sink();
    let summary = remove_profile(&env.paths, "work", &opts, &mut actions).unwrap();

    assert_eq!(summary.removed, 2);
    assert_eq!(
        actions,
        vec![
            LinkAction::ProfileDeleted {
                path: work.clone()
            },
            LinkAction::Removed {
                dest: env.home(".bashrc")
            },
            LinkAction::Removed {
                dest: env.home(".vimrc")
            },
            LinkAction::Kept {
                dest: env.home(".zshrc"),
                target: home.join(".zshrc"),
            },
        ]
    );
    assert!(work.join(".vimrc").exists());
    assert_eq!(env.link_target(".vimrc"), Some(work.join(".vimrc")));
    assert_eq!(env.link_target(".bashrc"), Some(work.join(".bashrc")));
    assert_eq!(
        State::load(&env.paths.state_file).unwrap().active_name(),
        Some("work")
    );
}

#[test]
fn name_substring_ownership_matches_legacy_behaviour() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc"]);
    // A link into a differently named directory that happens to contain "work"
    let elsewhere = env.paths.base_dir.join("workshop");
    fs::create_dir_all(&elsewhere).unwrap();
    fs::write(elsewhere.join(".vimrc"), "x").unwrap();
    symlink(elsewhere.join(".vimrc"), env.home(".vimrc")).unwrap();
    let links = plan(&work, &env.paths.home_dir).unwrap();
    let owner = ProfileRef {
        name: "work",
        root: &work,
    };

    let strict = remove_profile_links(&links, owner, &defaults(), &mut sink()).unwrap();
    assert_eq!(strict.kept, 1);
    assert!(env.exists_at(".vimrc"));

    let legacy = Options {
        ownership: Ownership::NameSubstring,
        ..defaults()
    };
    let loose = remove_profile_links(&links, owner, &legacy, &mut sink()).unwrap();
    assert_eq!(loose.removed, 1);
    assert!(!env.exists_at(".vimrc"));
}

#[test]
fn real_files_in_home_survive_profile_removal() {
    let env = TestEnv::new();
    env.profile("work", &[".vimrc"]);
    fs::write(env.home(".vimrc"), "hand written").unwrap();

    remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert_eq!(fs::read_to_string(env.home(".vimrc")).unwrap(), "hand written");
}

#[test]
fn failed_directory_delete_leaves_links_alone() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc", ".bashrc"]);
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    if !make_read_only(&work) {
        return;
    }

    let result = remove_profile(&env.paths, "work", &defaults(), &mut sink());
    make_writable(&work);

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LinkError>(),
        Some(LinkError::DirectoryDelete { .. })
    ));
    assert_eq!(env.link_target(".vimrc"), Some(work.join(".vimrc")));
    assert_eq!(env.link_target(".bashrc"), Some(work.join(".bashrc")));
    assert_eq!(
        State::load(&env.paths.state_file).unwrap().active_name(),
        Some("work")
    );
}

#[test]
fn failed_link_delete_keeps_earlier_removals() {
    let env = TestEnv::new();
    env.profile("work", &[".aliases", "notes/todo.md"]);
    // A real directory in home, so the profile's links go inside it
    fs::create_dir_all(env.home("notes")).unwrap();
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    assert!(env.link_target("notes/todo.md").is_some());
    let notes = env.home("notes");
    if !make_read_only(&notes) {
        return;
    }

    let result = remove_profile(&env.paths, "work", &defaults(), &mut sink());
    make_writable(&notes);

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LinkError>(),
        Some(LinkError::LinkDelete { .. })
    ));
    assert!(!env.exists_at(".aliases"));
    assert!(env.link_target("notes/todo.md").is_some());
}

#[test]
fn redirected_links_are_removed_with_their_profile() {
    let env = TestEnv::new();
    let work = env.profile("work", &[".vimrc", "bin/tool"]);
    fs::write(
        work.join(".dotprof.json"),
        r#"{"mappings": [{"match": "^bin/$", "target_dir": "~/.local"}]}"#,
    )
    .unwrap();
    switch_to_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();
    assert_eq!(env.link_target(".local/bin"), Some(work.join("bin")));
    assert!(!env.exists_at("bin"));

    let summary = remove_profile(&env.paths, "work", &defaults(), &mut sink()).unwrap();

    assert_eq!(summary.removed, 2);
    assert!(!env.exists_at(".local/bin"));
    assert!(env.dangling_links().is_empty());
}
