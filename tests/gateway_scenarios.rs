//! Gateway scenario tests.
//!
//! End-to-end behavior of the library API: history shape, branch isolation,
//! seeding, deletes, binary policy, name collisions and concurrent writers.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use tempfile::TempDir;

use gitapi::content::{BinaryClassifier, DefaultClassifier};
use gitapi::core::config::{Config, GatewayConfig};
use gitapi::gateway::{CommitQuery, FileChange, Gateway, GatewayError, Mutation, TagRequest};
use gitapi::translate::{ObjectJson, TreeEntryJson};

fn gateway() -> (TempDir, Gateway) {
    let dir = TempDir::new().unwrap();
    let config = Config::from_file_config(GatewayConfig {
        storage_root: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();
    let gateway = Gateway::new(&config);
    gateway.create_repository("test", &[]).unwrap();
    (dir, gateway)
}

fn change(branch: &str, path: &str, mutation: Mutation, source: Option<&str>) -> FileChange {
    FileChange {
        branch: branch.to_string(),
        path: path.to_string(),
        mutation,
        author_name: "Rune Madsen".to_string(),
        author_email: "rune@example.com".to_string(),
        message: format!("change {path}"),
        source_branch: source.map(str::to_string),
    }
}

fn text(data: &str) -> Mutation {
    Mutation::Upsert {
        content: data.to_string(),
        encoding: None,
    }
}

fn write(gw: &Gateway, branch: &str, path: &str, data: &str, source: Option<&str>) -> String {
    gw.commit_file_change("test.git", change(branch, path, text(data), source))
        .unwrap()
        .commit_sha
}

fn names(gw: &Gateway, branch: &str) -> Vec<String> {
    let mut names: Vec<String> = gw
        .tree("test.git", branch)
        .unwrap()
        .files
        .into_iter()
        .map(|entry| match entry {
            TreeEntryJson::Blob { name, .. }
            | TreeEntryJson::Tree { name, .. }
            | TreeEntryJson::Commit { name, .. } => name,
        })
        .collect();
    names.sort();
    names
}

fn read_text(gw: &Gateway, branch: &str, path: &str) -> String {
    match gw.object_at("test.git", branch, path).unwrap() {
        ObjectJson::Blob(blob) => blob.data,
        other => panic!("expected blob at {path}, got {other:?}"),
    }
}

#[test]
fn two_files_on_master() {
    let (_dir, gw) = gateway();
    let c1 = write(&gw, "master", "a.txt", "a", None);
    let c2 = write(&gw, "master", "b.txt", "b", None);

    assert_eq!(names(&gw, "master"), ["a.txt", "b.txt"]);

    let commits = gw.commits("test.git", &CommitQuery::default()).unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].id, c1);
    assert!(commits[0].parents.is_empty());
    assert_eq!(commits[1].id, c2);
    assert_eq!(commits[1].parents.len(), 1);
    assert_eq!(commits[1].parents[0].id, c1);
    assert!(commits.iter().all(|c| c.diffs.is_none()));
}

#[test]
fn feature_seeded_from_master() {
    let (_dir, gw) = gateway();
    let c1 = write(&gw, "master", "a.txt", "a", None);
    let c2 = write(&gw, "feature", "b.txt", "b", Some("master"));

    assert_eq!(names(&gw, "feature"), ["a.txt", "b.txt"]);
    assert_eq!(names(&gw, "master"), ["a.txt"]);

    let commit = gw.commit("test.git", &c2, false).unwrap();
    assert_eq!(commit.parents[0].id, c1);
}

#[test]
fn writes_to_one_branch_leave_another_alone() {
    let (_dir, gw) = gateway();
    write(&gw, "master", "a.txt", "a", None);
    write(&gw, "other", "x.txt", "x", None);
    write(&gw, "master", "b.txt", "b", None);

    assert_eq!(names(&gw, "other"), ["x.txt"]);
    assert_eq!(names(&gw, "master"), ["a.txt", "b.txt"]);
}

#[test]
fn write_from_unborn_branch_keeps_target_history() {
    let (_dir, gw) = gateway();
    let c1 = write(&gw, "master", "a.txt", "a", None);
    let c2 = write(&gw, "master", "b.txt", "b", Some("typo"));

    assert_eq!(names(&gw, "master"), ["a.txt", "b.txt"]);
    let commits = gw.commits("test.git", &CommitQuery::default()).unwrap();
    let ids: Vec<_> = commits.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, [c1.as_str(), c2.as_str()]);
}

#[test]
fn tag_named_like_a_branch_does_not_hide_it() {
    let (_dir, gw) = gateway();
    let c1 = write(&gw, "master", "a.txt", "a", None);
    gw.create_tag(
        "test.git",
        TagRequest {
            tag: "feature".to_string(),
            message: "same name as a branch".to_string(),
            sha: c1,
            kind: "commit".to_string(),
            user: "Rune Madsen".to_string(),
            email: "rune@example.com".to_string(),
        },
    )
    .unwrap();
    let c2 = write(&gw, "feature", "b.txt", "b", Some("master"));

    assert_eq!(names(&gw, "feature"), ["a.txt", "b.txt"]);
    assert_eq!(read_text(&gw, "feature", "b.txt"), "b");
    let query = CommitQuery {
        start: Some("feature".to_string()),
        ..Default::default()
    };
    let commits = gw.commits("test.git", &query).unwrap();
    assert_eq!(commits.last().unwrap().id, c2);
}

#[test]
fn byte_order_mark_survives_a_round_trip() {
    let (_dir, gw) = gateway();
    write(&gw, "master", "notes.txt", "\u{feff}hello", None);
    assert_eq!(read_text(&gw, "master", "notes.txt"), "\u{feff}hello");
}

#[test]
fn delete_just_committed_file() {
    let (_dir, gw) = gateway();
    write(&gw, "master", "keep.txt", "k", None);
    write(&gw, "master", "dir/gone.txt", "g", None);

    gw.commit_file_change("test.git", change("master", "dir/gone.txt", Mutation::Delete, None))
        .unwrap();

    assert!(matches!(
        gw.object_at("test.git", "master", "dir/gone.txt"),
        Err(GatewayError::ObjectNotFound { .. })
    ));
    assert_eq!(names(&gw, "master"), ["keep.txt"]);
}

#[test]
fn delete_missing_file_rejected() {
    let (_dir, gw) = gateway();
    write(&gw, "master", "a.txt", "a", None);
    assert!(gw
        .commit_file_change("test.git", change("master", "nope.txt", Mutation::Delete, None))
        .is_err());
}

#[test]
fn binary_reads_are_always_empty() {
    let (_dir, gw) = gateway();
    gw.commit_file_change(
        "test.git",
        change(
            "master",
            "data.bin",
            Mutation::Upsert {
                content: "AAECAwQ=".to_string(),
                encoding: Some("base64".to_string()),
            },
            None,
        ),
    )
    .unwrap();

    for _ in 0..2 {
        assert_eq!(read_text(&gw, "master", "data.bin"), "");
    }
}

#[test]
fn concurrent_writers_keep_a_linear_history() {
    let (_dir, gw) = gateway();
    let gw = Arc::new(gw);
    write(&gw, "master", "seed.txt", "seed", None);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let gw = Arc::clone(&gw);
            thread::spawn(move || {
                gw.commit_file_change(
                    "test.git",
                    change("master", &format!("f{i}.txt"), text("x"), None),
                )
            })
        })
        .collect();

    let mut landed = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => landed += 1,
            Err(GatewayError::WriteConflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let commits = gw.commits("test.git", &CommitQuery::default()).unwrap();
    assert_eq!(commits.len(), 1 + landed);
    for pair in commits.windows(2) {
        assert_eq!(pair[1].parents.len(), 1);
        assert_eq!(pair[1].parents[0].id, pair[0].id);
    }
    assert_eq!(names(&gw, "master").len(), 1 + landed);
}

/// A file name and content the default classifier shows as text.
fn text_file() -> impl Strategy<Value = (&'static str, String)> {
    let name = prop_oneof![Just("notes.txt"), Just("README.md"), Just("data"), Just("main.rs")];
    (name, any::<bool>(), any::<String>())
        .prop_map(|(name, bom, body)| {
            let data = if bom { format!("\u{feff}{body}") } else { body };
            (name, data)
        })
        .prop_filter("classified as binary", |(name, data)| {
            !DefaultClassifier::default().is_binary(Some(*name), data.as_bytes())
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn text_round_trips((name, data) in text_file()) {
        let (_dir, gw) = gateway();
        write(&gw, "master", name, &data, None);
        prop_assert_eq!(read_text(&gw, "master", name), data);
    }
}
