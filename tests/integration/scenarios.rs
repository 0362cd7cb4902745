use crate::integration::support::{at, meta, paths, reconciler, reconciler_with, DATASITE};
use sitesync::classify::infallible;
use sitesync::{ChangeKind, ReconcilerConfig, Resolution, Side};
use std::path::Path;

#[tokio::test]
async fn newer_remote_copy_is_pulled_down() {
    let r = reconciler(
        vec![meta("a.txt", "H1", 100, at(2023))],
        vec![meta("a.txt", "H2", 50, at(2024))],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert!(result.permission_changes.is_empty());
    assert_eq!(result.file_changes.len(), 1);
    let change = &result.file_changes[0];
    assert_eq!(change.path.as_str(), "a.txt");
    assert_eq!(change.authoritative_side, Side::Remote);
    assert_eq!(change.file_size, 50);
    assert_eq!(change.kind, ChangeKind::Modify);
    assert_eq!(change.resolution, Resolution::NewerWins);
    assert_eq!(
        change.local_abs_path(),
        Path::new(DATASITE).join("a.txt")
    );
}

#[tokio::test]
async fn local_only_permission_file_is_pushed_first() {
    let r = reconciler(vec![meta("perm.yaml", "P1", 30, at(2024))], vec![]);
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert!(result.file_changes.is_empty());
    assert_eq!(result.permission_changes.len(), 1);
    let change = &result.permission_changes[0];
    assert_eq!(change.authoritative_side, Side::Local);
    assert_eq!(change.kind, ChangeKind::Create);
    assert!(change.is_permission_file);
}

#[tokio::test]
async fn identical_hashes_are_in_sync_despite_timestamps() {
    let r = reconciler(
        vec![meta("b.bin", "H3", 10, at(2020))],
        vec![meta("b.bin", "H3", 10, at(2024))],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert!(!result.has_changes());
    assert_eq!(result.in_sync_paths, 1);
    assert!(r.is_in_sync(Path::new(DATASITE)).await.unwrap());
}

#[tokio::test]
async fn permission_files_then_small_files_then_large() {
    let r = reconciler(
        vec![
            meta("perm.yaml", "P", 1, at(2024)),
            meta("big.bin", "B", 10_000_000, at(2024)),
            meta("small.txt", "S", 10, at(2024)),
        ],
        vec![],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;

    let order: Vec<&str> = result.changes().map(|c| c.path.as_str()).collect();
    assert_eq!(order, vec!["perm.yaml", "small.txt", "big.bin"]);
}

#[tokio::test]
async fn ignored_path_produces_neither_change_nor_error() {
    let config = ReconcilerConfig {
        extra_ignore_globs: vec!["node_modules".to_string()],
        ..ReconcilerConfig::default()
    };
    let r = reconciler_with(
        config,
        vec![meta("node_modules/x.js", "L", 5, at(2025))],
        vec![meta("node_modules/x.js", "R", 5, at(2020))],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert!(!result.has_changes());
    assert!(result.per_path_errors.is_empty());
    assert_eq!(result.ignored_paths, 1);
}

#[tokio::test]
async fn caller_ignore_predicate_applies() {
    let r = reconciler(
        vec![meta("scratch/tmp.dat", "L", 5, at(2025))],
        vec![],
    )
    .with_ignore_predicate(infallible(|p| p.as_str().starts_with("scratch/")));
    let result = r.reconcile(Path::new(DATASITE)).await;
    assert!(!result.has_changes());
    assert_eq!(result.ignored_paths, 1);
}

#[tokio::test]
async fn hidden_paths_are_ignored_by_default() {
    let r = reconciler(
        vec![meta(".git/HEAD", "L", 5, at(2025))],
        vec![meta("docs/.secret", "R", 5, at(2025))],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;
    assert!(!result.has_changes());
    assert_eq!(result.ignored_paths, 2);
}

#[tokio::test]
async fn equal_timestamps_resolve_to_remote() {
    let r = reconciler(
        vec![meta("notes.md", "L", 7, at(2024))],
        vec![meta("notes.md", "R", 9, at(2024))],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;
    let change = &result.file_changes[0];
    assert_eq!(change.authoritative_side, Side::Remote);
    assert_eq!(change.resolution, Resolution::TieBreak);
    assert_eq!(change.file_size, 9);
}

#[tokio::test]
async fn mixed_datasite_summary_counts() {
    let r = reconciler(
        vec![
            meta("same.txt", "S", 3, at(2021)),
            meta("up.txt", "U", 3, at(2024)),
            meta(".hidden", "H", 3, at(2024)),
        ],
        vec![
            meta("same.txt", "S", 3, at(2022)),
            meta("down.txt", "D", 0, at(2024)),
        ],
    );
    let result = r.reconcile(Path::new(DATASITE)).await;
    let summary = result.summary();

    assert_eq!(summary.queued, 2);
    assert_eq!(summary.in_sync, 1);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.failed, 0);
    // Zero-sized files are clamped and sort like size 1.
    assert_eq!(paths(&result.file_changes), vec!["down.txt", "up.txt"]);
    assert_eq!(result.file_changes[0].file_size, 1);
    assert!(!r.is_in_sync(Path::new(DATASITE)).await.unwrap());
}

#[tokio::test]
async fn duplicate_remote_entries_keep_the_last() {
    let r = reconciler(
        vec![meta("a.txt", "H2", 4, at(2020))],
        vec![
            meta("a.txt", "H1", 4, at(2024)),
            meta("a.txt", "H2", 4, at(2024)),
        ],
    );
    assert!(r.is_in_sync(Path::new(DATASITE)).await.unwrap());
}
