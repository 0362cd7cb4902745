use crate::integration::support::{reconciler, DATASITE};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use sitesync::classify::{infallible, ChangeClassifier, Classification};
use sitesync::error::PredicateError;
use sitesync::{
    compare, prioritize, ChangeKind, ChangeRecord, FileMetadata, RelativePath, Resolution, Side,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn path_strategy() -> impl Strategy<Value = RelativePath> {
    "[a-z]{1,6}(/[a-z]{1,6}){0,2}".prop_map(|p| RelativePath::new(&p).unwrap())
}

fn time_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn metadata_strategy() -> impl Strategy<Value = FileMetadata> {
    (path_strategy(), "[0-9a-f]{1,8}", 0u64..1_000_000, time_strategy())
        .prop_map(|(path, hash, size, modified)| FileMetadata::new(path, hash, size, modified))
}

fn with_path(meta: &FileMetadata, path: &RelativePath) -> FileMetadata {
    FileMetadata::new(path.clone(), meta.hash.clone(), meta.size, meta.last_modified)
}

fn classifier(ignore_all: bool) -> ChangeClassifier {
    ChangeClassifier::new(
        DATASITE,
        infallible(move |_| ignore_all),
        infallible(|p| p.file_name() == "perm.yaml"),
    )
}

fn record(path: RelativePath, size: u64, is_permission_file: bool) -> ChangeRecord {
    ChangeRecord {
        local_sync_root: PathBuf::from(DATASITE),
        path,
        authoritative_side: Side::Local,
        kind: ChangeKind::Create,
        resolution: Resolution::OnlyOneSide,
        last_modified: Utc.timestamp_opt(0, 0).unwrap(),
        file_size: size.max(1),
        is_permission_file,
        local_path: None,
    }
}

proptest! {
    #[test]
    fn classification_is_idempotent(
        path in path_strategy(),
        local in proptest::option::of(metadata_strategy()),
        remote in proptest::option::of(metadata_strategy()),
    ) {
        prop_assume!(local.is_some() || remote.is_some());
        let local = local.map(|m| with_path(&m, &path));
        let remote = remote.map(|m| with_path(&m, &path));
        let c = classifier(false);
        let first = c.classify(&path, local.as_ref(), remote.as_ref()).unwrap();
        let second = c.classify(&path, local.as_ref(), remote.as_ref()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn equal_hashes_never_change(
        local in metadata_strategy(),
        size in 0u64..1_000_000,
        modified in time_strategy(),
    ) {
        let remote = FileMetadata::new(local.path.clone(), local.hash.clone(), size, modified);
        prop_assert_eq!(compare(Some(&local), Some(&remote)).unwrap(), None);
    }

    #[test]
    fn single_side_is_authoritative(meta in metadata_strategy()) {
        let up = compare(Some(&meta), None).unwrap().unwrap();
        prop_assert_eq!(up.authoritative_side, Side::Local);
        let down = compare(None, Some(&meta)).unwrap().unwrap();
        prop_assert_eq!(down.authoritative_side, Side::Remote);
        prop_assert_eq!(down.file_size, meta.size);
    }

    #[test]
    fn newer_side_wins_and_ties_go_remote(
        local in metadata_strategy(),
        remote_hash in "[g-z]{1,8}",
        remote_size in 0u64..1_000_000,
        remote_modified in time_strategy(),
    ) {
        let remote = FileMetadata::new(local.path.clone(), remote_hash, remote_size, remote_modified);
        let comparison = compare(Some(&local), Some(&remote)).unwrap().unwrap();
        let expected = if local.last_modified > remote.last_modified {
            Side::Local
        } else {
            Side::Remote
        };
        prop_assert_eq!(comparison.authoritative_side, expected);

        let tied = FileMetadata::new(local.path.clone(), remote.hash.clone(), remote_size, local.last_modified);
        let tie = compare(Some(&local), Some(&tied)).unwrap().unwrap();
        prop_assert_eq!(tie.authoritative_side, Side::Remote);
        prop_assert_eq!(tie.resolution, Resolution::TieBreak);
    }

    #[test]
    fn ignored_paths_never_change(
        path in path_strategy(),
        local in metadata_strategy(),
        remote_hash in "[g-z]{1,8}",
        remote_modified in time_strategy(),
    ) {
        let local = with_path(&local, &path);
        let remote = FileMetadata::new(path.clone(), remote_hash, 1, remote_modified);
        let result = classifier(true).classify(&path, Some(&local), Some(&remote)).unwrap();
        prop_assert_eq!(result, Classification::Ignored);
    }

    #[test]
    fn permission_changes_lead_then_size_then_path(
        entries in proptest::collection::vec((path_strategy(), 0u64..10_000, any::<bool>()), 0..40),
    ) {
        let changes: Vec<ChangeRecord> = entries
            .into_iter()
            .map(|(path, size, perm)| record(path, size, perm))
            .collect();
        let before = changes.clone();
        let ordered = prioritize(&changes);

        prop_assert_eq!(&changes, &before);
        prop_assert_eq!(ordered.len(), changes.len());
        let permission_count = changes.iter().filter(|c| c.is_permission_file).count();
        prop_assert!(ordered[..permission_count].iter().all(|c| c.is_permission_file));
        prop_assert!(ordered[permission_count..].iter().all(|c| !c.is_permission_file));
        for pair in ordered.windows(2) {
            if pair[0].is_permission_file == pair[1].is_permission_file {
                prop_assert!(
                    (pair[0].file_size, &pair[0].path) <= (pair[1].file_size, &pair[1].path)
                );
            }
        }
    }

    #[test]
    fn one_failing_path_out_of_n(
        names in proptest::collection::btree_set("[a-z]{1,8}", 1..20),
        pick in any::<proptest::sample::Index>(),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let failing = names[pick.index(names.len())].clone();
        let local: Vec<FileMetadata> = names
            .iter()
            .map(|n| FileMetadata::new(RelativePath::new(n).unwrap(), "h", 1, Utc.timestamp_opt(0, 0).unwrap()))
            .collect();
        let target = failing.clone();
        let r = reconciler(local, vec![]).with_permission_predicate(Arc::new(
            move |p: &RelativePath| -> Result<bool, PredicateError> {
                if p.as_str() == target {
                    Err(PredicateError::new("boom"))
                } else {
                    Ok(false)
                }
            },
        ));
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(r.reconcile(Path::new(DATASITE)));

        prop_assert!(!result.is_abandoned());
        prop_assert_eq!(result.file_changes.len(), names.len() - 1);
        prop_assert_eq!(result.per_path_errors.len(), 1);
        prop_assert_eq!(result.per_path_errors[0].path.as_str(), failing.as_str());
        let queued: BTreeSet<&str> = result.file_changes.iter().map(|c| c.path.as_str()).collect();
        prop_assert!(!queued.contains(failing.as_str()));
    }
}
