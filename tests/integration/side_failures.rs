use crate::integration::support::{at, meta, StaticHasher, DATASITE, DATASITE_NAME};
use async_trait::async_trait;
use sitesync::error::{LocalStateError, RemoteStateError};
use sitesync::{
    DatasiteReconciler, FileMetadata, FsContentHasher, InMemoryRemoteState, ReconcilerConfig,
    RemoteStateProvider, Side,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Unreachable;

#[async_trait]
impl RemoteStateProvider for Unreachable {
    async fn fetch_state(&self, _datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError> {
        Err(RemoteStateError::Network("connection refused".to_string()))
    }
}

struct Stalled;

#[async_trait]
impl RemoteStateProvider for Stalled {
    async fn fetch_state(&self, _datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}

fn local_state() -> Arc<StaticHasher> {
    Arc::new(StaticHasher(
        vec![meta("a.txt", "H1", 10, at(2024))].into_iter().collect(),
    ))
}

#[tokio::test]
async fn network_failure_is_a_remote_side_failure() {
    let r = DatasiteReconciler::new(ReconcilerConfig::default(), local_state(), Arc::new(Unreachable));
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert!(result.is_abandoned());
    assert!(!result.has_changes());
    assert!(result.per_path_errors.is_empty());
    assert_eq!(result.side_errors.len(), 1);
    assert_eq!(result.side_errors[0].side(), Side::Remote);
}

#[tokio::test]
async fn unknown_remote_root_is_not_found() {
    let provider = InMemoryRemoteState::new();
    let r = DatasiteReconciler::new(ReconcilerConfig::default(), local_state(), Arc::new(provider));
    let err = r
        .reconcile(Path::new(DATASITE))
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        &err.failures[0],
        sitesync::SideFailure::Remote(RemoteStateError::NotFound(name)) if name == DATASITE_NAME
    ));
}

#[tokio::test]
async fn missing_local_root_is_a_local_side_failure() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join(DATASITE_NAME);
    let provider = InMemoryRemoteState::new();
    provider.set(DATASITE_NAME, vec![meta("a.txt", "H1", 10, at(2024))]);
    let r = DatasiteReconciler::new(
        ReconcilerConfig::default(),
        Arc::new(FsContentHasher::default()),
        Arc::new(provider),
    );

    let result = r.reconcile(&root).await;
    assert_eq!(result.side_errors.len(), 1);
    assert!(matches!(
        &result.side_errors[0],
        sitesync::SideFailure::Local(LocalStateError::MissingRoot(_))
    ));
    assert!(r.is_in_sync(&root).await.is_err());
}

#[tokio::test]
async fn slow_remote_times_out() {
    let config = ReconcilerConfig {
        remote_timeout_secs: Some(1),
        ..ReconcilerConfig::default()
    };
    let r = DatasiteReconciler::new(config, local_state(), Arc::new(Stalled));
    let result = r.reconcile(Path::new(DATASITE)).await;

    assert_eq!(result.side_errors.len(), 1);
    assert!(matches!(
        &result.side_errors[0],
        sitesync::SideFailure::Remote(RemoteStateError::Timeout(limit)) if *limit == Duration::from_secs(1)
    ));
}

#[tokio::test]
async fn in_sync_check_propagates_side_failure() {
    let r = DatasiteReconciler::new(ReconcilerConfig::default(), local_state(), Arc::new(Unreachable));
    let err = r.is_in_sync(Path::new(DATASITE)).await.unwrap_err();
    assert_eq!(err.failures[0].side(), Side::Remote);
    assert!(err.to_string().contains("connection refused"));
}
