//! Remote state providers
//!
//! The transport that talks to the sync server lives outside this crate; it
//! plugs in through [`RemoteStateProvider`]. Two providers ship here: an
//! in-memory one and one that reads JSON manifests written by `sitesync
//! snapshot`.

use crate::error::{ApiError, RemoteStateError};
use crate::metadata::{FileMetadata, FileState};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of the server's view of a datasite.
#[async_trait]
pub trait RemoteStateProvider: Send + Sync {
    /// All files the server holds for `datasite`, with paths relative to the datasite root.
    async fn fetch_state(&self, datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError>;
}

/// Remote state held in memory, keyed by datasite name.
#[derive(Debug, Default)]
pub struct InMemoryRemoteState {
    datasites: RwLock<HashMap<String, Vec<FileMetadata>>>,
}

impl InMemoryRemoteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, datasite: impl Into<String>, files: Vec<FileMetadata>) {
        self.datasites.write().insert(datasite.into(), files);
    }
}

#[async_trait]
impl RemoteStateProvider for InMemoryRemoteState {
    async fn fetch_state(&self, datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError> {
        self.datasites
            .read()
            .get(datasite)
            .cloned()
            .ok_or_else(|| RemoteStateError::NotFound(datasite.to_string()))
    }
}

/// Remote state read from JSON manifests on disk.
///
/// `location` is either one manifest file, served for every datasite, or a
/// directory holding `<datasite>.json` per datasite.
#[derive(Debug, Clone)]
pub struct SnapshotRemoteState {
    location: PathBuf,
}

impl SnapshotRemoteState {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    fn manifest_path(&self, datasite: &str) -> PathBuf {
        if self.location.is_dir() {
            self.location.join(format!("{}.json", datasite))
        } else {
            self.location.clone()
        }
    }
}

#[async_trait]
impl RemoteStateProvider for SnapshotRemoteState {
    async fn fetch_state(&self, datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError> {
        let path = self.manifest_path(datasite);
        let datasite = datasite.to_string();
        tokio::task::spawn_blocking(move || read_manifest(&path, &datasite))
            .await
            .map_err(|_| RemoteStateError::Cancelled)?
    }
}

fn read_manifest(path: &Path, datasite: &str) -> Result<Vec<FileMetadata>, RemoteStateError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RemoteStateError::NotFound(datasite.to_string()),
        _ => RemoteStateError::Network(format!("failed to read {}: {}", path.display(), e)),
    })?;
    serde_json::from_str(&content)
        .map_err(|e| RemoteStateError::Malformed(format!("{}: {}", path.display(), e)))
}

/// Write `state` as a manifest readable by [`SnapshotRemoteState`].
pub fn write_snapshot(path: &Path, state: &FileState) -> Result<(), ApiError> {
    let entries: Vec<&FileMetadata> = state.iter().collect();
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| ApiError::Snapshot(format!("Failed to serialize snapshot: {}", e)))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;
    Ok(())
}
