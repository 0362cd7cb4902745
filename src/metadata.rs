//! File metadata snapshots
//!
//! A [`FileMetadata`] describes one file on one side at one instant. A
//! [`FileState`] is the full set of them for a datasite side, keyed by path.
//! Both are rebuilt on every reconciliation pass and never mutated afterwards.

use crate::types::RelativePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable description of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: RelativePath,
    /// Content digest; equal digests mean byte-identical files.
    /// Empty only as a sentinel for "no such file".
    pub hash: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// On-disk spelling relative to the datasite root, when it differs from `path`.
    /// Local entries only; never serialised.
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl FileMetadata {
    pub fn new(
        path: RelativePath,
        hash: impl Into<String>,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        FileMetadata {
            path,
            hash: hash.into(),
            size,
            last_modified,
            local_path: None,
        }
    }

    /// Record the root-relative path this file was read from.
    pub fn with_local_path(mut self, relative: &Path) -> Self {
        self.local_path = if self.path.to_local(Path::new("")) == relative {
            None
        } else {
            Some(relative.to_path_buf())
        };
        self
    }

    /// Where this file lives under `root` on the local filesystem.
    pub fn local_abs_path(&self, root: &Path) -> PathBuf {
        match &self.local_path {
            Some(relative) => root.join(relative),
            None => self.path.to_local(root),
        }
    }

    /// False for sentinel entries carrying an empty hash.
    pub fn exists(&self) -> bool {
        !self.hash.is_empty()
    }

    pub fn same_content(&self, other: &FileMetadata) -> bool {
        self.hash == other.hash
    }
}

/// All known files on one side of a datasite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileState {
    files: BTreeMap<RelativePath, FileMetadata>,
}

impl FileState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, returning the entry it replaced if the path was already known.
    pub fn insert(&mut self, metadata: FileMetadata) -> Option<FileMetadata> {
        self.files.insert(metadata.path.clone(), metadata)
    }

    pub fn get(&self, path: &str) -> Option<&FileMetadata> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &RelativePath> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileMetadata> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entries in path order.
    pub fn into_entries(self) -> Vec<FileMetadata> {
        self.files.into_values().collect()
    }
}

impl FromIterator<FileMetadata> for FileState {
    fn from_iter<I: IntoIterator<Item = FileMetadata>>(iter: I) -> Self {
        let mut state = FileState::new();
        for metadata in iter {
            state.insert(metadata);
        }
        state
    }
}
