//! Change records produced by a reconciliation pass.

use crate::compare::{ChangeKind, Comparison, Resolution};
use crate::types::{RelativePath, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One path that must be copied from its authoritative side to the other.
///
/// Created fresh on every pass and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub local_sync_root: PathBuf,
    pub path: RelativePath,
    pub authoritative_side: Side,
    pub kind: ChangeKind,
    pub resolution: Resolution,
    pub last_modified: DateTime<Utc>,
    /// Size of the authoritative copy, never below 1. Only used for ordering.
    pub file_size: u64,
    pub is_permission_file: bool,
    /// On-disk spelling of the local copy, when it differs from `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl ChangeRecord {
    pub fn from_comparison(
        local_sync_root: &Path,
        path: RelativePath,
        comparison: Comparison,
        is_permission_file: bool,
    ) -> Self {
        ChangeRecord {
            local_sync_root: local_sync_root.to_path_buf(),
            path,
            authoritative_side: comparison.authoritative_side,
            kind: comparison.kind,
            resolution: comparison.resolution,
            last_modified: comparison.last_modified,
            file_size: comparison.file_size.max(1),
            is_permission_file,
            local_path: None,
        }
    }

    /// Carry over the on-disk spelling of the local copy, if it has one.
    pub fn with_local_path(mut self, local_path: Option<PathBuf>) -> Self {
        self.local_path = local_path;
        self
    }

    /// Absolute path of this file in the local copy of the datasite.
    ///
    /// Uses the spelling found on disk when there is one, so a file under a
    /// differently normalised name is still reached.
    pub fn local_abs_path(&self) -> PathBuf {
        match &self.local_path {
            Some(relative) => self.local_sync_root.join(relative),
            None => self.path.to_local(&self.local_sync_root),
        }
    }

    /// The side that receives the authoritative copy.
    pub fn side_to_update(&self) -> Side {
        self.authoritative_side.opposite()
    }
}
