//! Filesystem traversal for local state.

use crate::error::LocalStateError;
use crate::metadata::{FileMetadata, FileState};
use crate::tree::hasher::hash_file;
use crate::types::RelativePath;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walker configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkerConfig {
    /// Do not descend into (or hash) entries whose name starts with `.`
    pub skip_hidden: bool,
}

/// Hash every regular file under `root`.
///
/// Symlinks are never followed or hashed. A file that cannot be read is
/// logged and left out; only an unreadable root fails the walk. Entries are
/// keyed by normalised path and remember their on-disk spelling.
pub fn walk_tree(root: &Path, config: WalkerConfig) -> Result<FileState, LocalStateError> {
    let meta = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LocalStateError::MissingRoot(root.to_path_buf()),
        _ => LocalStateError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_dir() {
        return Err(LocalStateError::NotADirectory(root.to_path_buf()));
    }

    let mut state = FileState::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(config.skip_hidden && entry.file_name().to_string_lossy().starts_with('.'))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(LocalStateError::Io {
                    path: root.to_path_buf(),
                    source: e.into(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(on_disk) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = match RelativePath::from_path(on_disk) {
            Ok(path) => path,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping unrepresentable path");
                continue;
            }
        };

        match file_metadata(entry.path(), relative) {
            Ok(metadata) => {
                if let Some(replaced) = state.insert(metadata.with_local_path(on_disk)) {
                    warn!(
                        path = %replaced.path,
                        dropped = %entry.path().display(),
                        "Two local files normalise to the same path, keeping the first"
                    );
                    state.insert(replaced);
                }
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Skipping unreadable file"),
        }
    }

    debug!(root = %root.display(), files = state.len(), "Hashed local tree");
    Ok(state)
}

fn file_metadata(path: &Path, relative: RelativePath) -> std::io::Result<FileMetadata> {
    let meta = std::fs::metadata(path)?;
    let last_modified: DateTime<Utc> = meta.modified()?.into();
    let hash = hash_file(path)?;
    Ok(FileMetadata::new(relative, hash, meta.len(), last_modified))
}
