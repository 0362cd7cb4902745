//! Content hashing for local files

use crate::error::LocalStateError;
use crate::metadata::FileState;
use crate::tree::walker::{walk_tree, WalkerConfig};
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Produces the local state of a datasite.
#[async_trait]
pub trait ContentHasher: Send + Sync {
    async fn hash_tree(&self, root: &Path) -> Result<FileState, LocalStateError>;
}

/// Hex-encoded BLAKE3 digest of a file, read in 64 KiB blocks.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Hashes the real filesystem on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentHasher {
    config: WalkerConfig,
}

impl FsContentHasher {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ContentHasher for FsContentHasher {
    async fn hash_tree(&self, root: &Path) -> Result<FileState, LocalStateError> {
        let root: PathBuf = root.to_path_buf();
        let config = self.config;
        tokio::task::spawn_blocking(move || walk_tree(&root, config))
            .await
            .map_err(|_| LocalStateError::Cancelled)?
    }
}
