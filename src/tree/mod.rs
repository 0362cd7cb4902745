//! Local tree hashing
//!
//! Walks a datasite root and produces a [`FileState`](crate::metadata::FileState)
//! with a content digest for every regular file.

pub mod hasher;
pub mod walker;

pub use hasher::{hash_file, ContentHasher, FsContentHasher};
pub use walker::{walk_tree, WalkerConfig};
