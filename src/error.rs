//! Error taxonomy for reconciliation.
//!
//! Failures fall into three tiers: a whole side of the datasite could not be
//! read ([`SideFailure`]), a single path could not be classified
//! ([`PathError`]), or the surrounding tooling failed ([`ApiError`]).

use crate::types::{RelativePath, Side};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A path that cannot be used as a root-relative datasite path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPath {
    #[error("path is empty")]
    Empty,
    #[error("path `{0}` is absolute")]
    Absolute(String),
    #[error("path `{0}` contains a `..` segment")]
    ParentSegment(String),
    #[error("path `{0}` is not valid UTF-8")]
    NonUtf8(String),
    #[error("path `{0}` has a `\\` inside a file name")]
    SeparatorInName(String),
}

/// Failure raised by a caller-supplied path predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PredicateError(pub String);

impl PredicateError {
    pub fn new(message: impl Into<String>) -> Self {
        PredicateError(message.into())
    }
}

/// The local tree could not be hashed.
#[derive(Debug, Error)]
pub enum LocalStateError {
    #[error("datasite root {} does not exist", .0.display())]
    MissingRoot(PathBuf),
    #[error("datasite root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("local hashing was cancelled")]
    Cancelled,
    #[error("failed to load ignore rules: {0}")]
    IgnoreRules(String),
}

/// The remote state could not be fetched.
#[derive(Debug, Error)]
pub enum RemoteStateError {
    #[error("network error: {0}")]
    Network(String),
    #[error("remote root `{0}` is unknown")]
    NotFound(String),
    #[error("remote state fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote state fetch was cancelled")]
    Cancelled,
    #[error("malformed remote state: {0}")]
    Malformed(String),
}

/// One entire side of a datasite is unavailable; no diff is possible.
#[derive(Debug, Error)]
pub enum SideFailure {
    #[error("local state unavailable: {0}")]
    Local(#[from] LocalStateError),
    #[error("remote state unavailable: {0}")]
    Remote(#[from] RemoteStateError),
}

impl SideFailure {
    pub fn side(&self) -> Side {
        match self {
            SideFailure::Local(_) => Side::Local,
            SideFailure::Remote(_) => Side::Remote,
        }
    }
}

/// Why a single path was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathErrorKind {
    #[error("ignore predicate failed: {0}")]
    IgnorePredicate(PredicateError),
    #[error("permission predicate failed: {0}")]
    PermissionPredicate(PredicateError),
    #[error("path is present on neither side")]
    InvariantViolation,
    #[error("file is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("invalid permission file: {0}")]
    InvalidPermissionFile(String),
}

/// A per-path failure. Recorded and skipped, never fatal for the datasite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct PathError {
    pub path: RelativePath,
    pub kind: PathErrorKind,
}

impl PathError {
    pub fn new(path: RelativePath, kind: PathErrorKind) -> Self {
        PathError { path, kind }
    }
}

/// Reconciliation of a datasite was abandoned because a side failed.
#[derive(Debug, Error)]
#[error("reconciliation of {} failed: {}", .datasite.display(), describe_failures(.failures))]
pub struct ReconcileError {
    pub datasite: PathBuf,
    pub failures: Vec<SideFailure>,
}

fn describe_failures(failures: &[SideFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from configuration, logging and the command-line surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
