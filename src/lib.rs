//! Sitesync: Datasite Reconciliation
//!
//! Compares the local copy of a datasite with the server's view of it and
//! produces prioritised queues of the files that must move, and in which
//! direction. Transfers themselves are left to the caller.

pub mod change;
pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod ignore;
pub mod logging;
pub mod metadata;
pub mod permission;
pub mod prioritize;
pub mod reconcile;
pub mod remote;
pub mod tooling;
pub mod tree;
pub mod types;

pub use change::ChangeRecord;
pub use classify::{ChangeClassifier, Classification, PathPredicate};
pub use compare::{compare, ChangeKind, Resolution, EQUAL_TIMESTAMP_WINNER};
pub use config::{ReconcilerConfig, SyncConfig};
pub use error::{ApiError, PathError, PathErrorKind, ReconcileError, SideFailure};
pub use metadata::{FileMetadata, FileState};
pub use prioritize::{prioritize, SyncQueue};
pub use reconcile::{DatasiteReconciler, ReconcileResult, ReconcileSummary};
pub use remote::{InMemoryRemoteState, RemoteStateProvider, SnapshotRemoteState};
pub use tree::{ContentHasher, FsContentHasher};
pub use types::{RelativePath, Side};
