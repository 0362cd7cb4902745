//! Datasite reconciliation
//!
//! Hashes the local tree, fetches the remote state, and diffs the two by path
//! into two prioritised queues: permission-file changes and everything else.
//! The reconciler keeps no state between calls; every pass starts from two
//! fresh snapshots.

use crate::change::ChangeRecord;
use crate::classify::{ChangeClassifier, Classification, PathPredicate};
use crate::config::ReconcilerConfig;
use crate::error::{
    LocalStateError, PathError, PathErrorKind, ReconcileError, RemoteStateError, SideFailure,
};
use crate::ignore::PathFilter;
use crate::metadata::FileState;
use crate::permission::{PermissionFileMatcher, PermissionValidator, StructuredPermissionValidator};
use crate::prioritize::prioritize;
use crate::remote::RemoteStateProvider;
use crate::tree::ContentHasher;
use crate::types::{RelativePath, Side};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Output of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileResult {
    pub datasite_root: PathBuf,
    /// Permission-file changes, prioritised.
    pub permission_changes: Vec<ChangeRecord>,
    /// All other changes, prioritised.
    pub file_changes: Vec<ChangeRecord>,
    pub per_path_errors: Vec<PathError>,
    /// Non-empty only when the pass was abandoned; the change lists are then empty.
    pub side_errors: Vec<SideFailure>,
    pub ignored_paths: usize,
    pub in_sync_paths: usize,
}

/// Counts for one pass, for logs and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub queued: usize,
    pub permission_changes: usize,
    pub file_changes: usize,
    pub ignored: usize,
    pub in_sync: usize,
    pub failed: usize,
}

impl ReconcileResult {
    fn abandoned(datasite_root: &Path, side_errors: Vec<SideFailure>) -> Self {
        ReconcileResult {
            datasite_root: datasite_root.to_path_buf(),
            side_errors,
            ..ReconcileResult::default()
        }
    }

    pub fn is_abandoned(&self) -> bool {
        !self.side_errors.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        !self.permission_changes.is_empty() || !self.file_changes.is_empty()
    }

    /// Every change in processing order: permission files, then the rest.
    pub fn changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.permission_changes.iter().chain(self.file_changes.iter())
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            queued: self.permission_changes.len() + self.file_changes.len(),
            permission_changes: self.permission_changes.len(),
            file_changes: self.file_changes.len(),
            ignored: self.ignored_paths,
            in_sync: self.in_sync_paths,
            failed: self.per_path_errors.len(),
        }
    }

    /// Turn an abandoned pass into an error.
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        if self.is_abandoned() {
            Err(ReconcileError {
                datasite: self.datasite_root,
                failures: self.side_errors,
            })
        } else {
            Ok(self)
        }
    }
}

#[derive(Default)]
struct Tally {
    ignored: usize,
    in_sync: usize,
    errors: Vec<PathError>,
}

/// Diffs local and remote state for datasites.
pub struct DatasiteReconciler {
    config: ReconcilerConfig,
    hasher: Arc<dyn ContentHasher>,
    remote: Arc<dyn RemoteStateProvider>,
    permission_files: Arc<dyn PathPredicate>,
    ignore_predicate: Option<Arc<dyn PathPredicate>>,
    validator: Option<Arc<dyn PermissionValidator>>,
}

impl DatasiteReconciler {
    pub fn new(
        config: ReconcilerConfig,
        hasher: Arc<dyn ContentHasher>,
        remote: Arc<dyn RemoteStateProvider>,
    ) -> Self {
        let permission_files: Arc<dyn PathPredicate> = Arc::new(PermissionFileMatcher::new(
            config.permission_file_names.iter().cloned(),
        ));
        let validator: Option<Arc<dyn PermissionValidator>> = if config.validate_permission_files
        {
            Some(Arc::new(StructuredPermissionValidator))
        } else {
            None
        };
        Self {
            config,
            hasher,
            remote,
            permission_files,
            ignore_predicate: None,
            validator,
        }
    }

    /// Extra ignore rule evaluated after the configured ones.
    pub fn with_ignore_predicate(mut self, predicate: Arc<dyn PathPredicate>) -> Self {
        self.ignore_predicate = Some(predicate);
        self
    }

    /// Replace the file-name based permission-file check.
    pub fn with_permission_predicate(mut self, predicate: Arc<dyn PathPredicate>) -> Self {
        self.permission_files = predicate;
        self
    }

    /// Replace (or with `None`, disable) validation of outgoing permission files.
    pub fn with_permission_validator(mut self, validator: Option<Arc<dyn PermissionValidator>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Name the remote knows a datasite by: the last component of its root.
    pub fn datasite_name(datasite_root: &Path) -> String {
        datasite_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Compute both prioritised change queues for one datasite.
    ///
    /// A side failure abandons the pass: `side_errors` is set and no changes
    /// are returned. Per-path failures are collected and never stop the pass.
    #[instrument(skip(self, datasite_root), fields(datasite = %datasite_root.display()))]
    pub async fn reconcile(&self, datasite_root: &Path) -> ReconcileResult {
        let started = Instant::now();
        let (local, remote) = match self.snapshots(datasite_root).await {
            Ok(states) => states,
            Err(failure) => {
                error!(side = %failure.side(), error = %failure, "Abandoning reconciliation");
                return ReconcileResult::abandoned(datasite_root, vec![failure]);
            }
        };

        let mut tally = Tally::default();
        let mut changes = Vec::new();
        if let Err(failure) = self.diff(datasite_root, &local, &remote, &mut tally, |change| {
            changes.push(change);
            ControlFlow::Continue(())
        }) {
            error!(side = %failure.side(), error = %failure, "Abandoning reconciliation");
            return ReconcileResult::abandoned(datasite_root, vec![failure]);
        }

        let (permission, files): (Vec<_>, Vec<_>) =
            changes.into_iter().partition(|c| c.is_permission_file);

        let result = ReconcileResult {
            datasite_root: datasite_root.to_path_buf(),
            permission_changes: prioritize(&permission),
            file_changes: prioritize(&files),
            per_path_errors: tally.errors,
            side_errors: Vec::new(),
            ignored_paths: tally.ignored,
            in_sync_paths: tally.in_sync,
        };

        let summary = result.summary();
        info!(
            queued = summary.queued,
            permission_changes = summary.permission_changes,
            ignored = summary.ignored,
            failed = summary.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Reconciled datasite"
        );
        result
    }

    /// True iff [`reconcile`](Self::reconcile) would return no changes.
    ///
    /// Stops at the first change instead of building the full queues.
    pub async fn is_in_sync(&self, datasite_root: &Path) -> Result<bool, ReconcileError> {
        let to_error = |failure: SideFailure| ReconcileError {
            datasite: datasite_root.to_path_buf(),
            failures: vec![failure],
        };
        let (local, remote) = self.snapshots(datasite_root).await.map_err(to_error)?;

        let mut found_change = false;
        let mut tally = Tally::default();
        self.diff(datasite_root, &local, &remote, &mut tally, |change| {
            debug!(path = %change.path, "Datasite out of sync");
            found_change = true;
            ControlFlow::Break(())
        })
        .map_err(to_error)?;
        Ok(!found_change)
    }

    /// Fetch both sides concurrently. The first failure wins and cancels the other side.
    async fn snapshots(&self, datasite_root: &Path) -> Result<(FileState, FileState), SideFailure> {
        let datasite = Self::datasite_name(datasite_root);
        let local = async {
            self.hasher
                .hash_tree(datasite_root)
                .await
                .map_err(SideFailure::from)
        };
        let remote = async { self.remote_state(&datasite).await.map_err(SideFailure::from) };
        futures::try_join!(local, remote)
    }

    async fn remote_state(&self, datasite: &str) -> Result<FileState, RemoteStateError> {
        let fetch = self.remote.fetch_state(datasite);
        let entries = match self.config.remote_timeout() {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| RemoteStateError::Timeout(limit))??,
            None => fetch.await?,
        };

        let mut state = FileState::new();
        for entry in entries {
            if let Some(replaced) = state.insert(entry) {
                warn!(path = %replaced.path, "Duplicate remote entry, keeping the last one");
            }
        }
        Ok(state)
    }

    /// Classify the union of both sides' paths, feeding admitted changes to `on_change`.
    fn diff(
        &self,
        datasite_root: &Path,
        local: &FileState,
        remote: &FileState,
        tally: &mut Tally,
        mut on_change: impl FnMut(ChangeRecord) -> ControlFlow<()>,
    ) -> Result<(), SideFailure> {
        let classifier = ChangeClassifier::new(
            datasite_root,
            Arc::new(self.path_filter(datasite_root)?),
            self.permission_files.clone(),
        );

        let union: BTreeSet<&RelativePath> = local.paths().chain(remote.paths()).collect();
        for path in union {
            let classification =
                classifier.classify(path, local.get(path.as_str()), remote.get(path.as_str()));
            match classification {
                Ok(Classification::Ignored) => tally.ignored += 1,
                Ok(Classification::InSync) => tally.in_sync += 1,
                Ok(Classification::Changed(change)) => match self.admit(&change) {
                    Ok(()) => {
                        debug!(
                            path = %change.path,
                            authoritative = %change.authoritative_side,
                            kind = ?change.kind,
                            "Change detected"
                        );
                        if on_change(change).is_break() {
                            return Ok(());
                        }
                    }
                    Err(kind) => {
                        warn!(path = %change.path, reason = %kind, "Change not queued");
                        tally.errors.push(PathError::new(change.path, kind));
                    }
                },
                Err(e) => {
                    if e.kind == PathErrorKind::InvariantViolation {
                        error!(path = %e.path, "Path in the union is missing from both sides");
                    } else {
                        warn!(path = %e.path, error = %e.kind, "Failed to classify path");
                    }
                    tally.errors.push(e);
                }
            }
        }
        Ok(())
    }

    fn path_filter(&self, datasite_root: &Path) -> Result<PathFilter, SideFailure> {
        let filter = PathFilter::from_config(datasite_root, &self.config)
            .map_err(|e| LocalStateError::IgnoreRules(e.to_string()))?;
        Ok(match &self.ignore_predicate {
            Some(predicate) => filter.with_predicate(predicate.clone()),
            None => filter,
        })
    }

    /// Checks a detected change must pass before it is queued.
    fn admit(&self, change: &ChangeRecord) -> Result<(), PathErrorKind> {
        if let Some(limit) = self.config.max_file_size_bytes {
            if change.file_size > limit {
                return Err(PathErrorKind::FileTooLarge {
                    size: change.file_size,
                    limit,
                });
            }
        }
        // Only uploads are checked: a corrupt local copy must stay overwritable.
        if change.is_permission_file && change.authoritative_side == Side::Local {
            if let Some(validator) = &self.validator {
                validator
                    .validate(&change.local_abs_path())
                    .map_err(PathErrorKind::InvalidPermissionFile)?;
            }
        }
        Ok(())
    }
}
