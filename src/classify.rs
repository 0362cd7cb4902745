//! Per-path change classification
//!
//! Wraps [`compare`](crate::compare::compare) with the ignore filter and the
//! permission-file tag. Every failure here is scoped to one path.

use crate::change::ChangeRecord;
use crate::compare::compare;
use crate::error::{PathError, PathErrorKind, PredicateError};
use crate::metadata::FileMetadata;
use crate::types::RelativePath;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A yes/no question about a datasite path that may fail.
pub trait PathPredicate: Send + Sync {
    fn evaluate(&self, path: &RelativePath) -> Result<bool, PredicateError>;
}

impl<F> PathPredicate for F
where
    F: Fn(&RelativePath) -> Result<bool, PredicateError> + Send + Sync,
{
    fn evaluate(&self, path: &RelativePath) -> Result<bool, PredicateError> {
        self(path)
    }
}

/// Wrap a predicate that cannot fail.
pub fn infallible<F>(f: F) -> Arc<dyn PathPredicate>
where
    F: Fn(&RelativePath) -> bool + Send + Sync + 'static,
{
    Arc::new(move |path: &RelativePath| -> Result<bool, PredicateError> { Ok(f(path)) })
}

/// Result of classifying one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Matched the ignore filter; never produces a change.
    Ignored,
    InSync,
    Changed(ChangeRecord),
}

impl Classification {
    pub fn into_change(self) -> Option<ChangeRecord> {
        match self {
            Classification::Changed(record) => Some(record),
            Classification::Ignored | Classification::InSync => None,
        }
    }
}

/// Classifies paths of one datasite.
#[derive(Clone)]
pub struct ChangeClassifier {
    local_sync_root: PathBuf,
    is_ignored: Arc<dyn PathPredicate>,
    is_permission_file: Arc<dyn PathPredicate>,
}

impl ChangeClassifier {
    pub fn new(
        local_sync_root: impl Into<PathBuf>,
        is_ignored: Arc<dyn PathPredicate>,
        is_permission_file: Arc<dyn PathPredicate>,
    ) -> Self {
        Self {
            local_sync_root: local_sync_root.into(),
            is_ignored,
            is_permission_file,
        }
    }

    pub fn local_sync_root(&self) -> &Path {
        &self.local_sync_root
    }

    /// Classify one path given the copy each side holds, if any.
    ///
    /// The permission tag only routes the change to a queue; it never affects
    /// which side is authoritative.
    pub fn classify(
        &self,
        path: &RelativePath,
        local: Option<&FileMetadata>,
        remote: Option<&FileMetadata>,
    ) -> Result<Classification, PathError> {
        let ignored = self
            .is_ignored
            .evaluate(path)
            .map_err(|e| PathError::new(path.clone(), PathErrorKind::IgnorePredicate(e)))?;
        if ignored {
            return Ok(Classification::Ignored);
        }

        let is_permission_file = self
            .is_permission_file
            .evaluate(path)
            .map_err(|e| PathError::new(path.clone(), PathErrorKind::PermissionPredicate(e)))?;

        let comparison = compare(local, remote)
            .map_err(|_| PathError::new(path.clone(), PathErrorKind::InvariantViolation))?;

        Ok(match comparison {
            Some(comparison) => Classification::Changed(
                ChangeRecord::from_comparison(
                    &self.local_sync_root,
                    path.clone(),
                    comparison,
                    is_permission_file,
                )
                .with_local_path(local.and_then(|m| m.local_path.clone())),
            ),
            None => Classification::InSync,
        })
    }
}
