//! Permission file recognition and validation
//!
//! Permission files hold the access rules for their directory. Reconciliation
//! only needs two things from them: recognising one by name, and refusing to
//! push a local copy whose content does not parse.

use crate::classify::PathPredicate;
use crate::error::PredicateError;
use crate::types::RelativePath;
use std::path::Path;

/// Recognises permission files by their file name.
#[derive(Debug, Clone)]
pub struct PermissionFileMatcher {
    names: Vec<String>,
}

impl PermissionFileMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_permission_file(&self, path: &RelativePath) -> bool {
        let file_name = path.file_name();
        self.names.iter().any(|name| name == file_name)
    }
}

impl PathPredicate for PermissionFileMatcher {
    fn evaluate(&self, path: &RelativePath) -> Result<bool, PredicateError> {
        Ok(self.is_permission_file(path))
    }
}

/// Decides whether a local permission file may be uploaded.
pub trait PermissionValidator: Send + Sync {
    /// `Err` carries a human-readable reason.
    fn validate(&self, local_path: &Path) -> Result<(), String>;
}

/// Accepts permission files whose content is a YAML or JSON mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredPermissionValidator;

impl PermissionValidator for StructuredPermissionValidator {
    fn validate(&self, local_path: &Path) -> Result<(), String> {
        let content = std::fs::read_to_string(local_path)
            .map_err(|e| format!("cannot read {}: {}", local_path.display(), e))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&content)
            .map_err(|e| format!("{} does not parse: {}", local_path.display(), e))?;
        match value {
            serde_yaml::Value::Mapping(_) => Ok(()),
            _ => Err(format!("{} is not a mapping of rules", local_path.display())),
        }
    }
}
