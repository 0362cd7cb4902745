//! Configuration
//!
//! Reconciliation is driven by an explicit [`ReconcilerConfig`] handed to the
//! reconciler; nothing is read from ambient global state. [`ConfigLoader`]
//! assembles it from defaults, config files and `SITESYNC__*` environment
//! variables.

mod facade;
mod merge;
mod paths;
mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rules applied by the reconciler to every datasite it processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Skip paths with any segment starting with `.`
    #[serde(default = "default_true")]
    pub ignore_hidden_files: bool,

    /// Extra glob patterns to ignore
    #[serde(default)]
    pub extra_ignore_globs: Vec<String>,

    /// File at the datasite root holding more ignore patterns
    #[serde(default = "default_ignore_file_name")]
    pub ignore_file_name: Option<String>,

    /// File names that mark a permission file
    #[serde(default = "default_permission_file_names")]
    pub permission_file_names: Vec<String>,

    /// Refuse to push local permission files whose content does not parse
    #[serde(default = "default_true")]
    pub validate_permission_files: bool,

    /// Changes larger than this are reported instead of queued
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,

    /// Upper bound on a remote state fetch
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,
}

impl ReconcilerConfig {
    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_secs.map(Duration::from_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_ignore_file_name() -> Option<String> {
    Some("_.syftignore".to_string())
}

fn default_permission_file_names() -> Vec<String> {
    vec!["_.syftperm".to_string(), "syftperm.yaml".to_string()]
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            ignore_hidden_files: default_true(),
            extra_ignore_globs: Vec::new(),
            ignore_file_name: default_ignore_file_name(),
            permission_file_names: default_permission_file_names(),
            validate_permission_files: default_true(),
            max_file_size_bytes: None,
            remote_timeout_secs: None,
        }
    }
}
