//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SyncConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace from files and environment.
    pub fn load(workspace_root: &Path) -> Result<SyncConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file, still honouring the environment.
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigError> {
        MergeService::load_from_file(path)
    }
}
