//! Path exclusion rules
//!
//! Hidden files, symlinks, glob patterns from configuration and from the
//! datasite's ignore file, plus an optional caller predicate. A path is
//! ignored if any rule matches the path itself or one of its parent
//! directories.

use crate::classify::PathPredicate;
use crate::config::ReconcilerConfig;
use crate::error::{ApiError, PredicateError};
use crate::types::RelativePath;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ignore filter for one datasite root.
pub struct PathFilter {
    root: PathBuf,
    ignore_hidden_files: bool,
    globs: GlobSet,
    pattern_count: usize,
    extra: Option<Arc<dyn PathPredicate>>,
}

impl PathFilter {
    /// Build the filter for `root` from configuration and the root's ignore file.
    pub fn from_config(root: &Path, config: &ReconcilerConfig) -> Result<Self, ApiError> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_count = 0;
        for pattern in &config.extra_ignore_globs {
            let glob = Glob::new(pattern).map_err(|e| {
                ApiError::ConfigError(format!("Invalid ignore pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
            pattern_count += 1;
        }

        // Bad lines in the ignore file are skipped, not fatal.
        if let Some(name) = &config.ignore_file_name {
            let file = root.join(name);
            for pattern in read_ignore_file(&file) {
                match Glob::new(&pattern) {
                    Ok(glob) => {
                        builder.add(glob);
                        pattern_count += 1;
                    }
                    Err(e) => {
                        warn!(file = %file.display(), pattern = %pattern, error = %e, "Skipping invalid ignore pattern")
                    }
                }
            }
        }

        let globs = builder
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build ignore set: {}", e)))?;

        Ok(Self {
            root: root.to_path_buf(),
            ignore_hidden_files: config.ignore_hidden_files,
            globs,
            pattern_count,
            extra: None,
        })
    }

    /// Chain a caller-supplied predicate after the built-in rules.
    pub fn with_predicate(mut self, predicate: Arc<dyn PathPredicate>) -> Self {
        self.extra = Some(predicate);
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    fn is_hidden(path: &RelativePath) -> bool {
        path.segments().any(|s| s.starts_with('.'))
    }

    /// True if the path or any of its ancestors is a symlink on the local side.
    fn crosses_symlink(&self, path: &RelativePath) -> bool {
        let mut current = self.root.clone();
        for segment in path.segments() {
            current.push(segment);
            match std::fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
        false
    }

    fn matches_glob(&self, path: &RelativePath) -> bool {
        if self.pattern_count == 0 {
            return false;
        }
        let mut prefix = String::new();
        for segment in path.segments() {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            // Slash-free patterns such as `node_modules` match at any depth.
            if self.globs.is_match(&prefix) || self.globs.is_match(segment) {
                return true;
            }
        }
        false
    }
}

impl PathPredicate for PathFilter {
    fn evaluate(&self, path: &RelativePath) -> Result<bool, PredicateError> {
        if self.ignore_hidden_files && Self::is_hidden(path) {
            debug!(path = %path, "Ignoring hidden path");
            return Ok(true);
        }
        if self.matches_glob(path) {
            debug!(path = %path, "Ignoring path matched by ignore pattern");
            return Ok(true);
        }
        if self.crosses_symlink(path) {
            debug!(path = %path, "Ignoring symlinked path");
            return Ok(true);
        }
        match &self.extra {
            Some(predicate) => predicate.evaluate(path),
            None => Ok(false),
        }
    }
}

/// Patterns from an ignore file, one per line; `#` starts a comment line.
fn read_ignore_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.trim_start_matches('/').to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
