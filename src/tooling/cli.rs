//! CLI Tooling
//!
//! Command-line interface over the reconciler. Every command is read-only with
//! respect to the datasite: it reports what would move, never moves it.

use crate::change::ChangeRecord;
use crate::classify::PathPredicate;
use crate::compare::Resolution;
use crate::config::{ConfigLoader, SyncConfig};
use crate::error::ApiError;
use crate::ignore::PathFilter;
use crate::logging::{LogFormat, LogOutput, LogOverrides};
use crate::metadata::{FileMetadata, FileState};
use crate::reconcile::{DatasiteReconciler, ReconcileResult};
use crate::remote::{write_snapshot, SnapshotRemoteState};
use crate::tree::{ContentHasher, FsContentHasher, WalkerConfig};
use crate::types::Side;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Sitesync CLI - datasite reconciliation
#[derive(Parser)]
#[command(name = "sitesync")]
#[command(about = "Compute what must sync between a local datasite and its remote state")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root, searched for sitesync.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<LogOutput>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging flags, which take precedence over environment and config.
    pub fn log_overrides(&self) -> LogOverrides {
        LogOverrides {
            level: self.log_level.clone(),
            format: self.log_format,
            output: self.log_output,
            file: self.log_file.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diff a datasite against a remote snapshot and list the queued changes
    Reconcile {
        /// Local datasite root
        #[arg(long)]
        root: PathBuf,
        /// Remote snapshot: one manifest file, or a directory of <datasite>.json
        #[arg(long)]
        remote: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Report whether a datasite is in sync with a remote snapshot
    Status {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        remote: PathBuf,
    },
    /// Hash a local datasite and write its state as a snapshot manifest
    Snapshot {
        #[arg(long)]
        root: PathBuf,
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Reconcile { .. } => "reconcile",
        Commands::Status { .. } => "status",
        Commands::Snapshot { .. } => "snapshot",
    }
}

/// Loaded configuration plus the runtime commands execute on.
pub struct CliContext {
    config: SyncConfig,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    /// Load configuration from `config_path`, or from the workspace and environment.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(&workspace_root),
        }
        .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;

        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute a CLI command, returning the text to print.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Reconcile {
                root,
                remote,
                format,
            } => {
                if format != "text" && format != "json" {
                    return Err(ApiError::ConfigError(format!(
                        "Invalid format: {} (must be 'text' or 'json')",
                        format
                    )));
                }
                let root = resolve_root(root);
                let reconciler = self.reconciler(remote);
                let result = self
                    .runtime
                    .block_on(reconciler.reconcile(&root))
                    .into_result()?;
                if format == "json" {
                    format_result_json(&result)
                } else {
                    Ok(format_result_text(&result))
                }
            }
            Commands::Status { root, remote } => {
                let root = resolve_root(root);
                let reconciler = self.reconciler(remote);
                let in_sync = self.runtime.block_on(reconciler.is_in_sync(&root))?;
                let datasite = DatasiteReconciler::datasite_name(&root);
                Ok(if in_sync {
                    format!("{}: {}", datasite, "in sync".green())
                } else {
                    format!("{}: {}", datasite, "out of sync".yellow())
                })
            }
            Commands::Snapshot { root, out } => {
                let root = resolve_root(root);
                let state = self.snapshot_state(&root)?;
                match out {
                    Some(path) => {
                        write_snapshot(path, &state)?;
                        Ok(format!(
                            "Wrote {} entries to {}",
                            state.len(),
                            path.display()
                        ))
                    }
                    None => {
                        let entries: Vec<&FileMetadata> = state.iter().collect();
                        serde_json::to_string_pretty(&entries).map_err(|e| {
                            ApiError::Snapshot(format!("Failed to serialize snapshot: {}", e))
                        })
                    }
                }
            }
        }
    }

    /// Local state as reconcile would see it: ignored paths are left out.
    fn snapshot_state(&self, root: &Path) -> Result<FileState, ApiError> {
        let hasher = FsContentHasher::new(self.walker_config());
        let state = self
            .runtime
            .block_on(hasher.hash_tree(root))
            .map_err(|e| ApiError::Snapshot(e.to_string()))?;
        let filter = PathFilter::from_config(root, &self.config.reconciler)?;

        let mut kept = FileState::new();
        for metadata in state.into_entries() {
            let ignored = filter
                .evaluate(&metadata.path)
                .map_err(|e| ApiError::Snapshot(format!("{}: {}", metadata.path, e)))?;
            if !ignored {
                kept.insert(metadata);
            }
        }
        Ok(kept)
    }

    fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            skip_hidden: self.config.reconciler.ignore_hidden_files,
        }
    }

    fn reconciler(&self, remote: &Path) -> DatasiteReconciler {
        DatasiteReconciler::new(
            self.config.reconciler.clone(),
            Arc::new(FsContentHasher::new(self.walker_config())),
            Arc::new(SnapshotRemoteState::new(remote)),
        )
    }
}

/// Canonical form of a root so `.` still yields a datasite name.
fn resolve_root(root: &Path) -> PathBuf {
    dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

fn direction(change: &ChangeRecord) -> &'static str {
    match change.authoritative_side {
        Side::Local => "upload",
        Side::Remote => "download",
    }
}

fn resolution_label(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::OnlyOneSide => "one side",
        Resolution::NewerWins => "newer",
        Resolution::TieBreak => "tie-break",
    }
}

fn format_result_text(result: &ReconcileResult) -> String {
    let summary = result.summary();
    let mut out = String::new();

    if result.has_changes() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Queue", "Path", "Direction", "Kind", "Resolved by", "Size"]);
        for change in result.changes() {
            let queue = if change.is_permission_file {
                "permission"
            } else {
                "file"
            };
            table.add_row(vec![
                queue.to_string(),
                change.path.to_string(),
                direction(change).to_string(),
                format!("{:?}", change.kind).to_lowercase(),
                resolution_label(change.resolution).to_string(),
                change.file_size.to_string(),
            ]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
    } else {
        out.push_str(&format!("{}\n", "Nothing to sync.".green()));
    }

    if !result.per_path_errors.is_empty() {
        out.push_str(&format!("\n{}\n", "Skipped paths".bold().underline()));
        for error in &result.per_path_errors {
            out.push_str(&format!("  {} {}\n", "!".red(), error));
        }
    }

    out.push_str(&format!(
        "\n{} queued ({} permission), {} in sync, {} ignored, {} skipped",
        summary.queued,
        summary.permission_changes,
        summary.in_sync,
        summary.ignored,
        summary.failed
    ));
    out
}

fn format_result_json(result: &ReconcileResult) -> Result<String, ApiError> {
    let errors: Vec<serde_json::Value> = result
        .per_path_errors
        .iter()
        .map(|e| json!({ "path": e.path, "error": e.kind.to_string() }))
        .collect();
    let value = json!({
        "datasite_root": result.datasite_root,
        "summary": result.summary(),
        "permission_changes": result.permission_changes,
        "file_changes": result.file_changes,
        "errors": errors,
    });
    serde_json::to_string_pretty(&value)
        .map_err(|e| ApiError::Snapshot(format!("Failed to serialize result: {}", e)))
}
