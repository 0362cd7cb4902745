//! Logging System
//!
//! One global `tracing` subscriber. Every setting is resolved with the same
//! precedence: command-line flag, then `SITESYNC_LOG*` environment variable,
//! then [`LoggingConfig`], then the built-in default.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const ENV_FILTER: &str = "SITESYNC_LOG";
const ENV_FORMAT: &str = "SITESYNC_LOG_FORMAT";
const ENV_OUTPUT: &str = "SITESYNC_LOG_OUTPUT";
const ENV_MODULES: &str = "SITESYNC_LOG_MODULES";
const ENV_FILE: &str = "SITESYNC_LOG_FILE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    /// stdout and stderr
    #[serde(rename = "both")]
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(format!(
                "unknown log output '{}' (expected stdout, stderr, file, file+stderr or both)",
                other
            )),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
            LogOutput::FileAndStderr => "file+stderr",
            LogOutput::Both => "both",
        })
    }
}

/// `[logging]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// trace, debug, info, warn, error or off
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file when `output` writes one; a per-user state directory otherwise.
    pub file: Option<PathBuf>,
    /// ANSI colours for text output on a terminal
    pub color: bool,
    /// Per-target levels, e.g. `sitesync::reconcile = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: None,
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct LogOverrides {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    pub output: Option<LogOutput>,
    pub file: Option<PathBuf>,
}

/// Fully resolved subscriber settings.
#[derive(Debug, Clone, PartialEq)]
struct LogSettings {
    filter: String,
    format: LogFormat,
    output: LogOutput,
    file: Option<PathBuf>,
    color: bool,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig, overrides: &LogOverrides) -> Result<(), ApiError> {
    let install_error = |e: tracing_subscriber::util::TryInitError| {
        ApiError::ConfigError(format!("Failed to install logger: {}", e))
    };

    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(install_error);
    }

    let settings = resolve(config, overrides, |key| std::env::var(key).ok())?;
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|e| ApiError::ConfigError(format!("Invalid log filter '{}': {}", settings.filter, e)))?;
    let writer = make_writer(&settings)?;

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339());
    let layer = match settings.format {
        LogFormat::Json => layer.json().with_writer(writer).boxed(),
        LogFormat::Text => layer.with_ansi(settings.color).with_writer(writer).boxed(),
    };

    Registry::default()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(install_error)
}

/// Apply precedence to every setting. `env` looks up one environment variable.
fn resolve(
    config: &LoggingConfig,
    overrides: &LogOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LogSettings, ApiError> {
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let format = match (overrides.format, env(ENV_FORMAT)) {
        (Some(format), _) => format,
        (None, Some(raw)) => raw.parse().map_err(invalid_env(ENV_FORMAT))?,
        (None, None) => config.format,
    };
    let output = match (overrides.output, env(ENV_OUTPUT)) {
        (Some(output), _) => output,
        (None, Some(raw)) => raw.parse().map_err(invalid_env(ENV_OUTPUT))?,
        (None, None) => config.output,
    };

    let file = if output.writes_file() {
        let path = overrides
            .file
            .clone()
            .or_else(|| env(ENV_FILE).map(PathBuf::from))
            .or_else(|| config.file.clone());
        Some(match path {
            Some(path) => path,
            None => default_log_file()?,
        })
    } else {
        None
    };

    // A full SITESYNC_LOG filter replaces level and modules unless the CLI set a level.
    let filter = match (&overrides.level, env(ENV_FILTER)) {
        (None, Some(filter)) => filter,
        (level, _) => {
            let level = level.as_deref().unwrap_or(&config.level);
            let mut directives = vec![level.to_string()];
            if level != "off" {
                directives.extend(config.modules.iter().map(|(m, l)| format!("{}={}", m, l)));
                if let Some(modules) = env(ENV_MODULES) {
                    directives.extend(parse_module_directives(&modules));
                }
            }
            directives.join(",")
        }
    };

    Ok(LogSettings {
        filter,
        format,
        output,
        file,
        color: config.color && !output.writes_file(),
    })
}

fn invalid_env(key: &'static str) -> impl Fn(String) -> ApiError {
    move |reason| ApiError::ConfigError(format!("{}: {}", key, reason))
}

/// `<state dir>/sitesync.log`; the data dir where the platform has no state dir.
fn default_log_file() -> Result<PathBuf, ApiError> {
    let dirs = directories::ProjectDirs::from("", "sitesync", "sitesync").ok_or_else(|| {
        ApiError::ConfigError("Could not determine a directory for the log file".to_string())
    })?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(dir.join("sitesync.log"))
}

fn make_writer(settings: &LogSettings) -> Result<BoxMakeWriter, ApiError> {
    let file = match &settings.file {
        Some(path) => Some(Arc::new(open_log_file(path)?)),
        None => None,
    };
    Ok(match (settings.output, file) {
        (LogOutput::File, Some(file)) => BoxMakeWriter::new(file),
        (LogOutput::FileAndStderr, Some(file)) => BoxMakeWriter::new(file.and(std::io::stderr)),
        (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
        (LogOutput::Both, _) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        _ => BoxMakeWriter::new(std::io::stderr),
    })
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::ConfigError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {}: {}", path.display(), e)))
}

/// `module=level` pairs separated by commas; malformed pairs are dropped.
fn parse_module_directives(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|pair| {
            let (module, level) = pair.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            (!module.is_empty() && !level.is_empty()).then(|| format!("{}={}", module, level))
        })
        .collect()
}
