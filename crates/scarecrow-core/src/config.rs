//! Configuration module for scarecrow-upload.
//!
//! Provides typed configuration structs that map to the optional YAML
//! configuration file, with loading, validation, defaults, and a builder
//! pattern for programmatic use. Also loads the JSON folder mapping that names
//! the shared root folder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DomainError, RemoteId};
use crate::retry::{Backoff, RetryPolicy};

/// Default location of the service-account key.
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "/etc/scarecrow-upload/google-service-key.json";

/// Default location of the folder mapping.
pub const DEFAULT_FOLDER_MAPPING: &str = "/etc/scarecrow-upload/mapping.json";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for scarecrow-upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drive: DriveConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub fetch: FetchConfig,
}

/// Storage credentials and root mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Service-account key JSON file.
    pub service_account_file: PathBuf,
    /// JSON file mapping root names to folder identifiers.
    pub folder_mapping: PathBuf,
}

/// Retry policy applied to every remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub initial_backoff_secs: u64,
    /// Upper bound for a single delay, in seconds.
    pub max_backoff_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file written in addition to stderr.
    pub file: Option<PathBuf>,
}

/// Capture retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Directory searched for capture files on every host.
    pub remote_directory: String,
    /// Local directory receiving one sub-directory per host.
    pub local_directory: PathBuf,
    /// IANA timezone used to compute the capture date.
    pub timezone: String,
    /// SSH connection timeout in seconds.
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path`, or return [`Config::default`] if the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_yaml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/scarecrow/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("scarecrow")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            service_account_file: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_FILE),
            folder_mapping: PathBuf::from(DEFAULT_FOLDER_MAPPING),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_secs: 1,
            max_backoff_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            remote_directory: "/var/local/scarecrow/detected/".to_string(),
            local_directory: PathBuf::from("/var/local/scarecrow-upload/"),
            timezone: "Europe/Budapest".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    /// The retry policy described by this section.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Backoff::exponential(
                Duration::from_secs(self.initial_backoff_secs),
                Duration::from_secs(self.max_backoff_secs),
            ),
        )
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"retry.max_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- retry ---
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retry.max_backoff_secs < self.retry.initial_backoff_secs {
            errors.push(ValidationError {
                field: "retry.max_backoff_secs".into(),
                message: format!(
                    "max_backoff_secs ({}) must not be below initial_backoff_secs ({})",
                    self.retry.max_backoff_secs, self.retry.initial_backoff_secs
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- fetch ---
        if self.fetch.remote_directory.trim().is_empty() {
            errors.push(ValidationError {
                field: "fetch.remote_directory".into(),
                message: "must not be empty".into(),
            });
        }
        if self.fetch.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ValidationError {
                field: "fetch.timezone".into(),
                message: format!("unknown timezone '{}'", self.fetch.timezone),
            });
        }
        if self.fetch.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "fetch.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use scarecrow_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .folder_mapping(PathBuf::from("/etc/scarecrow-upload/mapping.json"))
///     .retry_max_attempts(3)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an already loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // -- drive --

    pub fn service_account_file(mut self, path: PathBuf) -> Self {
        self.config.drive.service_account_file = path;
        self
    }

    pub fn folder_mapping(mut self, path: PathBuf) -> Self {
        self.config.drive.folder_mapping = path;
        self
    }

    // -- retry --

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_backoff_secs(mut self, initial: u64, max: u64) -> Self {
        self.config.retry.initial_backoff_secs = initial;
        self.config.retry.max_backoff_secs = max;
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // -- fetch --

    pub fn fetch_remote_directory(mut self, dir: impl Into<String>) -> Self {
        self.config.fetch.remote_directory = dir.into();
        self
    }

    pub fn fetch_local_directory(mut self, dir: PathBuf) -> Self {
        self.config.fetch.local_directory = dir;
        self
    }

    pub fn fetch_timezone(mut self, tz: impl Into<String>) -> Self {
        self.config.fetch.timezone = tz.into();
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch.timeout_secs = secs;
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// FolderMapping
// ---------------------------------------------------------------------------

/// Errors raised while loading startup configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Folder mapping {} has no \"root\" entry", path.display())]
    MissingRoot { path: PathBuf },

    #[error("Folder mapping entry '{name}' is not a valid folder id: {source}")]
    InvalidFolderId {
        name: String,
        #[source]
        source: DomainError,
    },
}

/// Named remote root folders, loaded from JSON such as
/// `{"root": "<folder-id>", "archive": "<folder-id>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    roots: BTreeMap<String, RemoteId>,
}

impl FolderMapping {
    /// Key of the mandatory shared root entry.
    pub const ROOT_KEY: &'static str = "root";

    /// Load and validate the mapping file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse mapping JSON; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        if !raw.contains_key(Self::ROOT_KEY) {
            return Err(ConfigError::MissingRoot {
                path: origin.to_path_buf(),
            });
        }

        let roots = raw
            .into_iter()
            .map(|(name, id)| match RemoteId::new(id) {
                Ok(id) => Ok((name, id)),
                Err(source) => Err(ConfigError::InvalidFolderId { name, source }),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { roots })
    }

    /// Identifier of the shared root folder.
    pub fn root(&self) -> &RemoteId {
        // Presence is checked in `parse`, the only constructor.
        &self.roots[Self::ROOT_KEY]
    }

    /// Identifier of another named root, if configured.
    pub fn get(&self, name: &str) -> Option<&RemoteId> {
        self.roots.get(name)
    }

    /// All configured root names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }
}
