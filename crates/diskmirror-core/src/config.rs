//! Configuration module for DiskMirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::RemoteFolder;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DiskMirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Reconciliation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory whose files are mirrored.
    pub local_folder: PathBuf,
    /// Seconds between reconciliation cycles.
    pub poll_interval: u64,
    /// Maximum number of remote operations in flight within one batch.
    pub max_concurrent: usize,
    /// Seconds between attempts to create the remote folder at startup.
    pub folder_retry_delay: u64,
}

/// Remote storage (Yandex Disk REST API) settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// OAuth token. Usually supplied through `DISKMIRROR_TOKEN`.
    pub token: Option<String>,
    /// Remote folder receiving the mirror, e.g. `/Mirror` or `disk:/Mirror`.
    pub cloud_folder: String,
    /// API base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    /// Number of entries requested per listing page.
    pub page_size: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
    /// Optional log file; stderr only when unset.
    pub file: Option<PathBuf>,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("cloud_folder", &self.cloud_folder)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

/// Environment variables that override file values.
pub const ENV_TOKEN: &str = "DISKMIRROR_TOKEN";
pub const ENV_LOCAL_FOLDER: &str = "DISKMIRROR_LOCAL_FOLDER";
pub const ENV_CLOUD_FOLDER: &str = "DISKMIRROR_CLOUD_FOLDER";
pub const ENV_POLL_INTERVAL: &str = "DISKMIRROR_POLL_INTERVAL";
pub const ENV_LOG_FILE: &str = "DISKMIRROR_LOG_FILE";

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/diskmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("diskmirror")
            .join("config.yaml")
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    /// Returns an error if `DISKMIRROR_POLL_INTERVAL` is not an integer.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_TOKEN) {
            self.remote.token = Some(token);
        }
        if let Some(folder) = get(ENV_LOCAL_FOLDER) {
            self.sync.local_folder = PathBuf::from(folder);
        }
        if let Some(folder) = get(ENV_CLOUD_FOLDER) {
            self.remote.cloud_folder = folder;
        }
        if let Some(interval) = get(ENV_POLL_INTERVAL) {
            self.sync.poll_interval = interval
                .trim()
                .parse()
                .with_context(|| format!("{ENV_POLL_INTERVAL} must be an integer: {interval}"))?;
        }
        if let Some(file) = get(ENV_LOG_FILE) {
            self.logging.file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Local folder with a leading `~` expanded to the home directory.
    pub fn resolved_local_folder(&self) -> PathBuf {
        expand_tilde(&self.sync.local_folder)
    }

    /// Settings handed to the reconciler.
    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            poll_interval: Duration::from_secs(self.sync.poll_interval),
            max_concurrent: self.sync.max_concurrent,
            folder_retry_delay: Duration::from_secs(self.sync.folder_retry_delay),
        }
    }
}

/// Expands a leading `~` component using the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// ReconcilerSettings
// ---------------------------------------------------------------------------

/// Immutable settings of the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Pause between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Worker limit for each batch of remote operations.
    pub max_concurrent: usize,
    /// Fixed backoff between startup attempts to create the remote folder.
    pub folder_retry_delay: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Config::default().reconciler_settings()
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_folder: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("DiskMirror"),
            poll_interval: 30,
            max_concurrent: 10,
            folder_retry_delay: 5,
        }
    }
}

/// Default Yandex Disk REST API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net";

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token: None,
            cloud_folder: "/DiskMirror".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: 60,
            page_size: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
pub const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Upper bound for `sync.max_concurrent`.
const MAX_CONCURRENT_LIMIT: usize = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- sync ---
        if self.sync.poll_interval == 0 {
            push("sync.poll_interval", "must be greater than 0".into());
        }
        if self.sync.max_concurrent == 0 || self.sync.max_concurrent > MAX_CONCURRENT_LIMIT {
            push(
                "sync.max_concurrent",
                format!("must be in range 1..={MAX_CONCURRENT_LIMIT}"),
            );
        }
        if self.sync.folder_retry_delay == 0 {
            push("sync.folder_retry_delay", "must be greater than 0".into());
        }
        let local_folder = self.resolved_local_folder();
        if !local_folder.is_dir() {
            push(
                "sync.local_folder",
                format!("directory does not exist: {}", local_folder.display()),
            );
        }

        // --- remote ---
        match self.remote.token.as_deref() {
            None => push(
                "remote.token",
                format!("missing; set it in the config file or via {ENV_TOKEN}"),
            ),
            Some(token) if token.trim().is_empty() => {
                push("remote.token", "must not be empty".into());
            }
            Some(_) => {}
        }
        if let Err(e) = RemoteFolder::new(self.remote.cloud_folder.clone()) {
            push("remote.cloud_folder", e.to_string());
        }
        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            push(
                "remote.base_url",
                format!("must be an http(s) URL: {}", self.remote.base_url),
            );
        }
        if self.remote.request_timeout == 0 {
            push("remote.request_timeout", "must be greater than 0".into());
        }
        if self.remote.page_size == 0 {
            push("remote.page_size", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format",
                format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            );
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
/// use diskmirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_folder(PathBuf::from("/home/user/Mirror"))
///     .cloud_folder("/Mirror")
///     .token("secret")
///     .poll_interval(60)
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

    // --- sync ---

    pub fn local_folder(mut self, folder: PathBuf) -> Self {
        self.config.sync.local_folder = folder;
        self
    }

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent = n;
        self
    }

    pub fn folder_retry_delay(mut self, seconds: u64) -> Self {
        self.config.sync.folder_retry_delay = seconds;
        self
    }

    // --- remote ---

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.remote.token = Some(token.into());
        self
    }

    pub fn cloud_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.remote.cloud_folder = folder.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.config.remote.request_timeout = seconds;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.config.remote.page_size = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
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
