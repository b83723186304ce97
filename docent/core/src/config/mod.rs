//! TOML Configuration File Support
//!
//! This module provides centralized configuration loading for docent,
//! supporting a TOML configuration file at `~/.config/docent/docent.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/docent/docent.toml` (typically `~/.config/docent/docent.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8000/api"
//! ask_path = "/ask/stream"
//! health_path = "/health"
//! connect_timeout_ms = 5000
//!
//! [session]
//! max_question_length = 1000
//! snapshot_capacity = 64
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default answer service URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default path of the streaming ask endpoint
pub const DEFAULT_ASK_PATH: &str = "/ask/stream";

/// Default path of the health endpoint
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Longest question the service accepts, in characters
pub const DEFAULT_MAX_QUESTION_LENGTH: usize = 1000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Answer service base URL
    pub base_url: Option<String>,

    /// Path of the streaming ask endpoint
    pub ask_path: Option<String>,

    /// Path of the health endpoint
    pub health_path: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Maximum question length in characters
    pub max_question_length: Option<usize>,

    /// Buffered snapshots between the session and its observer
    pub snapshot_capacity: Option<usize>,
}

/// Complete TOML configuration file structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocentToml {
    /// Server settings
    pub server: ServerToml,

    /// Session settings
    pub session: SessionToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Where and how to reach the answer service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSettings {
    /// Base URL, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Path of the streaming ask endpoint (leading `/`)
    pub ask_path: String,
    /// Path of the health endpoint (leading `/`)
    pub health_path: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ask_path: DEFAULT_ASK_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            connect_timeout: Duration::from_millis(5000),
        }
    }
}

/// Limits applied by the ask session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Questions longer than this many characters are rejected
    pub max_question_length: usize,
    /// Capacity of the snapshot channel surfaces should create
    pub snapshot_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_question_length: DEFAULT_MAX_QUESTION_LENGTH,
            snapshot_capacity: 64,
        }
    }
}

/// Fully resolved configuration
#[derive(Clone, Debug)]
pub struct DocentConfig {
    /// Server settings
    pub server: ServerSettings,
    /// Session settings
    pub session: SessionSettings,
    /// Path to the config file (if loaded from file)
    pub config_file_path: Option<PathBuf>,
    /// Highest-priority source that contributed a value
    source: ConfigSource,
}

impl Default for DocentConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            session: SessionSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl DocentConfig {
    /// Get the configuration source
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check that the resolved values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.server.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "server.base_url must not be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "server.base_url must start with http:// or https://, got {base_url}"
            )));
        }
        if self.session.max_question_length == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_question_length must be greater than 0".to_string(),
            ));
        }
        if self.server.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "server.connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.snapshot_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "session.snapshot_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Make sure an endpoint path starts with `/`
fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/docent/docent.toml` or
/// `~/.config/docent/docent.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("docent").join("docent.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed. A missing
/// config file is not an error. Values are not validated here; call
/// [`DocentConfig::validate`] once CLI overrides have been applied.
pub fn load_config() -> Result<DocentConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<DocentConfig, ConfigError> {
    let mut config = DocentConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: DocentToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut DocentConfig, toml: &DocentToml) {
    if let Some(ref url) = toml.server.base_url {
        config.server.base_url = url.clone();
    }
    if let Some(ref path) = toml.server.ask_path {
        config.server.ask_path = normalize_path(path);
    }
    if let Some(ref path) = toml.server.health_path {
        config.server.health_path = normalize_path(path);
    }
    if let Some(ms) = toml.server.connect_timeout_ms {
        config.server.connect_timeout = Duration::from_millis(ms);
    }

    if let Some(length) = toml.session.max_question_length {
        config.session.max_question_length = length;
    }
    if let Some(capacity) = toml.session.snapshot_capacity {
        config.session.snapshot_capacity = capacity;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut DocentConfig) {
    apply_env_lookup(config, |name| std::env::var(name).ok());
}

/// Apply overrides from any variable lookup (the process environment in production)
fn apply_env_lookup(config: &mut DocentConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("DOCENT_BASE_URL") {
        config.server.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(path) = lookup("DOCENT_ASK_PATH") {
        config.server.ask_path = normalize_path(&path);
        config.source = ConfigSource::Env;
    }
    if let Some(path) = lookup("DOCENT_HEALTH_PATH") {
        config.server.health_path = normalize_path(&path);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = lookup("DOCENT_CONNECT_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.server.connect_timeout = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(length) =
        lookup("DOCENT_MAX_QUESTION_LENGTH").and_then(|v| v.parse::<usize>().ok())
    {
        config.session.max_question_length = length;
        config.source = ConfigSource::Env;
    }
    if let Some(capacity) =
        lookup("DOCENT_SNAPSHOT_CAPACITY").and_then(|v| v.parse::<usize>().ok())
    {
        config.session.snapshot_capacity = capacity;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides,
/// then call [`DocentConfig::validate`] again.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Ask path override
    pub ask_path: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Maximum question length override
    pub max_question_length: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set ask path override
    #[must_use]
    pub fn with_ask_path(mut self, path: String) -> Self {
        self.ask_path = Some(path);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set maximum question length override
    #[must_use]
    pub fn with_max_question_length(mut self, length: usize) -> Self {
        self.max_question_length = Some(length);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.ask_path.is_none()
            && self.connect_timeout_ms.is_none()
            && self.max_question_length.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut DocentConfig) {
        if let Some(ref url) = self.base_url {
            config.server.base_url = url.clone();
        }
        if let Some(ref path) = self.ask_path {
            config.server.ask_path = normalize_path(path);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.server.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(length) = self.max_question_length {
            config.session.max_question_length = length;
        }

        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }
    }
}
