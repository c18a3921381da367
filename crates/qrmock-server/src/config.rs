//! Configuration management for the mock runtime server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QRMOCK_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::server::ExecutionLimits;

/// API versions accepted in the `IBM-API-Version` header by default.
pub const DEFAULT_API_VERSIONS: [&str; 3] = ["2024-01-01", "2025-01-01", "2025-05-01"];

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_address")]
    pub address: String,

    /// Bearer token required on `/v1` routes; any token is accepted when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Allowed CORS origins; `*` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Accepted `IBM-API-Version` header values
    #[serde(default = "default_api_versions")]
    pub supported_api_versions: Vec<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("cors_origins", &self.cors_origins)
            .field("supported_api_versions", &self.supported_api_versions)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            api_key: None,
            cors_origins: default_cors_origins(),
            supported_api_versions: default_api_versions(),
        }
    }
}

/// Job execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Period of the session expiry sweep in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Maximum number of jobs running at once (unbounded when unset)
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,

    /// Maximum number of jobs waiting for a slot (unbounded when unset)
    #[serde(default)]
    pub max_queued_jobs: Option<usize>,

    /// Artificial latency added to every job, in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Seed mixed into synthetic results
    #[serde(default)]
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval(),
            max_concurrent_jobs: None,
            max_queued_jobs: None,
            latency_ms: 0,
            seed: 0,
        }
    }
}

impl EngineConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_queued_jobs: self.max_queued_jobs,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_api_versions() -> Vec<String> {
    DEFAULT_API_VERSIONS.iter().map(|v| v.to_string()).collect()
}

fn default_sweep_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided, else defaults
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `QRMOCK_*` overrides read through `lookup`.
    ///
    /// Only variables that are present override the current values.
    pub fn merge_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Server
        if let Some(v) = lookup("QRMOCK_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = lookup("QRMOCK_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = lookup("QRMOCK_CORS_ORIGINS") {
            self.server.cors_origins = split_list(&v);
        }
        if let Some(v) = lookup("QRMOCK_API_VERSIONS") {
            self.server.supported_api_versions = split_list(&v);
        }

        // Logging
        if let Some(v) = lookup("QRMOCK_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("QRMOCK_LOG_FORMAT") {
            self.logging.format = v;
        }

        // Engine
        if let Some(v) = lookup("QRMOCK_SWEEP_INTERVAL") {
            self.engine.sweep_interval_seconds = parse_var("QRMOCK_SWEEP_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("QRMOCK_MAX_CONCURRENT_JOBS") {
            self.engine.max_concurrent_jobs = Some(parse_var("QRMOCK_MAX_CONCURRENT_JOBS", &v)?);
        }
        if let Some(v) = lookup("QRMOCK_MAX_QUEUED_JOBS") {
            self.engine.max_queued_jobs = Some(parse_var("QRMOCK_MAX_QUEUED_JOBS", &v)?);
        }
        if let Some(v) = lookup("QRMOCK_ENGINE_LATENCY_MS") {
            self.engine.latency_ms = parse_var("QRMOCK_ENGINE_LATENCY_MS", &v)?;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.address()?;

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        if self.engine.sweep_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.engine.max_concurrent_jobs == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_concurrent_jobs must be greater than 0".to_string(),
            ));
        }
        if self.engine.max_queued_jobs.is_some() && self.engine.max_concurrent_jobs.is_none() {
            return Err(ConfigError::ValidationError(
                "max_queued_jobs requires max_concurrent_jobs".to_string(),
            ));
        }

        if self.server.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "api_key must not be empty; omit the field to disable authentication".to_string(),
            ));
        }
        if self.server.supported_api_versions.is_empty() {
            return Err(ConfigError::ValidationError(
                "supported_api_versions must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed bind address.
    pub fn address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid server address: {}", self.server.address))
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("Invalid value for {key}: {value}")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
