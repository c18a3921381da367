//! Logging setup.
//!
//! Console output for development, JSON structured logging for anything that
//! ships logs to a collector.

use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable console output.
    #[default]
    Console,
    /// One JSON object per event.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" | "pretty" => Ok(TracingFormat::Console),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!("Invalid log format: {other}")),
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive (e.g., "info", "qrmock_server=debug").
    pub log_level: String,
    pub format: TracingFormat,
    /// Reported once at startup.
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: TracingFormat::Console,
            service_name: "qrmock-server".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn new(log_level: impl Into<String>, format: TracingFormat) -> Self {
        Self {
            log_level: log_level.into(),
            format,
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// - `RUST_LOG`: filter directive (default: "info")
    /// - `QRMOCK_LOG_FORMAT`: "console" or "json" (default: "console")
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("QRMOCK_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        Self {
            log_level,
            format,
            ..Self::default()
        }
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        TracingFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        TracingFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(service = %config.service_name, format = ?config.format, "Tracing initialized");
    Ok(())
}

/// Initialize tracing with configuration from the environment.
pub fn init_default_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(TracingConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, TracingFormat::Console);
        assert_eq!(config.service_name, "qrmock-server");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert_eq!("console".parse::<TracingFormat>().unwrap(), TracingFormat::Console);
        assert!("xml".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn test_custom_config() {
        let config = TracingConfig::new("debug", TracingFormat::Json);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.service_name, "qrmock-server");
    }
}
