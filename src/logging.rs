//! Logging System
//!
//! Structured logging via the `tracing` crate: configurable level, text or
//! json format, stdout or stderr destination. Level resolution prefers the
//! `PROJTREE_LOG` environment variable over the configured level.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr (default: stderr)
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
        }
    }
}

/// Initialize global logging. Safe to call once per process; a second call
/// reports a configuration error from the subscriber.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let config = config.cloned().unwrap_or_default();
    if !config.enabled || config.level == "off" {
        return Ok(());
    }

    let filter = match std::env::var("PROJTREE_LOG") {
        Ok(spec) if !spec.is_empty() => EnvFilter::try_new(spec),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| ApiError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match (config.format.as_str(), config.output.as_str()) {
        ("json", "stdout") => builder.json().try_init(),
        ("json", _) => builder.json().with_writer(std::io::stderr).try_init(),
        (_, "stdout") => builder.try_init(),
        _ => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| ApiError::ConfigError(format!("Failed to initialize logging: {}", e)))
}
