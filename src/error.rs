//! Error types for the projtree reconciliation core.
//!
//! Parse failures are deliberately absent from this taxonomy: malformed CLI
//! output and malformed declarative config degrade to empty results inside the
//! parsers, never to errors. Only tool invocation and our own configuration
//! can fail loudly.

use thiserror::Error;

/// Library-level errors surfaced to callers and, ultimately, the editor UI.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The external project CLI executable could not be located at all.
    #[error(
        "Project CLI executable `{command}` was not found. \
         Install the project CLI and verify it is available on your PATH."
    )]
    ToolNotFound { command: String },

    /// The external project CLI ran but exited with a failure. The message is
    /// the sanitized (ANSI-stripped, whitespace-collapsed) stderr text, or a
    /// generic fallback when stderr was empty.
    #[error("{0}")]
    ToolFailed(String),

    /// Invalid projtree settings or logging setup.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error spawning the CLI or reading workspace files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
