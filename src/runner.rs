//! Project CLI invocation.
//!
//! The reconciliation core never spawns processes directly; it talks to a
//! `CliRunner`, which the editor glue (or a test) provides. The system
//! implementation wraps `tokio::process` and applies the error taxonomy:
//! executable-not-found gets a distinct installation-guidance error, any
//! other failure carries the sanitized stderr text.

use crate::error::ApiError;
use crate::parse::sanitize_cli_text;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured output of one successful CLI invocation.
#[derive(Debug, Clone)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Process-invocation collaborator contract.
#[async_trait]
pub trait CliRunner: Send + Sync {
    /// Invoke the project CLI in `root` with the given arguments, capturing
    /// stdout and stderr separately.
    async fn run(&self, root: &Path, args: &[String]) -> Result<CliOutput, ApiError>;

    /// Executable name, for error messages.
    fn command(&self) -> &str;
}

/// Runs the real executable via `tokio::process`.
pub struct SystemCliRunner {
    command: String,
}

impl SystemCliRunner {
    pub fn new(command: impl Into<String>) -> Self {
        SystemCliRunner {
            command: command.into(),
        }
    }
}

#[async_trait]
impl CliRunner for SystemCliRunner {
    async fn run(&self, root: &Path, args: &[String]) -> Result<CliOutput, ApiError> {
        debug!(command = %self.command, args = ?args, root = %root.display(), "invoking project CLI");
        let output = Command::new(&self.command)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ApiError::ToolNotFound {
                        command: self.command.clone(),
                    }
                } else {
                    ApiError::Io(err)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let message = sanitize_cli_text(&stderr);
            let message = if message.is_empty() {
                format!("`{}` exited with {}", self.command, output.status)
            } else {
                message
            };
            return Err(ApiError::ToolFailed(message));
        }

        Ok(CliOutput { stdout, stderr })
    }

    fn command(&self) -> &str {
        &self.command
    }
}
