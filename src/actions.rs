//! Action invocations.
//!
//! Translates UI actions into project CLI invocations: run a task or flow,
//! connect a service, set or clear the default org, remove an org. These are
//! thin command builders over the runner; a genuine tool failure is never
//! swallowed, it surfaces with the sanitized CLI message.

use crate::error::ApiError;
use crate::runner::CliRunner;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Action service over a CLI runner.
pub struct ActionService {
    runner: Arc<dyn CliRunner>,
}

impl ActionService {
    pub fn new(runner: Arc<dyn CliRunner>) -> Self {
        ActionService { runner }
    }

    /// Run a task, with optional extra CLI arguments. Returns stdout.
    pub async fn run_task(
        &self,
        root: &Path,
        name: &str,
        extra_args: &[String],
    ) -> Result<String, ApiError> {
        let mut args = vec!["task".to_string(), "run".to_string(), name.to_string()];
        args.extend_from_slice(extra_args);
        self.invoke(root, args).await
    }

    /// Run a flow. Returns stdout.
    pub async fn run_flow(
        &self,
        root: &Path,
        name: &str,
        extra_args: &[String],
    ) -> Result<String, ApiError> {
        let mut args = vec!["flow".to_string(), "run".to_string(), name.to_string()];
        args.extend_from_slice(extra_args);
        self.invoke(root, args).await
    }

    /// Connect a service instance of the given type.
    pub async fn connect_service(
        &self,
        root: &Path,
        service_type: &str,
        name: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut args = vec![
            "service".to_string(),
            "connect".to_string(),
            service_type.to_string(),
        ];
        if let Some(name) = name {
            args.push(name.to_string());
        }
        self.invoke(root, args).await
    }

    /// Make `alias` the default org for this project.
    pub async fn set_default_org(&self, root: &Path, alias: &str) -> Result<String, ApiError> {
        self.invoke(
            root,
            vec!["org".to_string(), "default".to_string(), alias.to_string()],
        )
        .await
    }

    /// Clear the project's default org.
    pub async fn clear_default_org(&self, root: &Path) -> Result<String, ApiError> {
        self.invoke(
            root,
            vec![
                "org".to_string(),
                "default".to_string(),
                "--unset".to_string(),
            ],
        )
        .await
    }

    /// Remove a connected org.
    pub async fn remove_org(&self, root: &Path, alias: &str) -> Result<String, ApiError> {
        self.invoke(
            root,
            vec!["org".to_string(), "remove".to_string(), alias.to_string()],
        )
        .await
    }

    async fn invoke(&self, root: &Path, args: Vec<String>) -> Result<String, ApiError> {
        info!(args = ?args, root = %root.display(), "running action");
        let output = self.runner.run(root, &args).await?;
        Ok(output.stdout)
    }
}
