//! Stack generation and lifecycle control
//!
//! Generates the compose manifest for one deploy and drives the stack's
//! lifecycle through `docker compose`, always scoped by the
//! deterministic `-p {app}_{sha}` project context so operations can
//! never cross-affect stacks belonging to other commits.

pub mod compose;

use crate::config::BuildContext;
use crate::process::{self, ProcessError};
use compose::TemplateData;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const COMPOSE_FILENAME: &str = "docker-compose.yml";

#[derive(Debug, Error)]
pub enum StackError {
    #[error("failed to render compose manifest: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("failed to write compose manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fatal: the stack never reached running
    #[error("stack {context} failed to start (exit status {code})")]
    Start { context: String, code: i32 },

    /// Reported but non-fatal; the caller may retry
    #[error("stack {context} failed to stop (exit status {code})")]
    Stop { context: String, code: i32 },

    /// Reported but non-fatal; the caller may retry
    #[error("stack {context} failed to terminate (exit status {code})")]
    Terminate { context: String, code: i32 },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// One deployed application stack, identified by its project context.
pub struct ContainerStack<'a> {
    context: &'a BuildContext,
    working_dir: PathBuf,
    volume_tag: String,
}

impl<'a> ContainerStack<'a> {
    pub fn new(context: &'a BuildContext, working_dir: &Path, volume_tag: &str) -> Self {
        Self {
            context,
            working_dir: working_dir.to_path_buf(),
            volume_tag: volume_tag.to_string(),
        }
    }

    /// Deterministic compose project context: `{app}_{sha}`
    pub fn stack_context(&self) -> String {
        self.context.stack_context()
    }

    /// Assembles the flat rendering context for the manifest.
    fn template_data(&self) -> TemplateData {
        TemplateData {
            data_volume_tag: self.volume_tag.clone(),
            app_image_tag: self.context.application_image.clone(),
            db_image_tag: self.context.database_image.clone(),
            database_config: self.context.database_config.clone(),
            application_name: self.context.app_name.clone(),
            application_config: self.context.application_config.clone(),
            sha: self.context.sha.clone(),
        }
    }

    /// Renders the manifest and writes it to
    /// `{working_dir}/docker-compose.yml`, replacing any prior manifest
    /// for this workspace.
    pub fn write_compose_file(&self) -> Result<PathBuf, StackError> {
        let manifest = compose::render(&self.template_data())?;
        let target = self.working_dir.join(COMPOSE_FILENAME);

        info!(path = %target.display(), "Writing compose manifest");
        fs::write(&target, manifest).map_err(|source| StackError::Write {
            path: target.clone(),
            source,
        })?;

        Ok(target)
    }

    async fn compose(&self, args: &[&str]) -> Result<std::process::ExitStatus, ProcessError> {
        let context = self.stack_context();
        let mut argv = vec!["compose", "-p", context.as_str()];
        argv.extend_from_slice(args);
        process::run("docker", &argv, Some(&self.working_dir)).await
    }

    /// Brings the stack up in detached mode. Fatal on failure.
    pub async fn start(&self) -> Result<(), StackError> {
        let context = self.stack_context();
        info!(stack = %context, "Starting stack");

        let status = self.compose(&["up", "-d"]).await?;
        if !status.success() {
            return Err(StackError::Start {
                context,
                code: status.code().unwrap_or(-1),
            });
        }

        info!(stack = %context, "Stack running");
        Ok(())
    }

    /// Gracefully halts running services without removing them.
    pub async fn stop(&self) -> Result<(), StackError> {
        let context = self.stack_context();
        info!(stack = %context, "Stopping stack");

        let status = self.compose(&["stop"]).await?;
        if !status.success() {
            return Err(StackError::Stop {
                context,
                code: status.code().unwrap_or(-1),
            });
        }

        info!(stack = %context, "Stack stopped");
        Ok(())
    }

    /// Tears the stack down and removes its images.
    pub async fn terminate(&self) -> Result<(), StackError> {
        let context = self.stack_context();
        info!(stack = %context, "Terminating stack");

        let status = self.compose(&["down", "--rmi", "all"]).await?;
        if !status.success() {
            return Err(StackError::Terminate {
                context,
                code: status.code().unwrap_or(-1),
            });
        }

        info!(stack = %context, "Stack terminated");
        Ok(())
    }
}
