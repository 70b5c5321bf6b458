//! Deployment pipeline orchestration
//!
//! Runs the stages of one deploy in strict order — config resolution,
//! workspace creation, archive fetch, unpack, build commands, data
//! volume build, manifest generation, stack start — for a single
//! `(app, sha)` pair. Each stage consumes the immutable [`BuildContext`]
//! and the prior stage's output; the run halts at the first fatal error
//! with the workspace left in its then-current, inspectable state.
//!
//! Concurrent deploys for distinct pairs are safe without locking
//! because every derived resource name is disjoint by construction.

use crate::archive::{ArchiveError, RepositoryArchive};
use crate::config::{self, BuildContext, ConfigError};
use crate::process::{self, ProcessError};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::stack::{ContainerStack, StackError};
use crate::volume::{DataVolume, VolumeError};
use crate::workspace::Workspace;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("build command '{command}' exited with status {code}")]
    BuildCommand { command: String, code: i32 },

    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Everything a completed deploy produced, all derived from `(app, sha)`.
#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub app_name: String,
    pub sha: String,
    pub workspace: PathBuf,
    pub artifact_name: String,
    pub stack_context: String,
    pub manifest_path: PathBuf,
}

pub struct DeployPipeline {
    workdir_base: PathBuf,
    progress: Arc<dyn ProgressHandler>,
}

impl DeployPipeline {
    pub fn new(workdir_base: &Path, progress: Arc<dyn ProgressHandler>) -> Self {
        Self {
            workdir_base: workdir_base.to_path_buf(),
            progress,
        }
    }

    async fn run_stage<T, F>(&self, stage: &str, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        self.progress.on_progress(&ProgressEvent::StageStarted {
            stage: stage.to_string(),
        });

        let start = Instant::now();
        match fut.await {
            Ok(value) => {
                self.progress.on_progress(&ProgressEvent::StageComplete {
                    stage: stage.to_string(),
                    duration: start.elapsed(),
                });
                Ok(value)
            }
            Err(error) => {
                self.progress.on_progress(&ProgressEvent::Failed {
                    stage: stage.to_string(),
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Runs the full deploy pipeline for one commit.
    pub async fn deploy(
        &self,
        config_path: &Path,
        sha: &str,
    ) -> Result<DeploySummary, PipelineError> {
        let start = Instant::now();

        // Config resolution validates before any other side effect
        let context = self
            .run_stage("resolve-config", async {
                Ok(config::load(config_path, sha)?)
            })
            .await?;

        self.progress.on_progress(&ProgressEvent::Started {
            app_name: context.app_name.clone(),
            sha: context.sha.clone(),
        });

        let workspace = self
            .run_stage("workspace", async {
                Workspace::create(&self.workdir_base, &context.app_name, sha)
                    .map_err(PipelineError::Workspace)
            })
            .await?;

        let archive = RepositoryArchive::new(&context.application_repository)?;
        let archive_path = self
            .run_stage("fetch", async {
                Ok(archive
                    .fetch(sha, workspace.root(), self.progress.as_ref())
                    .await?)
            })
            .await?;

        let source_dir = self
            .run_stage("unpack", async {
                Ok(crate::archive::unpack(
                    &archive_path,
                    &context.app_name,
                    workspace.root(),
                )?)
            })
            .await?;

        if !context.build_commands.is_empty() {
            self.run_stage("build-commands", async {
                run_build_commands(&context.build_commands, &source_dir).await
            })
            .await?;
        }

        let volume = DataVolume::new(&context, &source_dir);
        let artifact_name = self
            .run_stage("build-volume", async { Ok(volume.build().await?) })
            .await?;

        let stack = ContainerStack::new(&context, workspace.root(), &artifact_name);
        let manifest_path = self
            .run_stage("generate-manifest", async {
                Ok(stack.write_compose_file()?)
            })
            .await?;

        self.run_stage("start-stack", async { Ok(stack.start().await?) })
            .await?;

        let summary = DeploySummary {
            app_name: context.app_name.clone(),
            sha: context.sha.clone(),
            workspace: workspace.root().to_path_buf(),
            artifact_name,
            stack_context: context.stack_context(),
            manifest_path,
        };

        self.progress.on_progress(&ProgressEvent::Completed {
            stack_context: summary.stack_context.clone(),
            total_time: start.elapsed(),
        });

        info!(
            stack = %summary.stack_context,
            workspace = %summary.workspace.display(),
            "Deploy pipeline complete"
        );
        Ok(summary)
    }

    /// Stops the stack previously deployed for this commit.
    pub async fn stop(&self, config_path: &Path, sha: &str) -> Result<(), PipelineError> {
        let (context, workspace) = self.resolve(config_path, sha)?;
        let stack = ContainerStack::new(&context, workspace.root(), &context.artifact_name());
        Ok(stack.stop().await?)
    }

    /// Tears down the stack and its images for this commit.
    pub async fn terminate(&self, config_path: &Path, sha: &str) -> Result<(), PipelineError> {
        let (context, workspace) = self.resolve(config_path, sha)?;
        let stack = ContainerStack::new(&context, workspace.root(), &context.artifact_name());
        Ok(stack.terminate().await?)
    }

    /// Re-derives the context and workspace for lifecycle operations on
    /// an already-deployed stack.
    fn resolve(
        &self,
        config_path: &Path,
        sha: &str,
    ) -> Result<(BuildContext, Workspace), PipelineError> {
        let context = config::load(config_path, sha)?;
        let workspace = Workspace::create(&self.workdir_base, &context.app_name, sha)
            .map_err(PipelineError::Workspace)?;
        Ok((context, workspace))
    }
}

/// Runs each configured build command in the unpacked source tree,
/// halting at the first non-zero exit.
async fn run_build_commands(commands: &[String], source_dir: &Path) -> Result<(), PipelineError> {
    for command in commands {
        info!(command = %command, dir = %source_dir.display(), "Running build command");
        let status = process::run_shell(command, source_dir).await?;
        if !status.success() {
            return Err(PipelineError::BuildCommand {
                command: command.clone(),
                code: status.code().unwrap_or(-1),
            });
        }
    }
    Ok(())
}
