//! Command handlers
//!
//! Each handler drives the pipeline for one subcommand and converts the
//! outcome into a process exit code: zero on full success, non-zero at
//! the first fatal error after logging its immediate cause.

use super::commands::StackArgs;
use crate::pipeline::DeployPipeline;
use crate::progress::LoggingHandler;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

fn pipeline(workdir: &Path) -> DeployPipeline {
    DeployPipeline::new(workdir, Arc::new(LoggingHandler))
}

pub async fn handle_deploy(args: &StackArgs, workdir: &Path) -> i32 {
    match pipeline(workdir).deploy(&args.configpath, &args.sha).await {
        Ok(summary) => {
            info!(
                stack = %summary.stack_context,
                artifact = %summary.artifact_name,
                manifest = %summary.manifest_path.display(),
                "Stack deployed"
            );
            0
        }
        Err(e) => {
            error!(error = %e, "Deploy failed");
            1
        }
    }
}

pub async fn handle_stop(args: &StackArgs, workdir: &Path) -> i32 {
    match pipeline(workdir).stop(&args.configpath, &args.sha).await {
        Ok(()) => 0,
        Err(e) => {
            // Non-fatal by design: report and let the caller retry
            error!(error = %e, "Stop failed");
            1
        }
    }
}

pub async fn handle_terminate(args: &StackArgs, workdir: &Path) -> i32 {
    match pipeline(workdir)
        .terminate(&args.configpath, &args.sha)
        .await
    {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Terminate failed");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_deploy_missing_config_exits_nonzero() {
        let workdir = TempDir::new().unwrap();
        let args = StackArgs {
            configpath: PathBuf::from("/nonexistent/buildconfig.json"),
            sha: "abc123".to_string(),
        };

        assert_eq!(handle_deploy(&args, workdir.path()).await, 1);
    }

    #[tokio::test]
    async fn test_stop_missing_config_exits_nonzero() {
        let workdir = TempDir::new().unwrap();
        let args = StackArgs {
            configpath: PathBuf::from("/nonexistent/buildconfig.json"),
            sha: "abc123".to_string(),
        };

        assert_eq!(handle_stop(&args, workdir.path()).await, 1);
    }
}
