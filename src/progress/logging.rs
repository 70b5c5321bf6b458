//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { app_name, sha } => {
                info!(app = %app_name, sha = %sha, "Starting deploy");
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::DownloadProgress { bytes, total } => {
                // The download already renders an interactive bar; keep
                // the log stream at debug to avoid drowning it.
                debug!(bytes, total = ?total, "Download progress");
            }
            ProgressEvent::Completed {
                stack_context,
                total_time,
            } => {
                info!(
                    stack = %stack_context,
                    total_time_ms = total_time.as_millis(),
                    "Deploy complete"
                );
            }
            ProgressEvent::Failed { stage, error } => {
                warn!(stage = %stage, error = %error, "Deploy failed");
            }
        }
    }
}
