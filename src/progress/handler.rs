//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a deploy run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Deploy started for one (app, sha) pair
    Started { app_name: String, sha: String },

    /// A pipeline stage started
    StageStarted { stage: String },

    /// A pipeline stage completed
    StageComplete { stage: String, duration: Duration },

    /// Bytes written so far during the archive download; `total` is None
    /// when the server did not supply a Content-Length
    DownloadProgress { bytes: u64, total: Option<u64> },

    /// The full pipeline completed and the stack is up
    Completed {
        stack_context: String,
        total_time: Duration,
    },

    /// The run halted at a fatal stage error
    Failed { stage: String, error: String },
}

/// Trait for observing deploy progress
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {
        // Intentionally empty
    }
}
