//! Deploy progress reporting
//!
//! Stages never log through a hidden singleton; the pipeline hands each
//! run an explicit [`ProgressHandler`] and emits [`ProgressEvent`]s as
//! stages start, finish, and fail.

mod handler;
mod logging;

pub use handler::{NoOpHandler, ProgressEvent, ProgressHandler};
pub use logging::LoggingHandler;
