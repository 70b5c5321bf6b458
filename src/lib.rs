//! shippy - build and deploy docker-compose stacks from a commit hash
//!
//! shippy takes a commit identifier and a declarative build config,
//! fetches the matching source snapshot from the GitHub archive API,
//! packages it into an immutable labeled data-volume image, generates a
//! docker-compose manifest parameterized by that image, and brings the
//! stack up under a project name derived from the application and
//! commit.
//!
//! # Core Concepts
//!
//! - **Build context**: the immutable per-run configuration built from a
//!   validated config file plus the target commit
//! - **Workspace**: a per-`(app, sha)` scratch directory owning the
//!   downloaded archive, the unpacked tree, and the generated manifest
//! - **Data volume**: a labeled image carrying the built source tree as
//!   a mountable volume, tagged `{app}_data_{sha}`
//! - **Stack**: the running compose services for one commit, scoped by
//!   the `{app}_{sha}` project context
//!
//! Every derived name is a pure function of `(app, sha)` (see
//! [`identity`]), so repeated runs for a commit are rebuilds and runs
//! for distinct commits never collide.
//!
//! # Example Usage
//!
//! ```ignore
//! use shippy::pipeline::DeployPipeline;
//! use shippy::progress::LoggingHandler;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! async fn deploy() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = DeployPipeline::new(
//!         Path::new("/tmp/shippy/archives"),
//!         Arc::new(LoggingHandler),
//!     );
//!     let summary = pipeline
//!         .deploy(Path::new("buildconfig.json"), "abc123")
//!         .await?;
//!     println!("Stack up: {}", summary.stack_context);
//!     Ok(())
//! }
//! ```

// Public modules
pub mod archive;
pub mod cli;
pub mod config;
pub mod identity;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod stack;
pub mod volume;
pub mod workspace;

// Re-export key types for convenient access
pub use config::{BuildContext, BuildSpec};
pub use pipeline::{DeployPipeline, DeploySummary, PipelineError};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
