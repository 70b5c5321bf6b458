//! Per-(app, sha) scratch directory
//!
//! One workspace owns the downloaded archive, the unpacked source tree,
//! and the generated compose manifest for a single deploy key. Creation
//! is idempotent: re-running a deploy against an existing workspace is a
//! rebuild, not an error.

use crate::identity;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location for workspaces, matching the original deploy layout.
pub const DEFAULT_WORKDIR_BASE: &str = "/tmp/shippy/archives";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    app_name: String,
}

impl Workspace {
    /// Creates (or re-opens) the workspace for one `(app, sha)` pair.
    ///
    /// `create_dir_all` succeeds when the directory already exists, which
    /// is the one "already there" condition the pipeline treats as
    /// success rather than error.
    pub fn create(base: &Path, app_name: &str, sha: &str) -> io::Result<Self> {
        let root = identity::workspace_dir(base, app_name, sha);
        fs::create_dir_all(&root)?;
        debug!(workspace = %root.display(), "Workspace ready");

        Ok(Self {
            root,
            app_name: app_name.to_string(),
        })
    }

    /// Workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the unpacked source tree lands in
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.app_name)
    }
}
