//! Deterministic naming for everything a deploy run touches.
//!
//! Every derived resource — workspace directory, data-volume image tag,
//! compose project context — is a pure function of `(application name, sha)`.
//! All other modules call these functions rather than re-formatting the
//! names themselves, so two runs for the same pair always address the same
//! resources and runs for distinct pairs never collide.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// No recognizable `owner/repo` path in the repository URL
    #[error("no owner/repo path found in repository URL: {0}")]
    MalformedUrl(String),
}

/// Splits a repository URL of the form `https://host/owner/repo[/]` into
/// its `(owner, repo)` segments.
fn repo_path(repo_url: &str) -> Result<(String, String), IdentityError> {
    let rest = repo_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(repo_url);

    let mut segments = rest.trim_end_matches('/').split('/');

    // First segment is the host, which must be present and non-empty
    let host = segments.next().unwrap_or("");
    let owner = segments.next().unwrap_or("");
    let repo = segments.next().unwrap_or("");

    if host.is_empty() || owner.is_empty() || repo.is_empty() {
        return Err(IdentityError::MalformedUrl(repo_url.to_string()));
    }

    Ok((owner.to_string(), repo.to_string()))
}

/// Returns the repository name, used as the application name everywhere.
///
/// Pure function: no I/O, stable across calls.
pub fn application_name(repo_url: &str) -> Result<String, IdentityError> {
    repo_path(repo_url).map(|(_, repo)| repo)
}

/// Returns the owning-account segment of the repository URL.
///
/// Only needed to construct the archive download URL.
pub fn owner_name(repo_url: &str) -> Result<String, IdentityError> {
    repo_path(repo_url).map(|(owner, _)| owner)
}

/// Workspace directory for one `(app, sha)` pair: `{base}/{app}_{sha}`
pub fn workspace_dir(base: &Path, app_name: &str, sha: &str) -> PathBuf {
    base.join(format!("{}_{}", app_name, sha))
}

/// Data-volume image tag for one `(app, sha)` pair: `{app}_data_{sha}`
pub fn artifact_name(app_name: &str, sha: &str) -> String {
    format!("{}_data_{}", app_name, sha)
}

/// Compose project context for one `(app, sha)` pair: `{app}_{sha}`
pub fn stack_context(app_name: &str, sha: &str) -> String {
    format!("{}_{}", app_name, sha)
}
