//! Repository archive acquisition
//!
//! Resolves the GitHub archive URL for a commit, streams the tarball to
//! the workspace in bounded chunks with a visible progress bar, and
//! unpacks it with the host-generated `{repo}-{ref}` wrapper directory
//! stripped so the extracted tree's root matches the repository root.

use crate::identity::{self, IdentityError};
use crate::progress::{ProgressEvent, ProgressHandler};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const GITHUB_API_BASEURL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Archive format other than tarball/zipball requested
    #[error("unsupported archive format: {0} (expected tarball or zipball)")]
    UnsupportedFormat(String),

    /// Transport or write failure during download
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// Extraction failure; always fatal and reported
    #[error("failed to unpack {}: {source}", archive.display())]
    Unpack {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download format offered by the archive API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tarball,
    Zipball,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Tarball => write!(f, "tarball"),
            ArchiveFormat::Zipball => write!(f, "zipball"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tarball" => Ok(ArchiveFormat::Tarball),
            "zipball" => Ok(ArchiveFormat::Zipball),
            other => Err(ArchiveError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Archive handle for one repository URL.
pub struct RepositoryArchive {
    owner: String,
    repo: String,
}

impl RepositoryArchive {
    /// Derives the owner/repo pair from a repository URL.
    pub fn new(repo_url: &str) -> Result<Self, ArchiveError> {
        Ok(Self {
            owner: identity::owner_name(repo_url)?,
            repo: identity::application_name(repo_url)?,
        })
    }

    /// Download URL for the given commit and format:
    /// `{api_base}/repos/{owner}/{repo}/{format}/{sha}`
    pub fn archive_url(&self, sha: &str, format: ArchiveFormat) -> String {
        format!(
            "{}/repos/{}/{}/{}/{}",
            GITHUB_API_BASEURL, self.owner, self.repo, format, sha
        )
    }

    /// Streams the commit tarball into `download_dir` and returns the
    /// local file path.
    ///
    /// Chunks are appended to the file as they arrive; the payload is
    /// never buffered whole. Progress renders as a sized bar when the
    /// server supplies a Content-Length and as a spinner otherwise.
    pub async fn fetch(
        &self,
        sha: &str,
        download_dir: &Path,
        progress: &dyn ProgressHandler,
    ) -> Result<PathBuf, ArchiveError> {
        let url = self.archive_url(sha, ArchiveFormat::Tarball);
        let local_path = download_dir.join(format!("{}.tar.gz", self.repo));

        info!(url = %url, dest = %local_path.display(), "Downloading archive");

        let download_err = |reason: String| ArchiveError::Download {
            url: url.clone(),
            reason,
        };

        let response = reqwest::get(&url)
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let total_size = response.content_length();
        let bar = match total_size {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        };

        let mut file = tokio::fs::File::create(&local_path)
            .await
            .map_err(|e| download_err(format!("creating {}: {}", local_path.display(), e)))?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_err(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| download_err(format!("writing {}: {}", local_path.display(), e)))?;

            downloaded += chunk.len() as u64;
            bar.set_position(downloaded);
            progress.on_progress(&ProgressEvent::DownloadProgress {
                bytes: downloaded,
                total: total_size,
            });
        }

        file.flush()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        bar.finish_and_clear();

        info!(bytes = downloaded, path = %local_path.display(), "Archive downloaded");
        Ok(local_path)
    }
}

/// Unpacks a commit tarball into `working_dir/{app_name}`, stripping
/// exactly one leading path component.
///
/// Commit archives wrap the tree in a `{repo}-{ref}` directory; dropping
/// that single component leaves the true repository root at the
/// extraction root.
pub fn unpack(
    archive_path: &Path,
    app_name: &str,
    working_dir: &Path,
) -> Result<PathBuf, ArchiveError> {
    let output_dir = working_dir.join(app_name);
    let unpack_err = |source| ArchiveError::Unpack {
        archive: archive_path.to_path_buf(),
        source,
    };

    info!(archive = %archive_path.display(), dest = %output_dir.display(), "Unpacking archive");
    fs::create_dir_all(&output_dir).map_err(unpack_err)?;

    let file = fs::File::open(archive_path).map_err(unpack_err)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries().map_err(unpack_err)? {
        let mut entry = entry.map_err(unpack_err)?;
        let path = entry.path().map_err(unpack_err)?.into_owned();

        // Drop the leading wrapper component
        let stripped: PathBuf = path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }

        // Entries that would escape the extraction root are never valid
        // in a commit archive
        if stripped
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            warn!(entry = %path.display(), "Skipping archive entry with parent-dir component");
            continue;
        }

        let target = output_dir.join(&stripped);

        // Commit archives do not always carry directory records for
        // every file's parent
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(unpack_err)?;
        }

        entry.unpack(&target).map_err(unpack_err)?;
    }

    debug!(dir = %output_dir.display(), "Archive unpacked");
    Ok(output_dir)
}
