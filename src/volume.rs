//! Data-volume image build
//!
//! Packages the unpacked source tree into an immutable busybox-based
//! image tagged `{app}_data_{sha}` and labeled with the commit. The
//! image exists purely as a content carrier: it declares the source
//! mountpoint as a volume so application containers attach to the tree
//! without re-copying it.

use crate::config::BuildContext;
use crate::process::{self, ProcessError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const DESCRIPTOR_FILENAME: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum VolumeError {
    /// Build descriptor could not be written into the source tree
    #[error("failed to write build descriptor {}: {source}", path.display())]
    DescriptorWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Build tool reported a non-zero outcome
    #[error("image build for {artifact} exited with status {code}")]
    Build { artifact: String, code: i32 },

    /// Build tool could not be invoked at all
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Builds and removes the per-commit data-volume image.
pub struct DataVolume<'a> {
    context: &'a BuildContext,
    source_dir: PathBuf,
    volume_name: String,
}

impl<'a> DataVolume<'a> {
    pub fn new(context: &'a BuildContext, source_dir: &Path) -> Self {
        Self {
            context,
            source_dir: source_dir.to_path_buf(),
            volume_name: context.artifact_name(),
        }
    }

    /// Image tag the volume is built under
    pub fn name(&self) -> &str {
        &self.volume_name
    }

    /// Generated build descriptor for this context.
    ///
    /// The tree is copied in with non-root ownership (uid 1000) so the
    /// application container can execute it without running as root, and
    /// the mountpoint is declared a volume for later attachment.
    fn descriptor(&self) -> String {
        let mountpoint = &self.context.application_source_mountpoint;
        format!(
            "FROM busybox\n\n\
             RUN mkdir -p {mountpoint}\n\n\
             COPY --chown=1000:1000 . {mountpoint}\n\n\
             VOLUME {mountpoint}\n\n\
             LABEL version={sha}\n",
            mountpoint = mountpoint,
            sha = self.context.sha,
        )
    }

    /// Writes the descriptor into the source tree root and builds the
    /// image against that tree.
    pub async fn build(&self) -> Result<String, VolumeError> {
        let descriptor_path = self.source_dir.join(DESCRIPTOR_FILENAME);
        fs::write(&descriptor_path, self.descriptor()).map_err(|source| {
            VolumeError::DescriptorWrite {
                path: descriptor_path.clone(),
                source,
            }
        })?;

        info!(image = %self.volume_name, dir = %self.source_dir.display(), "Building data volume image");

        let status = process::run(
            "docker",
            &["build", "-t", &self.volume_name, "."],
            Some(&self.source_dir),
        )
        .await?;

        if !status.success() {
            return Err(VolumeError::Build {
                artifact: self.volume_name.clone(),
                code: status.code().unwrap_or(-1),
            });
        }

        info!(image = %self.volume_name, "Data volume image built");
        Ok(self.volume_name.clone())
    }

    /// Removes the image. Removing a nonexistent image is not an error;
    /// the tool's outcome is logged either way.
    pub async fn remove(&self) -> Result<(), VolumeError> {
        info!(image = %self.volume_name, "Removing data volume image");

        let status = process::run("docker", &["rmi", "-f", &self.volume_name], None).await?;
        if !status.success() {
            warn!(
                image = %self.volume_name,
                code = ?status.code(),
                "Image removal reported non-zero exit; image may not exist"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::BTreeMap;
    use std::env;
    use tempfile::TempDir;

    /// Puts a stub `docker` with a fixed exit code at the front of PATH,
    /// restoring the previous PATH on drop.
    struct FakeDocker {
        old_path: Option<String>,
    }

    impl FakeDocker {
        fn exiting_with(dir: &Path, code: i32) -> Self {
            use std::os::unix::fs::PermissionsExt;

            let script = dir.join("docker");
            fs::write(&script, format!("#!/bin/sh\nexit {}\n", code)).unwrap();
            let mut perms = fs::metadata(&script).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script, perms).unwrap();

            let old_path = env::var("PATH").ok();
            env::set_var(
                "PATH",
                format!("{}:{}", dir.display(), old_path.clone().unwrap_or_default()),
            );
            Self { old_path }
        }
    }

    impl Drop for FakeDocker {
        fn drop(&mut self) {
            match &self.old_path {
                Some(p) => env::set_var("PATH", p),
                None => env::remove_var("PATH"),
            }
        }
    }

    fn mock_context() -> BuildContext {
        BuildContext {
            app_name: "ghost".to_string(),
            sha: "abc123".to_string(),
            application_repository: "https://github.com/tryghost/ghost".to_string(),
            application_image: "tryghost/ghost".to_string(),
            application_source_mountpoint: "/usr/src/ghost".to_string(),
            application_config: BTreeMap::new(),
            database_image: "mysql/mysql-server".to_string(),
            database_config: BTreeMap::new(),
            build_commands: Vec::new(),
        }
    }

    #[test]
    fn test_volume_name_derived_from_context() {
        let context = mock_context();
        let volume = DataVolume::new(&context, Path::new("/tmp/src"));
        assert_eq!(volume.name(), "ghost_data_abc123");
    }

    #[test]
    fn test_descriptor_contents() {
        let context = mock_context();
        let volume = DataVolume::new(&context, Path::new("/tmp/src"));
        let descriptor = volume.descriptor();

        assert!(descriptor.starts_with("FROM busybox\n"));
        assert!(descriptor.contains("RUN mkdir -p /usr/src/ghost"));
        assert!(descriptor.contains("COPY --chown=1000:1000 . /usr/src/ghost"));
        assert!(descriptor.contains("VOLUME /usr/src/ghost"));
        assert!(descriptor.contains("LABEL version=abc123"));
    }

    #[tokio::test]
    async fn test_build_fails_on_unwritable_descriptor() {
        let context = mock_context();
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let volume = DataVolume::new(&context, &missing);
        let result = volume.build().await;
        assert!(matches!(result, Err(VolumeError::DescriptorWrite { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn test_build_surfaces_tool_exit_code() {
        let context = mock_context();
        let source = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let _docker = FakeDocker::exiting_with(bin.path(), 7);

        let volume = DataVolume::new(&context, source.path());
        match volume.build().await {
            Err(VolumeError::Build { artifact, code }) => {
                assert_eq!(artifact, "ghost_data_abc123");
                assert_eq!(code, 7);
            }
            other => panic!("expected build failure, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_build_returns_tag_on_success() {
        let context = mock_context();
        let source = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let _docker = FakeDocker::exiting_with(bin.path(), 0);

        let volume = DataVolume::new(&context, source.path());
        let tag = volume.build().await.unwrap();
        assert_eq!(tag, "ghost_data_abc123");
        assert!(source.path().join("Dockerfile").exists());
    }
}
