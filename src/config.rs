//! Build configuration loading and validation
//!
//! Parses the JSON build config file, checks it against the required-field
//! schema, and freezes it together with the target commit into an immutable
//! [`BuildContext`] that every later pipeline stage reads.
//!
//! Validation runs before any network or filesystem side effect and reports
//! every violation, not just the first one found.

use crate::identity::{self, IdentityError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read build config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON
    #[error("failed to parse build config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Config is valid JSON but violates the required-field schema
    #[error("build config {} failed validation: {}", path.display(), violations.join("; "))]
    Schema {
        path: PathBuf,
        violations: Vec<String>,
    },

    /// Repository URL in the config has no recognizable owner/repo path
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Raw build specification as authored in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSpec {
    pub application_image: String,
    pub application_repository: String,
    pub application_source_mountpoint: String,
    pub application_config: BTreeMap<String, String>,
    pub database_image: String,
    pub database_config: BTreeMap<String, String>,

    /// Commands run inside the unpacked source tree before the data
    /// volume is built. Optional; most stacks build inside the container.
    #[serde(default)]
    pub build_commands: Vec<String>,
}

/// Immutable per-run build context.
///
/// Constructed once by [`load`] from a validated [`BuildSpec`] plus the
/// target commit; read-only for the rest of the invocation. The
/// application name is always derived from the repository URL, never
/// supplied directly, so derived names stay deterministic.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub app_name: String,
    pub sha: String,
    pub application_repository: String,
    pub application_image: String,
    pub application_source_mountpoint: String,
    pub application_config: BTreeMap<String, String>,
    pub database_image: String,
    pub database_config: BTreeMap<String, String>,
    pub build_commands: Vec<String>,
}

impl BuildContext {
    /// Data-volume image tag derived for this context
    pub fn artifact_name(&self) -> String {
        identity::artifact_name(&self.app_name, &self.sha)
    }

    /// Compose project context derived for this context
    pub fn stack_context(&self) -> String {
        identity::stack_context(&self.app_name, &self.sha)
    }
}

/// Required fields and the JSON type each must carry.
const REQUIRED_STRING_FIELDS: &[&str] = &[
    "application_image",
    "application_repository",
    "application_source_mountpoint",
    "database_image",
];
const REQUIRED_OBJECT_FIELDS: &[&str] = &["application_config", "database_config"];

/// Validates a parsed config against the required-field schema.
///
/// Returns the full list of violations so a user can fix the config in
/// one pass instead of replaying the load once per missing field.
pub fn validate(config: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(object) = config.as_object() else {
        violations.push("config root must be a JSON object".to_string());
        return violations;
    };

    for field in REQUIRED_STRING_FIELDS {
        match object.get(*field) {
            None => violations.push(format!("missing required field: {}", field)),
            Some(Value::String(_)) => {}
            Some(_) => violations.push(format!("field {} must be a string", field)),
        }
    }

    for field in REQUIRED_OBJECT_FIELDS {
        match object.get(*field) {
            None => violations.push(format!("missing required field: {}", field)),
            Some(Value::Object(_)) => {}
            Some(_) => violations.push(format!("field {} must be an object", field)),
        }
    }

    violations
}

/// Loads, validates, and freezes the build config for one commit.
pub fn load(path: &Path, sha: &str) -> Result<BuildContext, ConfigError> {
    debug!(path = %path.display(), "Loading build config");

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let violations = validate(&value);
    if !violations.is_empty() {
        return Err(ConfigError::Schema {
            path: path.to_path_buf(),
            violations,
        });
    }

    // Schema already guarantees the shape, so this deserialization is a
    // formality; surface any residual mismatch as a parse error.
    let spec: BuildSpec = serde_json::from_value(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let app_name = identity::application_name(&spec.application_repository)?;

    info!(app = %app_name, sha, "Build config loaded");

    Ok(BuildContext {
        app_name,
        sha: sha.to_string(),
        application_repository: spec.application_repository,
        application_image: spec.application_image,
        application_source_mountpoint: spec.application_source_mountpoint,
        application_config: spec.application_config,
        database_image: spec.database_image,
        database_config: spec.database_config,
        build_commands: spec.build_commands,
    })
}
