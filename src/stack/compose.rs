//! Compose manifest rendering
//!
//! The manifest is a typed compose document serialized with serde_yaml,
//! fully reproducible from the flat [`TemplateData`] mapping: three
//! services — the data-volume carrier, the application, and the
//! database — with the application attaching to the carrier's volume.

use serde::Serialize;
use std::collections::BTreeMap;

/// Flat rendering context assembled by the stack generator.
#[derive(Debug, Clone)]
pub struct TemplateData {
    pub data_volume_tag: String,
    pub app_image_tag: String,
    pub db_image_tag: String,
    pub database_config: BTreeMap<String, String>,
    pub application_name: String,
    pub application_config: BTreeMap<String, String>,
    pub sha: String,
}

#[derive(Debug, Serialize)]
struct ComposeFile {
    // volumes_from requires the v2 compose format
    version: &'static str,
    services: BTreeMap<String, Service>,
}

#[derive(Debug, Default, Serialize)]
struct Service {
    image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes_from: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

/// Renders the compose manifest text for one deploy.
///
/// Pure data-to-text: no I/O, deterministic for a given input (service
/// and environment maps are ordered).
pub fn render(data: &TemplateData) -> Result<String, serde_yaml::Error> {
    let version_label = BTreeMap::from([("version".to_string(), data.sha.clone())]);

    let mut services = BTreeMap::new();
    services.insert(
        "data".to_string(),
        Service {
            image: data.data_volume_tag.clone(),
            // The carrier only has to exist; its volume outlives the
            // exited container
            command: Some("true".to_string()),
            labels: version_label.clone(),
            ..Service::default()
        },
    );
    services.insert(
        "db".to_string(),
        Service {
            image: data.db_image_tag.clone(),
            environment: data.database_config.clone(),
            labels: version_label.clone(),
            ..Service::default()
        },
    );
    services.insert(
        data.application_name.clone(),
        Service {
            image: data.app_image_tag.clone(),
            environment: data.application_config.clone(),
            volumes_from: vec!["data".to_string()],
            depends_on: vec!["data".to_string(), "db".to_string()],
            labels: version_label,
            ..Service::default()
        },
    );

    serde_yaml::to_string(&ComposeFile {
        version: "2.4",
        services,
    })
}
