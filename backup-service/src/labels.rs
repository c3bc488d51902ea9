//! Container labels describing the database service.
//!
//! Labels are read once per process start and embedded into every artifact
//! header and manifest. A missing or unreachable container runtime is not an
//! error for the service: it simply runs with no labels.

use crate::{BackupError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::process::Command;
use tracing::{info, warn};

pub const LABEL_DATABASE_TYPE: &str = "backup.database.type";
pub const LABEL_DATABASE_NAME: &str = "backup.database.name";
pub const LABEL_DATABASE_VERSION: &str = "backup.database.version";
pub const LABEL_PRIORITY: &str = "backup.priority";
pub const LABEL_RETENTION_DAYS: &str = "backup.retention.days";
pub const LABEL_ENABLED: &str = "backup.enabled";

/// Read-only label snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerLabels(BTreeMap<String, String>);

impl ContainerLabels {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Summary fields, each defaulted when its label is absent.
    pub fn service_metadata(&self) -> ServiceMetadata {
        ServiceMetadata {
            database_type: self.get_or(LABEL_DATABASE_TYPE, "unknown").to_string(),
            database_name: self.get_or(LABEL_DATABASE_NAME, "unknown").to_string(),
            database_version: self.get_or(LABEL_DATABASE_VERSION, "unknown").to_string(),
            backup_priority: self.get_or(LABEL_PRIORITY, "normal").to_string(),
            retention_days: self.get_or(LABEL_RETENTION_DAYS, "7").to_string(),
            backup_enabled: self.get_or(LABEL_ENABLED, "false").to_string(),
        }
    }

    /// Retention requested by the `backup.retention.days` label, if it is a
    /// positive integer.
    pub fn retention_days(&self) -> Option<u64> {
        self.get(LABEL_RETENTION_DAYS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|days| *days > 0)
    }
}

impl FromIterator<(String, String)> for ContainerLabels {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub database_type: String,
    pub database_name: String,
    pub database_version: String,
    pub backup_priority: String,
    pub retention_days: String,
    pub backup_enabled: String,
}

impl Default for ServiceMetadata {
    fn default() -> Self {
        ContainerLabels::default().service_metadata()
    }
}

#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn labels(&self) -> Result<ContainerLabels>;
}

/// Reads labels with `docker inspect`.
pub struct DockerCliLabels {
    program: String,
    container: String,
}

impl DockerCliLabels {
    pub fn new(program: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            container: container.into(),
        }
    }
}

#[async_trait]
impl LabelSource for DockerCliLabels {
    async fn labels(&self) -> Result<ContainerLabels> {
        let output = Command::new(&self.program)
            .args(["inspect", "--format", "{{json .Config.Labels}}", &self.container])
            .output()
            .await?;

        if !output.status.success() {
            return Err(BackupError::Labels(format!(
                "{} inspect {} exited with {}: {}",
                self.program,
                self.container,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_inspect_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the JSON label object printed by `docker inspect`. `null` means the
/// container has no labels.
pub(crate) fn parse_inspect_output(stdout: &str) -> Result<ContainerLabels> {
    let parsed: Option<HashMap<String, String>> = serde_json::from_str(stdout.trim())?;
    Ok(parsed.unwrap_or_default().into_iter().collect())
}

/// Fetch labels once, degrading to an empty set on any failure.
pub async fn load_labels(source: &dyn LabelSource) -> ContainerLabels {
    match source.labels().await {
        Ok(labels) => {
            info!(count = labels.0.len(), "Loaded container labels");
            info!(
                "Database type: {}",
                labels.get_or(LABEL_DATABASE_TYPE, "unknown")
            );
            info!(
                "Database version: {}",
                labels.get_or(LABEL_DATABASE_VERSION, "unknown")
            );
            labels
        }
        Err(e) => {
            warn!(error = %e, "Could not load container metadata, continuing without labels");
            ContainerLabels::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticLabels;

    #[test]
    fn test_service_metadata_defaults() {
        let meta = ContainerLabels::default().service_metadata();
        assert_eq!(meta.database_type, "unknown");
        assert_eq!(meta.database_name, "unknown");
        assert_eq!(meta.database_version, "unknown");
        assert_eq!(meta.backup_priority, "normal");
        assert_eq!(meta.retention_days, "7");
        assert_eq!(meta.backup_enabled, "false");
    }

    #[test]
    fn test_service_metadata_from_labels() {
        let labels: ContainerLabels = [
            (LABEL_DATABASE_TYPE, "mariadb"),
            (LABEL_DATABASE_VERSION, "10.11"),
            (LABEL_PRIORITY, "high"),
            (LABEL_ENABLED, "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let meta = labels.service_metadata();
        assert_eq!(meta.database_type, "mariadb");
        assert_eq!(meta.database_version, "10.11");
        assert_eq!(meta.database_name, "unknown");
        assert_eq!(meta.backup_priority, "high");
        assert_eq!(meta.backup_enabled, "true");
    }

    #[test]
    fn test_retention_label() {
        let labels = |v: &str| -> ContainerLabels {
            [(LABEL_RETENTION_DAYS.to_string(), v.to_string())].into_iter().collect()
        };
        assert_eq!(labels("30").retention_days(), Some(30));
        assert_eq!(labels("0").retention_days(), None);
        assert_eq!(labels("soon").retention_days(), None);
        assert_eq!(ContainerLabels::default().retention_days(), None);
    }

    #[test]
    fn test_parse_inspect_output() {
        let labels = parse_inspect_output("{\"backup.priority\":\"high\",\"a\":\"b\"}\n").unwrap();
        assert_eq!(labels.get(LABEL_PRIORITY), Some("high"));
        assert_eq!(labels.get("a"), Some("b"));

        assert!(parse_inspect_output("null\n").unwrap().is_empty());
        assert!(parse_inspect_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_load_labels_degrades_to_empty() {
        let labels = load_labels(&StaticLabels::failing()).await;
        assert!(labels.is_empty());

        let missing = DockerCliLabels::new("/nonexistent/docker-binary", "mysql");
        assert!(load_labels(&missing).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_labels_passes_through() {
        let source = StaticLabels::new([(LABEL_DATABASE_TYPE, "mysql")]);
        let labels = load_labels(&source).await;
        assert_eq!(labels.get(LABEL_DATABASE_TYPE), Some("mysql"));
    }
}
