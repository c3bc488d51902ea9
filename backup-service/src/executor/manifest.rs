//! Manifest types for backup cycles.
//!
//! One manifest per cycle, serialized as `backup_manifest_<cycle>.json` in the
//! backup directory. It lists every artifact the cycle actually wrote, with
//! the server address (never the password) and the container label snapshot.
//! Manifests are never rewritten; only the retention sweep removes them.

use super::cycle::{CycleId, DISPLAY_FORMAT};
use super::BackupCycleResult;
use crate::config::{BackupFormat, ServerEndpoint};
use crate::export::MANIFEST_EXTENSION;
use crate::labels::{ContainerLabels, ServiceMetadata};
use crate::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_PREFIX: &str = "backup_manifest_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub backup_timestamp: String,
    pub backup_date: String,
    pub database_host: String,
    pub database_port: u16,
    pub backup_format: String,
    #[serde(default)]
    pub container_labels: ContainerLabels,
    #[serde(default)]
    pub service_metadata: ServiceMetadata,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseEntry>,
}

/// Artifacts recorded for one database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    #[serde(default)]
    pub tables: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub full_backup: Option<PathBuf>,
}

impl DatabaseEntry {
    /// Every artifact path in this entry: the full dump first, then tables.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.full_backup.iter().chain(self.tables.values())
    }
}

impl Manifest {
    /// Number of artifacts referenced (full dumps plus table exports).
    pub fn file_count(&self) -> usize {
        self.databases.values().map(|db| db.paths().count()).sum()
    }
}

pub fn manifest_file_name(cycle: &str) -> String {
    format!("{}{}.{}", MANIFEST_PREFIX, cycle, MANIFEST_EXTENSION)
}

/// Project a finished cycle into its manifest.
pub fn build_manifest(
    result: &BackupCycleResult,
    endpoint: &ServerEndpoint,
    labels: &ContainerLabels,
    format: BackupFormat,
    backup_date: NaiveDateTime,
) -> Manifest {
    let databases = result
        .databases
        .iter()
        .map(|(name, db)| {
            let entry = DatabaseEntry {
                tables: db
                    .tables
                    .iter()
                    .map(|(table, artifact)| (table.clone(), artifact.path.clone()))
                    .collect(),
                full_backup: db.full_backup.as_ref().map(|a| a.path.clone()),
            };
            (name.clone(), entry)
        })
        .collect();

    Manifest {
        backup_timestamp: result.cycle_id.to_string(),
        backup_date: backup_date.format(DISPLAY_FORMAT).to_string(),
        database_host: endpoint.host.clone(),
        database_port: endpoint.port,
        backup_format: format.to_string(),
        container_labels: labels.clone(),
        service_metadata: labels.service_metadata(),
        databases,
    }
}

/// Write `manifest` into `dir`, returning the file path.
pub fn write_manifest(dir: &Path, cycle: &CycleId, manifest: &Manifest) -> Result<PathBuf> {
    let path = dir.join(manifest_file_name(cycle.as_str()));
    let json = serde_json::to_vec_pretty(manifest)?;
    std::fs::write(&path, json)?;
    tracing::info!("Backup manifest created: {}", path.display());
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}
