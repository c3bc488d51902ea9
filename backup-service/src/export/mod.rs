//! Export engine.
//!
//! Two independent paths produce artifacts in the backup directory:
//! - full dump: `<database>_full_backup_<cycle>.sql`, written by the external
//!   dump tool after a metadata comment header
//! - table export: `<database>_<table>_backup_<cycle>.csv`, written from a
//!   table snapshot after a metadata comment header
//!
//! Each call is one unit of work. Failures are returned to the caller and
//! never abort sibling tables or databases.

pub mod dump;
pub mod header;
pub mod table;

use crate::config::ServerEndpoint;
use crate::db::DatabaseClient;
use crate::executor::cycle::CycleId;
use crate::labels::ContainerLabels;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub use dump::{DumpOutcome, DumpRunner, MysqldumpRunner};

pub const TABLE_EXTENSION: &str = "csv";
pub const DUMP_EXTENSION: &str = "sql";
pub const MANIFEST_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    FullDump,
    TableExport,
}

/// A file produced by one export unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub database: String,
    pub table: Option<String>,
}

impl ExportArtifact {
    /// Current size on disk. Read on demand, never cached.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

pub fn full_dump_file_name(database: &str, cycle: &CycleId) -> String {
    format!("{}_full_backup_{}.{}", database, cycle, DUMP_EXTENSION)
}

pub fn table_file_name(database: &str, table: &str, cycle: &CycleId) -> String {
    format!("{}_{}_backup_{}.{}", database, table, cycle, TABLE_EXTENSION)
}

/// Runs export units against one server into one directory.
pub struct Exporter {
    client: Arc<dyn DatabaseClient>,
    dumper: Arc<dyn DumpRunner>,
    endpoint: ServerEndpoint,
    backup_dir: PathBuf,
    labels: ContainerLabels,
}

impl Exporter {
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        dumper: Arc<dyn DumpRunner>,
        endpoint: ServerEndpoint,
        backup_dir: PathBuf,
        labels: ContainerLabels,
    ) -> Self {
        Self {
            client,
            dumper,
            endpoint,
            backup_dir,
            labels,
        }
    }

    /// Full structural and data dump of one database.
    pub async fn dump_database(&self, database: &str, cycle: &CycleId) -> Result<ExportArtifact> {
        let path = self.backup_dir.join(full_dump_file_name(database, cycle));
        dump::dump_database(
            self.dumper.as_ref(),
            &self.endpoint,
            database,
            &path,
            &self.labels,
        )
        .await?;

        Ok(ExportArtifact {
            path,
            kind: ArtifactKind::FullDump,
            database: database.to_string(),
            table: None,
        })
    }

    /// Flat-file export of one table.
    pub async fn dump_table(&self, database: &str, table: &str, cycle: &CycleId) -> Result<ExportArtifact> {
        let snapshot = self.client.table_snapshot(database, table).await?;
        let path = self.backup_dir.join(table_file_name(database, table, cycle));
        let records = table::write_table_file(&path, database, table, &snapshot, &self.labels)?;

        tracing::info!(
            database = %database,
            table = %table,
            records,
            "CSV backup completed: {}",
            path.display()
        );

        Ok(ExportArtifact {
            path,
            kind: ArtifactKind::TableExport,
            database: database.to_string(),
            table: Some(table.to_string()),
        })
    }
}
