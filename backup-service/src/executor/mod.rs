//! Backup cycle executor.
//!
//! One cycle walks `Idle → Probing → Enumerating → Exporting → Manifesting →
//! Cleaning → Idle`. An unreachable server or an empty catalog short-circuits
//! to `Failed` and straight back to `Idle`. Once exporting starts, the
//! manifest and the retention sweep always run, even if every export failed.
//!
//! Export failures are per unit (one database dump, one table) and only
//! counted and logged here; they never propagate out of the cycle.

pub mod cycle;
pub mod manifest;

use crate::config::AppConfig;
use crate::db::DatabaseClient;
use crate::export::{DumpRunner, ExportArtifact, Exporter};
use crate::labels::ContainerLabels;
use crate::services::catalog::Catalog;
use crate::services::probe::wait_for_database;
use crate::services::retention::{RetentionSweeper, SweepReport};
use cycle::{CycleClock, CycleId};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAbort {
    /// No connection after the configured probe attempts
    DatabaseUnavailable,
    /// The server reported no user databases
    EmptyCatalog,
    /// Shutdown was requested before any export started
    Interrupted,
}

impl fmt::Display for CycleAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleAbort::DatabaseUnavailable => f.write_str("database unavailable"),
            CycleAbort::EmptyCatalog => f.write_str("no databases found"),
            CycleAbort::Interrupted => f.write_str("interrupted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Probing,
    Enumerating,
    Exporting,
    Manifesting,
    Cleaning,
    Failed(CycleAbort),
}

/// Artifacts produced for one database in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseResult {
    pub full_backup: Option<ExportArtifact>,
    pub tables: BTreeMap<String, ExportArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCycleResult {
    pub cycle_id: CycleId,
    pub databases: BTreeMap<String, DatabaseResult>,
    /// Export units that failed
    pub failures: usize,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub result: BackupCycleResult,
    /// `None` if the manifest could not be written
    pub manifest_path: Option<PathBuf>,
    /// `None` if the sweep was skipped or could not read the directory
    pub sweep: Option<SweepReport>,
    /// Shutdown stopped the export loop early
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Aborted { cycle_id: CycleId, reason: CycleAbort },
}

/// Runs backup cycles against one server.
pub struct BackupCoordinator {
    config: Arc<AppConfig>,
    client: Arc<dyn DatabaseClient>,
    catalog: Catalog,
    exporter: Exporter,
    labels: ContainerLabels,
    clock: Mutex<CycleClock>,
}

impl BackupCoordinator {
    pub fn new(
        config: Arc<AppConfig>,
        client: Arc<dyn DatabaseClient>,
        dumper: Arc<dyn DumpRunner>,
        labels: ContainerLabels,
    ) -> Self {
        let catalog = Catalog::new(client.clone(), config.excluded_databases.clone());
        let exporter = Exporter::new(
            client.clone(),
            dumper,
            config.endpoint.clone(),
            config.backup_dir.clone(),
            labels.clone(),
        );
        Self {
            config,
            client,
            catalog,
            exporter,
            labels,
            clock: Mutex::new(CycleClock::new()),
        }
    }

    /// Effective retention: configuration, then the retention label, then
    /// the default.
    pub fn retention_days(&self) -> u64 {
        self.config
            .retention_days
            .or_else(|| self.labels.retention_days())
            .unwrap_or(crate::config::DEFAULT_RETENTION_DAYS)
    }

    /// Run one complete cycle. `cancel` stops the cycle from starting new
    /// export units; the unit in progress always finishes.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleOutcome {
        let cycle_id = self.clock.lock().await.next();
        info!(cycle = %cycle_id, "Starting backup process");

        enter(&cycle_id, CycleState::Probing);
        let available = tokio::select! {
            available = wait_for_database(self.client.as_ref(), &self.config.probe) => available,
            _ = cancel.cancelled() => return abort(cycle_id, CycleAbort::Interrupted),
        };
        if !available {
            error!(cycle = %cycle_id, "Cannot connect to database, backup aborted");
            return abort(cycle_id, CycleAbort::DatabaseUnavailable);
        }

        enter(&cycle_id, CycleState::Enumerating);
        let databases = self.catalog.list_databases().await;
        if databases.is_empty() {
            warn!(cycle = %cycle_id, "No databases found to backup");
            return abort(cycle_id, CycleAbort::EmptyCatalog);
        }

        enter(&cycle_id, CycleState::Exporting);
        let (result, interrupted) = self.export_all(cycle_id.clone(), &databases, cancel).await;
        if interrupted {
            warn!(cycle = %cycle_id, "Shutdown requested, remaining exports skipped");
        }

        enter(&cycle_id, CycleState::Manifesting);
        let manifest = manifest::build_manifest(
            &result,
            &self.config.endpoint,
            &self.labels,
            self.config.format,
            chrono::Local::now().naive_local(),
        );
        let manifest_path = match manifest::write_manifest(&self.config.backup_dir, &cycle_id, &manifest) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(cycle = %cycle_id, error = %e, "Error creating backup manifest");
                None
            }
        };

        let sweep = if interrupted {
            None
        } else {
            enter(&cycle_id, CycleState::Cleaning);
            let sweeper = RetentionSweeper::new(&self.config.backup_dir, self.retention_days());
            match sweeper.sweep(SystemTime::now()) {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(cycle = %cycle_id, error = %e, "Error during backup cleanup");
                    None
                }
            }
        };

        enter(&cycle_id, CycleState::Idle);
        if result.failures == 0 {
            info!(cycle = %cycle_id, "Backup process completed successfully");
        } else {
            warn!(
                cycle = %cycle_id,
                failures = result.failures,
                "Backup process completed with failures"
            );
        }

        CycleOutcome::Completed(CycleReport {
            result,
            manifest_path,
            sweep,
            interrupted,
        })
    }

    async fn export_all(
        &self,
        cycle_id: CycleId,
        databases: &[String],
        cancel: &CancellationToken,
    ) -> (BackupCycleResult, bool) {
        let format = self.config.format;
        let mut result = BackupCycleResult {
            cycle_id,
            databases: BTreeMap::new(),
            failures: 0,
        };

        for database in databases {
            if cancel.is_cancelled() {
                return (result, true);
            }
            info!(database = %database, "Backing up database: {}", database);
            let mut entry = DatabaseResult::default();

            if format.includes_sql() {
                match self.exporter.dump_database(database, &result.cycle_id).await {
                    Ok(artifact) => entry.full_backup = Some(artifact),
                    Err(e) => {
                        error!(database = %database, error = %e, "Error backing up database {} to SQL", database);
                        result.failures += 1;
                    }
                }
            }

            if format.includes_csv() {
                for table in self.catalog.list_tables(database).await {
                    if cancel.is_cancelled() {
                        result.databases.insert(database.clone(), entry);
                        return (result, true);
                    }
                    match self.exporter.dump_table(database, &table, &result.cycle_id).await {
                        Ok(artifact) => {
                            entry.tables.insert(table, artifact);
                        }
                        Err(e) => {
                            error!(
                                database = %database,
                                table = %table,
                                error = %e,
                                "Error backing up table {}.{} to CSV",
                                database,
                                table
                            );
                            result.failures += 1;
                        }
                    }
                }
            }

            result.databases.insert(database.clone(), entry);
        }

        (result, false)
    }
}

fn enter(cycle_id: &CycleId, state: CycleState) {
    debug!(cycle = %cycle_id, state = ?state, "Cycle state");
}

fn abort(cycle_id: CycleId, reason: CycleAbort) -> CycleOutcome {
    enter(&cycle_id, CycleState::Failed(reason));
    enter(&cycle_id, CycleState::Idle);
    CycleOutcome::Aborted { cycle_id, reason }
}
