//! In-memory doubles for the database server, the dump tool and the label
//! source.

use crate::config::{AppConfig, BackupFormat, Secret, ServerEndpoint};
use crate::db::{DatabaseClient, TableSnapshot};
use crate::export::{DumpOutcome, DumpRunner};
use crate::labels::{ContainerLabels, LabelSource};
use crate::{BackupError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn endpoint() -> ServerEndpoint {
    ServerEndpoint {
        host: "127.0.0.1".into(),
        port: 3306,
        user: "backup".into(),
        password: Secret::new("s3cret"),
        database: None,
    }
}

pub fn config_for(dir: &Path, format: BackupFormat) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DB_HOST", "127.0.0.1".to_string()),
        ("DB_USER", "backup".to_string()),
        ("DB_PASSWORD", "s3cret".to_string()),
        ("BACKUP_DIR", dir.display().to_string()),
        ("BACKUP_FORMAT", format.to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn refused() -> BackupError {
    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into()
}

fn server_error(code: u16, state: &str, message: String) -> BackupError {
    mysql_async::Error::Server(mysql_async::ServerError {
        code,
        message,
        state: state.to_string(),
    })
    .into()
}

/// Scripted database server.
#[derive(Default)]
pub struct FakeServer {
    databases: Vec<(String, Vec<(String, TableSnapshot)>)>,
    failing: HashSet<(String, String)>,
    down: bool,
    down_for: usize,
    pings: AtomicUsize,
    snapshots: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, name: &str) -> Self {
        self.database_mut(name);
        self
    }

    pub fn with_table(mut self, database: &str, table: &str, snapshot: TableSnapshot) -> Self {
        self.database_mut(database).push((table.to_string(), snapshot));
        self
    }

    /// Snapshot of this table fails; it is still listed.
    pub fn failing_table(mut self, database: &str, table: &str) -> Self {
        self.failing.insert((database.to_string(), table.to_string()));
        self
    }

    /// Every operation fails.
    pub fn unreachable(mut self) -> Self {
        self.down = true;
        self
    }

    /// The first `pings` connection attempts fail.
    pub fn unreachable_for(mut self, pings: usize) -> Self {
        self.down_for = pings;
        self
    }

    /// Cancel `token` once `snapshots` table snapshots have been served.
    pub fn cancel_after_snapshots(mut self, snapshots: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((snapshots, token));
        self
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    fn database_mut(&mut self, name: &str) -> &mut Vec<(String, TableSnapshot)> {
        let index = match self.databases.iter().position(|(db, _)| db == name) {
            Some(index) => index,
            None => {
                self.databases.push((name.to_string(), Vec::new()));
                self.databases.len() - 1
            }
        };
        &mut self.databases[index].1
    }

    fn check_up(&self) -> Result<()> {
        if self.down {
            return Err(refused());
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for FakeServer {
    async fn ping(&self) -> Result<()> {
        let attempt = self.pings.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        if attempt < self.down_for {
            return Err(refused());
        }
        Ok(())
    }

    async fn databases(&self) -> Result<Vec<String>> {
        self.check_up()?;
        Ok(self.databases.iter().map(|(db, _)| db.clone()).collect())
    }

    async fn tables(&self, database: &str) -> Result<Vec<String>> {
        self.check_up()?;
        Ok(self
            .databases
            .iter()
            .find(|(db, _)| db == database)
            .map(|(_, tables)| tables.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default())
    }

    async fn table_snapshot(&self, database: &str, table: &str) -> Result<TableSnapshot> {
        self.check_up()?;
        if self.failing.contains(&(database.to_string(), table.to_string())) {
            return Err(server_error(2013, "HY000", format!("Lost connection to MySQL server reading {database}.{table}")));
        }
        let snapshot = self
            .databases
            .iter()
            .find(|(db, _)| db == database)
            .and_then(|(_, tables)| tables.iter().find(|(t, _)| t == table))
            .map(|(_, snapshot)| snapshot.clone())
            .ok_or_else(|| server_error(1146, "42S02", format!("Table '{database}.{table}' doesn't exist")))?;

        let served = self.snapshots.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after {
            if served >= *limit {
                token.cancel();
            }
        }
        Ok(snapshot)
    }
}

/// Dump tool double. Writes `-- dump of <database>` on success.
pub struct FakeDumpRunner {
    fail: Option<(Option<String>, String)>,
    calls: Arc<AtomicUsize>,
}

impl FakeDumpRunner {
    pub fn succeeding() -> Self {
        Self {
            fail: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every dump exits with code 2.
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail: Some((None, stderr.to_string())),
            ..Self::succeeding()
        }
    }

    /// Dumps of `database` exit with code 2; the rest succeed.
    pub fn failing_for(database: &str, stderr: &str) -> Self {
        Self {
            fail: Some((Some(database.to_string()), stderr.to_string())),
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl DumpRunner for FakeDumpRunner {
    async fn dump(&self, _endpoint: &ServerEndpoint, database: &str, mut out: File) -> Result<DumpOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((only, stderr)) = &self.fail {
            if only.as_deref().map_or(true, |db| db == database) {
                return Ok(DumpOutcome {
                    success: false,
                    code: Some(2),
                    stderr: stderr.clone(),
                });
            }
        }

        writeln!(out, "-- dump of {}", database)?;
        Ok(DumpOutcome {
            success: true,
            code: Some(0),
            stderr: String::new(),
        })
    }
}

pub struct StaticLabels(Option<ContainerLabels>);

impl StaticLabels {
    pub fn new<'a>(labels: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(Some(
            labels
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl LabelSource for StaticLabels {
    async fn labels(&self) -> Result<ContainerLabels> {
        self.0
            .clone()
            .ok_or_else(|| BackupError::Labels("no such container: mysql".into()))
    }
}
