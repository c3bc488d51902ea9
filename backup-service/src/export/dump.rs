//! Full-database SQL dumps through an external dump tool.
//!
//! The destination file is seeded with a SQL comment header, then the tool's
//! stdout is appended to it directly. The password reaches the tool through
//! its environment, never its argument list.
//!
//! A tool that exits non-zero leaves its partial output in place. The caller
//! records no artifact for it, so the manifest never references that file.

use super::header::{backup_time_now, ArtifactHeader};
use crate::config::ServerEndpoint;
use crate::labels::ContainerLabels;
use crate::{BackupError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Exit status and captured stderr of one dump tool run.
#[derive(Debug, Clone)]
pub struct DumpOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

#[async_trait]
pub trait DumpRunner: Send + Sync {
    /// Dump `database`, writing the tool's stdout into `out`.
    async fn dump(&self, endpoint: &ServerEndpoint, database: &str, out: File) -> Result<DumpOutcome>;
}

/// Runs `mysqldump` (or a compatible binary).
pub struct MysqldumpRunner {
    program: String,
}

impl MysqldumpRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Password variable read by `mysqldump`.
pub const PASSWORD_ENV: &str = "MYSQL_PWD";

/// Argument list for one dump. Contains no credential.
pub fn dump_args(endpoint: &ServerEndpoint, database: &str) -> Vec<String> {
    vec![
        format!("--host={}", endpoint.host),
        format!("--port={}", endpoint.port),
        format!("--user={}", endpoint.user),
        "--single-transaction".to_string(),
        "--routines".to_string(),
        "--triggers".to_string(),
        database.to_string(),
    ]
}

#[async_trait]
impl DumpRunner for MysqldumpRunner {
    async fn dump(&self, endpoint: &ServerEndpoint, database: &str, out: File) -> Result<DumpOutcome> {
        // `output()` would re-pipe stdout, so spawn with the file attached.
        let child = Command::new(&self.program)
            .args(dump_args(endpoint, database))
            .env(PASSWORD_ENV, endpoint.password.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::piped())
            .spawn()?;
        let output = child.wait_with_output().await?;

        Ok(DumpOutcome {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Seed `path` with the header and run the dump tool into it.
pub async fn dump_database(
    runner: &dyn DumpRunner,
    endpoint: &ServerEndpoint,
    database: &str,
    path: &Path,
    labels: &ContainerLabels,
) -> Result<()> {
    let header = ArtifactHeader {
        database,
        table: None,
        backup_time: backup_time_now(),
        record_count: None,
        format: "SQL",
        generated_by: Some("MySQL Database Backup Service"),
        labels,
    };

    let mut file = File::create(path)?;
    for line in header.lines("--") {
        writeln!(file, "{}", line)?;
    }
    writeln!(file)?;
    file.flush()?;

    let outcome = runner.dump(endpoint, database, file).await?;
    if !outcome.success {
        tracing::error!(
            database = %database,
            code = ?outcome.code,
            "Dump tool failed: {}",
            outcome.stderr
        );
        return Err(BackupError::DumpFailed {
            database: database.to_string(),
            code: outcome.code,
            stderr: outcome.stderr,
        });
    }

    tracing::info!(database = %database, "SQL backup completed: {}", path.display());
    Ok(())
}
