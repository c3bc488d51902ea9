//! Custom error types for the backup service.

use thiserror::Error;

/// Failures of a single unit of backup work (probe, query, export, write).
///
/// None of these are fatal to the process; the coordinator logs them and
/// carries on with sibling units.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dump tool failed for database {database} (exit code {code:?}): {stderr}")]
    DumpFailed {
        database: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Label source error: {0}")]
    Labels(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

/// Startup failures. The process must not start when one of these occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set. Provide it via environment variables (or a local .env file)")]
    MissingSetting(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidSetting { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, BackupError>;
