//! Configuration management for the backup service.
//!
//! Settings are read once at startup from the environment (a local `.env`
//! file is honoured) into an immutable [`AppConfig`] that is handed to every
//! component. Nothing else in the crate reads the environment.

use crate::utils::ConfigError;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Database password. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where the database server lives and how to log in.
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    /// Default schema for connections that do not target a specific database
    pub database: Option<String>,
}

/// Which artifacts a cycle produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Csv,
    Sql,
    Both,
}

impl BackupFormat {
    pub fn includes_sql(self) -> bool {
        matches!(self, BackupFormat::Sql | BackupFormat::Both)
    }

    pub fn includes_csv(self) -> bool {
        matches!(self, BackupFormat::Csv | BackupFormat::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupFormat::Csv => "csv",
            BackupFormat::Sql => "sql",
            BackupFormat::Both => "both",
        }
    }
}

impl fmt::Display for BackupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(BackupFormat::Csv),
            "sql" => Ok(BackupFormat::Sql),
            "both" => Ok(BackupFormat::Both),
            other => Err(other.to_string()),
        }
    }
}

/// Connection probe limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_probe_attempts(),
            delay: Duration::from_secs(default_probe_delay_secs()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: ServerEndpoint,

    /// Directory receiving every artifact, manifest and the log file
    pub backup_dir: PathBuf,

    /// Time between scheduled cycles
    pub interval: Duration,

    pub format: BackupFormat,

    /// Explicit retention override. `None` defers to container labels.
    pub retention_days: Option<u64>,

    /// Schemas never backed up (system schemas of the server)
    pub excluded_databases: BTreeSet<String>,

    pub probe: ProbePolicy,

    /// Dump tool executable
    pub dump_program: String,

    /// Container runtime CLI used to read labels
    pub docker_program: String,

    /// Container whose labels describe the database service
    pub labels_container: String,

    pub log_level: String,
    pub log_file: PathBuf,
}

// Default values
fn default_host() -> String {
    "mysql".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/app/backups")
}

fn default_interval_hours() -> u64 {
    24
}

fn default_excluded_databases() -> BTreeSet<String> {
    ["information_schema", "performance_schema", "mysql", "sys"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_probe_attempts() -> u32 {
    30
}

fn default_probe_delay_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Retention used when neither the configuration nor the labels set one.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

impl AppConfig {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password = get("DB_PASSWORD").ok_or(ConfigError::MissingSetting("DB_PASSWORD"))?;
        let host = get("DB_HOST").unwrap_or_else(default_host);

        let endpoint = ServerEndpoint {
            port: parse_or(&lookup, "DB_PORT", default_port())?,
            user: get("DB_USER").unwrap_or_else(default_user),
            password: Secret::new(password),
            database: get("DB_NAME"),
            host: host.clone(),
        };

        let interval_hours: u64 = parse_or(&lookup, "BACKUP_INTERVAL_HOURS", default_interval_hours())?;
        let interval_secs = interval_hours
            .checked_mul(3600)
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidSetting {
                key: "BACKUP_INTERVAL_HOURS",
                value: interval_hours.to_string(),
            })?;

        let format = match get("BACKUP_FORMAT") {
            Some(raw) => raw.parse().map_err(|value| ConfigError::InvalidSetting {
                key: "BACKUP_FORMAT",
                value,
            })?,
            None => BackupFormat::Both,
        };

        let retention_days = match get("RETENTION_DAYS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidSetting {
                key: "RETENTION_DAYS",
                value: raw.clone(),
            })?),
            None => None,
        };

        let excluded_databases = match get("EXCLUDED_DATABASES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => default_excluded_databases(),
        };

        let probe = ProbePolicy {
            max_attempts: parse_or(&lookup, "DB_WAIT_ATTEMPTS", default_probe_attempts())?,
            delay: Duration::from_secs(parse_or(&lookup, "DB_WAIT_DELAY_SECS", default_probe_delay_secs())?),
        };

        let backup_dir = get("BACKUP_DIR").map(PathBuf::from).unwrap_or_else(default_backup_dir);
        let log_file = get("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| backup_dir.join("backup.log"));

        Ok(Self {
            endpoint,
            interval: Duration::from_secs(interval_secs),
            format,
            retention_days,
            excluded_databases,
            probe,
            dump_program: get("MYSQLDUMP_BIN").unwrap_or_else(|| "mysqldump".into()),
            docker_program: get("DOCKER_BIN").unwrap_or_else(|| "docker".into()),
            labels_container: get("LABELS_CONTAINER").unwrap_or(host),
            log_level: get("LOG_LEVEL").unwrap_or_else(default_log_level),
            log_file,
            backup_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidSetting { key, value: raw }),
        None => Ok(default),
    }
}
