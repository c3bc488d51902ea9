//! Backup Service - Main entry point
//!
//! Periodic MySQL backup service writing SQL dumps, CSV exports and
//! manifests into a local backup directory.

use anyhow::{Context, Result};
use backup_service::daemon::shutdown::ShutdownCoordinator;
use backup_service::db::MySqlClient;
use backup_service::executor::{BackupCoordinator, CycleOutcome};
use backup_service::export::MysqldumpRunner;
use backup_service::labels::{load_labels, DockerCliLabels};
use backup_service::services::BackupScheduler;
use backup_service::{utils, AppConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on waiting for an in-flight cycle at shutdown.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single backup cycle and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            utils::logger::init(args.log_level.as_deref().unwrap_or("info"), None)?;
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            return Err(e.into());
        }
    };

    std::fs::create_dir_all(&config.backup_dir)
        .with_context(|| format!("creating backup directory {}", config.backup_dir.display()))?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    utils::logger::init(log_level, Some(config.log_file.as_path()))?;

    tracing::info!("Starting backup-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.endpoint.host,
        port = config.endpoint.port,
        format = %config.format,
        interval_hours = config.interval.as_secs() / 3600,
        backup_dir = %config.backup_dir.display(),
        "Backup configuration loaded"
    );

    let labels = load_labels(&DockerCliLabels::new(
        config.docker_program.clone(),
        config.labels_container.clone(),
    ))
    .await;

    let config = Arc::new(config);
    let coordinator = Arc::new(BackupCoordinator::new(
        config.clone(),
        Arc::new(MySqlClient::new(config.endpoint.clone())),
        Arc::new(MysqldumpRunner::new(config.dump_program.clone())),
        labels,
    ));
    tracing::info!(retention_days = coordinator.retention_days(), "Retention policy resolved");

    let shutdown = Arc::new(ShutdownCoordinator::new());

    if args.once {
        let signals = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { shutdown.wait_for_signal().await }
        });

        match coordinator.run_cycle(&shutdown.token()).await {
            CycleOutcome::Completed(report) => tracing::info!(
                cycle = %report.result.cycle_id,
                failures = report.result.failures,
                "Single backup cycle finished"
            ),
            CycleOutcome::Aborted { cycle_id, reason } => {
                tracing::warn!(cycle = %cycle_id, reason = %reason, "Single backup cycle aborted")
            }
        }

        signals.abort();
        return Ok(());
    }

    let scheduler = BackupScheduler::new(coordinator, config.interval, shutdown.token()).await?;
    scheduler.start().await?;

    shutdown.wait_for_signal().await;

    tracing::info!("Graceful shutdown initiated");
    scheduler.shutdown(SHUTDOWN_DRAIN).await?;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}
