mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Database Backup Manager", long_about = None)]
struct Cli {
    /// Backup directory path
    #[arg(long, global = true, default_value = "/app/backups")]
    backup_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all backups
    List,
    /// Show backup details
    Details {
        /// Backup timestamp (default: latest)
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Show backup statistics
    Stats,
    /// Remove old backup files
    Cleanup {
        /// Remove files older than N days
        #[arg(long, default_value_t = 7)]
        days: u64,
        /// Actually remove files (default: dry run)
        #[arg(long)]
        confirm: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let inventory = backup_service::inventory::Inventory::open(&cli.backup_dir)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::List => commands::list(&inventory, &mut out),
        Command::Details { timestamp } => commands::details(&inventory, timestamp.as_deref(), &mut out),
        Command::Stats => commands::stats(&inventory, &mut out),
        Command::Cleanup { days, confirm } => commands::cleanup(&inventory, days, confirm, &mut out),
    }
}
