//! Report rendering for each subcommand.

use anyhow::Result;
use backup_service::inventory::{ArtifactStatus, Inventory};
use backup_service::services::RetentionSweeper;
use chrono::{DateTime, Local};
use std::io::Write;
use std::time::SystemTime;

pub fn list(inventory: &Inventory, out: &mut impl Write) -> Result<()> {
    let entries = inventory.entries()?;
    if entries.is_empty() {
        writeln!(out, "No backup manifests found.")?;
        return Ok(());
    }

    writeln!(out, "{:<20} {:<15} {:<10} {:<10}", "Backup Date", "Databases", "Files", "Format")?;
    writeln!(out, "{}", "-".repeat(65))?;

    for entry in entries {
        match entry.manifest {
            Ok(manifest) => writeln!(
                out,
                "{:<20} {:<15} {:<10} {:<10}",
                manifest.backup_date,
                manifest.databases.len(),
                manifest.file_count(),
                manifest.backup_format
            )?,
            Err(e) => writeln!(out, "Error reading {}: {}", entry.path.display(), e)?,
        }
    }
    Ok(())
}

pub fn details(inventory: &Inventory, timestamp: Option<&str>, out: &mut impl Write) -> Result<()> {
    let path = match timestamp {
        Some(ts) => match inventory.find(ts) {
            Some(path) => path,
            None => {
                writeln!(out, "Backup manifest not found: backup_manifest_{ts}.json")?;
                return Ok(());
            }
        },
        None => match inventory.latest()? {
            Some(path) => path,
            None => {
                writeln!(out, "No backup manifests found.")?;
                return Ok(());
            }
        },
    };

    let details = inventory.details(&path)?;
    let manifest = &details.manifest;
    writeln!(out, "Backup Details")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Timestamp: {}", manifest.backup_timestamp)?;
    writeln!(out, "Date: {}", manifest.backup_date)?;
    writeln!(out, "Host: {}:{}", manifest.database_host, manifest.database_port)?;
    writeln!(out, "Format: {}", manifest.backup_format)?;
    writeln!(out)?;

    for db in &details.databases {
        writeln!(out, "Database: {}", db.name)?;
        writeln!(out, "{}", "-".repeat(30))?;
        if let Some(full) = &db.full_backup {
            writeln!(out, "  Full Backup: {}", describe(full))?;
        }
        if !db.tables.is_empty() {
            writeln!(out, "  Table Backups: {} tables", db.tables.len())?;
            for (table, status) in &db.tables {
                writeln!(out, "    {}: {}", table, describe(status))?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn stats(inventory: &Inventory, out: &mut impl Write) -> Result<()> {
    let stats = inventory.stats()?;
    if stats.sessions == 0 {
        writeln!(out, "No backup manifests found.")?;
        return Ok(());
    }

    for (path, e) in &stats.unreadable {
        writeln!(out, "Error reading {}: {}", path.display(), e)?;
    }

    writeln!(out, "Backup Statistics")?;
    writeln!(out, "{}", "=".repeat(40))?;
    writeln!(out, "Total Backup Sessions: {}", stats.sessions)?;
    writeln!(out, "Unique Databases: {}", stats.databases.len())?;
    writeln!(out, "Total Backup Files: {}", stats.files)?;
    writeln!(
        out,
        "Total Storage Used: {} bytes ({:.2} MB)",
        thousands(stats.bytes),
        stats.megabytes()
    )?;
    writeln!(out)?;
    writeln!(out, "Backup Formats:")?;
    for (format, count) in &stats.formats {
        writeln!(out, "  {}: {} sessions", format, count)?;
    }
    writeln!(out)?;
    writeln!(out, "Databases:")?;
    for db in &stats.databases {
        writeln!(out, "  {}", db)?;
    }
    Ok(())
}

pub fn cleanup(inventory: &Inventory, days: u64, confirm: bool, out: &mut impl Write) -> Result<()> {
    let sweeper = RetentionSweeper::new(inventory.dir(), days);
    let now = SystemTime::now();
    let candidates = sweeper.candidates(now)?;

    if candidates.is_empty() {
        writeln!(out, "No backup files older than {} days found.", days)?;
        return Ok(());
    }

    writeln!(out, "Found {} files older than {} days:", candidates.len(), days)?;
    let mut total = 0u64;
    for candidate in &candidates {
        total += candidate.size;
        let modified: DateTime<Local> = candidate.modified.into();
        writeln!(
            out,
            "  {} ({} bytes, modified {})",
            file_name(&candidate.path),
            thousands(candidate.size),
            modified.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Total size to be removed: {} bytes", thousands(total))?;

    if !confirm {
        writeln!(out)?;
        writeln!(out, "[DRY RUN] Files would be deleted with --confirm flag")?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Removing files...")?;
    let report = sweeper.sweep(now)?;
    for path in &report.removed {
        writeln!(out, "  Removed: {}", file_name(path))?;
    }
    for path in &report.failed {
        writeln!(out, "  Error removing {}", file_name(path))?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Cleanup completed: {}/{} files removed",
        report.removed_count(),
        candidates.len()
    )?;
    Ok(())
}

fn describe(status: &ArtifactStatus) -> String {
    match status.size {
        Some(size) => format!("{} ({} bytes)", status.file_name(), thousands(size)),
        None => format!("{} (not available)", status.file_name()),
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
