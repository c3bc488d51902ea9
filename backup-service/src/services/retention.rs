use crate::export::{DUMP_EXTENSION, MANIFEST_EXTENSION, TABLE_EXTENSION};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Extensions the sweeper is allowed to delete.
pub const RECOGNIZED_EXTENSIONS: [&str; 3] = [TABLE_EXTENSION, DUMP_EXTENSION, MANIFEST_EXTENSION];

/// A file old enough to be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl SweepReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Time-based pruning of backup artifacts in one directory (non-recursive).
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    dir: PathBuf,
    retention_days: u64,
}

impl RetentionSweeper {
    pub fn new(dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    /// Artifacts last modified before `now - retention_days`, sorted by name.
    /// Subdirectories and unrecognized extensions are never candidates.
    pub fn candidates(&self, now: SystemTime) -> std::io::Result<Vec<RetentionCandidate>> {
        let cutoff = self
            .retention_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut candidates: Vec<RetentionCandidate> = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter(|e| is_recognized_artifact(&e.path()))
            .filter_map(|e| {
                let metadata = e.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let modified = metadata.modified().ok()?;
                (modified < cutoff).then(|| RetentionCandidate {
                    path: e.path(),
                    size: metadata.len(),
                    modified,
                })
            })
            .collect();

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(candidates)
    }

    /// Delete every candidate. One failed deletion is logged and the sweep
    /// moves on to the next file.
    pub fn sweep(&self, now: SystemTime) -> std::io::Result<SweepReport> {
        let mut report = SweepReport::default();

        for candidate in self.candidates(now)? {
            match std::fs::remove_file(&candidate.path) {
                Ok(()) => {
                    info!("Removed old backup: {}", display_name(&candidate.path));
                    report.removed.push(candidate.path);
                }
                Err(e) => {
                    error!(error = %e, "Failed to remove old backup: {}", display_name(&candidate.path));
                    report.failed.push(candidate.path);
                }
            }
        }

        if !report.removed.is_empty() {
            info!(
                "Cleanup completed: {} old backup files removed",
                report.removed.len()
            );
        }

        Ok(report)
    }
}

/// Sweep `dir` now and return how many files were removed.
pub fn cleanup(dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    Ok(RetentionSweeper::new(dir, retention_days)
        .sweep(SystemTime::now())?
        .removed_count())
}

pub fn is_recognized_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RECOGNIZED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
