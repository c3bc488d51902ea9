//! Read-only view over a backup directory's manifests.
//!
//! The service may be writing while this is read: a path listed in a
//! manifest that does not exist (yet, or any more) is reported as not
//! available, never as a broken manifest.

use crate::executor::manifest::{read_manifest, Manifest, MANIFEST_PREFIX};
use crate::export::MANIFEST_EXTENSION;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One manifest file and its parse result.
#[derive(Debug)]
pub struct InventoryEntry {
    pub path: PathBuf,
    pub manifest: std::result::Result<Manifest, String>,
}

/// A manifest-listed file with its size, if present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub path: PathBuf,
    pub size: Option<u64>,
}

impl ArtifactStatus {
    fn resolve(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: std::fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.size.is_some()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseDetails {
    pub name: String,
    pub full_backup: Option<ArtifactStatus>,
    pub tables: Vec<(String, ArtifactStatus)>,
}

#[derive(Debug, Clone)]
pub struct BackupDetails {
    pub manifest: Manifest,
    pub databases: Vec<DatabaseDetails>,
}

#[derive(Debug, Default)]
pub struct InventoryStats {
    pub sessions: usize,
    pub databases: BTreeSet<String>,
    /// Listed files that exist on disk
    pub files: usize,
    pub bytes: u64,
    pub formats: BTreeMap<String, usize>,
    pub unreadable: Vec<(PathBuf, String)>,
}

impl InventoryStats {
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / 1024.0 / 1024.0
    }
}

pub struct Inventory {
    dir: PathBuf,
}

impl Inventory {
    /// Open `dir`. A missing directory is an error.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Backup directory not found: {}", dir.display()),
            )
            .into());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest files, newest first by file name.
    pub fn manifest_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_manifest(p))
            .collect();
        paths.sort();
        paths.reverse();
        Ok(paths)
    }

    pub fn entries(&self) -> Result<Vec<InventoryEntry>> {
        Ok(self
            .manifest_paths()?
            .into_iter()
            .map(|path| {
                let manifest = read_manifest(&path).map_err(|e| e.to_string());
                InventoryEntry { path, manifest }
            })
            .collect())
    }

    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.manifest_paths()?.into_iter().next())
    }

    /// Path of the manifest for cycle `timestamp`, if it exists.
    pub fn find(&self, timestamp: &str) -> Option<PathBuf> {
        let path = self
            .dir
            .join(crate::executor::manifest::manifest_file_name(timestamp));
        path.is_file().then_some(path)
    }

    pub fn details(&self, manifest_path: &Path) -> Result<BackupDetails> {
        let manifest = read_manifest(manifest_path)?;
        let databases = manifest
            .databases
            .iter()
            .map(|(name, entry)| DatabaseDetails {
                name: name.clone(),
                full_backup: entry.full_backup.as_deref().map(ArtifactStatus::resolve),
                tables: entry
                    .tables
                    .iter()
                    .map(|(table, path)| (table.clone(), ArtifactStatus::resolve(path)))
                    .collect(),
            })
            .collect();
        Ok(BackupDetails { manifest, databases })
    }

    pub fn stats(&self) -> Result<InventoryStats> {
        let mut stats = InventoryStats::default();

        for entry in self.entries()? {
            stats.sessions += 1;
            let manifest = match entry.manifest {
                Ok(manifest) => manifest,
                Err(e) => {
                    stats.unreadable.push((entry.path, e));
                    continue;
                }
            };

            *stats.formats.entry(manifest.backup_format.clone()).or_default() += 1;
            for (name, db) in &manifest.databases {
                stats.databases.insert(name.clone());
                for status in db.paths().map(|p| ArtifactStatus::resolve(p)) {
                    if let Some(size) = status.size {
                        stats.files += 1;
                        stats.bytes += size;
                    }
                }
            }
        }

        Ok(stats)
    }
}

fn is_manifest(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(MANIFEST_PREFIX)
        && path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
        && path.is_file()
}
