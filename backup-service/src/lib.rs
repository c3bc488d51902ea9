//! MySQL backup service library.
//!
//! Periodically discovers the databases on a server, writes full SQL dumps
//! and per-table CSV exports, records each cycle in a JSON manifest and
//! prunes artifacts past their retention.

pub mod config;
pub mod daemon;
pub mod db;
pub mod executor;
pub mod export;
pub mod inventory;
pub mod labels;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{AppConfig, BackupFormat};
pub use utils::errors::{BackupError, ConfigError, Result};
