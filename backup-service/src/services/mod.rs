pub mod backup_scheduler;
pub mod catalog;
pub mod probe;
pub mod retention;

pub use backup_scheduler::{BackupScheduler, CycleGuard, Trigger};
pub use catalog::Catalog;
pub use retention::{RetentionSweeper, SweepReport};
