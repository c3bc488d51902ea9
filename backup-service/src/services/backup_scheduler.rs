use crate::executor::{BackupCoordinator, CycleOutcome};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

/// Result of one trigger.
#[derive(Debug)]
pub enum Trigger {
    Ran(CycleOutcome),
    /// A cycle was already in flight, or shutdown has started
    Skipped,
}

/// Admits at most one cycle at a time.
pub struct CycleGuard {
    coordinator: Arc<BackupCoordinator>,
    running: Mutex<()>,
    cancel: CancellationToken,
}

impl CycleGuard {
    pub fn new(coordinator: Arc<BackupCoordinator>, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            running: Mutex::new(()),
            cancel,
        }
    }

    pub async fn trigger(&self) -> Trigger {
        let Ok(_running) = self.running.try_lock() else {
            tracing::warn!("Skipping scheduled run: previous backup cycle still running");
            return Trigger::Skipped;
        };
        if self.cancel.is_cancelled() {
            return Trigger::Skipped;
        }
        Trigger::Ran(self.coordinator.run_cycle(&self.cancel).await)
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Resolves once no cycle holds the guard.
    pub async fn wait_idle(&self) {
        let _idle = self.running.lock().await;
    }
}

pub struct BackupScheduler {
    scheduler: Mutex<JobScheduler>,
    guard: Arc<CycleGuard>,
    interval: Duration,
    cancel: CancellationToken,
}

impl BackupScheduler {
    pub async fn new(
        coordinator: Arc<BackupCoordinator>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            guard: Arc::new(CycleGuard::new(coordinator, cancel.clone())),
            interval,
            cancel,
        })
    }

    pub fn guard(&self) -> Arc<CycleGuard> {
        self.guard.clone()
    }

    /// Register the repeated job, start ticking and kick off the initial
    /// cycle in the background.
    pub async fn start(&self) -> Result<()> {
        let guard = self.guard.clone();
        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let guard = guard.clone();
            Box::pin(async move {
                tracing::info!("Scheduled backup triggered");
                guard.trigger().await;
            })
        })?;

        let mut scheduler = self.scheduler.lock().await;
        scheduler.add(job).await?;
        scheduler.start().await?;
        tracing::info!(
            interval_hours = self.interval.as_secs() / 3600,
            "Backup scheduled every {} hours",
            self.interval.as_secs() / 3600
        );

        let guard = self.guard.clone();
        tokio::spawn(async move {
            guard.trigger().await;
        });
        Ok(())
    }

    /// Stop admitting cycles, wait up to `drain` for the one in flight and
    /// stop the scheduler.
    pub async fn shutdown(&self, drain: Duration) -> Result<()> {
        self.cancel.cancel();

        if tokio::time::timeout(drain, self.guard.wait_idle()).await.is_err() {
            tracing::warn!(
                drain_secs = drain.as_secs(),
                "Backup cycle still running after drain timeout"
            );
        }

        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }
}
