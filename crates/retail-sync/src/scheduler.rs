//! # Scheduler
//!
//! Interval jobs that drive the engine.
//!
//! ## Jobs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fishbowl_sync    every sync_interval_minutes   ──► determine_sync()   │
//! │  fishbowl_sales   every sales_interval_minutes  ──► run_sales_check()  │
//! │                   (MANUAL method only)                                  │
//! │                                                                         │
//! │  First run: one full interval after the job is scheduled.              │
//! │  A job that overruns its interval delays the next tick.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Config Changes
//! ```text
//! apply_config(update)
//!   │
//!   ├── validate ── persist to the inventory document
//!   ├── sync interval changed        ──► reschedule fishbowl_sync
//!   ├── method now AUTOMATED         ──► remove fishbowl_sales
//!   └── method MANUAL and (method or sales interval changed, or no job)
//!                                    ──► reschedule fishbowl_sales
//! ```
//!
//! Job failures are already in the error log (the engine writes them); the
//! job loop only traces them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use retail_core::validation::{validate_config_update, validate_interval};
use retail_core::{ConfigUpdate, ErrorKind, Failure, InventoryMethod, SyncConfig};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Job Types
// =============================================================================

/// The two scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Sync,
    SalesCheck,
}

impl JobKind {
    /// Stable job identifier.
    pub fn id(&self) -> &'static str {
        match self {
            JobKind::Sync => "fishbowl_sync",
            JobKind::SalesCheck => "fishbowl_sales",
        }
    }

    fn interval_field(&self) -> &'static str {
        match self {
            JobKind::Sync => "sync_interval_minutes",
            JobKind::SalesCheck => "sales_interval_minutes",
        }
    }

    /// Interval for this job from the runtime config.
    pub fn interval_minutes(&self, config: &SyncConfig) -> u32 {
        match self {
            JobKind::Sync => config.sync_interval_minutes,
            JobKind::SalesCheck => config.sales_interval_minutes,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A scheduled job as callers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub kind: JobKind,
    pub id: &'static str,
    pub interval_minutes: u32,
    pub scheduled_at: DateTime<Utc>,
    /// First run after scheduling.
    pub first_run: DateTime<Utc>,
}

/// What [`SchedulerHandle::apply_config`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigChange {
    pub config: SyncConfig,
    pub rescheduled: Vec<JobKind>,
    pub removed: Vec<JobKind>,
}

struct ScheduledJob {
    info: JobInfo,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ScheduledJob {
    async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(job = %self.info.kind, error = %e, "Job task ended abnormally");
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Starts the job set for the current runtime config.
pub struct Scheduler;

impl Scheduler {
    /// Schedules `fishbowl_sync`, plus `fishbowl_sales` when the method is
    /// manual.
    pub async fn start(engine: Arc<SyncEngine>) -> SyncResult<SchedulerHandle> {
        let handle = SchedulerHandle {
            engine: Arc::clone(&engine),
            jobs: Arc::new(Mutex::new(BTreeMap::new())),
        };

        let config = engine.store().inventory().get_config().await?;
        handle
            .schedule(JobKind::Sync, config.sync_interval_minutes)
            .await?;
        if config.inventory_method == InventoryMethod::Manual {
            handle
                .schedule(JobKind::SalesCheck, config.sales_interval_minutes)
                .await?;
        }

        info!(
            method = %config.inventory_method,
            jobs = handle.jobs().await.len(),
            "Scheduler started"
        );
        Ok(handle)
    }
}

/// Handle for controlling scheduled jobs.
#[derive(Clone)]
pub struct SchedulerHandle {
    engine: Arc<SyncEngine>,
    jobs: Arc<Mutex<BTreeMap<JobKind, ScheduledJob>>>,
}

impl SchedulerHandle {
    /// Scheduled jobs, sync first.
    pub async fn jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .lock()
            .await
            .values()
            .map(|job| job.info.clone())
            .collect()
    }

    pub async fn is_scheduled(&self, kind: JobKind) -> bool {
        self.jobs.lock().await.contains_key(&kind)
    }

    /// Replaces a job, reading its interval fresh from the store.
    pub async fn reschedule(&self, kind: JobKind) -> Result<JobInfo, Failure> {
        let result = async {
            let config = self.engine.store().inventory().get_config().await?;
            self.schedule(kind, kind.interval_minutes(&config)).await
        }
        .await;

        match result {
            Ok(info) => Ok(info),
            Err(e) => Err(self
                .engine
                .fail(
                    ErrorKind::SchedulerError,
                    format!("Failed to reschedule {}: {}", kind, e),
                    "scheduler",
                    json!({ "job": kind.id() }),
                )
                .await),
        }
    }

    /// Stops and removes a job. Returns `false` when it was not scheduled.
    pub async fn remove(&self, kind: JobKind) -> bool {
        let job = self.jobs.lock().await.remove(&kind);
        match job {
            Some(job) => {
                job.stop().await;
                info!(job = %kind, "Job removed");
                true
            }
            None => false,
        }
    }

    /// Validates and persists a runtime config change, then adjusts jobs.
    ///
    /// Invalid input is returned without being logged.
    pub async fn apply_config(&self, update: ConfigUpdate) -> Result<ConfigChange, Failure> {
        if let Err(e) = validate_config_update(&update) {
            return Err(Failure::new(ErrorKind::SchedulerError, e.to_string()));
        }

        let inventory = self.engine.store().inventory();
        let persisted = async {
            let before = inventory.get_config().await?;
            let after = inventory.update_config(&update).await?;
            Ok::<_, SyncError>((before, after))
        }
        .await;

        let (before, after) = match persisted {
            Ok(configs) => configs,
            Err(e) => {
                return Err(self
                    .engine
                    .fail(
                        ErrorKind::SchedulerError,
                        format!("Failed to update sync config: {}", e),
                        "scheduler",
                        json!({}),
                    )
                    .await);
            }
        };

        let mut change = ConfigChange {
            config: after.clone(),
            rescheduled: Vec::new(),
            removed: Vec::new(),
        };

        if after.sync_interval_minutes != before.sync_interval_minutes {
            self.reschedule(JobKind::Sync).await?;
            change.rescheduled.push(JobKind::Sync);
        }

        match after.inventory_method {
            InventoryMethod::Automated => {
                if self.remove(JobKind::SalesCheck).await {
                    change.removed.push(JobKind::SalesCheck);
                }
            }
            InventoryMethod::Manual => {
                let needs_job = before.inventory_method != InventoryMethod::Manual
                    || after.sales_interval_minutes != before.sales_interval_minutes
                    || !self.is_scheduled(JobKind::SalesCheck).await;
                if needs_job {
                    self.reschedule(JobKind::SalesCheck).await?;
                    change.rescheduled.push(JobKind::SalesCheck);
                }
            }
        }

        info!(
            method = %after.inventory_method,
            rescheduled = ?change.rescheduled,
            removed = ?change.removed,
            "Sync config applied"
        );
        Ok(change)
    }

    /// Stops every job.
    pub async fn shutdown(&self) {
        let jobs = std::mem::take(&mut *self.jobs.lock().await);
        for (_, job) in jobs {
            job.stop().await;
        }
        info!("Scheduler stopped");
    }

    async fn schedule(&self, kind: JobKind, minutes: u32) -> SyncResult<JobInfo> {
        validate_interval(kind.interval_field(), minutes)
            .map_err(|e| SyncError::Scheduler(e.to_string()))?;
        let period = Duration::from_secs(u64::from(minutes) * 60);
        Ok(self.spawn_job(kind, minutes, period).await)
    }

    async fn spawn_job(&self, kind: JobKind, minutes: u32, period: Duration) -> JobInfo {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let scheduled_at = Utc::now();
        let info = JobInfo {
            kind,
            id: kind.id(),
            interval_minutes: minutes,
            scheduled_at,
            first_run: scheduled_at
                + chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::zero()),
        };

        let task = tokio::spawn(run_job(
            Arc::clone(&self.engine),
            kind,
            period,
            shutdown_rx,
        ));

        let previous = self.jobs.lock().await.insert(
            kind,
            ScheduledJob {
                info: info.clone(),
                shutdown_tx,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.stop().await;
        }

        info!(job = %kind, interval_minutes = minutes, "Job scheduled");
        info
    }
}

async fn run_job(
    engine: Arc<SyncEngine>,
    kind: JobKind,
    period: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                debug!(job = %kind, "Job firing");
                match kind {
                    JobKind::Sync => match engine.determine_sync().await {
                        Ok(report) => info!(job = %kind, message = %report.message, "Job finished"),
                        Err(failure) => warn!(job = %kind, error = %failure, "Job failed"),
                    },
                    JobKind::SalesCheck => match engine.run_sales_check().await {
                        Ok(report) => info!(job = %kind, message = %report.message, "Job finished"),
                        Err(failure) => warn!(job = %kind, error = %failure, "Job failed"),
                    },
                }
            }

            _ = shutdown_rx.recv() => {
                debug!(job = %kind, "Job shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::erp::fake::FakeErp;
    use tempfile::TempDir;

    async fn start(dir: &TempDir, erp: &FakeErp) -> SchedulerHandle {
        let engine = Arc::new(engine(dir, erp).await);
        Scheduler::start(engine).await.unwrap()
    }

    fn kinds(jobs: &[JobInfo]) -> Vec<JobKind> {
        jobs.iter().map(|j| j.kind).collect()
    }

    #[tokio::test]
    async fn test_manual_method_schedules_both_jobs() {
        let dir = TempDir::new().unwrap();
        let scheduler = start(&dir, &FakeErp::new()).await;

        let jobs = scheduler.jobs().await;
        assert_eq!(kinds(&jobs), vec![JobKind::Sync, JobKind::SalesCheck]);
        assert_eq!(jobs[0].id, "fishbowl_sync");
        assert_eq!(jobs[0].interval_minutes, 5);
        assert_eq!(jobs[1].interval_minutes, 180);
        assert_eq!(jobs[0].first_run - jobs[0].scheduled_at, chrono::Duration::minutes(5));

        scheduler.shutdown().await;
        assert!(scheduler.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_switching_to_automated_removes_sales_job() {
        let dir = TempDir::new().unwrap();
        let scheduler = start(&dir, &FakeErp::new()).await;

        let change = scheduler
            .apply_config(ConfigUpdate {
                inventory_method: Some(InventoryMethod::Automated),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(change.removed, vec![JobKind::SalesCheck]);
        assert!(change.rescheduled.is_empty());
        assert_eq!(kinds(&scheduler.jobs().await), vec![JobKind::Sync]);

        let change = scheduler
            .apply_config(ConfigUpdate {
                inventory_method: Some(InventoryMethod::Manual),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(change.rescheduled, vec![JobKind::SalesCheck]);
        assert!(scheduler.is_scheduled(JobKind::SalesCheck).await);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_interval_change_reschedules_with_new_interval() {
        let dir = TempDir::new().unwrap();
        let scheduler = start(&dir, &FakeErp::new()).await;

        let change = scheduler
            .apply_config(ConfigUpdate {
                sync_interval_minutes: Some(15),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(change.rescheduled, vec![JobKind::Sync]);
        assert_eq!(change.config.sync_interval_minutes, 15);
        assert_eq!(scheduler.jobs().await[0].interval_minutes, 15);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_interval_is_rejected_and_not_persisted() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let engine = Arc::new(engine(&dir, &erp).await);
        let scheduler = Scheduler::start(Arc::clone(&engine)).await.unwrap();

        let failure = scheduler
            .apply_config(ConfigUpdate {
                sales_interval_minutes: Some(181),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::SchedulerError);

        let config = engine.store().inventory().get_config().await.unwrap();
        assert_eq!(config.sales_interval_minutes, 180);
        assert!(engine.store().errors().get_errors(10, false).await.unwrap().is_empty());

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_job_runs_engine_after_one_period() {
        let dir = TempDir::new().unwrap();
        let erp = FakeErp::new();
        let scheduler = start(&dir, &erp).await;
        scheduler.shutdown().await;

        scheduler
            .spawn_job(JobKind::SalesCheck, 1, Duration::from_millis(20))
            .await;
        assert!(erp.queries().is_empty());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while erp.queries().is_empty() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(erp.queries()[0].contains("FROM so"));

        assert!(scheduler.remove(JobKind::SalesCheck).await);
        assert!(!scheduler.remove(JobKind::SalesCheck).await);
    }
}
