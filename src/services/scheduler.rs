//! Background job scheduler.
//!
//! Jobs are registered as data (id + trigger) on an explicitly constructed
//! scheduler owned by the application lifecycle. Each job carries an overlap
//! guard: when a run is still in flight at the next fire time, the new run
//! is skipped, not queued. Job failures are logged and recorded but never
//! stop the loop.

use crate::config::SchedulerConfig;
use crate::services::database::Database;
use crate::services::metrics::RECONCILED_TOTAL;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const JOB_UPDATE_OVERDUE: &str = "update_overdue_invoices";
pub const JOB_PRUNE_EXECUTIONS: &str = "delete_old_job_executions";

const EXECUTION_RETENTION_DAYS: i64 = 7;

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every hour, on the hour.
    Hourly,
    /// Every Monday at 00:00 UTC.
    WeeklyMonday,
}

impl Trigger {
    /// Next fire time strictly after `now`.
    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Trigger::Hourly => {
                let truncated = Utc
                    .with_ymd_and_hms(now.year(), now.month(), now.day(), now.hour(), 0, 0)
                    .single()
                    .unwrap_or(now);
                truncated + ChronoDuration::hours(1)
            }
            Trigger::WeeklyMonday => {
                let midnight = Utc
                    .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
                    .single()
                    .unwrap_or(now);
                let days_to_monday = (7 - now.weekday().num_days_from_monday() as i64) % 7;
                let candidate = midnight + ChronoDuration::days(days_to_monday);
                if candidate > now {
                    candidate
                } else {
                    candidate + ChronoDuration::days(7)
                }
            }
        }
    }
}

/// One registered job: identity plus trigger. At most one instance of a job
/// runs at a time.
#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub id: &'static str,
    pub trigger: Trigger,
}

/// The fixed job registry.
pub const JOBS: [JobSpec; 2] = [
    JobSpec {
        id: JOB_UPDATE_OVERDUE,
        trigger: Trigger::Hourly,
    },
    JobSpec {
        id: JOB_PRUNE_EXECUTIONS,
        trigger: Trigger::WeeklyMonday,
    },
];

/// Periodic job runner owned by the application.
#[derive(Clone)]
pub struct Scheduler {
    db: Database,
    reconcile_guard: Arc<Mutex<()>>,
    prune_guard: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            reconcile_guard: Arc::new(Mutex::new(())),
            prune_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Spawn one loop per registered job. Returns immediately; the loops run
    /// until the process exits.
    pub fn spawn(&self, config: &SchedulerConfig) {
        if !config.enabled {
            info!("Scheduler disabled by configuration");
            return;
        }

        for job in JOBS {
            info!(job_id = job.id, trigger = ?job.trigger, "Registering scheduled job");
            let runner = self.clone();
            tokio::spawn(async move {
                loop {
                    sleep_until(job.trigger.next_fire(Utc::now())).await;
                    runner.run_job(job.id).await;
                }
            });
        }
    }

    /// Run one registered job by id, with its overlap guard.
    pub async fn run_job(&self, job_id: &'static str) {
        let guard = match job_id {
            JOB_UPDATE_OVERDUE => &self.reconcile_guard,
            JOB_PRUNE_EXECUTIONS => &self.prune_guard,
            other => {
                error!(job_id = other, "Unknown job id");
                return;
            }
        };

        let _guard = match guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(job_id = job_id, "Previous run still in flight, skipping");
                return;
            }
        };

        let started = Utc::now();
        let (succeeded, detail) = match job_id {
            JOB_UPDATE_OVERDUE => self.reconcile_overdue_pass().await,
            _ => self.prune_executions_pass().await,
        };
        let finished = Utc::now();

        if let Err(e) = self
            .db
            .record_job_execution(job_id, started, finished, succeeded, &detail)
            .await
        {
            error!(job_id = job_id, error = %e, "Failed to record job execution");
        }
    }

    async fn reconcile_overdue_pass(&self) -> (bool, String) {
        match self.db.reconcile_overdue(None).await {
            Ok(updated) => {
                RECONCILED_TOTAL
                    .with_label_values(&["scheduled"])
                    .inc_by(updated.len() as u64);
                info!(
                    job_id = JOB_UPDATE_OVERDUE,
                    updated = updated.len(),
                    "Overdue reconciliation completed"
                );
                (true, format!("updated {} invoice(s)", updated.len()))
            }
            Err(e) => {
                error!(job_id = JOB_UPDATE_OVERDUE, error = %e, "Overdue reconciliation failed");
                (false, e.to_string())
            }
        }
    }

    async fn prune_executions_pass(&self) -> (bool, String) {
        let cutoff = Utc::now() - ChronoDuration::days(EXECUTION_RETENTION_DAYS);
        match self.db.delete_old_job_executions(cutoff).await {
            Ok(deleted) => {
                info!(
                    job_id = JOB_PRUNE_EXECUTIONS,
                    deleted = deleted,
                    "Job history pruning completed"
                );
                (true, format!("deleted {} record(s)", deleted))
            }
            Err(e) => {
                error!(job_id = JOB_PRUNE_EXECUTIONS, error = %e, "Job history pruning failed");
                (false, e.to_string())
            }
        }
    }
}

async fn sleep_until(fire_at: DateTime<Utc>) {
    let now = Utc::now();
    if let Ok(wait) = (fire_at - now).to_std() {
        tokio::time::sleep(wait).await;
    }
}
