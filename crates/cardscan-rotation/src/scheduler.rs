//! Rotation scheduler: the recurring trigger that sweeps expired buckets
//! into archives.
//!
//! One background task fires at period boundaries (daily midnight, Monday
//! midnight, or the first of the month, per the configured granularity) and
//! runs a sweep across every output category. Sweeps are serialized through
//! an internal guard, so a trigger firing while a sweep is still running
//! queues behind it instead of running in parallel.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cardscan_core::config::{OutputCategory, RotationConfig, RotationGranularity};
use cardscan_core::{CoreError, CoreResult};

use crate::archiver;
use crate::policy::RotationPolicy;
use crate::store::BucketStore;

/// Per-category outcome of one sweep.
#[derive(Debug, Clone, Copy)]
pub struct CategorySweep {
    pub category: OutputCategory,
    /// Buckets archived and removed.
    pub archived: usize,
    /// Buckets still within retention, left untouched.
    pub skipped: usize,
    /// Buckets whose archival (or listing) failed. Never aborts the sweep.
    pub failed: usize,
}

impl CategorySweep {
    fn new(category: OutputCategory) -> Self {
        Self {
            category,
            archived: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Accumulated outcome of one full sweep across all categories.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub categories: Vec<CategorySweep>,
}

impl SweepReport {
    /// Total buckets archived.
    pub fn archived(&self) -> usize {
        self.categories.iter().map(|c| c.archived).sum()
    }

    /// Total buckets skipped as still within retention.
    pub fn skipped(&self) -> usize {
        self.categories.iter().map(|c| c.skipped).sum()
    }

    /// Total per-bucket failures.
    pub fn failed(&self) -> usize {
        self.categories.iter().map(|c| c.failed).sum()
    }
}

/// Background rotation scheduler.
///
/// Lifecycle is `Stopped -> Running -> Stopped`; [`start`] and [`stop`] are
/// idempotent. [`stop`] cancels the pending trigger and waits for an
/// in-flight sweep to finish, so shutdown never leaves a bucket
/// half-archived.
///
/// [`start`]: RotationScheduler::start
/// [`stop`]: RotationScheduler::stop
pub struct RotationScheduler {
    store: Arc<BucketStore>,
    config: RotationConfig,
    sweep_guard: Arc<Mutex<()>>,
    worker: Option<(watch::Sender<()>, JoinHandle<()>)>,
}

impl RotationScheduler {
    /// Create a scheduler over an existing store.
    pub fn new(store: Arc<BucketStore>, config: RotationConfig) -> Self {
        Self {
            store,
            config,
            sweep_guard: Arc::new(Mutex::new(())),
            worker: None,
        }
    }

    /// Provision the store from `config` and build a scheduler over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the category directories cannot be created.
    pub fn from_config(config: RotationConfig) -> CoreResult<Self> {
        let store = Arc::new(BucketStore::new(&config)?);
        Ok(Self::new(store, config))
    }

    /// The store this scheduler sweeps; output writers share it.
    pub fn store(&self) -> Arc<BucketStore> {
        Arc::clone(&self.store)
    }

    /// Whether the background trigger is registered.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Register the recurring trigger. No-op when already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("rotation scheduler already running");
            return;
        }

        for category in OutputCategory::ALL {
            let policy = self.policy_for(category);
            if policy.shorter_than_period() {
                warn!(
                    category = %category,
                    retention_days = policy.retention_days,
                    granularity = %policy.granularity,
                    "retention window is shorter than one rotation period; \
                     the active bucket may be archived while still receiving writes"
                );
            }
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        let inner = self.clone_for_worker();
        let granularity = self.config.granularity;

        let handle = tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = next_fire(now, granularity);
                debug!(next = %next, "rotation trigger armed");

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown_rx.changed() => break,
                }

                let fired_at = Local::now().naive_local();
                let report = inner.sweep_at(fired_at).await;
                if report.failed() > 0 {
                    error!(
                        failed = report.failed(),
                        "scheduled sweep finished with failures"
                    );
                }
            }
        });

        self.worker = Some((shutdown_tx, handle));
        info!(granularity = %granularity, "rotation scheduler started");
    }

    /// Cancel the pending trigger and wait for a running sweep to finish.
    /// No-op when already stopped.
    pub async fn stop(&mut self) {
        let Some((shutdown_tx, handle)) = self.worker.take() else {
            return;
        };

        let _ = shutdown_tx.send(());
        if handle.await.is_err() {
            error!("rotation worker terminated abnormally");
        }
        info!("rotation scheduler stopped");
    }

    /// Sweep all categories now, archiving buckets past their retention
    /// window. Serialized against the background trigger.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Local::now().naive_local()).await
    }

    /// Sweep with an explicit wall-clock instant; the instant also stamps
    /// archive filenames.
    pub async fn sweep_at(&self, now: NaiveDateTime) -> SweepReport {
        self.run_sweep(now, false).await
    }

    /// Operator entry point that ignores the retention window entirely,
    /// archiving every candidate bucket in every category immediately.
    pub async fn force_cleanup(&self) -> SweepReport {
        self.force_cleanup_at(Local::now().naive_local()).await
    }

    /// Forced cleanup with an explicit wall-clock instant.
    pub async fn force_cleanup_at(&self, now: NaiveDateTime) -> SweepReport {
        warn!("forced cleanup initiated; archiving all candidate buckets");
        self.run_sweep(now, true).await
    }

    async fn run_sweep(&self, now: NaiveDateTime, forced: bool) -> SweepReport {
        // No two sweeps run concurrently; a trigger firing mid-sweep waits
        // here.
        let _guard = self.sweep_guard.lock().await;

        info!(forced, "starting rotation sweep");
        let start = Instant::now();

        let mut report = SweepReport::default();
        for category in OutputCategory::ALL {
            let mut policy = self.policy_for(category);
            if forced {
                policy = policy.forced();
            }
            report.categories.push(self.sweep_category(category, policy, now));
        }

        info!(
            archived = report.archived(),
            skipped = report.skipped(),
            failed = report.failed(),
            duration_ms = start.elapsed().as_millis() as u64,
            "rotation sweep complete"
        );
        report
    }

    fn sweep_category(
        &self,
        category: OutputCategory,
        policy: RotationPolicy,
        now: NaiveDateTime,
    ) -> CategorySweep {
        let mut outcome = CategorySweep::new(category);

        let candidates = match self.store.list_candidates(category) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(category = %category, error = %e, "failed to list candidate buckets");
                outcome.failed += 1;
                return outcome;
            }
        };

        for bucket in candidates {
            if !policy.is_expired(&bucket.name, bucket.modified, now) {
                debug!(
                    bucket = %bucket.name,
                    category = %category,
                    "bucket within retention, skipping"
                );
                outcome.skipped += 1;
                continue;
            }

            match archiver::archive_bucket(&bucket.path, &self.store.archive_dir(category), now) {
                Ok(entry) => {
                    info!(
                        bucket = %entry.bucket,
                        category = %category,
                        files = entry.files,
                        "bucket archived"
                    );
                    outcome.archived += 1;
                }
                Err(e @ CoreError::SourceRemoval { .. }) => {
                    // The archive exists but the source survived; it will be
                    // seen (and re-archived) next sweep.
                    error!(
                        bucket = %bucket.name,
                        category = %category,
                        error = %e,
                        "archive written but source removal failed"
                    );
                    outcome.failed += 1;
                }
                Err(e) => {
                    error!(
                        bucket = %bucket.name,
                        category = %category,
                        error = %e,
                        "failed to archive bucket"
                    );
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    fn policy_for(&self, category: OutputCategory) -> RotationPolicy {
        RotationPolicy::new(self.config.granularity, self.config.retention_days(category))
    }

    /// Clone for the worker task (without the trigger handle).
    fn clone_for_worker(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            sweep_guard: Arc::clone(&self.sweep_guard),
            worker: None,
        }
    }
}

/// First trigger instant strictly after `now` for a granularity: the next
/// midnight, the next Monday midnight, or the next first-of-month midnight.
fn next_fire(now: NaiveDateTime, granularity: RotationGranularity) -> NaiveDateTime {
    let today = now.date();
    let next = match granularity {
        RotationGranularity::Daily => today + Duration::days(1),
        RotationGranularity::Weekly => {
            let ahead = 7 - i64::from(today.weekday().num_days_from_monday());
            today + Duration::days(ahead)
        }
        RotationGranularity::Monthly => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            // The first of a month always exists.
            chrono::NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today + Duration::days(1))
        }
    };
    next.and_time(NaiveTime::MIN)
}
