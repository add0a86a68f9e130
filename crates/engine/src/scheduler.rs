use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::notifier::InactivityNotifier;
use crate::store::ProgressStore;
use crate::sync::SyncEngine;

struct ScheduleState {
    scheduler: Option<JobScheduler>,
    cron: String,
}

/// Owns the recurring roster sweep: a cron-driven job that syncs every
/// student sequentially with inter-student pacing, then runs the
/// inactivity pass. The scheduler owns its whole lifecycle; rescheduling
/// cancels the pending job and installs the replacement under one lock.
pub struct SweepScheduler {
    sync: Arc<SyncEngine>,
    notifier: Arc<InactivityNotifier>,
    store: Arc<dyn ProgressStore>,
    timezone: Tz,
    pacing: Duration,
    state: Mutex<ScheduleState>,
    sweep_gate: Mutex<()>,
}

impl SweepScheduler {
    pub fn new(
        sync: Arc<SyncEngine>,
        notifier: Arc<InactivityNotifier>,
        store: Arc<dyn ProgressStore>,
        config: &EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sync,
            notifier,
            store,
            timezone: config.timezone,
            pacing: config.pacing,
            state: Mutex::new(ScheduleState {
                scheduler: None,
                cron: config.cron.clone(),
            }),
            sweep_gate: Mutex::new(()),
        })
    }

    /// Install the configured schedule and start firing.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut state = self.state.lock().await;
        let cron = state.cron.clone();
        let scheduler = self.install(&cron).await?;
        state.scheduler = Some(scheduler);
        info!(%cron, timezone = %self.timezone, "roster sweep scheduled");
        Ok(())
    }

    /// Replace the active schedule. The expression is validated first, so a
    /// bad input leaves the current schedule running; otherwise the old job
    /// is shut down and the new one started without releasing the lock in
    /// between.
    pub async fn reschedule(self: &Arc<Self>, cron: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let job = self.make_job(cron)?;

        if let Some(mut old) = state.scheduler.take() {
            old.shutdown().await?;
        }

        let scheduler = JobScheduler::new().await?;
        scheduler.add(job).await?;
        scheduler.start().await?;
        state.scheduler = Some(scheduler);
        state.cron = cron.to_string();
        info!(%cron, "roster sweep rescheduled");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut scheduler) = state.scheduler.take() {
            if let Err(err) = scheduler.shutdown().await {
                error!(%err, "failed to shut down the sweep scheduler");
            }
        }
    }

    pub async fn current_schedule(&self) -> String {
        self.state.lock().await.cron.clone()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn install(self: &Arc<Self>, cron: &str) -> Result<JobScheduler> {
        let job = self.make_job(cron)?;
        let scheduler = JobScheduler::new().await?;
        scheduler.add(job).await?;
        scheduler.start().await?;
        Ok(scheduler)
    }

    fn make_job(self: &Arc<Self>, cron: &str) -> Result<Job> {
        let this = Arc::clone(self);
        let job = Job::new_async_tz(cron, self.timezone, move |_job_id, _scheduler| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                this.run_sweep().await;
            })
        })?;
        Ok(job)
    }

    /// One full pass over the roster: sync each student with pacing in
    /// between, then the inactivity checks. A firing that lands while a
    /// previous sweep is still running is skipped, never queued.
    pub async fn run_sweep(&self) {
        let Ok(_running) = self.sweep_gate.try_lock() else {
            warn!("previous roster sweep still running; skipping this firing");
            return;
        };

        let students = match self.store.list_students().await {
            Ok(students) => students,
            Err(err) => {
                error!(%err, "roster sweep aborted: could not load students");
                return;
            }
        };
        if students.is_empty() {
            info!("roster is empty; nothing to sweep");
            return;
        }
        info!(count = students.len(), "roster sweep started");

        for student in &students {
            match self.sync.sync(student.student_id).await {
                Ok(report) => info!(
                    handle = %student.handle,
                    new_contests = report.new_contests,
                    new_submissions = report.new_submissions,
                    "synced"
                ),
                Err(err) => error!(handle = %student.handle, %err, "sync failed"),
            }
            tokio::time::sleep(self.pacing).await;
        }

        // The notifier re-reads each student so it sees what the syncs
        // above just persisted.
        for student in &students {
            self.notifier.check_inactivity(student.student_id).await;
        }

        info!("roster sweep finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SWEEP_CRON;
    use crate::testing::{MemoryStore, RecordingMailer, StubJudge, sample_student};
    use std::sync::atomic::Ordering;

    fn test_config() -> EngineConfig {
        EngineConfig {
            api_base: "http://localhost:0".to_string(),
            http_timeout: Duration::from_secs(1),
            submission_fetch_limit: 1000,
            cron: DEFAULT_SWEEP_CRON.to_string(),
            timezone: chrono_tz::Asia::Kolkata,
            pacing: Duration::ZERO,
        }
    }

    fn scheduler(
        store: Arc<MemoryStore>,
        judge: Arc<StubJudge>,
        mailer: Arc<RecordingMailer>,
    ) -> Arc<SweepScheduler> {
        let sync = Arc::new(SyncEngine::new(store.clone(), judge, 1000));
        let notifier = Arc::new(InactivityNotifier::new(store.clone(), mailer));
        SweepScheduler::new(sync, notifier, store, &test_config())
    }

    #[tokio::test]
    async fn sweep_syncs_everyone_then_runs_inactivity_checks() {
        let store = Arc::new(MemoryStore::new());
        store.add_student(sample_student("alice"));
        store.add_student(sample_student("bob"));

        let judge = Arc::new(StubJudge::new());
        let mailer = Arc::new(RecordingMailer::new());
        scheduler(store.clone(), judge.clone(), mailer.clone())
            .run_sweep()
            .await;

        assert_eq!(judge.info_calls.load(Ordering::SeqCst), 2);
        // Neither student has a recent accepted solve, so both get nudged.
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn one_failing_student_does_not_stop_the_sweep() {
        let store = Arc::new(MemoryStore::new());
        store.add_student(sample_student("alice"));
        // Listed in the roster but gone by sync time.
        store.add_phantom(sample_student("deleted"));

        let judge = Arc::new(StubJudge::new());
        let mailer = Arc::new(RecordingMailer::new());
        scheduler(store.clone(), judge.clone(), mailer.clone())
            .run_sweep()
            .await;

        // The surviving student still synced and was checked.
        assert_eq!(judge.info_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn overlapping_sweep_firing_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.add_student(sample_student("alice"));

        let judge = Arc::new(StubJudge::new());
        let mailer = Arc::new(RecordingMailer::new());
        let scheduler = scheduler(store, judge.clone(), mailer);

        let _in_flight = scheduler.sweep_gate.lock().await;
        scheduler.run_sweep().await;

        assert_eq!(judge.info_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_cron_expression_leaves_the_schedule_untouched() {
        let store = Arc::new(MemoryStore::new());
        let judge = Arc::new(StubJudge::new());
        let mailer = Arc::new(RecordingMailer::new());
        let scheduler = scheduler(store, judge, mailer);

        assert!(scheduler.reschedule("definitely not cron").await.is_err());
        assert_eq!(scheduler.current_schedule().await, DEFAULT_SWEEP_CRON);
    }
}
