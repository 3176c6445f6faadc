//! Task scheduler implementation.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::metrics;
use crate::sync::SyncError;

use super::types::{
    Job, JobOutcome, JobState, JobStatus, SchedulerError, SchedulerStatus,
};

type SharedJob = Arc<Mutex<Box<dyn Job>>>;
type StatusMap = Arc<RwLock<HashMap<String, JobStatus>>>;

struct Registered {
    name: String,
    delay: Duration,
    job: SharedJob,
}

/// Runs every registered job in its own supervised loop.
pub struct TaskScheduler {
    jobs: Vec<Registered>,
    statuses: StatusMap,
    cancel: CancellationToken,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Register a job. Names must be unique.
    pub fn add_job(&mut self, job: Box<dyn Job>) -> Result<(), SchedulerError> {
        let name = job.name().to_string();
        if self.jobs.iter().any(|registered| registered.name == name) {
            return Err(SchedulerError::DuplicateJob(name));
        }

        let delay = job.delay();
        self.jobs.push(Registered {
            name,
            delay,
            job: Arc::new(Mutex::new(job)),
        });
        Ok(())
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|registered| registered.name.clone()).collect()
    }

    /// Token cancelled on shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn one loop per registered job.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        let mut handles = self.handles.lock().await;
        for registered in &self.jobs {
            handles.push(self.spawn_loop(registered));
        }
        info!(jobs = self.jobs.len(), "Scheduler started");
    }

    /// Cancel every loop and wait for all of them to exit.
    ///
    /// A run in progress observes the cancellation at its next suspension
    /// point.
    pub async fn shutdown(&self) {
        info!("Stopping scheduler");
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Job loop did not exit cleanly");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Scheduler stopped");
    }

    /// Run a single supervised iteration of one job and wait for it.
    pub async fn run_once(&self, name: &str) -> Result<JobOutcome, SchedulerError> {
        let registered = self
            .jobs
            .iter()
            .find(|registered| registered.name == name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;

        Ok(run_iteration(registered, &self.statuses, &self.cancel).await)
    }

    /// Status of one job; a job that never ran reports as idle.
    pub async fn job_status(&self, name: &str) -> Option<JobStatus> {
        let registered = self.jobs.iter().find(|registered| registered.name == name)?;
        let statuses = self.statuses.read().await;
        Some(status_or_idle(&statuses, registered))
    }

    /// Snapshot of every job, in registration order.
    pub async fn status(&self) -> SchedulerStatus {
        let statuses = self.statuses.read().await;
        SchedulerStatus {
            running: self.is_running(),
            jobs: self
                .jobs
                .iter()
                .map(|registered| status_or_idle(&statuses, registered))
                .collect(),
        }
    }

    fn spawn_loop(&self, registered: &Registered) -> JoinHandle<()> {
        let registered = Registered {
            name: registered.name.clone(),
            delay: registered.delay,
            job: Arc::clone(&registered.job),
        };
        let statuses = Arc::clone(&self.statuses);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let name = registered.name.clone();
            let delay = registered.delay;
            info!(job = %name, delay_ms = delay.as_millis() as u64, "Job loop started");
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                run_iteration(&registered, &statuses, &cancel).await;

                if delay.is_zero() {
                    tokio::task::yield_now().await;
                    continue;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            info!(job = %name, "Job loop stopped");
        })
    }
}

fn status_or_idle(statuses: &HashMap<String, JobStatus>, registered: &Registered) -> JobStatus {
    statuses
        .get(&registered.name)
        .cloned()
        .unwrap_or_else(|| JobStatus::new(&registered.name, registered.delay))
}

/// One run of a job, with failures and panics contained.
async fn run_iteration(
    registered: &Registered,
    statuses: &StatusMap,
    cancel: &CancellationToken,
) -> JobOutcome {
    let name = registered.name.as_str();
    let run_id = Uuid::new_v4();
    let span = info_span!("job", job = %name, run_id = %run_id);

    async move {
        let mut job = registered.job.lock().await;

        {
            let mut statuses = statuses.write().await;
            let status = statuses
                .entry(name.to_string())
                .or_insert_with(|| JobStatus::new(name, registered.delay));
            status.state = JobState::Running;
            status.last_started_at = Some(Utc::now());
        }
        debug!("Job run started");

        let started = Instant::now();
        let result = AssertUnwindSafe(job.run(cancel)).catch_unwind().await;
        let elapsed = started.elapsed();
        drop(job);

        let (outcome, error_message, report) = match result {
            Ok(Ok(report)) => (JobOutcome::Succeeded, None, Some(report)),
            Ok(Err(SyncError::Cancelled)) => {
                info!("Job run cancelled");
                (JobOutcome::Cancelled, None, None)
            }
            Ok(Err(e)) => {
                error!(kind = e.kind(), error = %e, "Job run failed");
                (JobOutcome::Failed, Some(e.to_string()), None)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Job run panicked");
                (JobOutcome::Panicked, Some(message), None)
            }
        };

        metrics::JOB_RUNS
            .with_label_values(&[name, outcome.as_str()])
            .inc();
        metrics::JOB_RUN_DURATION
            .with_label_values(&[name])
            .observe(elapsed.as_secs_f64());

        if let Some(status) = statuses.write().await.get_mut(name) {
            status.state = JobState::Idle;
            status.runs += 1;
            if matches!(outcome, JobOutcome::Failed | JobOutcome::Panicked) {
                status.failures += 1;
            }
            status.last_outcome = Some(outcome);
            status.last_error = error_message;
            if report.is_some() {
                status.last_report = report;
            }
            status.last_finished_at = Some(Utc::now());
        }
        debug!(
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Job run finished"
        );

        outcome
    }
    .instrument(span)
    .await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
