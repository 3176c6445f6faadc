//! Types for the task scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::sync::{JobReport, SyncError};

/// A unit of repeating background work.
#[async_trait]
pub trait Job: Send {
    /// Unique name, used in logs, metrics and status.
    fn name(&self) -> &str;

    /// Pause between the end of one run and the start of the next.
    fn delay(&self) -> Duration;

    /// Perform one run. Errors end the run; the scheduler logs them.
    async fn run(&mut self, cancel: &CancellationToken) -> Result<JobReport, SyncError>;
}

/// Errors from scheduler management calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("job already registered: {0}")]
    DuplicateJob(String),
}

/// Per-job state. There is no failed state: a failed run goes back to idle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
}

/// How one run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Cancelled,
    Panicked,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::Panicked => "panicked",
        }
    }
}

/// Snapshot of one job for the operator surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub name: String,
    pub state: JobState,
    pub delay_ms: u64,
    /// Runs finished so far, whatever the outcome.
    pub runs: u64,
    pub failures: u64,
    pub last_outcome: Option<JobOutcome>,
    pub last_error: Option<String>,
    pub last_report: Option<JobReport>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: JobState::Idle,
            delay_ms: delay.as_millis() as u64,
            runs: 0,
            failures: 0,
            last_outcome: None,
            last_error: None,
            last_report: None,
            last_started_at: None,
            last_finished_at: None,
        }
    }
}

/// Snapshot of the whole scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}
