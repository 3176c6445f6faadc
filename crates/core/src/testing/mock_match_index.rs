//! Mock match index for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::index::{IndexError, IndexSubmission, IndexedContent, MatchIndex, UpdateSet};

/// Mock implementation of the MatchIndex trait.
///
/// Records accepted submissions, tracks how many submissions are in flight at
/// once, and can reject chosen URLs.
#[derive(Debug)]
pub struct MockMatchIndex {
    /// Accepted submissions, in completion order.
    submissions: Arc<RwLock<Vec<IndexSubmission>>>,
    /// Submission attempts, accepted or not.
    attempts: Arc<AtomicUsize>,
    /// URLs whose submission is rejected.
    failing_urls: Arc<RwLock<HashSet<String>>>,
    /// Entries returned by `fetch_latest_state`.
    latest: Arc<RwLock<Vec<IndexedContent>>>,
    /// Limits passed to `fetch_latest_state`.
    fetch_limits: Arc<RwLock<Vec<u32>>>,
    next_fetch_error: Arc<RwLock<Option<IndexError>>>,
    /// Simulated latency of each submission.
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockMatchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMatchIndex {
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            failing_urls: Arc::new(RwLock::new(HashSet::new())),
            latest: Arc::new(RwLock::new(Vec::new())),
            fetch_limits: Arc::new(RwLock::new(Vec::new())),
            next_fetch_error: Arc::new(RwLock::new(None)),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hold every submission for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn fail_url(&self, url: &str) {
        self.failing_urls.write().await.insert(url.to_string());
    }

    pub async fn set_latest(&self, entries: Vec<IndexedContent>) {
        *self.latest.write().await = entries;
    }

    pub async fn set_next_fetch_error(&self, error: IndexError) {
        *self.next_fetch_error.write().await = Some(error);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn submissions(&self) -> Vec<IndexSubmission> {
        self.submissions.read().await.clone()
    }

    pub async fn submitted_urls(&self) -> Vec<String> {
        self.submissions
            .read()
            .await
            .iter()
            .map(|submission| submission.source_url.clone())
            .collect()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of submissions observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub async fn fetch_limits(&self) -> Vec<u32> {
        self.fetch_limits.read().await.clone()
    }
}

#[async_trait]
impl MatchIndex for MockMatchIndex {
    async fn submit(&self, submission: &IndexSubmission) -> Result<(), IndexError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let rejected = self
            .failing_urls
            .read()
            .await
            .contains(&submission.source_url);
        if !rejected {
            self.submissions.write().await.push(submission.clone());
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if rejected {
            return Err(IndexError::Rejected {
                content_id: submission.content_id.clone(),
                message: "mock rejection".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_latest_state(&self, limit: u32) -> Result<UpdateSet, IndexError> {
        self.fetch_limits.write().await.push(limit);
        if let Some(error) = self.next_fetch_error.write().await.take() {
            return Err(error);
        }

        let entries = self
            .latest
            .read()
            .await
            .iter()
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(UpdateSet::new(entries))
    }
}
