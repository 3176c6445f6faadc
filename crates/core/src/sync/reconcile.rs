//! Periodic merge of the match index's latest state into the catalog store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::JobConfig;
use crate::index::MatchIndex;
use crate::metrics;
use crate::scheduler::Job;
use crate::store::CatalogStore;

use super::types::until_cancelled;
use super::{JobReport, ReconcileSummary, SyncError};

/// Fetches what the index service reports as recently indexed and merges it
/// into the store. Both steps are idempotent, so a failed run is simply
/// repeated on the next tick.
pub struct ReconciliationTask {
    index: Arc<dyn MatchIndex>,
    store: Arc<dyn CatalogStore>,
    batch_size: u32,
    delay: Duration,
}

impl ReconciliationTask {
    pub fn new(
        index: Arc<dyn MatchIndex>,
        store: Arc<dyn CatalogStore>,
        batch_size: u32,
        delay: Duration,
    ) -> Self {
        Self {
            index,
            store,
            batch_size,
            delay,
        }
    }

    pub fn from_config(
        index: Arc<dyn MatchIndex>,
        store: Arc<dyn CatalogStore>,
        config: &JobConfig,
    ) -> Self {
        Self::new(
            index,
            store,
            config.batch_size,
            Duration::from_millis(config.delay_ms),
        )
    }

    pub async fn reconcile(&self, cancel: &CancellationToken) -> Result<ReconcileSummary, SyncError> {
        let updates = until_cancelled(cancel, self.index.fetch_latest_state(self.batch_size))
            .await?
            .map_err(|e| {
                error!(limit = self.batch_size, error = %e, "Fetching latest index state failed");
                SyncError::Index(e)
            })?;

        let merged = self.store.merge_updates(&updates).map_err(|e| {
            error!(entries = updates.len(), error = %e, "Merging index updates failed");
            SyncError::Store(e)
        })?;
        metrics::RECONCILED_UPDATES.inc_by(merged as u64);

        Ok(ReconcileSummary {
            fetched: updates.len() as u32,
            merged,
        })
    }
}

#[async_trait]
impl Job for ReconciliationTask {
    fn name(&self) -> &str {
        "reconciliation"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn run(&mut self, cancel: &CancellationToken) -> Result<JobReport, SyncError> {
        let summary = self.reconcile(cancel).await?;
        info!(
            fetched = summary.fetched,
            merged = summary.merged,
            "Reconciliation finished"
        );
        Ok(JobReport::Reconcile(summary))
    }
}
