//! Forward-looking refresh of recently updated catalog entries.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::JobConfig;
use crate::metrics;
use crate::scheduler::Job;
use crate::source::CatalogSource;
use crate::store::CatalogStore;

use super::types::until_cancelled;
use super::{JobReport, RefreshSummary, SyncError};

/// Pulls the remote "recently updated" feed into the catalog store.
///
/// Complements the historical crawl, which only ever moves forward by
/// creation time and never sees edits to older entries.
pub struct CatalogRefreshTask {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CatalogStore>,
    batch_size: u32,
    delay: Duration,
}

impl CatalogRefreshTask {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn CatalogStore>,
        batch_size: u32,
        delay: Duration,
    ) -> Self {
        Self {
            source,
            store,
            batch_size,
            delay,
        }
    }

    pub fn from_config(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn CatalogStore>,
        config: &JobConfig,
    ) -> Self {
        Self::new(
            source,
            store,
            config.batch_size,
            Duration::from_millis(config.delay_ms),
        )
    }

    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<RefreshSummary, SyncError> {
        let items = until_cancelled(cancel, self.source.list_recently_updated(self.batch_size))
            .await?
            .map_err(|e| {
                error!(limit = self.batch_size, error = %e, "Recently updated feed failed");
                SyncError::catalog("recently updated feed", e)
            })?;
        debug!(fetched = items.len(), "Fetched recently updated entries");

        let changed = self.store.upsert_items(&items)?;
        metrics::REFRESHED_ITEMS.inc_by(changed as u64);

        Ok(RefreshSummary {
            fetched: items.len() as u32,
            changed,
        })
    }
}

#[async_trait]
impl Job for CatalogRefreshTask {
    fn name(&self) -> &str {
        "refresher"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn run(&mut self, cancel: &CancellationToken) -> Result<JobReport, SyncError> {
        let summary = self.refresh(cancel).await?;
        info!(
            fetched = summary.fetched,
            changed = summary.changed,
            "Catalog refresh finished"
        );
        Ok(JobReport::Refresh(summary))
    }
}
