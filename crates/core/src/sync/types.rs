//! Types shared by the sync pipeline stages.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::index::IndexError;
use crate::source::SourceError;
use crate::store::StoreError;
use crate::watermark::WatermarkError;

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote catalog call failed.
    #[error("catalog source error during {context}: {source}")]
    Source {
        context: String,
        #[source]
        source: SourceError,
    },

    /// Match index call failed (outside the fan-out).
    #[error("match index error: {0}")]
    Index(#[from] IndexError),

    /// Catalog store failed.
    #[error("catalog store error: {0}")]
    Store(#[from] StoreError),

    /// The watermark could not be persisted.
    #[error("failed to persist watermark: {0}")]
    Persistence(#[from] WatermarkError),

    /// Shutdown was requested.
    #[error("run cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn catalog(context: impl Into<String>, source: SourceError) -> Self {
        SyncError::Source {
            context: context.into(),
            source,
        }
    }

    /// Short label for metrics and status reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Source { .. } => "source",
            SyncError::Index(_) => "index",
            SyncError::Store(_) => "store",
            SyncError::Persistence(_) => "persistence",
            SyncError::Cancelled => "cancelled",
        }
    }
}

/// Race a future against the cancellation token.
pub(crate) async fn until_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        value = fut => Ok(value),
    }
}

/// Summary of one historical crawl run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrawlSummary {
    /// Catalog pages fully processed (watermark advanced after each).
    pub pages: u32,
    pub catalog_items: u32,
    pub chapters: u32,
    /// Chapters skipped because no pages were available.
    pub chapters_skipped: u32,
    pub units_submitted: u32,
    pub units_failed: u32,
    /// Watermark at the end of the run.
    pub watermark: Option<DateTime<Utc>>,
}

/// Summary of one refresher run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RefreshSummary {
    pub fetched: u32,
    pub changed: u32,
}

/// What a job run produced, for logs and the operator surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobReport {
    Crawl(CrawlSummary),
    Refresh(RefreshSummary),
    Reconcile(ReconcileSummary),
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconcileSummary {
    pub fetched: u32,
    pub merged: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display_and_kind() {
        let err = SyncError::catalog("catalog page", SourceError::RateLimitExceeded);
        assert_eq!(
            err.to_string(),
            "catalog source error during catalog page: Rate limit exceeded, please wait before retrying"
        );
        assert_eq!(err.kind(), "source");
        assert_eq!(SyncError::Cancelled.kind(), "cancelled");
    }

    #[tokio::test]
    async fn test_until_cancelled_passes_value_through() {
        let cancel = CancellationToken::new();
        let value = until_cancelled(&cancel, async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_until_cancelled_stops_pending_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = until_cancelled(&cancel, tokio::time::sleep(Duration::from_secs(3600))).await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
