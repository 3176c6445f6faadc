//! Bounded-concurrency submission of content units to the match index.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::index::{ContentUnit, IndexSubmission, MatchIndex};
use crate::metrics;

use super::SyncError;

/// How a fan-out batch settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutOutcome {
    /// Every unit was accepted by the index.
    Complete { submitted: usize },
    /// Some units failed; they are left for a later resync.
    PartialFailure {
        submitted: usize,
        failed: Vec<String>,
    },
}

impl FanoutOutcome {
    pub fn submitted(&self) -> usize {
        match self {
            FanoutOutcome::Complete { submitted } => *submitted,
            FanoutOutcome::PartialFailure { submitted, .. } => *submitted,
        }
    }

    /// Content ids that were not accepted.
    pub fn failed(&self) -> &[String] {
        match self {
            FanoutOutcome::Complete { .. } => &[],
            FanoutOutcome::PartialFailure { failed, .. } => failed,
        }
    }
}

/// Submits the units of one chapter in sequential chunks.
///
/// Units inside a chunk are submitted concurrently and the chunk is awaited
/// in full before the next one starts, so at most `chunk_size` calls are
/// outstanding at any time.
pub struct ContentFanoutIndexer {
    index: Arc<dyn MatchIndex>,
    source_name: String,
    chunk_size: usize,
}

impl ContentFanoutIndexer {
    pub fn new(index: Arc<dyn MatchIndex>, source_name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            index,
            source_name: source_name.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Index every unit and wait for all of them to settle.
    ///
    /// Individual failures never fail the batch. Cancellation is observed
    /// between chunks only; a chunk in flight always settles.
    pub async fn submit(
        &self,
        units: &[ContentUnit],
        cancel: &CancellationToken,
    ) -> Result<FanoutOutcome, SyncError> {
        let mut submitted = 0;
        let mut failed = Vec::new();

        for (chunk_idx, chunk) in units.chunks(self.chunk_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            debug!(chunk = chunk_idx, units = chunk.len(), "Submitting chunk");

            let results = join_all(chunk.iter().map(|unit| async move {
                let submission = IndexSubmission::for_unit(unit, &self.source_name);
                (unit, self.index.submit(&submission).await)
            }))
            .await;

            for (unit, result) in results {
                match result {
                    Ok(()) => {
                        submitted += 1;
                        metrics::INDEX_SUBMISSIONS.with_label_values(&["ok"]).inc();
                    }
                    Err(e) => {
                        warn!(
                            content_id = %unit.content_id,
                            url = %unit.source_url,
                            child_id = %unit.child_id,
                            ordinal = unit.ordinal,
                            error = %e,
                            "Index submission failed"
                        );
                        metrics::INDEX_SUBMISSIONS
                            .with_label_values(&["failed"])
                            .inc();
                        failed.push(unit.content_id.clone());
                    }
                }
            }
        }

        if failed.is_empty() {
            Ok(FanoutOutcome::Complete { submitted })
        } else {
            Ok(FanoutOutcome::PartialFailure { submitted, failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::content_id_for_url;
    use crate::testing::MockMatchIndex;
    use std::time::Duration;

    fn units(n: usize) -> Vec<ContentUnit> {
        let urls: Vec<String> = (1..=n)
            .map(|i| format!("https://cdn.example/data/hash/{i}.png"))
            .collect();
        ContentUnit::pages_of("manga-1", "chapter-1", &urls)
    }

    #[tokio::test]
    async fn test_all_units_submitted_with_metadata() {
        let index = Arc::new(MockMatchIndex::new());
        let fanout = ContentFanoutIndexer::new(index.clone(), "mangadex", 5);
        let batch = units(3);

        let outcome = fanout
            .submit(&batch, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, FanoutOutcome::Complete { submitted: 3 });
        let recorded = index.submissions().await;
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].metadata.source, "mangadex");
        assert_eq!(recorded[0].metadata.catalog_id, "manga-1");
        let mut ordinals: Vec<u32> = recorded.iter().map(|s| s.metadata.ordinal).collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_chunk_size() {
        let index = Arc::new(MockMatchIndex::new().with_delay(Duration::from_millis(5)));
        let fanout = ContentFanoutIndexer::new(index.clone(), "mangadex", 3);

        let outcome = fanout
            .submit(&units(11), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submitted(), 11);
        assert_eq!(index.max_in_flight(), 3);
        assert_eq!(index.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_unit_does_not_stop_siblings() {
        let index = Arc::new(MockMatchIndex::new());
        let batch = units(5);
        index.fail_url(&batch[2].source_url).await;
        let fanout = ContentFanoutIndexer::new(index.clone(), "mangadex", 5);

        let outcome = fanout
            .submit(&batch, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submitted(), 4);
        assert_eq!(outcome.failed(), &[batch[2].content_id.clone()][..]);
        let urls = index.submitted_urls().await;
        assert!(urls.contains(&batch[1].source_url));
        assert!(urls.contains(&batch[3].source_url));
        assert!(!urls.contains(&batch[2].source_url));
    }

    #[tokio::test]
    async fn test_cancel_before_first_chunk() {
        let index = Arc::new(MockMatchIndex::new());
        let fanout = ContentFanoutIndexer::new(index.clone(), "mangadex", 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fanout.submit(&units(4), &cancel).await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(index.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_complete() {
        let index = Arc::new(MockMatchIndex::new());
        let fanout = ContentFanoutIndexer::new(index, "mangadex", 5);

        let outcome = fanout.submit(&[], &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, FanoutOutcome::Complete { submitted: 0 });
    }

    #[tokio::test]
    async fn test_resubmission_uses_same_content_id() {
        let index = Arc::new(MockMatchIndex::new());
        let fanout = ContentFanoutIndexer::new(index.clone(), "mangadex", 5);
        let batch = units(1);
        let cancel = CancellationToken::new();

        fanout.submit(&batch, &cancel).await.unwrap();
        fanout.submit(&batch, &cancel).await.unwrap();

        let recorded = index.submissions().await;
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].content_id, recorded[1].content_id);
        assert_eq!(recorded[0].content_id, content_id_for_url(&batch[0].source_url));
    }
}
