//! Scheduler lifecycle integration tests.
//!
//! Real jobs (crawler, refresher, reconciliation) running side by side in the
//! scheduler, with one of them failing on every run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use folio_core::index::IndexError;
use folio_core::testing::{fixtures, MemoryWatermarkStore, MockCatalogSource, MockMatchIndex};
use folio_core::{
    CatalogRefreshTask, CatalogStore, ContentFanoutIndexer, CrawlSettings, HistoricalCrawlWalker,
    JobOutcome, JobState, RateGovernor, ReconciliationTask, SqliteCatalogStore, TaskScheduler,
    WatermarkStore,
};

struct TestHarness {
    source: Arc<MockCatalogSource>,
    index: Arc<MockMatchIndex>,
    store: Arc<SqliteCatalogStore>,
    watermarks: Arc<MemoryWatermarkStore>,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            source: Arc::new(MockCatalogSource::new()),
            index: Arc::new(MockMatchIndex::new()),
            store: Arc::new(SqliteCatalogStore::in_memory().expect("Failed to open store")),
            watermarks: Arc::new(MemoryWatermarkStore::new()),
        }
    }

    fn scheduler(&self) -> TaskScheduler {
        let mut scheduler = TaskScheduler::new();

        let walker = HistoricalCrawlWalker::new(
            self.source.clone(),
            Arc::clone(&self.watermarks) as Arc<dyn WatermarkStore>,
            ContentFanoutIndexer::new(self.index.clone(), "mangadex", 5),
            RateGovernor::new(1000, Duration::from_secs(60)),
            CrawlSettings {
                catalog_page_size: 10,
                child_page_size: 500,
                delay: Duration::from_secs(1),
            },
        );
        let refresher = CatalogRefreshTask::new(
            self.source.clone(),
            Arc::clone(&self.store) as Arc<dyn CatalogStore>,
            50,
            Duration::from_secs(5),
        );
        let reconciliation = ReconciliationTask::new(
            self.index.clone(),
            Arc::clone(&self.store) as Arc<dyn CatalogStore>,
            50,
            Duration::from_secs(5),
        );

        scheduler.add_job(Box::new(walker)).unwrap();
        scheduler.add_job(Box::new(refresher)).unwrap();
        scheduler.add_job(Box::new(reconciliation)).unwrap();
        scheduler
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_job_does_not_stop_siblings() {
    let h = TestHarness::new();
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    h.source
        .add_item(fixtures::catalog_item("manga-1", created))
        .await;
    h.source
        .add_child(fixtures::child_item("ch-1", "manga-1"))
        .await;
    h.source
        .set_pages("ch-1", fixtures::page_urls("ch-1", 2))
        .await;
    h.source
        .set_recently_updated(vec![fixtures::catalog_item("manga-1", created)])
        .await;
    h.index
        .set_next_fetch_error(IndexError::ApiError {
            status: 502,
            message: "bad gateway".to_string(),
        })
        .await;

    let scheduler = h.scheduler();
    scheduler.start().await;
    tokio::time::sleep(Duration::from_secs(12)).await;

    let status = scheduler.status().await;
    assert!(status.running);

    let crawler = &status.jobs[0];
    assert_eq!(crawler.name, "crawler");
    assert!(crawler.runs >= 10);
    assert_eq!(h.watermarks.current().unwrap().timestamp(), created);

    let refresher = &status.jobs[1];
    assert_eq!(refresher.last_outcome, Some(JobOutcome::Succeeded));
    assert!(refresher.runs >= 2);

    // First reconciliation failed, later ones recovered on their own
    let reconciliation = &status.jobs[2];
    assert_eq!(reconciliation.failures, 1);
    assert!(reconciliation.runs >= 2);
    assert_eq!(reconciliation.last_outcome, Some(JobOutcome::Succeeded));

    scheduler.shutdown().await;
    let status = scheduler.status().await;
    assert!(!status.running);
    assert!(status.jobs.iter().all(|job| job.state == JobState::Idle));

    // Nothing runs after shutdown
    let runs_at_shutdown: Vec<u64> = status.jobs.iter().map(|job| job.runs).collect();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let runs_later: Vec<u64> = scheduler
        .status()
        .await
        .jobs
        .iter()
        .map(|job| job.runs)
        .collect();
    assert_eq!(runs_at_shutdown, runs_later);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_inter_run_delay() {
    let h = TestHarness::new();
    let scheduler = h.scheduler();

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = tokio::time::Instant::now();
    scheduler.shutdown().await;

    // The 5 s delays are cut short
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(h.store.stats().unwrap().items, 0);
}

#[tokio::test]
async fn test_run_once_drives_each_job() {
    let h = TestHarness::new();
    h.index
        .set_latest(vec![fixtures::indexed_content("https://cdn.example/1.png")])
        .await;
    let scheduler = h.scheduler();

    for name in ["crawler", "refresher", "reconciliation"] {
        assert_eq!(
            scheduler.run_once(name).await.unwrap(),
            JobOutcome::Succeeded
        );
    }

    assert_eq!(h.store.stats().unwrap().indexed_content, 1);
    assert!(!scheduler.is_running());
}
