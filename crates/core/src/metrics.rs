//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Historical crawl (pages, items, skipped chapters, watermark)
//! - Fan-out indexing (submissions by result)
//! - Rate governor cooldowns
//! - Scheduled jobs (runs by outcome, duration)
//! - Refresher and reconciliation throughput

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Historical Crawl Metrics
// =============================================================================

/// Catalog pages fully processed.
pub static CRAWL_PAGES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_crawl_pages_total",
        "Catalog pages fully processed by the historical crawl",
    )
    .unwrap()
});

/// Catalog items whose chapters were all processed.
pub static CATALOG_ITEMS_PROCESSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_catalog_items_processed_total",
        "Catalog items fully processed by the historical crawl",
    )
    .unwrap()
});

/// Chapters skipped because no pages were available.
pub static CHAPTERS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_chapters_skipped_total",
        "Chapters skipped because no pages were available yet",
    )
    .unwrap()
});

/// Current watermark as a unix timestamp.
pub static WATERMARK_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "folio_watermark_timestamp_seconds",
        "Current crawl watermark (unix seconds)",
    )
    .unwrap()
});

// =============================================================================
// Fan-out Metrics
// =============================================================================

/// Index submissions by result.
pub static INDEX_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "folio_index_submissions_total",
            "Content submissions to the match index",
        ),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

// =============================================================================
// Rate Governor Metrics
// =============================================================================

/// Cooldown pauses imposed by the rate governor.
pub static GOVERNOR_COOLDOWNS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_governor_cooldowns_total",
        "Cooldown pauses imposed by the rate governor",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Job runs by job name and outcome.
pub static JOB_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("folio_job_runs_total", "Scheduled job runs"),
        &["job", "outcome"], // "succeeded", "failed", "cancelled", "panicked"
    )
    .unwrap()
});

/// Job run duration in seconds.
pub static JOB_RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("folio_job_run_duration_seconds", "Duration of one job run")
            .buckets(vec![
                0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0,
            ]),
        &["job"],
    )
    .unwrap()
});

/// Index entries merged into the catalog store.
pub static RECONCILED_UPDATES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_reconciled_updates_total",
        "Index entries merged into the catalog store",
    )
    .unwrap()
});

/// Catalog entries inserted or changed by the refresher.
pub static REFRESHED_ITEMS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "folio_refreshed_items_total",
        "Catalog entries inserted or changed by the refresher",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Crawl
        Box::new(CRAWL_PAGES.clone()),
        Box::new(CATALOG_ITEMS_PROCESSED.clone()),
        Box::new(CHAPTERS_SKIPPED.clone()),
        Box::new(WATERMARK_TIMESTAMP.clone()),
        // Fan-out and governor
        Box::new(INDEX_SUBMISSIONS.clone()),
        Box::new(GOVERNOR_COOLDOWNS.clone()),
        // Jobs
        Box::new(JOB_RUNS.clone()),
        Box::new(JOB_RUN_DURATION.clone()),
        Box::new(RECONCILED_UPDATES.clone()),
        Box::new(REFRESHED_ITEMS.clone()),
    ]
}
