//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the folio server:
//! - HTTP request metrics (latency, counts)
//! - Scheduler and per-job state (collected dynamically)
//! - Catalog store sizes (collected dynamically)
//! - Everything exported by `folio_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use folio_core::JobState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "folio_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("folio_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "folio_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics (collected dynamically)
// =============================================================================

/// Scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "folio_scheduler_running",
        "Whether the job scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Whether each job is mid-run.
pub static JOB_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("folio_job_active", "Whether the job is currently running"),
        &["job"],
    )
    .unwrap()
});

/// Failed or panicked runs per job since startup.
pub static JOB_FAILURES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("folio_job_failures", "Failed runs per job since startup"),
        &["job"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Mirrored catalog entries.
pub static CATALOG_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "folio_catalog_items",
        "Number of catalog entries in the local store",
    )
    .unwrap()
});

/// Index entries merged by reconciliation.
pub static INDEXED_CONTENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "folio_indexed_content",
        "Number of index entries reconciled into the local store",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Scheduler
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(JOB_ACTIVE.clone())).unwrap();
    registry.register(Box::new(JOB_FAILURES.clone())).unwrap();

    // Catalog
    registry.register(Box::new(CATALOG_ITEMS.clone())).unwrap();
    registry
        .register(Box::new(INDEXED_CONTENT.clone()))
        .unwrap();

    // Core metrics (crawl, fan-out, governor, jobs)
    for metric in folio_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the scheduler and the catalog store.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.scheduler().status().await;
    SCHEDULER_RUNNING.set(if status.running { 1 } else { 0 });
    for job in &status.jobs {
        let active = if job.state == JobState::Running { 1 } else { 0 };
        JOB_ACTIVE.with_label_values(&[&job.name]).set(active);
        JOB_FAILURES
            .with_label_values(&[&job.name])
            .set(job.failures as i64);
    }

    if let Ok(stats) = state.store().stats() {
        CATALOG_ITEMS.set(stats.items as i64);
        INDEXED_CONTENT.set(stats.indexed_content as i64);
    }
}
