//! In-process tests of the operator API.

mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::json;

use common::{fixtures, TestFixture};
use folio_core::JobOutcome;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body["server"], "host", json!("127.0.0.1"));
    assert!(response.body["source_url"].is_string());
    assert!(response.body["index_url"].is_string());
    assert_json_path!(response.body["governor"], "threshold", json!(10));
    assert_json_path!(response.body["fanout"], "chunk_size", json!(5));
    // Raw remote sections are not exposed
    assert!(response.body.get("source").is_none());
    assert!(response.body.get("index").is_none());
}

#[tokio::test]
async fn test_jobs_listed_idle_before_start() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/jobs").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "running", json!(false));
    let jobs = response.body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_json_path!(jobs[0], "name", json!("refresher"));
    assert_json_path!(jobs[0], "state", json!("idle"));
    assert_json_path!(jobs[0], "runs", json!(0));
    assert_json_path!(jobs[1], "name", json!("reconciliation"));
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/jobs/nope").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_json_path!(response.body, "error", json!("Job not found: nope"));
}

#[tokio::test]
async fn test_job_status_reflects_last_run() {
    let fixture = TestFixture::new().await;
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    fixture
        .source
        .set_recently_updated(vec![
            fixtures::catalog_item("manga-1", created),
            fixtures::catalog_item("manga-2", created),
        ])
        .await;

    let outcome = fixture.scheduler.run_once("refresher").await.unwrap();
    assert_eq!(outcome, JobOutcome::Succeeded);

    let response = fixture.get("/api/v1/jobs/refresher").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "runs", json!(1));
    assert_json_path!(response.body, "failures", json!(0));
    assert_json_path!(response.body, "last_outcome", json!("succeeded"));
    assert_json_path!(response.body["last_report"], "kind", json!("refresh"));
    assert_json_path!(response.body["last_report"], "fetched", json!(2));
}

#[tokio::test]
async fn test_failed_run_is_reported() {
    let fixture = TestFixture::new().await;
    fixture
        .index
        .set_next_fetch_error(folio_core::IndexError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
        .await;

    let outcome = fixture.scheduler.run_once("reconciliation").await.unwrap();
    assert_eq!(outcome, JobOutcome::Failed);

    let response = fixture.get("/api/v1/jobs/reconciliation").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "state", json!("idle"));
    assert_json_path!(response.body, "failures", json!(1));
    assert_json_path!(response.body, "last_outcome", json!("failed"));
    assert!(response.body["last_error"].is_string());
}

#[tokio::test]
async fn test_catalog_stats_after_refresh_and_reconcile() {
    let fixture = TestFixture::new().await;
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    fixture
        .source
        .set_recently_updated(vec![fixtures::catalog_item("manga-1", created)])
        .await;
    fixture
        .index
        .set_latest(vec![
            fixtures::indexed_content("https://cdn.example/1.png"),
            fixtures::indexed_content("https://cdn.example/2.png"),
        ])
        .await;

    let empty = fixture.get("/api/v1/catalog/stats").await;
    assert_status!(empty, StatusCode::OK);
    assert_json_path!(empty.body, "items", json!(0));

    fixture.scheduler.run_once("refresher").await.unwrap();
    fixture.scheduler.run_once("reconciliation").await.unwrap();

    let response = fixture.get("/api/v1/catalog/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "items", json!(1));
    assert_json_path!(response.body, "indexed_content", json!(2));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.scheduler.run_once("refresher").await.unwrap();
    // Produce at least one labelled HTTP sample
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;

    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("folio_http_requests_total"));
    assert!(response.text.contains("folio_scheduler_running 0"));
    assert!(response.text.contains("folio_job_active{job=\"refresher\"} 0"));
    assert!(response.text.contains("folio_job_runs_total"));
    assert!(response.text.contains("folio_catalog_items"));
}

#[tokio::test]
async fn test_unmatched_route_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/nothing-here").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}
