//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that builds the router over a real
//! SQLite catalog store and a scheduler whose jobs talk to mock remotes, so
//! the operator surface can be exercised without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use folio_core::testing::{MockCatalogSource, MockMatchIndex};
use folio_core::config::{DatabaseConfig, ServerConfig};
use folio_core::{
    CatalogRefreshTask, CatalogSource, CatalogStore, Config, MatchIndex, ReconciliationTask,
    SqliteCatalogStore, TaskScheduler,
};
use folio_server::state::AppState;

/// Re-export fixtures for test convenience
pub use folio_core::testing::fixtures;

/// Test fixture with mock remotes behind the jobs.
///
/// The scheduler is never started; tests drive jobs with `run_once`.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_jobs_listed() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.get("/api/v1/jobs").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock remote catalog behind the refresher
    pub source: Arc<MockCatalogSource>,
    /// Mock match index behind reconciliation
    pub index: Arc<MockMatchIndex>,
    /// Scheduler holding the refresher and reconciliation jobs
    pub scheduler: Arc<TaskScheduler>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let source = Arc::new(MockCatalogSource::new());
        let index = Arc::new(MockMatchIndex::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let store: Arc<dyn CatalogStore> = Arc::new(
            SqliteCatalogStore::new(&db_path).expect("Failed to create catalog store"),
        );

        let mut scheduler = TaskScheduler::new();
        scheduler
            .add_job(Box::new(CatalogRefreshTask::new(
                Arc::clone(&source) as Arc<dyn CatalogSource>,
                Arc::clone(&store),
                50,
                Duration::from_secs(60),
            )))
            .expect("Failed to register refresher");
        scheduler
            .add_job(Box::new(ReconciliationTask::new(
                Arc::clone(&index) as Arc<dyn MatchIndex>,
                Arc::clone(&store),
                50,
                Duration::from_secs(600),
            )))
            .expect("Failed to register reconciliation");
        let scheduler = Arc::new(scheduler);

        let state = Arc::new(AppState::new(config, store, Arc::clone(&scheduler)));
        let router = folio_server::api::create_router(state);

        Self {
            router,
            source,
            index,
            scheduler,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
