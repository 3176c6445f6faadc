//! HTTP client for the match index service.
//!
//! Protocol:
//! - `POST {base}/add` multipart form with `url`, `filepath` (content id) and
//!   `metadata` (JSON)
//! - `GET {base}/latest?limit=N` returning `{"status", "result": [...]}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::types::{IndexMetadata, IndexSubmission, IndexedContent, UpdateSet};
use super::{IndexError, MatchIndex};
use crate::config::IndexConfig;

/// Match index client.
pub struct HttpMatchIndex {
    client: Client,
    base_url: String,
}

impl HttpMatchIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MatchIndex for HttpMatchIndex {
    async fn submit(&self, submission: &IndexSubmission) -> Result<(), IndexError> {
        let metadata = serde_json::to_string(&submission.metadata)
            .map_err(|e| IndexError::ParseError(e.to_string()))?;

        let form = Form::new()
            .text("url", submission.source_url.clone())
            .text("filepath", submission.content_id.clone())
            .text("metadata", metadata);

        debug!("Index add: content_id={}", submission.content_id);

        let response = self
            .client
            .post(format!("{}/add", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| IndexError::ParseError(format!("Failed to parse add response: {}", e)))?;

        if body.status != "ok" {
            return Err(IndexError::Rejected {
                content_id: submission.content_id.clone(),
                message: body.error.join("; "),
            });
        }

        Ok(())
    }

    async fn fetch_latest_state(&self, limit: u32) -> Result<UpdateSet, IndexError> {
        debug!("Index latest: limit={}", limit);

        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: LatestResponse = response.json().await.map_err(|e| {
            IndexError::ParseError(format!("Failed to parse latest response: {}", e))
        })?;

        Ok(UpdateSet::new(
            body.result
                .into_iter()
                .map(|entry| IndexedContent {
                    content_id: entry.filepath,
                    metadata: entry.metadata,
                })
                .collect(),
        ))
    }
}

// ============================================================================
// Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    result: Vec<LatestEntry>,
}

#[derive(Debug, Deserialize)]
struct LatestEntry {
    filepath: String,
    #[serde(default)]
    metadata: Option<IndexMetadata>,
}
