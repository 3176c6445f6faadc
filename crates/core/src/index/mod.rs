//! External content match index.
//!
//! Discovered pages are pushed to a content-addressed match service. The
//! service owns deduplication: submitting the same content id twice is an
//! upsert.

mod http;
mod types;

pub use http::HttpMatchIndex;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the match index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("Index API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Service accepted the request but reported a failure.
    #[error("Index rejected {content_id}: {message}")]
    Rejected { content_id: String, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Write/read access to the match index.
#[async_trait]
pub trait MatchIndex: Send + Sync {
    /// Add (or replace) one image in the index.
    async fn submit(&self, submission: &IndexSubmission) -> Result<(), IndexError>;

    /// The index service's view of the most recently indexed content.
    async fn fetch_latest_state(&self, limit: u32) -> Result<UpdateSet, IndexError>;
}
