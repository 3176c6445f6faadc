//! Remote catalog access.
//!
//! The crawl only ever talks to the catalog through [`CatalogSource`], which
//! mirrors the four listing endpoints it needs: creation-ordered catalog pages,
//! chapter pages, page URLs for a chapter, and the recently-updated feed.

mod mangadex;
mod types;

pub use mangadex::MangaDexSource;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the remote catalog.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Read access to the remote catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List catalog items created at or after `query.created_since`,
    /// ordered by creation time ascending.
    async fn list_catalog(&self, query: &CatalogQuery)
        -> Result<ListPage<CatalogItem>, SourceError>;

    /// List chapters of a catalog item, ordered by volume then chapter.
    async fn list_child_items(
        &self,
        catalog_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListPage<ChildItem>, SourceError>;

    /// Page image URLs of a chapter, in reading order.
    ///
    /// An empty list is valid and means the pages are not available yet.
    async fn list_content_units(&self, child_id: &str) -> Result<Vec<String>, SourceError>;

    /// Most recently updated catalog items, newest first.
    async fn list_recently_updated(&self, limit: u32) -> Result<Vec<CatalogItem>, SourceError>;
}
