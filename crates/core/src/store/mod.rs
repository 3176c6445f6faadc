//! Durable local catalog store.
//!
//! Holds the mirrored catalog entries (kept fresh by the refresher job) and
//! the index state reported by the match service (merged by reconciliation).

mod sqlite;
mod types;

pub use sqlite::SqliteCatalogStore;
pub use types::*;

use thiserror::Error;

use crate::index::UpdateSet;
use crate::source::CatalogItem;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Trait for the local catalog store.
pub trait CatalogStore: Send + Sync {
    /// Insert or refresh catalog entries.
    ///
    /// Returns the number of entries that were new or changed.
    fn upsert_items(&self, items: &[CatalogItem]) -> Result<u32, StoreError>;

    /// Merge the index service's latest view.
    ///
    /// Idempotent: merging the same set twice changes nothing the second time.
    /// Returns the number of entries that were new or changed.
    fn merge_updates(&self, updates: &UpdateSet) -> Result<u32, StoreError>;

    /// Store statistics.
    fn stats(&self) -> Result<CatalogStats, StoreError>;
}
