//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator the sync engine talks to, so crawl,
//! reconciliation and scheduler behaviour can be exercised without a network
//! or a real match service.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_core::testing::{fixtures, MemoryWatermarkStore, MockCatalogSource, MockMatchIndex};
//!
//! let source = MockCatalogSource::new();
//! source.add_item(fixtures::catalog_item("manga-1", created_at)).await;
//! source.add_child(fixtures::child_item("ch-1", "manga-1")).await;
//! source.set_pages("ch-1", vec!["https://cdn/1.png".into()]).await;
//!
//! let index = MockMatchIndex::new();
//! // Build a HistoricalCrawlWalker over them...
//! ```

mod memory_watermark_store;
mod mock_catalog_source;
mod mock_match_index;

pub use memory_watermark_store::MemoryWatermarkStore;
pub use mock_catalog_source::{MockCatalogSource, RecordedSourceQuery};
pub use mock_match_index::MockMatchIndex;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::index::{content_id_for_url, IndexMetadata, IndexedContent, PAGE_KIND};
    use crate::source::{chapter_label, CatalogItem, ChildItem};

    /// Create a catalog item with a title derived from its id.
    pub fn catalog_item(id: &str, created_at: DateTime<Utc>) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: format!("Title of {}", id),
            created_at,
            updated_at: Some(created_at),
        }
    }

    /// Create an English chapter of a catalog item.
    pub fn child_item(id: &str, catalog_id: &str) -> ChildItem {
        ChildItem {
            id: id.to_string(),
            catalog_id: catalog_id.to_string(),
            label: chapter_label(None, Some("1")),
            chapter: Some("1".to_string()),
            volume: None,
            translated_language: Some("en".to_string()),
        }
    }

    /// Page URLs for a chapter, `count` of them.
    pub fn page_urls(child_id: &str, count: usize) -> Vec<String> {
        (1..=count)
            .map(|n| format!("https://uploads.example/data/{}/{}.png", child_id, n))
            .collect()
    }

    /// Index entry for a page image URL.
    pub fn indexed_content(url: &str) -> IndexedContent {
        IndexedContent {
            content_id: content_id_for_url(url),
            metadata: Some(IndexMetadata {
                source: "mangadex".to_string(),
                kind: PAGE_KIND.to_string(),
                catalog_id: "manga-1".to_string(),
                child_id: "ch-1".to_string(),
                ordinal: 1,
            }),
        }
    }
}
