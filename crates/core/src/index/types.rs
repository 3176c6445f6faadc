//! Types for content submitted to the match index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Discriminator for page images.
pub const PAGE_KIND: &str = "page";

/// Stable content identifier for a source URL (lowercase hex SHA-256).
///
/// The same URL always yields the same identifier, which is what makes
/// re-submission to the index an upsert rather than a duplicate.
pub fn content_id_for_url(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

/// The smallest indexable artifact: one page image of a chapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentUnit {
    pub content_id: String,
    pub source_url: String,
    pub kind: String,
    pub catalog_id: String,
    pub child_id: String,
    /// 1-based position within the chapter.
    pub ordinal: u32,
}

impl ContentUnit {
    /// Build the page units of a chapter from its ordered page URLs.
    pub fn pages_of(catalog_id: &str, child_id: &str, urls: &[String]) -> Vec<ContentUnit> {
        urls.iter()
            .enumerate()
            .map(|(idx, url)| ContentUnit {
                content_id: content_id_for_url(url),
                source_url: url.clone(),
                kind: PAGE_KIND.to_string(),
                catalog_id: catalog_id.to_string(),
                child_id: child_id.to_string(),
                ordinal: idx as u32 + 1,
            })
            .collect()
    }
}

/// Structured metadata stored alongside an indexed image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMetadata {
    /// Name of the catalog the content came from.
    pub source: String,
    pub kind: String,
    pub catalog_id: String,
    pub child_id: String,
    pub ordinal: u32,
}

/// One submission call to the match index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSubmission {
    pub content_id: String,
    pub source_url: String,
    pub metadata: IndexMetadata,
}

impl IndexSubmission {
    pub fn for_unit(unit: &ContentUnit, source_name: &str) -> Self {
        Self {
            content_id: unit.content_id.clone(),
            source_url: unit.source_url.clone(),
            metadata: IndexMetadata {
                source: source_name.to_string(),
                kind: unit.kind.clone(),
                catalog_id: unit.catalog_id.clone(),
                child_id: unit.child_id.clone(),
                ordinal: unit.ordinal,
            },
        }
    }
}

/// One entry of the index service's latest view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedContent {
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IndexMetadata>,
}

/// Latest view reported by the index service, merged into the catalog store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateSet {
    pub fetched_at: DateTime<Utc>,
    pub entries: Vec<IndexedContent>,
}

impl UpdateSet {
    pub fn new(entries: Vec<IndexedContent>) -> Self {
        Self {
            fetched_at: Utc::now(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
