//! Types for the local catalog store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogStats {
    /// Number of mirrored catalog entries.
    pub items: u64,
    /// Number of content ids known to be indexed.
    pub indexed_content: u64,
    /// Creation time of the newest mirrored entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_item_created_at: Option<DateTime<Utc>>,
    /// Last time index state was merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_merged_at: Option<DateTime<Utc>>,
}
