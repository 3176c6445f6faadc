//! Mock remote catalog for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::source::{CatalogItem, CatalogQuery, CatalogSource, ChildItem, ListPage, SourceError};

/// A recorded source call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSourceQuery {
    ListCatalog(CatalogQuery),
    ListChildItems {
        catalog_id: String,
        limit: u32,
        offset: u32,
    },
    ListContentUnits { child_id: String },
    ListRecentlyUpdated { limit: u32 },
}

/// Mock implementation of the CatalogSource trait.
///
/// Behaves like the real listing endpoints: the catalog is filtered by an
/// inclusive `created_since`, ordered by creation time and paged with
/// offset/limit, and `total` counts every match regardless of paging.
#[derive(Debug)]
pub struct MockCatalogSource {
    /// Catalog items in insertion order.
    items: Arc<RwLock<Vec<CatalogItem>>>,
    /// Chapters in insertion order.
    children: Arc<RwLock<Vec<ChildItem>>>,
    /// Page URLs by chapter id.
    pages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    /// Feed returned by `list_recently_updated`.
    recently_updated: Arc<RwLock<Vec<CatalogItem>>>,
    /// Chapters whose page listing always fails.
    failing_pages: Arc<RwLock<HashSet<String>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedSourceQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<SourceError>>>,
}

impl Default for MockCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogSource {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            children: Arc::new(RwLock::new(Vec::new())),
            pages: Arc::new(RwLock::new(HashMap::new())),
            recently_updated: Arc::new(RwLock::new(Vec::new())),
            failing_pages: Arc::new(RwLock::new(HashSet::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Catalog Configuration
    // =========================================================================

    pub async fn add_item(&self, item: CatalogItem) {
        self.items.write().await.push(item);
    }

    /// Delete an item from the remote, as if it had been taken down.
    pub async fn remove_item(&self, id: &str) {
        self.items.write().await.retain(|item| item.id != id);
    }

    pub async fn add_child(&self, child: ChildItem) {
        self.children.write().await.push(child);
    }

    pub async fn set_pages(&self, child_id: &str, urls: Vec<String>) {
        self.pages.write().await.insert(child_id.to_string(), urls);
    }

    pub async fn set_recently_updated(&self, items: Vec<CatalogItem>) {
        *self.recently_updated.write().await = items;
    }

    /// Make page listing for one chapter fail on every call.
    pub async fn fail_pages_for(&self, child_id: &str) {
        self.failing_pages
            .write()
            .await
            .insert(child_id.to_string());
    }

    // =========================================================================
    // Query Recording
    // =========================================================================

    pub async fn recorded_queries(&self) -> Vec<RecordedSourceQuery> {
        self.queries.read().await.clone()
    }

    /// Catalog queries only.
    pub async fn catalog_queries(&self) -> Vec<CatalogQuery> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|query| match query {
                RecordedSourceQuery::ListCatalog(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn query_count(&self) -> usize {
        self.queries.read().await.len()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<SourceError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, query: RecordedSourceQuery) {
        self.queries.write().await.push(query);
    }
}

fn page_of<T: Clone>(matching: &[T], limit: u32, offset: u32) -> ListPage<T> {
    ListPage {
        items: matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect(),
        total: matching.len() as u32,
        limit,
        offset,
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn list_catalog(
        &self,
        query: &CatalogQuery,
    ) -> Result<ListPage<CatalogItem>, SourceError> {
        self.record(RecordedSourceQuery::ListCatalog(query.clone()))
            .await;
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let mut matching: Vec<CatalogItem> = self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.created_at >= query.created_since)
            .cloned()
            .collect();
        matching.sort_by_key(|item| item.created_at);

        Ok(page_of(&matching, query.limit, query.offset))
    }

    async fn list_child_items(
        &self,
        catalog_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListPage<ChildItem>, SourceError> {
        self.record(RecordedSourceQuery::ListChildItems {
            catalog_id: catalog_id.to_string(),
            limit,
            offset,
        })
        .await;
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let matching: Vec<ChildItem> = self
            .children
            .read()
            .await
            .iter()
            .filter(|child| child.catalog_id == catalog_id)
            .cloned()
            .collect();

        Ok(page_of(&matching, limit, offset))
    }

    async fn list_content_units(&self, child_id: &str) -> Result<Vec<String>, SourceError> {
        self.record(RecordedSourceQuery::ListContentUnits {
            child_id: child_id.to_string(),
        })
        .await;
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        if self.failing_pages.read().await.contains(child_id) {
            return Err(SourceError::ApiError {
                status: 503,
                message: format!("pages of {} unavailable", child_id),
            });
        }

        Ok(self
            .pages
            .read()
            .await
            .get(child_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_recently_updated(&self, limit: u32) -> Result<Vec<CatalogItem>, SourceError> {
        self.record(RecordedSourceQuery::ListRecentlyUpdated { limit })
            .await;
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        Ok(self
            .recently_updated
            .read()
            .await
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
