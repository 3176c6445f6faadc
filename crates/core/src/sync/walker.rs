//! Resumable historical walk over the remote catalog.
//!
//! The walk requests catalog items created at or after the watermark, oldest
//! first, and indexes every page of every chapter of every item. Only when a
//! whole catalog page has been processed does the watermark move forward to
//! the newest creation time seen in that page.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::index::ContentUnit;
use crate::metrics;
use crate::scheduler::Job;
use crate::source::{CatalogItem, CatalogQuery, CatalogSource, ChildItem};
use crate::watermark::{Watermark, WatermarkStore};

use super::fanout::{ContentFanoutIndexer, FanoutOutcome};
use super::governor::{Admission, RateGovernor};
use super::types::until_cancelled;
use super::{CrawlSummary, JobReport, SyncError};

/// Page sizes and pacing of the crawl job.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub catalog_page_size: u32,
    pub child_page_size: u32,
    pub delay: Duration,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            catalog_page_size: config.source.catalog_page_size,
            child_page_size: config.source.child_page_size,
            delay: Duration::from_millis(config.jobs.crawler.delay_ms),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Position of the walk.
///
/// The remote filter is inclusive, so items created exactly at the watermark
/// come back on every request. `seen` holds the ids already processed at the
/// watermark and is cleared whenever the watermark advances.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CrawlCursor {
    watermark: Watermark,
    seen: HashSet<String>,
}

impl CrawlCursor {
    fn start(watermark: Watermark) -> Self {
        Self {
            watermark,
            seen: HashSet::new(),
        }
    }

    fn already_processed(&self, item: &CatalogItem) -> bool {
        item.created_at == self.watermark.timestamp() && self.seen.contains(&item.id)
    }

    fn after(&self, page: &CompletedPage) -> Self {
        match page.newest {
            Some(newest) if newest > self.watermark.timestamp() => Self {
                watermark: self.watermark.advanced_to(newest),
                seen: page.at_newest.iter().cloned().collect(),
            },
            Some(_) => {
                let mut seen = self.seen.clone();
                seen.extend(page.at_newest.iter().cloned());
                Self {
                    watermark: self.watermark,
                    seen,
                }
            }
            None => self.clone(),
        }
    }
}

/// Tracks the items of one catalog page until each has been processed.
struct PageGate {
    pending: Vec<String>,
    processed: u32,
    newest: Option<DateTime<Utc>>,
    at_newest: Vec<String>,
}

/// A catalog page whose items have all been processed or dropped.
struct CompletedPage {
    processed: u32,
    newest: Option<DateTime<Utc>>,
    /// Ids processed at `newest`.
    at_newest: Vec<String>,
}

impl PageGate {
    fn open(items: &[CatalogItem]) -> Self {
        Self {
            pending: items.iter().map(|item| item.id.clone()).collect(),
            processed: 0,
            newest: None,
            at_newest: Vec::new(),
        }
    }

    fn processed(&mut self, item: &CatalogItem) {
        self.settle(&item.id);
        self.processed += 1;
        match self.newest {
            Some(newest) if newest == item.created_at => self.at_newest.push(item.id.clone()),
            Some(newest) if newest > item.created_at => {}
            _ => {
                self.newest = Some(item.created_at);
                self.at_newest = vec![item.id.clone()];
            }
        }
    }

    /// Item left out of processing (older than the watermark, or seen).
    fn dropped(&mut self, item: &CatalogItem) {
        self.settle(&item.id);
    }

    fn settle(&mut self, id: &str) {
        if let Some(pos) = self.pending.iter().position(|pending| pending == id) {
            self.pending.swap_remove(pos);
        }
    }

    /// Close the gate. Fails while any item is still pending.
    fn close(self) -> Result<CompletedPage, Vec<String>> {
        if !self.pending.is_empty() {
            return Err(self.pending);
        }
        Ok(CompletedPage {
            processed: self.processed,
            newest: self.newest,
            at_newest: self.at_newest,
        })
    }
}

/// The historical crawl job.
///
/// The watermark is loaded from the store on the first run and then kept in
/// memory; every advance is persisted before the next page is requested.
pub struct HistoricalCrawlWalker {
    source: Arc<dyn CatalogSource>,
    watermarks: Arc<dyn WatermarkStore>,
    fanout: ContentFanoutIndexer,
    governor: RateGovernor,
    settings: CrawlSettings,
    cursor: Option<CrawlCursor>,
}

impl HistoricalCrawlWalker {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        watermarks: Arc<dyn WatermarkStore>,
        fanout: ContentFanoutIndexer,
        governor: RateGovernor,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            source,
            watermarks,
            fanout,
            governor,
            settings,
            cursor: None,
        }
    }

    /// In-memory watermark, if the walker has started.
    pub fn watermark(&self) -> Option<Watermark> {
        self.cursor.as_ref().map(|cursor| cursor.watermark)
    }

    fn cursor(&mut self) -> CrawlCursor {
        if let Some(cursor) = &self.cursor {
            return cursor.clone();
        }
        let watermark = self.watermarks.load();
        info!(watermark = %watermark, "Loaded crawl watermark");
        metrics::WATERMARK_TIMESTAMP.set(watermark.timestamp().timestamp());
        let cursor = CrawlCursor::start(watermark);
        self.cursor = Some(cursor.clone());
        cursor
    }

    /// Walk forward from the watermark until the remote has nothing newer.
    ///
    /// Every request starts at offset 0. The walk only pages forward over
    /// pages made entirely of items it has already processed.
    pub async fn crawl(&mut self, cancel: &CancellationToken) -> Result<CrawlSummary, SyncError> {
        let mut summary = CrawlSummary::default();
        let mut cursor = self.cursor();
        let mut offset = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            self.govern("catalog page", cancel).await?;
            let query = CatalogQuery {
                created_since: cursor.watermark.timestamp(),
                limit: self.settings.catalog_page_size,
                offset,
            };
            let page = until_cancelled(cancel, self.source.list_catalog(&query))
                .await?
                .map_err(|e| {
                    error!(watermark = %cursor.watermark, offset, error = %e, "Catalog page request failed");
                    SyncError::catalog(format!("catalog page since {}", cursor.watermark), e)
                })?;

            if page.items.is_empty() {
                if page.total == 0 {
                    info!(watermark = %cursor.watermark, "No catalog items beyond watermark");
                } else {
                    info!(
                        watermark = %cursor.watermark,
                        total = page.total,
                        offset,
                        "Catalog page came back empty, ending run"
                    );
                }
                break;
            }

            debug!(
                items = page.items.len(),
                total = page.total,
                offset,
                watermark = %cursor.watermark,
                "Fetched catalog page"
            );

            let mut gate = PageGate::open(&page.items);
            for item in &page.items {
                if item.created_at < cursor.watermark.timestamp() {
                    debug!(
                        catalog_id = %item.id,
                        created_at = %item.created_at,
                        watermark = %cursor.watermark,
                        "Dropping item older than watermark"
                    );
                    gate.dropped(item);
                    continue;
                }
                if cursor.already_processed(item) {
                    gate.dropped(item);
                    continue;
                }

                self.process_item(item, cancel, &mut summary).await?;
                gate.processed(item);
            }

            let completed = match gate.close() {
                Ok(completed) => completed,
                Err(pending) => {
                    // Never advance past an item that was not settled.
                    warn!(pending = ?pending, "Catalog page not complete, watermark held");
                    break;
                }
            };

            if completed.processed == 0 {
                debug!(offset, items = page.items.len(), "Catalog page already processed, paging forward");
                offset += page.items.len() as u32;
                continue;
            }

            let next = cursor.after(&completed);
            if next.watermark != cursor.watermark {
                if let Err(e) = self.watermarks.save(&next.watermark) {
                    error!(watermark = %next.watermark, error = %e, "Failed to persist watermark");
                    return Err(e.into());
                }
                info!(from = %cursor.watermark, to = %next.watermark, "Watermark advanced");
                metrics::WATERMARK_TIMESTAMP.set(next.watermark.timestamp().timestamp());
            }
            self.cursor = Some(next.clone());
            cursor = next;
            offset = 0;

            summary.pages += 1;
            metrics::CRAWL_PAGES.inc();
        }

        summary.watermark = Some(cursor.watermark.timestamp());
        Ok(summary)
    }

    async fn process_item(
        &mut self,
        item: &CatalogItem,
        cancel: &CancellationToken,
        summary: &mut CrawlSummary,
    ) -> Result<(), SyncError> {
        debug!(catalog_id = %item.id, title = %item.title, "Processing catalog item");

        let mut offset = 0;
        loop {
            self.govern("chapter page", cancel).await?;
            let page = until_cancelled(
                cancel,
                self.source
                    .list_child_items(&item.id, self.settings.child_page_size, offset),
            )
            .await?
            .map_err(|e| {
                error!(catalog_id = %item.id, offset, error = %e, "Chapter listing failed");
                SyncError::catalog(format!("chapters of {} at offset {}", item.id, offset), e)
            })?;

            for child in &page.items {
                self.process_child(item, child, cancel, summary).await?;
            }

            if page.items.is_empty() || !page.has_more() {
                break;
            }
            offset += self.settings.child_page_size;
        }

        summary.catalog_items += 1;
        metrics::CATALOG_ITEMS_PROCESSED.inc();
        Ok(())
    }

    async fn process_child(
        &mut self,
        item: &CatalogItem,
        child: &ChildItem,
        cancel: &CancellationToken,
        summary: &mut CrawlSummary,
    ) -> Result<(), SyncError> {
        self.govern("chapter content", cancel).await?;
        let urls = until_cancelled(cancel, self.source.list_content_units(&child.id))
            .await?
            .map_err(|e| {
                error!(catalog_id = %item.id, child_id = %child.id, error = %e, "Page listing failed");
                SyncError::catalog(format!("pages of chapter {}", child.id), e)
            })?;

        if urls.is_empty() {
            warn!(
                catalog_id = %item.id,
                child_id = %child.id,
                label = %child.label,
                "No pages available for chapter, skipping"
            );
            summary.chapters_skipped += 1;
            metrics::CHAPTERS_SKIPPED.inc();
            return Ok(());
        }

        let units = ContentUnit::pages_of(&item.id, &child.id, &urls);
        match self.fanout.submit(&units, cancel).await? {
            FanoutOutcome::Complete { submitted } => {
                debug!(child_id = %child.id, submitted, "Chapter indexed");
                summary.units_submitted += submitted as u32;
            }
            FanoutOutcome::PartialFailure { submitted, failed } => {
                warn!(
                    catalog_id = %item.id,
                    child_id = %child.id,
                    submitted,
                    failed = failed.len(),
                    "Chapter partially indexed"
                );
                summary.units_submitted += submitted as u32;
                summary.units_failed += failed.len() as u32;
            }
        }
        summary.chapters += 1;
        Ok(())
    }

    async fn govern(&mut self, label: &str, cancel: &CancellationToken) -> Result<(), SyncError> {
        match self.governor.check_and_maybe_pause(label, cancel).await {
            Admission::Cancelled => Err(SyncError::Cancelled),
            Admission::Immediate | Admission::AfterCooldown => Ok(()),
        }
    }
}

#[async_trait]
impl Job for HistoricalCrawlWalker {
    fn name(&self) -> &str {
        "crawler"
    }

    fn delay(&self) -> Duration {
        self.settings.delay
    }

    async fn run(&mut self, cancel: &CancellationToken) -> Result<JobReport, SyncError> {
        let summary = self.crawl(cancel).await?;
        info!(
            pages = summary.pages,
            items = summary.catalog_items,
            chapters = summary.chapters,
            skipped = summary.chapters_skipped,
            submitted = summary.units_submitted,
            failed = summary.units_failed,
            "Crawl run finished"
        );
        Ok(JobReport::Crawl(summary))
    }
}
