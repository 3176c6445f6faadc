//! The sync pipeline: rate governor, fan-out indexer and the three jobs the
//! scheduler runs (historical crawl, catalog refresh, reconciliation).

mod fanout;
mod governor;
mod reconcile;
mod refresh;
mod types;
mod walker;

pub use fanout::{ContentFanoutIndexer, FanoutOutcome};
pub use governor::{Admission, RateGovernor};
pub use reconcile::ReconciliationTask;
pub use refresh::CatalogRefreshTask;
pub use types::{CrawlSummary, JobReport, ReconcileSummary, RefreshSummary, SyncError};
pub use walker::{CrawlSettings, HistoricalCrawlWalker};
