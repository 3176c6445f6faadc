pub mod config;
pub mod index;
pub mod metrics;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod sync;
pub mod testing;
pub mod watermark;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    WatermarkBackend,
};
pub use index::{ContentUnit, HttpMatchIndex, IndexError, MatchIndex};
pub use scheduler::{Job, JobOutcome, JobState, JobStatus, SchedulerStatus, TaskScheduler};
pub use source::{CatalogItem, CatalogSource, ChildItem, MangaDexSource, SourceError};
pub use store::{CatalogStats, CatalogStore, SqliteCatalogStore, StoreError};
pub use sync::{
    CatalogRefreshTask, ContentFanoutIndexer, CrawlSettings, HistoricalCrawlWalker, JobReport,
    RateGovernor, ReconciliationTask, SyncError,
};
pub use watermark::{create_watermark_store, Watermark, WatermarkError, WatermarkStore};
