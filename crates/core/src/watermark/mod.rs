//! Durable crawl watermark.
//!
//! The watermark is the creation time of the oldest catalog item not yet
//! guaranteed to be fully processed. It is the only state the crawl persists.

mod file;
mod sqlite;

pub use file::{FileWatermarkStore, WATERMARK_FILE};
pub use sqlite::{SqliteWatermarkStore, WATERMARK_KEY};

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{WatermarkBackend, WatermarkConfig};

/// 2001-01-01T00:00:00Z, older than anything in the catalog.
const EPOCH_SENTINEL_SECS: i64 = 978_307_200;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for WatermarkError {
    fn from(e: rusqlite::Error) -> Self {
        WatermarkError::Database(e.to_string())
    }
}

/// A point in time the crawl has fully processed up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Starting point when nothing has been persisted yet.
    pub fn epoch() -> Self {
        Self(DateTime::from_timestamp(EPOCH_SENTINEL_SECS, 0).unwrap_or_default())
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// The later of `self` and `candidate`; a watermark never moves back.
    pub fn advanced_to(self, candidate: DateTime<Utc>) -> Self {
        Self(self.0.max(candidate))
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::epoch()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Durable single-value storage for the watermark.
pub trait WatermarkStore: Send + Sync {
    /// Read the stored watermark.
    ///
    /// Never fails: a missing or unreadable value yields [`Watermark::epoch`].
    fn load(&self) -> Watermark;

    /// Persist the watermark. Returns only once the value is durable.
    fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError>;
}

/// Factory function to create the configured watermark store.
pub fn create_watermark_store(
    config: &WatermarkConfig,
    database_path: &Path,
) -> Result<Box<dyn WatermarkStore>, WatermarkError> {
    match config.backend {
        WatermarkBackend::File => Ok(Box::new(FileWatermarkStore::in_dir(&config.state_dir))),
        WatermarkBackend::Sqlite => Ok(Box::new(SqliteWatermarkStore::new(database_path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_epoch_sentinel() {
        assert_eq!(
            Watermark::epoch().to_string(),
            "2001-01-01T00:00:00+00:00"
        );
        assert_eq!(Watermark::default(), Watermark::epoch());
    }

    #[test]
    fn test_advanced_to_never_moves_back() {
        let w = Watermark::new("2020-01-02T00:00:00Z".parse().unwrap());

        let later = w.advanced_to("2020-01-03T00:00:00Z".parse().unwrap());
        assert_eq!(later.to_string(), "2020-01-03T00:00:00+00:00");

        let earlier = w.advanced_to("2019-12-31T00:00:00Z".parse().unwrap());
        assert_eq!(earlier, w);
    }

    #[test]
    fn test_create_file_store() {
        let dir = TempDir::new().unwrap();
        let config = WatermarkConfig {
            backend: WatermarkBackend::File,
            state_dir: dir.path().to_path_buf(),
        };
        let store = create_watermark_store(&config, &dir.path().join("unused.db")).unwrap();

        let w = Watermark::new("2022-02-02T00:00:00Z".parse().unwrap());
        store.save(&w).unwrap();
        assert!(dir.path().join(WATERMARK_FILE).exists());
        assert_eq!(store.load(), w);
    }

    #[test]
    fn test_create_sqlite_store() {
        let dir = TempDir::new().unwrap();
        let config = WatermarkConfig {
            backend: WatermarkBackend::Sqlite,
            state_dir: dir.path().to_path_buf(),
        };
        let db = dir.path().join("folio.db");
        let store = create_watermark_store(&config, &db).unwrap();

        assert_eq!(store.load(), Watermark::epoch());
        let w = Watermark::new("2023-03-03T00:00:00Z".parse().unwrap());
        store.save(&w).unwrap();
        assert_eq!(store.load(), w);
        assert!(!dir.path().join(WATERMARK_FILE).exists());
    }
}
