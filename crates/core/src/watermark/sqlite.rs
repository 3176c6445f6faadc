//! Watermark stored as a row in the shared SQLite database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::{Watermark, WatermarkError, WatermarkStore};

/// Well-known key of the watermark row.
pub const WATERMARK_KEY: &str = "historical_crawl_watermark";

/// SQLite-backed watermark store.
pub struct SqliteWatermarkStore {
    conn: Mutex<Connection>,
}

impl SqliteWatermarkStore {
    pub fn new(path: &Path) -> Result<Self, WatermarkError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, WatermarkError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), WatermarkError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, WatermarkError> {
        self.conn
            .lock()
            .map_err(|_| WatermarkError::Database("connection lock poisoned".to_string()))
    }

    fn read(&self) -> Result<Option<String>, WatermarkError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?",
                params![WATERMARK_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl WatermarkStore for SqliteWatermarkStore {
    fn load(&self) -> Watermark {
        match self.read() {
            Ok(Some(value)) => match DateTime::parse_from_rfc3339(&value) {
                Ok(dt) => Watermark::new(dt.with_timezone(&Utc)),
                Err(e) => {
                    warn!("Corrupt stored watermark {:?}, starting from epoch: {}", value, e);
                    Watermark::epoch()
                }
            },
            Ok(None) => {
                debug!("No stored watermark, starting from epoch");
                Watermark::epoch()
            }
            Err(e) => {
                warn!("Failed to read watermark, starting from epoch: {}", e);
                Watermark::epoch()
            }
        }
    }

    fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![WATERMARK_KEY, watermark.to_string(), Utc::now().to_rfc3339()],
        )?;
        debug!("Watermark saved: {}", watermark);
        Ok(())
    }
}
