//! SQLite-backed catalog store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CatalogStats, CatalogStore, StoreError};
use crate::index::UpdateSet;
use crate::source::CatalogItem;

/// SQLite-backed catalog store.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            -- Mirrored catalog entries
            CREATE TABLE IF NOT EXISTS catalog_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                refreshed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_items_created ON catalog_items(created_at);

            -- Content reported as indexed by the match service
            CREATE TABLE IF NOT EXISTS indexed_content (
                content_id TEXT PRIMARY KEY,
                source TEXT,
                kind TEXT,
                catalog_id TEXT,
                child_id TEXT,
                ordinal INTEGER,
                merged_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_indexed_content_catalog ON indexed_content(catalog_id);

            -- Bookkeeping values
            CREATE TABLE IF NOT EXISTS sync_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl CatalogStore for SqliteCatalogStore {
    fn upsert_items(&self, items: &[CatalogItem]) -> Result<u32, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut changed = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO catalog_items (id, title, created_at, updated_at, refreshed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    updated_at = excluded.updated_at,
                    refreshed_at = excluded.refreshed_at
                 WHERE catalog_items.title IS NOT excluded.title
                    OR catalog_items.updated_at IS NOT excluded.updated_at",
            )?;

            for item in items {
                changed += stmt.execute(params![
                    item.id,
                    item.title,
                    item.created_at.to_rfc3339(),
                    item.updated_at.map(|t| t.to_rfc3339()),
                    now,
                ])? as u32;
            }
        }

        tx.commit()?;
        Ok(changed)
    }

    fn merge_updates(&self, updates: &UpdateSet) -> Result<u32, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let merged_at = updates.fetched_at.to_rfc3339();
        let mut changed = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO indexed_content
                    (content_id, source, kind, catalog_id, child_id, ordinal, merged_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(content_id) DO UPDATE SET
                    source = excluded.source,
                    kind = excluded.kind,
                    catalog_id = excluded.catalog_id,
                    child_id = excluded.child_id,
                    ordinal = excluded.ordinal,
                    merged_at = excluded.merged_at
                 WHERE indexed_content.source IS NOT excluded.source
                    OR indexed_content.kind IS NOT excluded.kind
                    OR indexed_content.catalog_id IS NOT excluded.catalog_id
                    OR indexed_content.child_id IS NOT excluded.child_id
                    OR indexed_content.ordinal IS NOT excluded.ordinal",
            )?;

            for entry in &updates.entries {
                let meta = entry.metadata.as_ref();
                changed += stmt.execute(params![
                    entry.content_id,
                    meta.map(|m| m.source.as_str()),
                    meta.map(|m| m.kind.as_str()),
                    meta.map(|m| m.catalog_id.as_str()),
                    meta.map(|m| m.child_id.as_str()),
                    meta.map(|m| m.ordinal),
                    merged_at,
                ])? as u32;
            }

            tx.execute(
                "INSERT INTO sync_meta (key, value) VALUES ('last_merged_at', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![merged_at],
            )?;
        }

        tx.commit()?;
        Ok(changed)
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let conn = self.conn()?;

        let items: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_items", [], |row| {
            row.get(0)
        })?;
        let indexed_content: i64 =
            conn.query_row("SELECT COUNT(*) FROM indexed_content", [], |row| row.get(0))?;
        let newest: Option<String> = conn.query_row(
            "SELECT MAX(created_at) FROM catalog_items",
            [],
            |row| row.get(0),
        )?;
        let last_merged: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = 'last_merged_at'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(CatalogStats {
            items: items as u64,
            indexed_content: indexed_content as u64,
            newest_item_created_at: parse_timestamp(newest),
            last_merged_at: parse_timestamp(last_merged),
        })
    }
}
