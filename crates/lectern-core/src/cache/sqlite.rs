//! SQLite-based cache backend.

use super::traits::{CacheBackend, CachedAsset};
use crate::error::{LecternError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-based cache backend.
///
/// A single database file holds every generation, so the offline shell
/// survives restarts. Thread-safe via internal mutex on the connection.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the specified path.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LecternError::Io {
                message: format!("Failed to create cache directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| LecternError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        // WAL keeps reads cheap while a refresh write is in progress
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| LecternError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Open an in-memory database. Useful for tests that want the SQL path
    /// without touching disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LecternError::Database {
            message: format!("Failed to open in-memory cache: {}", e),
            source: Some(e),
        })?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS shell_assets (
                generation TEXT NOT NULL,
                key TEXT NOT NULL,
                body BLOB NOT NULL,
                content_type TEXT,
                status INTEGER NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (generation, key)
            );

            CREATE INDEX IF NOT EXISTS idx_shell_assets_generation
                ON shell_assets(generation);
            "#,
        )
        .map_err(|e| LecternError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| LecternError::Database {
            message: format!("Failed to lock cache database: {}", e),
            source: None,
        })
    }
}

impl CacheBackend for SqliteCache {
    fn get(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT body, content_type, status, cached_at
                 FROM shell_assets WHERE generation = ?1 AND key = ?2",
                params![generation, key],
                |row| {
                    let body: Vec<u8> = row.get(0)?;
                    let content_type: Option<String> = row.get(1)?;
                    let status: u16 = row.get(2)?;
                    let cached_at: String = row.get(3)?;
                    Ok((body, content_type, status, cached_at))
                },
            )
            .optional()?;

        Ok(row.map(|(body, content_type, status, cached_at)| CachedAsset {
            body: Bytes::from(body),
            content_type,
            status,
            cached_at: cached_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        }))
    }

    fn set(&self, generation: &str, key: &str, asset: &CachedAsset) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO shell_assets
                 (generation, key, body, content_type, status, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                generation,
                key,
                asset.body.as_ref(),
                asset.content_type,
                asset.status,
                asset.cached_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn generations(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT generation FROM shell_assets ORDER BY generation")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn remove_generation(&self, generation: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM shell_assets WHERE generation = ?1",
            params![generation],
        )?;
        debug!("Evicted {} entries from generation {}", removed, generation);
        Ok(removed)
    }

    fn entry_count(&self, generation: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM shell_assets WHERE generation = ?1",
            params![generation],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
