use rusqlite::{params, OptionalExtension};

use crate::db::{quote_ident, DbPool};
use crate::error::StoreResult;
use crate::models::record::{Record, RecordForm};

use super::SqlStore;

/// SQLite-backed implementation of the SqlStore trait.
/// Wraps an r2d2 connection pool over the embedded database file.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &std::path::Path) -> StoreResult<Self> {
        let pool = crate::db::init_pool_at(path)?;
        Ok(Self { pool })
    }
}

impl SqlStore for SqliteStore {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_schema(&self, table: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        // AUTOINCREMENT: ids of deleted rows are never handed out again
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                username VARCHAR(100) NOT NULL,
                url TEXT NOT NULL,
                source TEXT,
                image TEXT NOT NULL,
                video_id TEXT,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );",
            quote_ident(table)
        ))?;
        Ok(())
    }

    fn list(&self, table: &str) -> StoreResult<Vec<Record>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY id ASC",
            quote_ident(table)
        ))?;
        let rows = stmt.query_map([], Record::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get(&self, table: &str, id: i64) -> StoreResult<Option<Record>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                &format!("SELECT * FROM {} WHERE id = ?1", quote_ident(table)),
                params![id],
                Record::from_row,
            )
            .optional()?)
    }

    fn insert(&self, table: &str, form: &RecordForm) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (title, description, username, url, source, image, video_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                quote_ident(table)
            ),
            params![
                form.title,
                form.description,
                form.username,
                form.url,
                form.source,
                form.image,
                form.video_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, table: &str, id: i64, form: &RecordForm) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET title=?1, description=?2, username=?3, url=?4, source=?5,
                 image=?6, video_id=?7, updated_at=CURRENT_TIMESTAMP WHERE id=?8",
                quote_ident(table)
            ),
            params![
                form.title,
                form.description,
                form.username,
                form.url,
                form.source,
                form.image,
                form.video_id,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, table: &str, id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", quote_ident(table)),
            params![id],
        )?;
        Ok(changed > 0)
    }

    fn count(&self, table: &str) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        Ok(conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?)
    }
}
