use crate::error::StoreResult;
use crate::models::record::{Record, RecordForm};

pub mod json;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

/// Relational data-access trait. Every table-backed collection operation goes through here.
/// Implementations: `SqliteStore` (rusqlite/r2d2) and `MysqlStore` (mysql crate pool).
///
/// `table` is always a configured, identifier-validated name; every value is a bound parameter.
pub trait SqlStore: Send + Sync {
    /// Engine name for status output: "sqlite" or "mysql"
    fn engine(&self) -> &'static str;

    // ── Schema ──────────────────────────────────────────────────────
    fn ensure_schema(&self, table: &str) -> StoreResult<()>;

    // ── CRUD ────────────────────────────────────────────────────────
    /// All rows, ascending by id.
    fn list(&self, table: &str) -> StoreResult<Vec<Record>>;
    fn get(&self, table: &str, id: i64) -> StoreResult<Option<Record>>;
    /// Insert and return the engine-assigned id. `updated_at` is stamped by the engine.
    fn insert(&self, table: &str, form: &RecordForm) -> StoreResult<i64>;
    /// `Ok(false)` when no row was touched, which includes an unknown id.
    fn update(&self, table: &str, id: i64, form: &RecordForm) -> StoreResult<bool>;
    fn delete(&self, table: &str, id: i64) -> StoreResult<bool>;

    // ── Counting ────────────────────────────────────────────────────
    fn count(&self, table: &str) -> StoreResult<i64>;
}
