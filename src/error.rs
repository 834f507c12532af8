use serde::Serialize;
use thiserror::Error;

/// Machine-checkable error kind, surfaced next to the human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Connection,
    NotFound,
    Validation,
    Precondition,
    Storage,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("no such collection: {0}")]
    UnknownCollection(String),

    #[error("record {id} not found in {collection}")]
    NotFound { collection: String, id: i64 },

    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("{0}")]
    Precondition(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[cfg(feature = "mysql")]
    #[error("mysql: {0}")]
    Mysql(#[from] mysql::Error),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Config(_) => ErrorKind::Config,
            StoreError::Connection(_) => ErrorKind::Connection,
            StoreError::UnknownCollection(_) | StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Validation { .. } => ErrorKind::Validation,
            StoreError::Precondition(_) => ErrorKind::Precondition,
            _ => ErrorKind::Storage,
        }
    }

    pub fn not_found(collection: &str, id: i64) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
