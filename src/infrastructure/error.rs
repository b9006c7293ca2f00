use crate::domain::record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
