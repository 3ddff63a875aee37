//! Shared error type for LOMAP crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures from the catalog store, configuration and input validation
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite failure from the catalog or settings tables
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure (root folder, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable configuration, e.g. no Gemini API key
    #[error("Configuration error: {0}")]
    Config(String),

    /// No product (or other record) with the given id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected product, rating or coordinate
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
