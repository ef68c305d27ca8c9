//! Error types for the forecast store.

use std::path::PathBuf;

use crate::uri::ForecastUri;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing the forecast store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create the database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The URI does not name a resource this query can serve.
    #[error("Unsupported URI for this query: {0}")]
    UnsupportedUri(ForecastUri),

    /// A weather row was written for a location id that does not exist.
    #[error("Unknown location id: {0}")]
    UnknownLocation(i64),

    /// A stored date could not be converted back to a calendar day.
    #[error("Invalid stored date: {0}")]
    InvalidDate(i64),
}
