//! Error types for visitlog-core

use thiserror::Error;

/// Main error type for the visitlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store refused a read or write (e.g. quota exceeded)
    #[error("storage error: {0}")]
    Storage(String),

    /// The persisted visit buffer could not be parsed
    #[error("buffered visits are not valid JSON: {0}")]
    CorruptBuffer(#[source] serde_json::Error),

    /// Network/transport failure while delivering a visit
    #[error("transport error: {0}")]
    Transport(String),

    /// Capability reserved in the interface but never built
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The page went away before it finished loading
    #[error("page closed before load completed")]
    PageClosed,
}

/// Result type alias for visitlog-core
pub type Result<T> = std::result::Result<T, Error>;
