/// surql-orm Error Module
///
/// This module defines the structured error types for the ORM. It covers
/// transport failures, the transient content-type failure that the execution
/// runtime retries, database-level query failures, unexpected response
/// shapes, schema declaration problems, and configuration loading.
use thiserror::Error;

/// Comprehensive error type for surql-orm.
///
/// Note that a database-level error envelope returned by the `/sql` endpoint
/// is *not* represented here: the multi-result execution path returns it as
/// data (`SqlOutcome::DbError`) and callers must check for it explicitly.
#[derive(Error, Debug)]
pub enum SurqlError {
    /// Transport-level HTTP errors from reqwest
    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed content-type on a response. Retried by the execution
    /// runtime; surfacing one of these means the retry budget is exhausted.
    #[error("Content-type error: {0}")]
    ContentType(String),

    /// Query execution errors raised from the single-result path
    #[error("Query error: {0}")]
    Query(String),

    /// Unexpected response shapes (a non-sequence where a sequence was expected)
    #[error("Response error: {0}")]
    Response(String),

    /// Schema declaration and column lookup errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing and serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result to use SurqlError as the error type.
pub type Result<T> = std::result::Result<T, SurqlError>;
