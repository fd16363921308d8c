//! Error types for the engagement engine

use thiserror::Error;

/// Errors produced by the engagement engine.
///
/// Callers on the UI path never see these directly: the public `award`/`track_*`
/// wrappers log them and return `false`. The `try_*` variants surface them so
/// failure paths can be asserted.
#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("Stats store error: {0}")]
    Store(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No authenticated user")]
    Unauthenticated,

    #[error("User {requested} does not match authenticated user {current}")]
    IdentityMismatch { requested: String, current: String },

    #[error("Points must be greater than zero (got {0})")]
    InvalidPoints(u32),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngagementError>;
