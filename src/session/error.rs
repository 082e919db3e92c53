//! Session registry error types.

use thiserror::Error;

/// Result type for session registry operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during session registry operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A filter or update referenced a column outside the session table's
    /// fixed column set. Raised before any store mutation.
    #[error("no such column: {0}")]
    InvalidColumn(String),

    /// A selector built from raw key/value pairs named no column at all.
    #[error("selector must name at least one column")]
    EmptySelector,

    /// No row matched the selector, or the matched row's kernel was found
    /// dead during reconciliation.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Invalid backing-store location. Fatal to registry construction.
    #[error("invalid session database: {0}")]
    Configuration(String),

    /// Underlying storage failure.
    #[error("session database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Kernel registry failure, propagated unmasked.
    #[error("kernel registry error: {0}")]
    Kernel(#[source] anyhow::Error),

    /// Contents resolver failure, propagated unmasked.
    #[error("contents resolver error: {0}")]
    Contents(#[source] anyhow::Error),
}
