//! Shared error types.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors produced by the shared database layer.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a connection or build the pool
    #[error("database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// A query failed to execute
    #[error("database query error: {0}")]
    Query(#[source] SqlxError),

    /// Applying migrations failed
    #[error("database migration error: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// The pool configuration is unusable
    #[error("database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
