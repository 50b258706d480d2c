//! Custom error types for the common library
//!
//! This module defines the error taxonomy shared by the attendance core
//! and its persistence backends.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors surfaced by a persistence backend or by core components
/// validating state against it.
///
/// The core never retries on its own: every variant is returned to the
/// caller, which decides whether to notify, resync, or give up.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient connectivity or query failure. Retryable by the caller.
    #[error("persistence connectivity error: {0}")]
    Connectivity(String),

    /// A uniqueness constraint rejected a write. Expected during
    /// session-creation races; callers re-query rather than fail.
    #[error("uniqueness constraint violated: {0}")]
    Constraint(String),

    /// An operation was invoked against state that does not permit it,
    /// e.g. check-out without a prior check-in.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Custom error type for database bootstrap operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
