//! Error types for the notification bus.

use thiserror::Error;

/// Main error type for bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no transaction bound to the current thread")]
    TransactionRequired,

    #[error("transaction is no longer active")]
    TransactionCompleted,

    #[error("transaction prepare phase failed")]
    PrepareFailed,

    #[error("transaction member already registered: {0}")]
    DuplicateMember(String),

    #[error("no session bound to the current thread")]
    SessionRequired,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("listener error: {0}")]
    Listener(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
