//! Error types for basilisk

use thiserror::Error;

/// Result type alias for basilisk operations
pub type Result<T> = std::result::Result<T, BasiliskError>;

/// Unified error type for all basilisk operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BasiliskError {
    /// Initial connection setup did not finish within the connect deadline
    #[error("Connect timeout: {0}")]
    ConnectTimeout(String),

    /// Initial connection setup failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The liveness ping failed or timed out after connecting
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// A collection handle could not be materialized
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller input was rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the underlying driver during a read or write
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BasiliskError {
    /// Returns true if repeating the connection attempt may succeed.
    ///
    /// Nothing in basilisk retries on its own; callers decide whether to
    /// call `new_database` again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BasiliskError::ConnectTimeout(_)
                | BasiliskError::Connection(_)
                | BasiliskError::Unreachable(_)
        )
    }

    /// Consumes the error, returning its message without the variant prefix.
    pub fn into_message(self) -> String {
        match self {
            BasiliskError::ConnectTimeout(msg)
            | BasiliskError::Connection(msg)
            | BasiliskError::Unreachable(msg)
            | BasiliskError::NotFound(msg)
            | BasiliskError::Validation(msg)
            | BasiliskError::Store(msg)
            | BasiliskError::Serialization(msg) => msg,
        }
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for BasiliskError {
    fn from(err: mongodb::error::Error) -> Self {
        BasiliskError::Store(err.to_string())
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for BasiliskError {
    fn from(err: bson::ser::Error) -> Self {
        BasiliskError::Serialization(format!("BSON serialization error: {}", err))
    }
}
