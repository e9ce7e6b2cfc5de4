//! Domain error types.

use storage::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request collides with existing state (taken name, duplicate entry).
    #[error("{0}")]
    Conflict(String),

    /// The request breaks a business rule.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    /// Hashing or signing failed.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl DomainError {
    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        DomainError::Unauthorized(message.into())
    }
}

impl From<StoreError> for DomainError {
    /// Constraint violations surface as conflicts; everything else is a
    /// store failure.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                DomainError::Conflict(format!("request conflicts with existing data ({constraint})"))
            }
            other => DomainError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
