//! Records error types.

use thiserror::Error;

pub type RecordsResult<T> = Result<T, RecordsError>;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("identity record not found: {0}")]
    IdentityNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] insight_store::StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] insight_crypto::CryptoError),

    /// A password hashing task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for RecordsError {
    fn from(e: tokio::task::JoinError) -> Self {
        RecordsError::Task(e.to_string())
    }
}
