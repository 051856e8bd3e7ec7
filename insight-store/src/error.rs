//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A mutation was attempted before `init()` completed.
    #[error("store not initialized")]
    NotInitialized,

    #[error("vault error: {0}")]
    Vault(#[from] insight_vault::VaultError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The blocking seal/unseal task panicked or was cancelled.
    #[error("vault task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}
