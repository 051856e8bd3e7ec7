//! Vault error types.

use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that abort a vault operation.
///
/// Unreadable sealed records are not errors; they surface as
/// [`crate::Unsealed::Unreadable`].
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("master key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] insight_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<duckdb::Error> for VaultError {
    fn from(e: duckdb::Error) -> Self {
        VaultError::Storage(e.to_string())
    }
}
