//! Sealing engine: JSON document <-> base64 sealed record.

use crate::error::VaultResult;
use crate::key_manager::MasterKeyManager;
use insight_crypto::{decrypt, encrypt, CryptoError, EncryptedData};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

/// Outcome of unsealing.
///
/// `Unreadable` covers every way a present record can fail to yield a
/// document. Callers that only care about "data or not" use
/// [`Unsealed::into_document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Unsealed<T> {
    /// No sealed record exists yet.
    Empty,
    Document(T),
    /// A record exists but could not be turned back into a document.
    Unreadable(UnreadableReason),
}

impl<T> Unsealed<T> {
    pub fn into_document(self) -> Option<T> {
        match self {
            Unsealed::Document(doc) => Some(doc),
            Unsealed::Empty | Unsealed::Unreadable(_) => None,
        }
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self, Unsealed::Unreadable(_))
    }
}

/// Why a sealed record could not be unsealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadableReason {
    /// Not valid base64.
    Encoding,
    /// Too short to hold a nonce and tag.
    Truncated,
    /// Tag check failed: wrong key, tampering, or corruption.
    Authentication,
    /// Decrypted fine but is not the expected JSON document.
    Format,
}

impl fmt::Display for UnreadableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnreadableReason::Encoding => "invalid encoding",
            UnreadableReason::Truncated => "truncated record",
            UnreadableReason::Authentication => "authentication failed",
            UnreadableReason::Format => "not a state document",
        };
        f.write_str(s)
    }
}

/// Encrypts and decrypts whole JSON documents with the master key.
pub struct SealingEngine {
    keys: MasterKeyManager,
}

impl SealingEngine {
    pub fn new(keys: MasterKeyManager) -> Self {
        Self { keys }
    }

    /// Serializes `document` and seals it under a fresh nonce.
    pub fn seal<T: Serialize + ?Sized>(&self, document: &T) -> VaultResult<String> {
        let key = self.keys.get_key()?;
        let plaintext = serde_json::to_vec(document)?;
        let sealed = encrypt(&key, &plaintext)?;
        let record = sealed.to_base64();
        debug!(
            plaintext_bytes = plaintext.len(),
            record_bytes = record.len(),
            "sealed document"
        );
        Ok(record)
    }

    /// Unseals a record produced by [`SealingEngine::seal`].
    ///
    /// Only key acquisition can fail with `Err`. Any problem with the record
    /// itself is logged and reported as [`Unsealed::Unreadable`].
    pub fn unseal<T: DeserializeOwned>(&self, record: &str) -> VaultResult<Unsealed<T>> {
        let key = self.keys.get_key()?;

        let sealed = match EncryptedData::from_base64(record) {
            Ok(sealed) => sealed,
            Err(e) => return Ok(unreadable(reason_for(&e), &e)),
        };

        let plaintext = match decrypt(&key, &sealed) {
            Ok(plaintext) => plaintext,
            Err(e) => return Ok(unreadable(reason_for(&e), &e)),
        };

        match serde_json::from_slice(&plaintext) {
            Ok(doc) => {
                debug!(plaintext_bytes = plaintext.len(), "unsealed document");
                Ok(Unsealed::Document(doc))
            }
            Err(e) => Ok(unreadable(UnreadableReason::Format, &e)),
        }
    }
}

fn reason_for(e: &CryptoError) -> UnreadableReason {
    match e {
        CryptoError::Encoding(_) => UnreadableReason::Encoding,
        CryptoError::Malformed(_) => UnreadableReason::Truncated,
        _ => UnreadableReason::Authentication,
    }
}

fn unreadable<T>(reason: UnreadableReason, cause: &dyn fmt::Display) -> Unsealed<T> {
    error!(%reason, %cause, "vault corruption or decryption failure");
    Unsealed::Unreadable(reason)
}
