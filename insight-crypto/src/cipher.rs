//! AES-256-GCM sealing of opaque byte payloads.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{random_bytes, MasterKey};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// AES-GCM nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Output of [`encrypt`]: the nonce plus ciphertext with the tag appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext followed by the 16-byte GCM tag.
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Flattens to the persisted layout `nonce || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Splits the persisted layout back into nonce and ciphertext.
    ///
    /// Anything shorter than a nonce plus an empty-plaintext tag cannot have
    /// been produced by [`encrypt`] and is rejected before decryption.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Malformed(format!(
                "record is {} bytes, minimum is {}",
                bytes.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Standard padded base64 of [`EncryptedData::to_bytes`].
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::Encoding(format!("sealed record: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Encrypts `plaintext` under `key` with a freshly drawn random nonce.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: crate::KEY_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;

    let nonce = random_bytes::<NONCE_SIZE>()?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData { nonce, ciphertext })
}

/// Authenticates and decrypts `data` under `key`.
///
/// A wrong key, a modified nonce, and modified ciphertext all fail the tag
/// check and return [`CryptoError::Decryption`]; no partial plaintext is
/// ever returned.
pub fn decrypt(key: &MasterKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: crate::KEY_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;

    cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_ref())
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
}
