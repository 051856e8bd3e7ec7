//! Master key material.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the master key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key used for every seal/unseal in one storage profile.
///
/// The raw bytes are only reachable inside this crate. Callers persist the
/// key through [`MasterKey::to_base64`] and restore it with
/// [`MasterKey::from_base64`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Wraps a byte slice, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Decodes a key persisted with [`MasterKey::to_base64`].
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let mut raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Encoding(format!("master key: {e}")))?;
        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }

    /// Encodes the key for persistence.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for MasterKey {}

/// Generates a fresh master key from the OS CSPRNG.
pub fn generate_random_key() -> CryptoResult<MasterKey> {
    Ok(MasterKey(random_bytes::<KEY_SIZE>()?))
}

/// Fills an array from the OS CSPRNG, surfacing RNG failure as an error.
pub(crate) fn random_bytes<const N: usize>() -> CryptoResult<[u8; N]> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
