//! Argon2id password hashing for account credentials.
//!
//! Hashes are self-describing strings of the form
//! `argon2id$m=<kib>,t=<iterations>,p=<lanes>$<salt b64>$<hash b64>` so a
//! hash created under one set of parameters still verifies after the
//! defaults change.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{constant_time_eq, random_bytes};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD as B64, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const SALT_SIZE: usize = 16;
const HASH_SIZE: usize = 32;
const SCHEME: &str = "argon2id";

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Smallest parameters Argon2 accepts. Only for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(HASH_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn encode(&self) -> String {
        format!(
            "m={},t={},p={}",
            self.memory_kib, self.iterations, self.parallelism
        )
    }

    fn decode(s: &str) -> CryptoResult<Self> {
        let mut memory_kib = None;
        let mut iterations = None;
        let mut parallelism = None;
        for part in s.split(',') {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| CryptoError::Encoding(format!("bad kdf parameter: {part}")))?;
            let value: u32 = value
                .parse()
                .map_err(|_| CryptoError::Encoding(format!("bad kdf parameter: {part}")))?;
            match name {
                "m" => memory_kib = Some(value),
                "t" => iterations = Some(value),
                "p" => parallelism = Some(value),
                _ => return Err(CryptoError::Encoding(format!("unknown kdf parameter: {name}"))),
            }
        }
        match (memory_kib, iterations, parallelism) {
            (Some(memory_kib), Some(iterations), Some(parallelism)) => Ok(Self {
                memory_kib,
                iterations,
                parallelism,
            }),
            _ => Err(CryptoError::Encoding("incomplete kdf parameters".into())),
        }
    }
}

/// Hashes `password` with a random salt.
pub fn hash_password(password: &str, params: &KdfParams) -> CryptoResult<String> {
    let salt = random_bytes::<SALT_SIZE>()?;
    let hash = derive(password, &salt, params)?;
    Ok(format!(
        "{SCHEME}${}${}${}",
        params.encode(),
        B64.encode(salt),
        B64.encode(hash.as_slice())
    ))
}

/// Checks `password` against a hash produced by [`hash_password`].
///
/// Returns `Ok(false)` for a wrong password and `Err` only when `encoded`
/// is not a hash this module understands.
pub fn verify_password(password: &str, encoded: &str) -> CryptoResult<bool> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(params), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::Encoding("unrecognized password hash".into()));
    };
    if scheme != SCHEME {
        return Err(CryptoError::Encoding(format!("unsupported scheme: {scheme}")));
    }

    let params = KdfParams::decode(params)?;
    let salt = B64
        .decode(salt)
        .map_err(|e| CryptoError::Encoding(format!("salt: {e}")))?;
    let expected = B64
        .decode(expected)
        .map_err(|e| CryptoError::Encoding(format!("hash: {e}")))?;

    let actual = derive(password, &salt, &params)?;
    Ok(constant_time_eq(actual.as_slice(), &expected))
}

fn derive(password: &str, salt: &[u8], params: &KdfParams) -> CryptoResult<Zeroizing<[u8; HASH_SIZE]>> {
    let mut out = Zeroizing::new([0u8; HASH_SIZE]);
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut out[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(out)
}
