//! Encryption layer for the SDG-Insight vault.
//!
//! Provides the primitives the vault seals its state document with:
//! - AES-256-GCM authenticated encryption with a fresh 96-bit nonce per call
//! - A 256-bit master key type that zeroizes on drop and never prints itself
//! - The sealed record framing (`nonce || ciphertext || tag`, base64 encoded)
//! - Argon2id password hashing for account credentials
//!
//! # Architecture
//!
//! There is a single symmetric **master key** per storage profile. It is
//! generated from the OS CSPRNG the first time the vault needs it and is then
//! persisted next to the data it protects. The key is not derived from a
//! password, so unlocking needs no user interaction; the trade-off is that
//! anyone holding the key slot can read the vault.
//!
//! Every encryption draws a new random nonce. AES-GCM loses confidentiality
//! if a nonce repeats under the same key, so nonces are never derived,
//! counted, or reused.

mod cipher;
mod error;
mod key;
pub mod password;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{generate_random_key, MasterKey, KEY_SIZE};
pub use password::{hash_password, verify_password, KdfParams};
