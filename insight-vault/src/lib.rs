//! Sealed single-document vault.
//!
//! The entire application state is one JSON object, encrypted as a unit
//! under a per-profile master key and stored in one named slot:
//!
//! ```text
//! Vault::seal(doc) -> SealingEngine -> AES-256-GCM(master key) -> slot "system_core.bin"
//!                                        ^
//!                     MasterKeyManager --+-- slot "SDG_VAULT_MASTER"
//! ```
//!
//! Unsealing is fail-soft: a record that is corrupt, tampered with, or
//! sealed under a different key yields [`Unsealed::Unreadable`] instead of
//! an error, so callers can start empty while still telling "nothing stored"
//! apart from "stored but unreadable". Failing to obtain the master key is
//! the only fatal case.

mod config;
mod error;
mod key_manager;
mod sealing;
mod storage;
mod vault;

pub use config::{VaultConfig, DEFAULT_MASTER_KEY_SLOT, DEFAULT_VAULT_SLOT};
pub use error::{VaultError, VaultResult};
pub use key_manager::MasterKeyManager;
pub use sealing::{SealingEngine, UnreadableReason, Unsealed};
pub use storage::{DuckDbSlots, MemorySlots, SlotStorage};
pub use vault::{StateDocument, Vault};
