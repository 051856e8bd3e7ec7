//! Master key lifecycle: lazily created, persisted, never rotated.

use crate::error::{VaultError, VaultResult};
use crate::storage::SlotStorage;
use insight_crypto::{generate_random_key, MasterKey};
use std::sync::Arc;
use tracing::{debug, info};

/// Supplies the single master key of a storage profile.
///
/// The key is re-read from its slot on every call, so a key written by
/// another manager over the same storage is picked up immediately.
pub struct MasterKeyManager {
    storage: Arc<dyn SlotStorage>,
    slot: String,
}

impl MasterKeyManager {
    pub fn new(storage: Arc<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        Self {
            storage,
            slot: slot.into(),
        }
    }

    /// Returns the master key, generating and persisting one if the slot is
    /// empty.
    ///
    /// Storage failures, RNG failures, and a key slot that does not hold a
    /// valid 32-byte key are all fatal: without the key there is no vault.
    pub fn get_key(&self) -> VaultResult<MasterKey> {
        let stored = self
            .storage
            .get_item(&self.slot)
            .map_err(|e| VaultError::KeyUnavailable(e.to_string()))?;

        match stored {
            Some(encoded) => {
                debug!(slot = %self.slot, "loaded master key");
                MasterKey::from_base64(&encoded)
                    .map_err(|e| VaultError::KeyUnavailable(format!("corrupt key slot: {e}")))
            }
            None => {
                let key = generate_random_key()
                    .map_err(|e| VaultError::KeyUnavailable(e.to_string()))?;
                self.storage
                    .set_item(&self.slot, &key.to_base64())
                    .map_err(|e| VaultError::KeyUnavailable(e.to_string()))?;
                info!(slot = %self.slot, "generated new master key");
                Ok(key)
            }
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }
}
