//! The vault: one sealed state document in one storage slot.

use crate::config::VaultConfig;
use crate::error::VaultResult;
use crate::key_manager::MasterKeyManager;
use crate::sealing::{SealingEngine, Unsealed, UnreadableReason};
use crate::storage::SlotStorage;
use std::sync::Arc;
use tracing::{debug, error};

/// The whole persisted application state: string keys to JSON values.
pub type StateDocument = serde_json::Map<String, serde_json::Value>;

/// Seals one [`StateDocument`] into a single storage slot.
///
/// There is no partial update: every [`Vault::seal`] re-serializes and
/// re-encrypts the entire document it is given.
pub struct Vault {
    storage: Arc<dyn SlotStorage>,
    engine: SealingEngine,
    slot: String,
}

impl Vault {
    pub fn new(
        storage: Arc<dyn SlotStorage>,
        master_key_slot: impl Into<String>,
        vault_slot: impl Into<String>,
    ) -> Self {
        let keys = MasterKeyManager::new(storage.clone(), master_key_slot);
        Self {
            storage,
            engine: SealingEngine::new(keys),
            slot: vault_slot.into(),
        }
    }

    /// Opens the configured storage and builds a vault over it.
    pub fn from_config(config: &VaultConfig) -> VaultResult<Self> {
        let storage = config.open_storage()?;
        Ok(Self::new(
            storage,
            config.master_key_slot.clone(),
            config.vault_slot.clone(),
        ))
    }

    /// Encrypts `document` and overwrites the vault slot with it.
    pub fn seal(&self, document: &StateDocument) -> VaultResult<()> {
        let record = self.engine.seal(document)?;
        self.storage.set_item(&self.slot, &record)?;
        debug!(slot = %self.slot, keys = document.len(), "vault sealed");
        Ok(())
    }

    /// Reads and decrypts the vault slot.
    ///
    /// A record that decrypts to valid JSON that is not an object is
    /// reported as [`UnreadableReason::Format`].
    pub fn unseal(&self) -> VaultResult<Unsealed<StateDocument>> {
        let Some(record) = self.storage.get_item(&self.slot)? else {
            debug!(slot = %self.slot, "no sealed record");
            return Ok(Unsealed::Empty);
        };

        Ok(match self.engine.unseal::<serde_json::Value>(&record)? {
            Unsealed::Document(serde_json::Value::Object(doc)) => Unsealed::Document(doc),
            Unsealed::Document(_) => {
                error!(slot = %self.slot, "sealed record is not a JSON object");
                Unsealed::Unreadable(UnreadableReason::Format)
            }
            Unsealed::Empty => Unsealed::Empty,
            Unsealed::Unreadable(reason) => Unsealed::Unreadable(reason),
        })
    }

    /// The raw sealed record, if any.
    pub fn sealed_record(&self) -> VaultResult<Option<String>> {
        self.storage.get_item(&self.slot)
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }
}
