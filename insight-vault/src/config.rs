//! Vault configuration.

use crate::error::VaultResult;
use crate::storage::{DuckDbSlots, SlotStorage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Slot holding the base64 master key.
pub const DEFAULT_MASTER_KEY_SLOT: &str = "SDG_VAULT_MASTER";

/// Slot holding the sealed state document.
pub const DEFAULT_VAULT_SLOT: &str = "system_core.bin";

/// Configuration for opening a vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// DuckDB file backing the slots. `None` keeps everything in memory.
    pub storage_path: Option<PathBuf>,

    pub master_key_slot: String,

    pub vault_slot: String,

    /// DuckDB `memory_limit` pragma (e.g. "64MB").
    pub memory_limit: String,

    /// DuckDB worker threads.
    pub threads: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            master_key_slot: DEFAULT_MASTER_KEY_SLOT.to_string(),
            vault_slot: DEFAULT_VAULT_SLOT.to_string(),
            memory_limit: "64MB".to_string(),
            threads: 1,
        }
    }
}

impl VaultConfig {
    /// Config for a file-backed vault at `path` with default slot names.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Opens the slot storage this config describes.
    pub fn open_storage(&self) -> VaultResult<Arc<dyn SlotStorage>> {
        let slots = match &self.storage_path {
            Some(path) => DuckDbSlots::open(path, &self.memory_limit, self.threads)?,
            None => DuckDbSlots::open_in_memory()?,
        };
        Ok(Arc::new(slots))
    }
}
