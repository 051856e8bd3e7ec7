//! Write-through key-value store.
//!
//! Reads are served from an in-memory copy of the state document. Every
//! mutation is applied to a clone of that copy, the clone is sealed, and
//! only a successful seal replaces the cache, so a completed `set` is
//! durable and a failed one changes nothing.

use crate::error::{StoreError, StoreResult};
use insight_vault::{StateDocument, UnreadableReason, Unsealed, Vault, VaultConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Lifecycle of a [`KvStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// `init()` has not completed; reads return nothing, writes are refused.
    Uninitialized,
    Ready(LoadOrigin),
}

/// Where the cached document came from when the store became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// No sealed record existed; started empty.
    Fresh,
    /// Loaded from an existing sealed record.
    Restored,
    /// A sealed record existed but could not be unsealed; started empty.
    /// The next mutation overwrites the unreadable record.
    Unreadable(UnreadableReason),
}

struct Cache {
    document: StateDocument,
    origin: LoadOrigin,
}

/// Key-value view over a single sealed [`StateDocument`].
///
/// Construct one per vault at startup and share it (e.g. in an `Arc`).
/// Mutations hold the write lock until their seal completes, so the
/// persisted record always matches the latest finished mutation and
/// concurrent writers are applied in lock order. Sealing and unsealing run
/// on the blocking pool.
pub struct KvStore {
    vault: Arc<Vault>,
    cache: RwLock<Option<Cache>>,
}

impl KvStore {
    pub fn new(vault: Vault) -> Self {
        Self {
            vault: Arc::new(vault),
            cache: RwLock::new(None),
        }
    }

    /// Opens the configured vault. The store still needs [`KvStore::init`].
    pub fn from_config(config: &VaultConfig) -> StoreResult<Self> {
        Ok(Self::new(Vault::from_config(config)?))
    }

    /// Unseals the vault into the cache. No-op once ready.
    ///
    /// Fails only when the vault itself is unusable (storage or master key
    /// unavailable). An unreadable record is logged and the store starts
    /// empty with [`LoadOrigin::Unreadable`].
    pub async fn init(&self) -> StoreResult<()> {
        if self.cache.read().await.is_some() {
            return Ok(());
        }

        let mut cache = self.cache.write().await;
        if cache.is_some() {
            return Ok(());
        }

        let vault = Arc::clone(&self.vault);
        let unsealed = tokio::task::spawn_blocking(move || vault.unseal()).await??;
        let (document, origin) = match unsealed {
            Unsealed::Document(doc) => (doc, LoadOrigin::Restored),
            Unsealed::Empty => (StateDocument::new(), LoadOrigin::Fresh),
            Unsealed::Unreadable(reason) => {
                warn!(%reason, "vault unreadable, starting with an empty store");
                (StateDocument::new(), LoadOrigin::Unreadable(reason))
            }
        };

        info!(keys = document.len(), ?origin, "store initialized");
        *cache = Some(Cache { document, origin });
        Ok(())
    }

    pub async fn status(&self) -> StoreStatus {
        match self.cache.read().await.as_ref() {
            Some(cache) => StoreStatus::Ready(cache.origin),
            None => StoreStatus::Uninitialized,
        }
    }

    /// Returns the value under `key` deserialized as `T`.
    ///
    /// `None` when the key is absent, the store is not initialized, or the
    /// stored value does not have the shape of `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "stored value has unexpected shape");
                None
            }
        }
    }

    /// Returns the raw JSON value under `key`.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let cache = self.cache.read().await;
        let Some(cache) = cache.as_ref() else {
            warn!(key, "store not initialized, call init() first");
            return None;
        };
        cache.document.get(key).cloned()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.cache
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.document.contains_key(key))
    }

    /// Keys currently in the cache, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .cache
            .read()
            .await
            .as_ref()
            .map(|c| c.document.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Stores `value` under `key` and seals the whole document.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value)?;
        self.mutate(|doc| {
            doc.insert(key.to_string(), value);
        })
        .await?;
        debug!(key, "set");
        Ok(())
    }

    /// Reads, transforms, and writes back the value under `key` as one
    /// atomic step.
    ///
    /// `f` receives the current value (`None` if absent or not shaped like
    /// `T`) and returns the replacement plus a result for the caller. No
    /// other mutation can interleave between the read and the seal. If `f`
    /// fails nothing is written; if the replacement equals the current value
    /// the document is not re-sealed.
    pub async fn update<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(Option<T>) -> Result<(T, R), E>,
    {
        self.mutate_if_changed(|doc| {
            let current = doc.get(key).cloned();
            let typed = current.clone().and_then(|v| match serde_json::from_value(v) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(key, error = %e, "stored value has unexpected shape, replacing it");
                    None
                }
            });
            let (next, out) = f(typed)?;
            let next = serde_json::to_value(&next).map_err(StoreError::from)?;
            if current.as_ref() == Some(&next) {
                return Ok((out, false));
            }
            doc.insert(key.to_string(), next);
            Ok((out, true))
        })
        .await
    }

    /// Removes `key` and seals the whole document. Removing a missing key
    /// still re-seals.
    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        self.mutate(|doc| {
            doc.remove(key);
        })
        .await?;
        debug!(key, "removed");
        Ok(())
    }

    /// Empties the store and seals the empty document.
    pub async fn clear(&self) -> StoreResult<()> {
        let dropped = self
            .mutate(|doc| {
                let dropped = doc.len();
                doc.clear();
                dropped
            })
            .await?;
        debug!(dropped, "cleared");
        Ok(())
    }

    /// Applies `change` to a copy of the cached document under the write
    /// lock, seals the copy, and only then swaps it into the cache.
    async fn mutate<R>(&self, change: impl FnOnce(&mut StateDocument) -> R) -> StoreResult<R> {
        self.mutate_if_changed(|doc| Ok((change(doc), true))).await
    }

    /// Like [`KvStore::mutate`], but `change` may fail (nothing is written)
    /// or report that it left the document as it was (nothing is sealed).
    async fn mutate_if_changed<R, E>(
        &self,
        change: impl FnOnce(&mut StateDocument) -> Result<(R, bool), E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.cache.write().await;
        let cache = guard.as_mut().ok_or(StoreError::NotInitialized)?;

        let mut candidate = cache.document.clone();
        let (out, changed) = change(&mut candidate)?;
        if changed {
            cache.document = self.seal(candidate).await?;
        }
        Ok(out)
    }

    async fn seal(&self, document: StateDocument) -> StoreResult<StateDocument> {
        let vault = Arc::clone(&self.vault);
        let sealed =
            tokio::task::spawn_blocking(move || vault.seal(&document).map(|()| document)).await??;
        Ok(sealed)
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }
}
