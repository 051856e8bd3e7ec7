//! Key-value store for the SDG-Insight application state.
//!
//! A thin mapping interface (`get` / `set` / `remove` / `clear`) over the
//! single sealed state document kept by [`insight_vault::Vault`]. The
//! decrypted document is cached after `init()`; every mutation re-seals it.

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{KvStore, LoadOrigin, StoreStatus};
