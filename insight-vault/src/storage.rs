//! Named-slot persistent storage.
//!
//! The vault only ever needs a handful of string slots (the master key and
//! the sealed record), the same shape as browser `localStorage`. Backends
//! implement [`SlotStorage`]; the vault holds them as `Arc<dyn SlotStorage>`.

use crate::error::{VaultError, VaultResult};
use duckdb::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// String key-value storage addressed by slot name.
pub trait SlotStorage: Send + Sync {
    /// Reads a slot, `None` if it was never written or was removed.
    fn get_item(&self, name: &str) -> VaultResult<Option<String>>;

    /// Writes a slot, replacing any previous value in one step.
    fn set_item(&self, name: &str, value: &str) -> VaultResult<()>;

    /// Removes a slot. Removing a missing slot is not an error.
    fn remove_item(&self, name: &str) -> VaultResult<()>;
}

// ============================================================================
// MemorySlots
// ============================================================================

/// Process-local slot storage. Contents vanish when the last clone drops.
#[derive(Clone, Default)]
pub struct MemorySlots {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlots {
    fn get_item(&self, name: &str) -> VaultResult<Option<String>> {
        let slots = self.slots.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(slots.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> VaultResult<()> {
        let mut slots = self.slots.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        slots.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> VaultResult<()> {
        let mut slots = self.slots.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        slots.remove(name);
        Ok(())
    }
}

// ============================================================================
// DuckDbSlots
// ============================================================================

/// Slot storage in a single DuckDB table.
///
/// Each write is one `INSERT OR REPLACE`, so a slot is either the old value
/// or the new value after a crash, never a mix.
#[derive(Clone)]
pub struct DuckDbSlots {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbSlots {
    /// Opens (or creates) a slot database at `path`, capping DuckDB's
    /// memory and worker threads.
    pub fn open(path: &Path, memory_limit: &str, threads: u32) -> VaultResult<Self> {
        let conn = open_discarding_stale_wal(path)?;
        conn.execute_batch(&format!(
            "SET memory_limit = '{}'; SET threads = {threads};",
            memory_limit.replace('\'', "")
        ))?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory slot database.
    pub fn open_in_memory() -> VaultResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> VaultResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS slots (
                name VARCHAR PRIMARY KEY,
                value VARCHAR NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl SlotStorage for DuckDbSlots {
    fn get_item(&self, name: &str) -> VaultResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let result = conn.query_row(
            "SELECT value FROM slots WHERE name = ?",
            params![name],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, name: &str, value: &str) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO slots (name, value) VALUES (?, ?)",
            params![name, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, name: &str) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute("DELETE FROM slots WHERE name = ?", params![name])?;
        Ok(())
    }
}

/// Opens `path`, retrying once without its `<path>.wal` if the first open
/// fails and such a file exists. Every slot write is a single statement, so
/// a WAL left by a crash holds at most the one write that was in flight.
fn open_discarding_stale_wal(path: &Path) -> VaultResult<Connection> {
    let err = match Connection::open(path) {
        Ok(conn) => return Ok(conn),
        Err(err) => err,
    };

    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    let wal = PathBuf::from(wal);
    if !wal.exists() {
        return Err(err.into());
    }

    warn!(wal = %wal.display(), error = %err, "slot database failed to open, discarding WAL");
    std::fs::remove_file(&wal)
        .map_err(|e| VaultError::Storage(format!("cannot remove {}: {e}", wal.display())))?;
    Ok(Connection::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn SlotStorage) {
        assert_eq!(storage.get_item("a").unwrap(), None);
        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("2"));
        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
        storage.remove_item("a").unwrap();
    }

    #[test]
    fn memory_slots_basic_ops() {
        exercise(&MemorySlots::new());
    }

    #[test]
    fn duckdb_slots_basic_ops() {
        exercise(&DuckDbSlots::open_in_memory().unwrap());
    }

    #[test]
    fn memory_slots_clones_share_state() {
        let a = MemorySlots::new();
        let b = a.clone();
        a.set_item("k", "v").unwrap();
        assert_eq!(b.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn duckdb_slots_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.duckdb");
        {
            let slots = DuckDbSlots::open(&path, "64MB", 1).unwrap();
            slots.set_item("k", "persisted").unwrap();
        }
        let slots = DuckDbSlots::open(&path, "64MB", 1).unwrap();
        assert_eq!(slots.get_item("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn duckdb_slots_open_past_garbage_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.duckdb");
        {
            let slots = DuckDbSlots::open(&path, "64MB", 1).unwrap();
            slots.set_item("k", "kept").unwrap();
        }
        std::fs::write(dir.path().join("slots.duckdb.wal"), b"not a wal").unwrap();

        let slots = DuckDbSlots::open(&path, "64MB", 1).unwrap();
        assert_eq!(slots.get_item("k").unwrap().as_deref(), Some("kept"));
    }
}
