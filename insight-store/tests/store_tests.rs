use insight_store::{KvStore, LoadOrigin, StoreError, StoreStatus};
use insight_vault::{
    DEFAULT_MASTER_KEY_SLOT, DEFAULT_VAULT_SLOT, MemorySlots, SlotStorage, UnreadableReason, Vault,
    VaultConfig, VaultError, VaultResult,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("insight_store=debug,insight_vault=debug"))
        .with_test_writer()
        .try_init();
}

fn store_over(storage: Arc<dyn SlotStorage>) -> KvStore {
    KvStore::new(Vault::new(storage, DEFAULT_MASTER_KEY_SLOT, DEFAULT_VAULT_SLOT))
}

async fn ready_store(slots: &MemorySlots) -> KvStore {
    let store = store_over(Arc::new(slots.clone()));
    store.init().await.unwrap();
    store
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    id: String,
    email: String,
}

/// Reads always work; writes fail while `fail_writes` is set.
struct FlakyStorage {
    inner: MemorySlots,
    fail_writes: AtomicBool,
}

impl SlotStorage for FlakyStorage {
    fn get_item(&self, name: &str) -> VaultResult<Option<String>> {
        self.inner.get_item(name)
    }
    fn set_item(&self, name: &str, value: &str) -> VaultResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VaultError::Storage("quota exceeded".into()));
        }
        self.inner.set_item(name, value)
    }
    fn remove_item(&self, name: &str) -> VaultResult<()> {
        self.inner.remove_item(name)
    }
}

struct DisabledStorage;

impl SlotStorage for DisabledStorage {
    fn get_item(&self, _name: &str) -> VaultResult<Option<String>> {
        Err(VaultError::Storage("storage disabled".into()))
    }
    fn set_item(&self, _name: &str, _value: &str) -> VaultResult<()> {
        Err(VaultError::Storage("storage disabled".into()))
    }
    fn remove_item(&self, _name: &str) -> VaultResult<()> {
        Err(VaultError::Storage("storage disabled".into()))
    }
}

// ── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn starts_uninitialized() {
    let store = store_over(Arc::new(MemorySlots::new()));
    assert_eq!(store.status().await, StoreStatus::Uninitialized);
}

#[tokio::test]
async fn get_before_init_returns_none() {
    init_tracing();
    let slots = MemorySlots::new();
    ready_store(&slots).await.set("k", &1).await.unwrap();

    let store = store_over(Arc::new(slots));
    assert_eq!(store.get::<i64>("k").await, None);
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn mutations_before_init_are_refused_and_do_not_touch_storage() {
    let slots = MemorySlots::new();
    ready_store(&slots).await.set("k", "kept").await.unwrap();
    let before = slots.get_item(DEFAULT_VAULT_SLOT).unwrap();

    let store = store_over(Arc::new(slots.clone()));
    assert!(matches!(store.set("k", "lost").await, Err(StoreError::NotInitialized)));
    assert!(matches!(store.remove("k").await, Err(StoreError::NotInitialized)));
    assert!(matches!(store.clear().await, Err(StoreError::NotInitialized)));
    assert_eq!(slots.get_item(DEFAULT_VAULT_SLOT).unwrap(), before);
}

#[tokio::test]
async fn init_on_empty_storage_is_fresh() {
    let store = ready_store(&MemorySlots::new()).await;
    assert_eq!(store.status().await, StoreStatus::Ready(LoadOrigin::Fresh));
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn init_twice_is_idempotent() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("a", &json!({"x": 1})).await.unwrap();

    // Storage changes behind the store's back are not picked up again.
    slots.remove_item(DEFAULT_VAULT_SLOT).unwrap();
    store.init().await.unwrap();

    assert_eq!(store.get_value("a").await, Some(json!({"x": 1})));
    assert_eq!(store.status().await, StoreStatus::Ready(LoadOrigin::Fresh));
}

#[tokio::test]
async fn init_with_disabled_storage_fails() {
    let store = store_over(Arc::new(DisabledStorage));
    let err = store.init().await.unwrap_err();
    assert!(matches!(err, StoreError::Vault(_)));
    assert_eq!(store.status().await, StoreStatus::Uninitialized);
}

// ── Reads and Writes ────────────────────────────────────────────

#[tokio::test]
async fn users_scenario() {
    let store = ready_store(&MemorySlots::new()).await;
    let users = vec![Account {
        id: "u1".into(),
        email: "a@b.edu".into(),
    }];

    store.set("users", &users).await.unwrap();
    store.set("results", &Vec::<Account>::new()).await.unwrap();
    assert_eq!(store.get::<Vec<Account>>("users").await, Some(users));

    store.remove("users").await.unwrap();
    assert_eq!(store.get::<Vec<Account>>("users").await, None);
    assert!(store.contains_key("results").await);

    store.clear().await.unwrap();
    assert_eq!(store.get::<Vec<Account>>("users").await, None);
    assert_eq!(store.get::<Vec<Account>>("results").await, None);
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn clear_forgets_every_key() {
    let store = ready_store(&MemorySlots::new()).await;
    let keys = ["users", "results", "current_session", "misc"];
    for (i, key) in keys.iter().enumerate() {
        store.set(key, &i).await.unwrap();
    }

    store.clear().await.unwrap();
    for key in keys {
        assert_eq!(store.get_value(key).await, None);
    }
}

#[tokio::test]
async fn get_with_wrong_shape_returns_none() {
    let store = ready_store(&MemorySlots::new()).await;
    store.set("users", "not an array").await.unwrap();

    assert_eq!(store.get::<Vec<Account>>("users").await, None);
    assert_eq!(store.get::<String>("users").await.as_deref(), Some("not an array"));
}

#[tokio::test]
async fn falsy_values_are_preserved() {
    let store = ready_store(&MemorySlots::new()).await;
    store.set("zero", &0).await.unwrap();
    store.set("empty", "").await.unwrap();
    store.set("no", &false).await.unwrap();

    assert_eq!(store.get::<i32>("zero").await, Some(0));
    assert_eq!(store.get::<String>("empty").await.as_deref(), Some(""));
    assert_eq!(store.get::<bool>("no").await, Some(false));
}

#[tokio::test]
async fn keys_are_sorted() {
    let store = ready_store(&MemorySlots::new()).await;
    for key in ["results", "current_session", "users"] {
        store.set(key, &1).await.unwrap();
    }
    assert_eq!(store.keys().await, vec!["current_session", "results", "users"]);
}

// ── Durability ──────────────────────────────────────────────────

#[tokio::test]
async fn writes_are_visible_to_a_fresh_process() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("k", &json!({"v": [1, 2, 3]})).await.unwrap();

    let restarted = ready_store(&slots).await;
    assert_eq!(restarted.status().await, StoreStatus::Ready(LoadOrigin::Restored));
    assert_eq!(restarted.get_value("k").await, Some(json!({"v": [1, 2, 3]})));
}

#[tokio::test]
async fn remove_and_clear_are_durable() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("a", &1).await.unwrap();
    store.set("b", &2).await.unwrap();
    store.remove("a").await.unwrap();

    let restarted = ready_store(&slots).await;
    assert_eq!(restarted.keys().await, vec!["b"]);

    restarted.clear().await.unwrap();
    assert!(ready_store(&slots).await.keys().await.is_empty());
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = VaultConfig::at_path(dir.path().join("insight.duckdb"));

    {
        let store = KvStore::from_config(&config).unwrap();
        store.init().await.unwrap();
        store.set("current_session", &json!({"id": "u1"})).await.unwrap();
    }

    let store = KvStore::from_config(&config).unwrap();
    store.init().await.unwrap();
    assert_eq!(
        store.get_value("current_session").await,
        Some(json!({"id": "u1"}))
    );
}

#[tokio::test]
async fn failed_seal_leaves_cache_unchanged() {
    let flaky = Arc::new(FlakyStorage {
        inner: MemorySlots::new(),
        fail_writes: AtomicBool::new(false),
    });
    let store = store_over(flaky.clone());
    store.init().await.unwrap();
    store.set("a", &1).await.unwrap();

    flaky.fail_writes.store(true, Ordering::SeqCst);
    assert!(store.set("a", &2).await.is_err());
    assert!(store.set("b", &3).await.is_err());
    assert!(store.remove("a").await.is_err());
    assert!(store.clear().await.is_err());

    assert_eq!(store.get::<i32>("a").await, Some(1));
    assert_eq!(store.get::<i32>("b").await, None);
}

// ── Corruption ──────────────────────────────────────────────────

#[tokio::test]
async fn truncated_record_yields_empty_store() {
    init_tracing();
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("users", &json!([{"id": "u1"}])).await.unwrap();

    let record = slots.get_item(DEFAULT_VAULT_SLOT).unwrap().unwrap();
    slots
        .set_item(DEFAULT_VAULT_SLOT, &record[..record.len() - 1])
        .unwrap();

    let reloaded = ready_store(&slots).await;
    assert_eq!(
        reloaded.status().await,
        StoreStatus::Ready(LoadOrigin::Unreadable(UnreadableReason::Encoding))
    );
    assert_eq!(reloaded.get_value("users").await, None);
}

#[tokio::test]
async fn record_from_another_key_yields_empty_store() {
    let slots = MemorySlots::new();
    ready_store(&slots).await.set("k", &1).await.unwrap();
    slots.remove_item(DEFAULT_MASTER_KEY_SLOT).unwrap();

    let reloaded = ready_store(&slots).await;
    assert_eq!(
        reloaded.status().await,
        StoreStatus::Ready(LoadOrigin::Unreadable(UnreadableReason::Authentication))
    );
    assert_eq!(reloaded.get_value("k").await, None);

    // The next write replaces the unreadable record under the new key.
    reloaded.set("k", &2).await.unwrap();
    assert_eq!(ready_store(&slots).await.get::<i32>("k").await, Some(2));
}

// ── Concurrency ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_to_different_keys_are_all_persisted() {
    let slots = MemorySlots::new();
    let store = Arc::new(ready_store(&slots).await);

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.set(&format!("key-{i:02}"), &i).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let restarted = ready_store(&slots).await;
    assert_eq!(restarted.keys().await.len(), 32);
    for i in 0..32 {
        assert_eq!(restarted.get::<i32>(&format!("key-{i:02}")).await, Some(i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_init_loads_once() {
    let slots = MemorySlots::new();
    ready_store(&slots).await.set("k", "v").await.unwrap();
    let store = Arc::new(store_over(Arc::new(slots)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.init().await.unwrap() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.status().await, StoreStatus::Ready(LoadOrigin::Restored));
    assert_eq!(store.get::<String>("k").await.as_deref(), Some("v"));
}

// ── Atomic update ───────────────────────────────────────────────

#[tokio::test]
async fn update_before_init_is_refused() {
    let store = store_over(Arc::new(MemorySlots::new()));
    let result: Result<(), StoreError> = store
        .update("n", |n: Option<i64>| Ok((n.unwrap_or(0) + 1, ())))
        .await;
    assert!(matches!(result, Err(StoreError::NotInitialized)));
}

#[tokio::test]
async fn update_sees_current_value_and_returns_result() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("names", &json!(["a"])).await.unwrap();

    let len = store
        .update("names", |names: Option<Vec<String>>| {
            let mut names = names.unwrap_or_default();
            names.push("b".into());
            let len = names.len();
            Ok::<_, StoreError>((names, len))
        })
        .await
        .unwrap();

    assert_eq!(len, 2);
    assert_eq!(
        ready_store(&slots).await.get_value("names").await,
        Some(json!(["a", "b"]))
    );
}

#[derive(Debug)]
enum Rejected {
    Store(StoreError),
    Duplicate,
}

impl From<StoreError> for Rejected {
    fn from(e: StoreError) -> Self {
        Rejected::Store(e)
    }
}

#[tokio::test]
async fn failed_update_writes_nothing() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("names", &json!(["a"])).await.unwrap();
    let before = slots.get_item(DEFAULT_VAULT_SLOT).unwrap();

    let result = store
        .update("names", |names: Option<Vec<String>>| {
            let names = names.unwrap_or_default();
            if names.iter().any(|n| n == "a") {
                return Err(Rejected::Duplicate);
            }
            Ok((names, ()))
        })
        .await;

    assert!(matches!(result, Err(Rejected::Duplicate)));
    assert_eq!(store.get_value("names").await, Some(json!(["a"])));
    assert_eq!(slots.get_item(DEFAULT_VAULT_SLOT).unwrap(), before);
}

#[tokio::test]
async fn unchanged_update_does_not_reseal() {
    let slots = MemorySlots::new();
    let store = ready_store(&slots).await;
    store.set("n", &5).await.unwrap();
    let before = slots.get_item(DEFAULT_VAULT_SLOT).unwrap();

    store
        .update("n", |n: Option<i64>| Ok::<_, StoreError>((n.unwrap_or(0), ())))
        .await
        .unwrap();

    // A fresh nonce would have changed the record.
    assert_eq!(slots.get_item(DEFAULT_VAULT_SLOT).unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_to_one_key_are_not_lost() {
    let slots = MemorySlots::new();
    let store = Arc::new(ready_store(&slots).await);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update("log", |log: Option<Vec<i32>>| {
                        let mut log = log.unwrap_or_default();
                        log.push(i);
                        Ok::<_, StoreError>((log, ()))
                    })
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let mut log: Vec<i32> = ready_store(&slots).await.get("log").await.unwrap();
    log.sort();
    assert_eq!(log, (0..32).collect::<Vec<_>>());
}
