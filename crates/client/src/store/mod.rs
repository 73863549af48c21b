//! Cached, persisted state per entity family.
//!
//! Every store follows the same action protocol:
//!
//! 1. fail fast with [`ClientError::Unauthenticated`] when there is no
//!    session token (no network call is made)
//! 2. set `loading`, clear `error`
//! 3. call the API
//! 4. on success patch the cached collection, on failure record the message
//!    and return the error
//! 5. clear `loading`
//!
//! State is saved under the store's key after every change. Snapshot write
//! failures are logged and never fail the action.

mod auth;
mod categories;
mod periods;
mod products;
mod records;

pub use auth::{AuthState, AuthStore};
pub use categories::{CategoriesState, CategoryStore};
pub use periods::{PeriodStore, PeriodsState};
pub use products::{ProductStore, ProductsState};
pub use records::{RecordStore, RecordsState};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::storage::{SnapshotStorage, StorageError};

/// Transient flags shared by every store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatus {
    /// An action is in flight. Never persisted.
    #[serde(skip)]
    pub loading: bool,
    /// Message of the last failed action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// State that can live in a [`StoreCell`].
pub trait StoreState: Default + Serialize + DeserializeOwned + Send + Sync {
    fn status(&self) -> &ActionStatus;
    fn status_mut(&mut self) -> &mut ActionStatus;
}

/// One store's state plus its snapshot slot.
pub(crate) struct StoreCell<S> {
    key: &'static str,
    state: RwLock<S>,
    storage: Arc<dyn SnapshotStorage>,
    /// Bumped on every change, under the state write lock.
    generation: AtomicU64,
    /// Generation of the newest snapshot written so far.
    saved: Mutex<u64>,
}

impl<S: StoreState> StoreCell<S> {
    pub(crate) fn new(key: &'static str, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            key,
            state: RwLock::new(S::default()),
            storage,
            generation: AtomicU64::new(0),
            saved: Mutex::new(0),
        }
    }

    /// Replace the in-memory state with the persisted snapshot, if any.
    ///
    /// A snapshot that is not valid JSON, or does not fit the state shape,
    /// is discarded with a warning. Only I/O failures are returned.
    pub(crate) async fn rehydrate(&self) -> Result<(), StorageError> {
        let value = match self.storage.load(self.key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(store = self.key, "no snapshot");
                return Ok(());
            }
            Err(StorageError::Json(e)) => {
                warn!(store = self.key, error = %e, "discarding corrupt snapshot");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_value::<S>(value) {
            Ok(mut restored) => {
                restored.status_mut().loading = false;
                *self.state.write().await = restored;
                debug!(store = self.key, "rehydrated");
            }
            Err(e) => {
                warn!(store = self.key, error = %e, "discarding unreadable snapshot");
            }
        }
        Ok(())
    }

    /// Read from the current state.
    pub(crate) async fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Mutate the state and persist the result.
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let (result, generation, snapshot) = {
            let mut state = self.state.write().await;
            let result = f(&mut *state);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (result, generation, serde_json::to_value(&*state))
        };
        self.persist(generation, snapshot).await;
        result
    }

    async fn persist(&self, generation: u64, snapshot: Result<Value, serde_json::Error>) {
        let mut saved = self.saved.lock().await;
        if generation <= *saved {
            // A newer snapshot is already on disk
            return;
        }
        let outcome = match snapshot {
            Ok(value) => self.storage.save(self.key, &value).await,
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(()) => *saved = generation,
            Err(e) => warn!(store = self.key, error = %e, "failed to persist snapshot"),
        }
    }

    /// Write the current state regardless of pending changes.
    pub(crate) async fn flush(&self) -> Result<(), StorageError> {
        let _saved = self.saved.lock().await;
        let value = serde_json::to_value(&*self.state.read().await)?;
        self.storage.save(self.key, &value).await
    }

    /// Reset to the empty state.
    pub(crate) async fn clear(&self) {
        self.update(|state| *state = S::default()).await;
    }

    /// Require a session token, recording the failure if there is none.
    pub(crate) async fn authorize(&self, auth: &AuthStore) -> Result<SecretString, ClientError> {
        if let Some(token) = auth.token().await {
            return Ok(token);
        }
        self.reject(ClientError::Unauthenticated).await
    }

    /// Record a failure that happened before any network call.
    pub(crate) async fn reject<T>(&self, error: ClientError) -> Result<T, ClientError> {
        let message = error.to_string();
        self.update(|state| state.status_mut().error = Some(message))
            .await;
        Err(error)
    }

    /// Mark an action as started.
    pub(crate) async fn begin(&self) {
        self.update(|state| {
            let status = state.status_mut();
            status.loading = true;
            status.error = None;
        })
        .await;
    }

    /// Finish an action: apply the result on success, record it on failure.
    pub(crate) async fn settle<T, E>(
        &self,
        action: &'static str,
        result: Result<T, E>,
        apply: impl FnOnce(&mut S, &T),
    ) -> Result<T, ClientError>
    where
        E: Into<ClientError>,
    {
        let result = result.map_err(Into::into);
        self.update(|state| {
            state.status_mut().loading = false;
            match &result {
                Ok(value) => apply(state, value),
                Err(e) => state.status_mut().error = Some(e.to_string()),
            }
        })
        .await;

        match &result {
            Ok(_) => debug!(store = self.key, action, "action succeeded"),
            Err(e) => warn!(store = self.key, action, error = %e, "action failed"),
        }
        result
    }
}

/// Insert `item` at the head of `items`, replacing any entry with the same
/// key. Returns `true` if the item was not cached before.
pub(crate) fn upsert_front<T, K: PartialEq>(
    items: &mut Vec<T>,
    item: T,
    key: impl Fn(&T) -> K,
) -> bool {
    let id = key(&item);
    let before = items.len();
    items.retain(|existing| key(existing) != id);
    let is_new = items.len() == before;
    items.insert(0, item);
    is_new
}

/// Replace the cached entry with the same key in place. Returns `false` if
/// nothing matched.
pub(crate) fn replace_by<T, K: PartialEq>(items: &mut [T], item: T, key: impl Fn(&T) -> K) -> bool {
    let id = key(&item);
    match items.iter_mut().find(|existing| key(existing) == id) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}

/// Remove every entry with the given key. Returns `true` if any was removed.
pub(crate) fn remove_by<T, K: PartialEq>(items: &mut Vec<T>, id: &K, key: impl Fn(&T) -> K) -> bool {
    let before = items.len();
    items.retain(|existing| key(existing) != *id);
    items.len() != before
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        #[serde(default)]
        status: ActionStatus,
    }

    impl StoreState for Counter {
        fn status(&self) -> &ActionStatus {
            &self.status
        }
        fn status_mut(&mut self) -> &mut ActionStatus {
            &mut self.status
        }
    }

    #[tokio::test]
    async fn test_update_persists_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let cell: StoreCell<Counter> = StoreCell::new("counter", storage.clone());
        cell.update(|s| s.value = 3).await;

        let saved = storage.load("counter").await.unwrap().unwrap();
        assert_eq!(saved["value"], 3);
        assert!(saved.get("status").unwrap().get("loading").is_none());
    }

    #[tokio::test]
    async fn test_rehydrate_never_restores_loading() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save(
                "counter",
                &json!({"value": 7, "status": {"loading": true, "error": "boom"}}),
            )
            .await
            .unwrap();

        let cell: StoreCell<Counter> = StoreCell::new("counter", storage);
        cell.rehydrate().await.unwrap();
        cell.read(|s| {
            assert_eq!(s.value, 7);
            assert!(!s.status.loading);
            assert_eq!(s.status.error.as_deref(), Some("boom"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_rehydrate_discards_bad_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save("counter", &json!({"value": "not a number"}))
            .await
            .unwrap();
        let cell: StoreCell<Counter> = StoreCell::new("counter", storage);
        cell.rehydrate().await.unwrap();
        assert_eq!(cell.read(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_rehydrate_discards_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("counter.json"), b"{\"value\": [").unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));

        let cell: StoreCell<Counter> = StoreCell::new("counter", storage.clone());
        cell.rehydrate().await.unwrap();
        assert_eq!(cell.read(|s| s.value).await, 0);

        // The next change replaces the corrupt file.
        cell.update(|s| s.value = 2).await;
        assert_eq!(storage.load("counter").await.unwrap().unwrap()["value"], 2);
    }

    #[tokio::test]
    async fn test_settle_records_error_and_clears_loading() {
        let cell: StoreCell<Counter> = StoreCell::new("counter", Arc::new(MemoryStorage::new()));
        cell.begin().await;
        assert!(cell.read(|s| s.status.loading).await);

        let result: Result<u32, ClientError> = cell
            .settle("bump", Err(ClientError::Unauthenticated), |s, v: &u32| s.value = *v)
            .await;
        assert!(result.is_err());
        cell.read(|s| {
            assert!(!s.status.loading);
            assert_eq!(s.status.error.as_deref(), Some("Not authenticated"));
        })
        .await;

        let result = cell
            .settle("bump", Ok::<_, ClientError>(5), |s, v| s.value = *v)
            .await;
        assert_eq!(result.unwrap(), 5);
        assert_eq!(cell.read(|s| s.value).await, 5);
    }

    #[test]
    fn test_collection_helpers() {
        let mut items = vec![(1, "a"), (2, "b")];
        assert!(upsert_front(&mut items, (3, "c"), |i| i.0));
        assert!(!upsert_front(&mut items, (2, "B"), |i| i.0));
        assert_eq!(items, vec![(2, "B"), (3, "c"), (1, "a")]);

        assert!(replace_by(&mut items, (1, "A"), |i| i.0));
        assert!(!replace_by(&mut items, (9, "z"), |i| i.0));
        assert_eq!(items[2], (1, "A"));

        assert!(remove_by(&mut items, &3, |i| i.0));
        assert!(!remove_by(&mut items, &3, |i| i.0));
        assert_eq!(items.len(), 2);
    }
}
