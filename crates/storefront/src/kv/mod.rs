//! Key-value persistence for marketplace collections.
//!
//! Every collection is a JSON document stored under a fixed key (see
//! [`keys`]). [`JsonStore`] is the only way in or out:
//!
//! - reads never fail; a missing or malformed document reads as empty and the
//!   corruption is logged
//! - every write bumps a per-key revision and broadcasts a [`StoreChange`]
//! - multi-key writes go through a [`Batch`] so subscribers never observe half
//!   of a logical operation
//!
//! Commits are serialised by one async lock per store. Readers never take it.
//! A read-modify-write opens its batch with [`JsonStore::write`], which also
//! holds the store's writer gate, so overlapping writers queue instead of
//! losing a revision race. Revisions are process-local and start at zero on
//! every open.

pub mod backend;
pub mod keys;

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, broadcast};

pub use backend::{Backend, FileBackend, MemoryBackend, Op};

/// Capacity of the change channel before slow subscribers start lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while writing to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not read or write a document.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An optimistic write lost a race with another writer.
    #[error("stale write to {key}: expected revision {expected}, found {actual}")]
    StaleWrite {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// The key contains characters outside `[a-z0-9_]`.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Notification that a key was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// The key that changed.
    pub key: String,
    /// Revision of the key after the change.
    pub revision: u64,
}

/// JSON document store with change notification.
///
/// Cheap to clone; clones share the backend, revisions and change channel.
#[derive(Clone)]
pub struct JsonStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Backend,
    /// Per-key revisions. Holding this lock is what makes a caller the writer.
    revisions: Mutex<HashMap<String, u64>>,
    /// Held by a [`JsonStore::write`] batch from before its reads until commit.
    writer: Mutex<()>,
    changes: broadcast::Sender<StoreChange>,
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}

impl JsonStore {
    /// Create a store held entirely in memory.
    #[must_use]
    pub fn memory() -> Self {
        Self::with_backend(Backend::Memory(MemoryBackend::default()))
    }

    /// Open a file-backed store rooted at `dir`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let backend = FileBackend::open(dir).await?;
        tracing::debug!(root = %backend.root().display(), "opened file store");
        Ok(Self::with_backend(Backend::File(backend)))
    }

    fn with_backend(backend: Backend) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                revisions: Mutex::new(HashMap::new()),
                writer: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Load a sequence stored under `key`.
    ///
    /// Missing keys and malformed documents both read as an empty sequence.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.load_value::<Vec<T>>(key).await.unwrap_or_default()
    }

    /// Load a single value stored under `key`.
    ///
    /// Missing keys and malformed documents both read as `None`.
    pub async fn load_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !keys::is_valid(key) {
            tracing::warn!(key, "refusing to read invalid storage key");
            return None;
        }

        let raw = match self.inner.backend.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read stored value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding malformed stored value");
                None
            }
        }
    }

    /// Overwrite `key` with `items`.
    ///
    /// Returns the key's new revision.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the key is invalid, serialization fails or the
    /// backend write fails.
    pub async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<u64, StoreError> {
        let mut batch = self.batch();
        batch.put(key, items)?;
        Self::single_revision(batch.commit().await?)
    }

    /// Overwrite `key` with a single value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the key is invalid, serialization fails or the
    /// backend write fails.
    pub async fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<u64, StoreError> {
        let mut batch = self.batch();
        batch.put_value(key, value)?;
        Self::single_revision(batch.commit().await?)
    }

    /// Overwrite `key` only if its revision is still `expected`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StaleWrite` if another writer advanced the key
    /// since `expected` was read, plus the errors of [`save`](Self::save).
    pub async fn save_if<T: Serialize>(
        &self,
        key: &str,
        expected: u64,
        items: &[T],
    ) -> Result<u64, StoreError> {
        let mut batch = self.batch();
        batch.expect_revision(key, expected);
        batch.put(key, items)?;
        Self::single_revision(batch.commit().await?)
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the key is invalid or the backend fails.
    pub async fn remove(&self, key: &str) -> Result<u64, StoreError> {
        let mut batch = self.batch();
        batch.remove(key)?;
        Self::single_revision(batch.commit().await?)
    }

    /// Current revision of `key`; zero if it was never written in this process.
    pub async fn revision(&self, key: &str) -> u64 {
        self.inner
            .revisions
            .lock()
            .await
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Start a multi-key write.
    #[must_use]
    pub fn batch(&self) -> Batch<'_> {
        Batch {
            store: self,
            ops: Vec::new(),
            expected: Vec::new(),
            _gate: None,
        }
    }

    /// Start a read-modify-write.
    ///
    /// Waits for the writer gate and keeps it until the returned batch is
    /// committed or dropped. Reads made after this call see every earlier
    /// `write` batch, and no other one commits in between. A task must not
    /// open a second `write` batch while holding one.
    pub async fn write(&self) -> Batch<'_> {
        let gate = self.inner.writer.lock().await;
        Batch {
            store: self,
            ops: Vec::new(),
            expected: Vec::new(),
            _gate: Some(gate),
        }
    }

    /// Subscribe to changes on every key.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.inner.changes.subscribe(),
            keys: None,
        }
    }

    /// Subscribe to changes on the given keys only.
    #[must_use]
    pub fn subscribe_keys(&self, keys: &[&str]) -> Subscription {
        Subscription {
            rx: self.inner.changes.subscribe(),
            keys: Some(keys.iter().map(|k| (*k).to_owned()).collect()),
        }
    }

    fn single_revision(changes: Vec<StoreChange>) -> Result<u64, StoreError> {
        Ok(changes.last().map_or(0, |c| c.revision))
    }
}

/// A staged multi-key write.
///
/// Nothing touches the backend until [`commit`](Self::commit). Staging the
/// same key twice keeps only the last operation.
#[must_use = "a batch does nothing until committed"]
pub struct Batch<'a> {
    store: &'a JsonStore,
    ops: Vec<Op>,
    expected: Vec<(String, u64)>,
    _gate: Option<MutexGuard<'a, ()>>,
}

impl Batch<'_> {
    /// Stage a sequence write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the key is invalid or serialization fails.
    pub fn put<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<&mut Self, StoreError> {
        self.put_value(key, items)
    }

    /// Stage a single-value write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the key is invalid or serialization fails.
    pub fn put_value<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<&mut Self, StoreError> {
        let value = serde_json::to_string(value)?;
        self.stage(Op::Put {
            key: checked_key(key)?,
            value,
        });
        Ok(self)
    }

    /// Stage a delete.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if the key is invalid.
    pub fn remove(&mut self, key: &str) -> Result<&mut Self, StoreError> {
        self.stage(Op::Remove {
            key: checked_key(key)?,
        });
        Ok(self)
    }

    /// Require `key` to still be at `revision` when the batch commits.
    pub fn expect_revision(&mut self, key: &str, revision: u64) -> &mut Self {
        self.expected.push((key.to_owned(), revision));
        self
    }

    /// Whether anything has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn stage(&mut self, op: Op) {
        self.ops.retain(|staged| staged.key() != op.key());
        self.ops.push(op);
    }

    /// Apply every staged operation, then notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StaleWrite` if a revision expectation fails (in
    /// which case nothing is written), or `StoreError::Io` if the backend
    /// fails.
    pub async fn commit(self) -> Result<Vec<StoreChange>, StoreError> {
        if self.ops.is_empty() {
            return Ok(Vec::new());
        }

        let inner = &self.store.inner;
        let mut revisions = inner.revisions.lock().await;

        for (key, expected) in &self.expected {
            let actual = revisions.get(key).copied().unwrap_or(0);
            if actual != *expected {
                return Err(StoreError::StaleWrite {
                    key: key.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }

        inner.backend.apply(&self.ops).await?;

        let changes: Vec<StoreChange> = self
            .ops
            .iter()
            .map(|op| {
                let revision = revisions.entry(op.key().to_owned()).or_insert(0);
                *revision += 1;
                StoreChange {
                    key: op.key().to_owned(),
                    revision: *revision,
                }
            })
            .collect();

        // Sent under the lock so subscribers see revisions in order.
        for change in &changes {
            // No receivers is fine.
            let _ = inner.changes.send(change.clone());
        }
        drop(revisions);

        tracing::debug!(keys = changes.len(), "committed store batch");
        Ok(changes)
    }
}

fn checked_key(key: &str) -> Result<String, StoreError> {
    if keys::is_valid(key) {
        Ok(key.to_owned())
    } else {
        Err(StoreError::InvalidKey(key.to_owned()))
    }
}

/// A stream of [`StoreChange`]s, optionally filtered by key.
///
/// Delivery is best-effort: a subscriber that falls behind skips the missed
/// events and should re-read the keys it cares about.
pub struct Subscription {
    rx: broadcast::Receiver<StoreChange>,
    keys: Option<Vec<String>>,
}

impl Subscription {
    fn wants(&self, change: &StoreChange) -> bool {
        self.keys
            .as_ref()
            .is_none_or(|keys| keys.iter().any(|k| *k == change.key))
    }

    /// Wait for the next matching change.
    ///
    /// Returns `None` once every store handle has been dropped.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.wants(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching change if one is already queued.
    pub fn try_recv(&mut self) -> Option<StoreChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if self.wants(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store subscriber lagged; events dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load_preserves_order() {
        let store = JsonStore::memory();
        store.save("rc_cart", &[3, 1, 2]).await.unwrap();
        assert_eq!(store.load::<i32>("rc_cart").await, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_write_batches_queue_behind_each_other() {
        let store = JsonStore::memory();
        let first = store.write().await;

        let second = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut batch = store.write().await;
                batch.put("rc_cart", &[2]).unwrap();
                batch.commit().await.unwrap();
            })
        };
        tokio::task::yield_now().await;
        assert!(!second.is_finished());
        assert!(store.load::<i32>("rc_cart").await.is_empty());

        drop(first);
        second.await.unwrap();
        assert_eq!(store.load::<i32>("rc_cart").await, vec![2]);
    }

    #[tokio::test]
    async fn test_missing_key_loads_empty() {
        let store = JsonStore::memory();
        assert!(store.load::<i32>("rc_listings").await.is_empty());
        assert_eq!(store.load_value::<bool>(keys::AUTH).await, None);
    }

    #[tokio::test]
    async fn test_malformed_document_loads_empty() {
        let store = JsonStore::memory();
        store
            .inner
            .backend
            .apply(&[Op::Put {
                key: "rc_cart".to_owned(),
                value: "{not json".to_owned(),
            }])
            .await
            .unwrap();
        assert!(store.load::<i32>("rc_cart").await.is_empty());

        // Shape mismatch is treated the same way.
        store.save_value("rc_cart", &"a string").await.unwrap();
        assert!(store.load::<i32>("rc_cart").await.is_empty());
    }

    #[tokio::test]
    async fn test_revisions_advance_per_key() {
        let store = JsonStore::memory();
        assert_eq!(store.revision("rc_cart").await, 0);
        assert_eq!(store.save("rc_cart", &[1]).await.unwrap(), 1);
        assert_eq!(store.save("rc_cart", &[2]).await.unwrap(), 2);
        assert_eq!(store.save("rc_wishlist", &[1]).await.unwrap(), 1);
        assert_eq!(store.remove("rc_cart").await.unwrap(), 3);
        assert!(store.load::<i32>("rc_cart").await.is_empty());
    }

    #[tokio::test]
    async fn test_save_if_rejects_stale_revision() {
        let store = JsonStore::memory();
        let seen = store.revision("rc_listings").await;
        store.save("rc_listings", &["other writer"]).await.unwrap();

        let err = store
            .save_if("rc_listings", seen, &["mine"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StaleWrite {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert_eq!(store.load::<String>("rc_listings").await, vec!["other writer"]);

        let current = store.revision("rc_listings").await;
        store.save_if("rc_listings", current, &["mine"]).await.unwrap();
        assert_eq!(store.load::<String>("rc_listings").await, vec!["mine"]);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let store = JsonStore::memory();
        let err = store.save("../etc", &[1]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_batch_commits_all_then_notifies() {
        let store = JsonStore::memory();
        let mut sub = store.subscribe();

        let mut batch = store.batch();
        batch.put("rc_listings", &["a"]).unwrap();
        batch.put("rc_user_products", &["b"]).unwrap();
        assert!(sub.try_recv().is_none());

        let changes = batch.commit().await.unwrap();
        assert_eq!(changes.len(), 2);

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert_eq!(first.key, "rc_listings");
        assert_eq!(second.key, "rc_user_products");
        assert_eq!(store.load::<String>("rc_user_products").await, vec!["b"]);
    }

    #[tokio::test]
    async fn test_batch_keeps_last_op_per_key() {
        let store = JsonStore::memory();
        let mut batch = store.batch();
        batch.put("rc_cart", &[1]).unwrap();
        batch.put("rc_cart", &[2]).unwrap();
        let changes = batch.commit().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(store.load::<i32>("rc_cart").await, vec![2]);
    }

    #[tokio::test]
    async fn test_stale_batch_writes_nothing() {
        let store = JsonStore::memory();
        store.save("rc_cart", &[1]).await.unwrap();

        let mut batch = store.batch();
        batch.expect_revision("rc_cart", 0);
        batch.put("rc_cart", &[9]).unwrap();
        batch.put("rc_orders", &[9]).unwrap();
        assert!(batch.commit().await.is_err());

        assert_eq!(store.load::<i32>("rc_cart").await, vec![1]);
        assert!(store.load::<i32>("rc_orders").await.is_empty());
    }

    #[tokio::test]
    async fn test_filtered_subscription_skips_other_keys() {
        let store = JsonStore::memory();
        let mut sub = store.subscribe_keys(&[keys::CART]);
        store.save(keys::WISHLIST, &[1]).await.unwrap();
        store.save(keys::CART, &[1]).await.unwrap();

        let change = sub.recv().await.unwrap();
        assert_eq!(change.key, keys::CART);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonStore::open(dir.path()).await.unwrap();
            store.save(keys::ORDERS, &["RC-1", "RC-2"]).await.unwrap();
        }
        let store = JsonStore::open(dir.path()).await.unwrap();
        assert_eq!(store.load::<String>(keys::ORDERS).await, vec!["RC-1", "RC-2"]);
        // Revisions do not survive a restart.
        assert_eq!(store.revision(keys::ORDERS).await, 0);
    }
}
