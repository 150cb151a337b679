//! # Queue Engine
//!
//! Crash-durable, ordered, uniquely identified storage for pending work items.
//!
//! ## Locking
//!
//! One exclusive lock per engine guards `save`, `delete`, `update` and `clear`,
//! so two mutations on the collection never interleave their read-modify-write
//! steps. Clones of an engine share the lock. `list`, `count` and `get` read the
//! store directly and may or may not observe a mutation that is in flight, but
//! never a partially written item.
//!
//! Mutations run to completion on a spawned task once started: dropping the
//! returned future does not abandon a half-finished write.
//!
//! ## Failure semantics
//!
//! `save`, `clear` and `generate_identifier` surface storage failures. `delete`
//! and `update` report them as `false`, `list` as an empty sequence, `count` as
//! zero and `get` as `None`, each logged at error level. Callers that need to
//! tell "empty" from "unavailable" use [`OfflineQueue::try_list`] and
//! [`OfflineQueue::try_count`].

use crate::config::{open_store, QueueConfig};
use crate::document_store::{DocumentQuery, DocumentStore, StorageError, StoreHealthStatus};
use crate::id_generator::IdGenerator;
use crate::queued_item::{ItemKind, QueuedItem, CREATED_AT_PROPERTY};
use crate::{CollectionName, ItemId, ValidationError};
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn, Instrument, Span};

// ============================================================================
// Core Trait
// ============================================================================

/// Producer-facing queue operations
///
/// Producers enqueue work and later resolve it with `delete`; the sync agent
/// lists pending items, records attempts with `update` and deletes delivered ones.
///
/// # Examples
///
/// ```no_run
/// use offline_queue_core::{OfflineQueue, QueueError, Timestamp};
/// # #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
/// # enum Work { Payment }
/// # async fn forward(_: &str) -> bool { true }
/// # async fn example(queue: impl OfflineQueue<Work>) -> Result<(), QueueError> {
/// for mut item in queue.list().await {
///     if forward(&item.payload).await {
///         queue.delete(item.id).await;
///     } else {
///         item.record_attempt(Timestamp::now());
///         queue.update(&item).await;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait OfflineQueue<K: ItemKind>: Send + Sync {
    /// Mint an identifier greater than every identifier ever issued for the collection
    ///
    /// # Errors
    ///
    /// Returns error if the first-use recovery scan cannot read the collection.
    async fn generate_identifier(&self) -> Result<ItemId, QueueError>;

    /// Durably persist an item under the key derived from its id
    ///
    /// Saving an id that already exists overwrites the stored item.
    ///
    /// # Errors
    ///
    /// Returns error if the item is not durable when the call returns.
    async fn save(&self, item: QueuedItem<K>) -> Result<QueuedItem<K>, QueueError>;

    /// All readable items, oldest first (ties by id)
    ///
    /// Returns an empty sequence if the store cannot be read.
    async fn list(&self) -> Vec<QueuedItem<K>>;

    /// Number of items `list` would return; zero if the store cannot be read
    async fn count(&self) -> usize;

    /// Remove an item; `true` iff an item was actually removed
    async fn delete(&self, id: ItemId) -> bool;

    /// Copy `attempts` and `last_attempt` onto the stored item with the same id
    ///
    /// Every other field of the stored item is left as it was. Returns `false`
    /// if no such item exists or the write fails.
    async fn update(&self, item: &QueuedItem<K>) -> bool;

    /// Remove every item in the collection, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns the first storage failure; items deleted before it stay deleted.
    async fn clear(&self) -> Result<usize, QueueError>;

    /// Look up a single item by id
    async fn get(&self, id: ItemId) -> Option<QueuedItem<K>>;

    /// Like [`OfflineQueue::list`] but reports storage failures
    async fn try_list(&self) -> Result<Vec<QueuedItem<K>>, QueueError>;

    /// Like [`OfflineQueue::count`] but reports storage failures
    async fn try_count(&self) -> Result<usize, QueueError>;

    /// Generate an id, build a fresh item and save it
    async fn enqueue(&self, kind: K, payload: String) -> Result<QueuedItem<K>, QueueError> {
        let id = self.generate_identifier().await?;
        self.save(QueuedItem::new(id, kind, payload)).await
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Document store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Stored document could not be turned into an item
    #[error("Corrupted item {key}: {message}")]
    Corrupted { key: String, message: String },

    /// Configuration is unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Background task running a mutation failed
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl QueueError {
    /// Check if error is transient and the operation worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Internal { .. } => true,
            Self::Validation(_) => false,
            Self::Corrupted { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Queue engine over one collection of a [`DocumentStore`]
///
/// Cheap to clone; clones share the collection lock and identifier counter.
/// Create one engine per collection and hand clones to every caller.
pub struct QueueEngine<K> {
    inner: Arc<EngineInner>,
    _kind: PhantomData<fn() -> K>,
}

struct EngineInner {
    store: Arc<dyn DocumentStore>,
    collection: CollectionName,
    lock: Mutex<()>,
    ids: IdGenerator,
}

impl<K> Clone for QueueEngine<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for QueueEngine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEngine")
            .field("collection", &self.inner.collection)
            .field("ids_recovered", &self.inner.ids.is_recovered())
            .finish()
    }
}

impl<K: ItemKind> QueueEngine<K> {
    /// Create an engine over `collection` in `store`
    pub fn new(store: Arc<dyn DocumentStore>, collection: CollectionName) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                collection,
                lock: Mutex::new(()),
                ids: IdGenerator::new(),
            }),
            _kind: PhantomData,
        }
    }

    /// Build the configured store and an engine over the configured collection
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the store cannot be opened.
    pub async fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let store = open_store(&config.storage).await?;
        let collection = config.collection.clone();
        info!(collection = %collection, storage = %config.storage, "Queue engine opened");
        Ok(Self::new(store, collection))
    }

    /// Collection this engine owns
    pub fn collection(&self) -> &CollectionName {
        &self.inner.collection
    }

    /// Check health of the underlying store
    pub async fn health_check(&self) -> Result<StoreHealthStatus, QueueError> {
        Ok(self.inner.store.health_check().await?)
    }

    /// Run a mutation under the collection lock on its own task
    async fn run_exclusive<T, F, Fut>(
        &self,
        operation: &'static str,
        mutation: F,
    ) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<EngineInner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, QueueError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move {
                let _guard = inner.lock.lock().await;
                mutation(Arc::clone(&inner)).await
            }
            .instrument(Span::current()),
        );

        task.await.map_err(|e| QueueError::Internal {
            message: format!("{} did not complete: {}", operation, e),
        })?
    }
}

impl EngineInner {
    async fn save_locked<K: ItemKind>(
        &self,
        item: QueuedItem<K>,
    ) -> Result<QueuedItem<K>, QueueError> {
        let document = item.to_document()?;
        self.store
            .put(&self.collection, &item.storage_key(), document)
            .await?;
        self.ids.observe(item.id);
        Ok(item)
    }

    async fn update_locked<K: ItemKind>(&self, item: QueuedItem<K>) -> Result<bool, QueueError> {
        let key = item.storage_key();
        let Some(document) = self.store.get(&self.collection, &key).await? else {
            return Ok(false);
        };

        let mut stored = QueuedItem::<K>::from_document(&key, document)?;
        stored.attempts = item.attempts;
        stored.last_attempt = item.last_attempt;

        self.store
            .put(&self.collection, &key, stored.to_document()?)
            .await?;
        Ok(true)
    }

    async fn clear_locked(&self) -> Result<usize, QueueError> {
        let keys = self.store.keys(&self.collection).await?;
        let mut removed = 0;
        for key in &keys {
            if self.store.delete(&self.collection, key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn read_items<K: ItemKind>(&self) -> Result<Vec<QueuedItem<K>>, QueueError> {
        let documents = self
            .store
            .query(
                &self.collection,
                &DocumentQuery::all().order_by(CREATED_AT_PROPERTY),
            )
            .await?;

        let mut items: Vec<QueuedItem<K>> = documents
            .into_iter()
            .filter_map(
                |stored| match QueuedItem::from_document(&stored.key, stored.document) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!(collection = %self.collection, key = %stored.key, error = %e, "Skipping unreadable item");
                        None
                    }
                },
            )
            .collect();

        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }
}

#[async_trait]
impl<K: ItemKind> OfflineQueue<K> for QueueEngine<K> {
    #[instrument(skip(self), fields(collection = %self.inner.collection))]
    async fn generate_identifier(&self) -> Result<ItemId, QueueError> {
        self.inner
            .ids
            .next_id(self.inner.store.as_ref(), &self.inner.collection)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to generate identifier"))
    }

    #[instrument(skip(self, item), fields(collection = %self.inner.collection, id = %item.id))]
    async fn save(&self, item: QueuedItem<K>) -> Result<QueuedItem<K>, QueueError> {
        let result = self
            .run_exclusive("save", move |inner| async move {
                inner.save_locked(item).await
            })
            .await;

        match &result {
            Ok(_) => debug!("Item saved"),
            Err(e) => error!(error = %e, "Failed to save item"),
        }
        result
    }

    #[instrument(skip(self), fields(collection = %self.inner.collection))]
    async fn list(&self) -> Vec<QueuedItem<K>> {
        self.try_list().await.unwrap_or_else(|e| {
            error!(error = %e, "Listing failed; reporting empty queue");
            Vec::new()
        })
    }

    #[instrument(skip(self), fields(collection = %self.inner.collection))]
    async fn count(&self) -> usize {
        self.try_count().await.unwrap_or_else(|e| {
            error!(error = %e, "Counting failed; reporting zero");
            0
        })
    }

    #[instrument(skip(self, id), fields(collection = %self.inner.collection, id = %id))]
    async fn delete(&self, id: ItemId) -> bool {
        let key = id.storage_key();
        let result = self
            .run_exclusive("delete", move |inner| async move {
                Ok(inner.store.delete(&inner.collection, &key).await?)
            })
            .await;

        match result {
            Ok(removed) => {
                debug!(removed, "Delete completed");
                removed
            }
            Err(e) => {
                error!(error = %e, "Failed to delete item");
                false
            }
        }
    }

    #[instrument(skip(self, item), fields(collection = %self.inner.collection, id = %item.id))]
    async fn update(&self, item: &QueuedItem<K>) -> bool {
        let item = item.clone();
        let result = self
            .run_exclusive("update", move |inner| async move {
                inner.update_locked(item).await
            })
            .await;

        match result {
            Ok(true) => {
                debug!("Attempt bookkeeping updated");
                true
            }
            Ok(false) => {
                debug!("Update target not found");
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to update item");
                false
            }
        }
    }

    #[instrument(skip(self), fields(collection = %self.inner.collection))]
    async fn clear(&self) -> Result<usize, QueueError> {
        let result = self
            .run_exclusive("clear", |inner| async move { inner.clear_locked().await })
            .await;

        match &result {
            Ok(removed) => info!(removed, "Queue cleared"),
            Err(e) => error!(error = %e, "Failed to clear queue"),
        }
        result
    }

    #[instrument(skip(self, id), fields(collection = %self.inner.collection, id = %id))]
    async fn get(&self, id: ItemId) -> Option<QueuedItem<K>> {
        let key = id.storage_key();
        let document = match self.inner.store.get(&self.inner.collection, &key).await {
            Ok(document) => document?,
            Err(e) => {
                error!(error = %e, "Lookup failed; reporting item absent");
                return None;
            }
        };

        QueuedItem::from_document(&key, document)
            .inspect_err(|e| warn!(error = %e, "Stored item is unreadable"))
            .ok()
    }

    async fn try_list(&self) -> Result<Vec<QueuedItem<K>>, QueueError> {
        self.inner.read_items().await
    }

    async fn try_count(&self) -> Result<usize, QueueError> {
        Ok(self.inner.read_items::<K>().await?.len())
    }
}

#[cfg(test)]
#[path = "queue_engine_tests.rs"]
mod tests;
