//! # In-Memory Document Store
//!
//! Thread-safe in-memory implementation for testing and ephemeral queues.
//! Nothing survives the process, so it does not provide durability.

use crate::document_store::{
    validate_key, DocumentQuery, DocumentStore, StorageError, StoreHealthStatus, StoredDocument,
};
use crate::CollectionName;
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

type Collections = HashMap<CollectionName, BTreeMap<String, serde_json::Value>>;

/// Thread-safe in-memory document store
///
/// Clones share the same underlying data. [`InMemoryDocumentStore::set_unavailable`]
/// makes every operation fail, which lets callers exercise their failure paths.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage (or recovery from one)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                message: "in-memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StorageError> {
        self.check_available()?;
        self.collections
            .read()
            .map_err(|_| StorageError::Unavailable {
                message: "in-memory store lock poisoned".to_string(),
            })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StorageError> {
        self.check_available()?;
        self.collections
            .write()
            .map_err(|_| StorageError::Unavailable {
                message: "in-memory store lock poisoned".to_string(),
            })
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(
        &self,
        collection: &CollectionName,
        key: &str,
        document: serde_json::Value,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        self.write()?
            .entry(collection.clone())
            .or_default()
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn get(
        &self,
        collection: &CollectionName,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        Ok(self
            .read()?
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    async fn delete(&self, collection: &CollectionName, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self
            .write()?
            .get_mut(collection)
            .map(|documents| documents.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        let documents: Vec<StoredDocument> = self
            .read()?
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(key, document)| StoredDocument {
                        key: key.clone(),
                        document: document.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(query.apply(documents))
    }

    async fn keys(&self, collection: &CollectionName) -> Result<Vec<String>, StorageError> {
        Ok(self
            .read()?
            .get(collection)
            .map(|documents| documents.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &CollectionName) -> Result<usize, StorageError> {
        Ok(self
            .read()?
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0))
    }

    async fn health_check(&self) -> Result<StoreHealthStatus, StorageError> {
        match self.read() {
            Ok(_) => Ok(StoreHealthStatus::healthy()),
            Err(e) => Ok(StoreHealthStatus::unhealthy(e.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
