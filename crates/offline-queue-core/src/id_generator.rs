//! # Identifier Generation
//!
//! Strictly increasing item identifiers that stay increasing across restarts.
//!
//! The counter lives in memory. On the first request after the process starts it
//! is rebuilt from the collection: every persisted document's `id`, plus the id
//! encoded in every storage key (which covers documents too corrupt to parse),
//! and the next id issued is one past the largest of those. The scan runs once
//! per generator; concurrent first callers wait for the same scan.
//!
//! Once `i64::MAX` has been issued or persisted the generator is exhausted and
//! every further request fails; it never wraps around to reuse low ids.

use crate::document_store::{DocumentQuery, DocumentStore};
use crate::queue_engine::QueueError;
use crate::queued_item::document_id;
use crate::{CollectionName, ItemId, ValidationError};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::OnceCell;
use tracing::info;

/// Monotonic identifier generator for one collection
#[derive(Debug)]
pub struct IdGenerator {
    /// Next identifier to hand out
    next: AtomicI64,

    /// Set once `i64::MAX` is taken
    exhausted: AtomicBool,

    /// Set once the recovery scan has completed
    recovered: OnceCell<()>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a generator that has not yet recovered its baseline
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(ItemId::MIN.as_i64()),
            exhausted: AtomicBool::new(false),
            recovered: OnceCell::new(),
        }
    }

    /// Whether the recovery scan has run
    pub fn is_recovered(&self) -> bool {
        self.recovered.initialized()
    }

    /// Mint the next identifier
    ///
    /// Runs the recovery scan first if this is the first call. A failed scan is
    /// reported and retried on the next call.
    ///
    /// # Errors
    ///
    /// Returns error if the recovery scan cannot read the collection or the
    /// identifier space is exhausted.
    pub async fn next_id(
        &self,
        store: &dyn DocumentStore,
        collection: &CollectionName,
    ) -> Result<ItemId, QueueError> {
        self.recovered
            .get_or_try_init(|| async {
                let max = recover_max_id(store, collection).await?;
                if let Some(id) = max {
                    self.observe(id);
                }
                info!(
                    collection = %collection,
                    recovered_max = ?max.map(|id| id.as_i64()),
                    next_id = self.next.load(Ordering::SeqCst),
                    exhausted = self.is_exhausted(),
                    "Identifier counter recovered"
                );
                Ok::<(), QueueError>(())
            })
            .await?;

        if self.is_exhausted() {
            return Err(exhausted_error());
        }

        let advanced = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1));

        let value = match advanced {
            Ok(value) => value,
            // Counter sits at i64::MAX; exactly one caller may take it
            Err(value) => {
                if self
                    .exhausted
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    return Err(exhausted_error());
                }
                value
            }
        };

        Ok(ItemId::new(value)?)
    }

    /// Whether every identifier has been used
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Make sure `id` is never issued by this generator
    ///
    /// Called for every saved item so explicitly assigned ids also raise the
    /// counter.
    pub fn observe(&self, id: ItemId) {
        match id.as_i64().checked_add(1) {
            Some(next) => {
                self.next.fetch_max(next, Ordering::SeqCst);
            }
            None => self.exhausted.store(true, Ordering::SeqCst),
        }
    }
}

fn exhausted_error() -> QueueError {
    QueueError::Validation(ValidationError::OutOfRange {
        field: "id".to_string(),
        message: format!("identifier space exhausted at {}", i64::MAX),
    })
}

/// Largest item id persisted in a collection, if any
pub async fn recover_max_id(
    store: &dyn DocumentStore,
    collection: &CollectionName,
) -> Result<Option<ItemId>, QueueError> {
    let from_keys = store
        .keys(collection)
        .await?
        .iter()
        .filter_map(|key| ItemId::from_storage_key(key).ok())
        .max();

    let from_documents = store
        .query(collection, &DocumentQuery::all())
        .await?
        .iter()
        .filter_map(|stored| document_id(&stored.document))
        .max();

    Ok(from_keys.max(from_documents))
}

#[cfg(test)]
#[path = "id_generator_tests.rs"]
mod tests;
