//! # Queued Items
//!
//! The durable unit of work and the document shape it is persisted as:
//!
//! ```text
//! { key: "queue_<id>", id: <int64>, type: <kind>, payload: <string>,
//!   createdAt: <ISO-8601>, attempts: <int>, lastAttempt: <ISO-8601 | absent> }
//! ```
//!
//! The payload is opaque; producers own its serialization and the set of legal kinds.

use crate::queue_engine::QueueError;
use crate::{ItemId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Producer-owned enumeration of item kinds (transaction, payment, print job, ...)
///
/// Blanket-implemented for any type that can round-trip through serde, so
/// producers only need to derive `Serialize`, `Deserialize`, `Clone` and `Debug`.
pub trait ItemKind: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {}

impl<T> ItemKind for T where T: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {}

/// A unit of pending work held by the queue
///
/// `id`, `kind`, `payload` and `created_at` are fixed once the item is saved;
/// only `attempts` and `last_attempt` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "K: DeserializeOwned"))]
pub struct QueuedItem<K> {
    /// Identifier assigned by the queue
    pub id: ItemId,

    /// What kind of work the payload represents
    pub kind: K,

    /// Opaque serialized payload
    pub payload: String,

    /// When the item was enqueued
    pub created_at: Timestamp,

    /// Number of delivery attempts so far
    pub attempts: u32,

    /// When the most recent delivery attempt happened
    pub last_attempt: Option<Timestamp>,
}

impl<K: ItemKind> QueuedItem<K> {
    /// Create a fresh item stamped with the current time and no attempts
    pub fn new(id: ItemId, kind: K, payload: impl Into<String>) -> Self {
        Self::with_created_at(id, kind, payload, Timestamp::now())
    }

    /// Create a fresh item with an explicit enqueue time
    pub fn with_created_at(
        id: ItemId,
        kind: K,
        payload: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            kind,
            payload: payload.into(),
            created_at,
            attempts: 0,
            last_attempt: None,
        }
    }

    /// Record a delivery attempt made at `at`
    ///
    /// This only changes the local copy; pass the item to `update` to persist it.
    pub fn record_attempt(&mut self, at: Timestamp) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(at);
    }

    /// Storage key for this item
    pub fn storage_key(&self) -> String {
        self.id.storage_key()
    }

    /// Render the persisted document for this item
    pub fn to_document(&self) -> Result<serde_json::Value, QueueError> {
        let document = ItemDocument {
            key: self.storage_key(),
            id: self.id,
            kind: self.kind.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at,
            attempts: self.attempts,
            last_attempt: self.last_attempt,
        };

        serde_json::to_value(&document).map_err(|e| QueueError::Corrupted {
            key: self.storage_key(),
            message: format!("Failed to serialize item: {}", e),
        })
    }

    /// Parse a persisted document back into an item
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Corrupted`] when the document does not match the
    /// item shape or when its `key` disagrees with its `id`.
    pub fn from_document(key: &str, document: serde_json::Value) -> Result<Self, QueueError> {
        let parsed: ItemDocument<K> =
            serde_json::from_value(document).map_err(|e| QueueError::Corrupted {
                key: key.to_string(),
                message: format!("Failed to deserialize item: {}", e),
            })?;

        if parsed.key != parsed.id.storage_key() || parsed.key != key {
            return Err(QueueError::Corrupted {
                key: key.to_string(),
                message: format!(
                    "Document key '{}' does not match id {}",
                    parsed.key, parsed.id
                ),
            });
        }

        Ok(Self {
            id: parsed.id,
            kind: parsed.kind,
            payload: parsed.payload,
            created_at: parsed.created_at,
            attempts: parsed.attempts,
            last_attempt: parsed.last_attempt,
        })
    }
}

/// Wire shape of a persisted item
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "K: DeserializeOwned"))]
struct ItemDocument<K> {
    key: String,
    id: ItemId,
    #[serde(rename = "type")]
    kind: K,
    payload: String,
    created_at: Timestamp,
    #[serde(default)]
    attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_attempt: Option<Timestamp>,
}

/// Name of the document property list ordering uses
pub(crate) const CREATED_AT_PROPERTY: &str = "createdAt";

/// Pull the `id` property out of a raw document without parsing the rest
pub(crate) fn document_id(document: &serde_json::Value) -> Option<ItemId> {
    document
        .get("id")
        .and_then(serde_json::Value::as_i64)
        .and_then(|raw| ItemId::new(raw).ok())
}

#[cfg(test)]
#[path = "queued_item_tests.rs"]
mod tests;
