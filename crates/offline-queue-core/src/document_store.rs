//! # Document Store Interface
//!
//! Abstraction over the embedded document store the queue persists into.
//!
//! Documents are JSON values addressed by `{collection, key}`. A successful
//! [`DocumentStore::put`] must be recoverable after a crash; everything else in
//! the queue's durability story builds on that guarantee.

use crate::{CollectionName, Timestamp};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Core Trait
// ============================================================================

/// Interface for document storage operations
///
/// # Examples
///
/// ```no_run
/// use offline_queue_core::document_store::*;
/// use offline_queue_core::CollectionName;
/// # async fn example(store: impl DocumentStore) -> Result<(), StorageError> {
/// let collection = CollectionName::new("pending-work").unwrap();
///
/// store
///     .put(&collection, "queue_1", serde_json::json!({ "id": 1 }))
///     .await?;
///
/// let ordered = store
///     .query(&collection, &DocumentQuery::all().order_by("createdAt"))
///     .await?;
/// println!("{} documents", ordered.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Durably write a document, replacing any document under the same key
    ///
    /// # Errors
    ///
    /// Returns error if the write cannot be made durable (I/O failure,
    /// disk full, backend unavailable).
    async fn put(
        &self,
        collection: &CollectionName,
        key: &str,
        document: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Read a document by key
    ///
    /// Returns `None` if no document is stored under the key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the stored bytes fail their
    /// integrity check, or another error if the backend cannot be read.
    async fn get(
        &self,
        collection: &CollectionName,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError>;

    /// Remove a document
    ///
    /// Returns `true` iff a document was actually removed.
    async fn delete(&self, collection: &CollectionName, key: &str) -> Result<bool, StorageError>;

    /// Select documents in a collection
    ///
    /// Documents that fail their integrity check are skipped rather than
    /// failing the whole query.
    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StorageError>;

    /// Keys of every document in a collection, sorted
    ///
    /// Unlike [`DocumentStore::query`] this includes documents that fail their
    /// integrity check, so callers can still account for (or remove) them.
    async fn keys(&self, collection: &CollectionName) -> Result<Vec<String>, StorageError>;

    /// Number of documents [`DocumentStore::query`] would return for the collection
    async fn count(&self, collection: &CollectionName) -> Result<usize, StorageError>;

    /// Check store health
    async fn health_check(&self) -> Result<StoreHealthStatus, StorageError>;
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Select-all query with optional ordering and result cap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Top-level property to order by, ascending
    pub order_by: Option<String>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl DocumentQuery {
    /// Select every document in the collection
    pub fn all() -> Self {
        Self::default()
    }

    /// Order results ascending by a top-level property
    pub fn order_by(mut self, property: impl Into<String>) -> Self {
        self.order_by = Some(property.into());
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply ordering and limit to an unordered result set
    ///
    /// Documents lacking the ordering property sort after those that have it.
    /// Ties fall back to key order so results are deterministic.
    pub fn apply(&self, mut documents: Vec<StoredDocument>) -> Vec<StoredDocument> {
        documents.sort_by(|a, b| a.key.cmp(&b.key));

        if let Some(property) = &self.order_by {
            documents.sort_by(|a, b| {
                let left = a.document.get(property);
                let right = b.document.get(property);
                match (left, right) {
                    (Some(l), Some(r)) => compare_values(l, r),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        }

        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }

        documents
    }
}

/// Compare two JSON property values for ordering
///
/// Numbers compare numerically and strings lexicographically; mixed types
/// compare by type rank (null < bool < number < string < other).
fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> std::cmp::Ordering {
    use serde_json::Value;

    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => l.cmp(&r),
            _ => l
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&r.as_f64().unwrap_or_default()),
        },
        (Value::String(l), Value::String(r)) => l.cmp(r),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A document together with the key it is stored under
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Storage key
    pub key: String,

    /// Document body
    pub document: serde_json::Value,
}

/// Health status of a document store
#[derive(Debug, Clone)]
pub struct StoreHealthStatus {
    /// Overall health status
    pub healthy: bool,

    /// When the check ran
    pub checked_at: Timestamp,

    /// Error message if unhealthy
    pub error_message: Option<String>,
}

impl StoreHealthStatus {
    /// Healthy status stamped now
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            checked_at: Timestamp::now(),
            error_message: None,
        }
    }

    /// Unhealthy status stamped now
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            checked_at: Timestamp::now(),
            error_message: Some(message.into()),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during document store operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed
    #[error("I/O error during {operation}: {message}")]
    Io { operation: String, message: String },

    /// Document could not be serialized for storage
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// Stored document failed its integrity check or could not be parsed
    #[error("Corrupted document {key}: {message}")]
    Corrupted { key: String, message: String },

    /// Backend cannot serve requests right now
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    /// Key cannot be used as a storage address
    #[error("Invalid key: {key}")]
    InvalidKey { key: String },
}

impl StorageError {
    /// Check if error is transient and worth retrying
    ///
    /// I/O failures and unavailability may clear up; corruption, bad keys and
    /// serialization failures will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Unavailable { .. })
    }

    /// Check if error indicates data corruption
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    pub(crate) fn io(operation: &str, error: std::io::Error) -> Self {
        Self::Io {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }
}

/// Check that a key is usable as a storage address
///
/// Keys become file names in the filesystem adapter, so only ASCII
/// alphanumerics, hyphens and underscores are accepted.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "document_store_tests.rs"]
mod tests;
