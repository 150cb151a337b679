//! # Offline Queue Core
//!
//! Durable storage for units of pending work (transaction records, payment
//! confirmations, print jobs, sync payloads) that must survive crashes, power
//! loss and restarts until a sync agent forwards them or a producer resolves them.
//!
//! ## Architecture
//!
//! - [`queue_engine::QueueEngine`] owns one logical collection and serializes every
//!   mutation on that collection behind a single exclusive lock
//! - [`document_store::DocumentStore`] abstracts the embedded document store the
//!   engine persists into; adapters live in [`adapters`]
//! - [`id_generator::IdGenerator`] mints strictly increasing identifiers and rebuilds
//!   its counter from persisted items on first use after a restart
//!
//! ## Usage
//!
//! ```rust
//! use offline_queue_core::{adapters::InMemoryDocumentStore, CollectionName, QueueEngine, OfflineQueue};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! enum Work {
//!     Transaction,
//!     PrintJob,
//! }
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let queue: QueueEngine<Work> =
//!     QueueEngine::new(store, CollectionName::new("pending-work").unwrap());
//!
//! let item = queue.enqueue(Work::PrintJob, "{\"receipt\":42}".to_string()).await.unwrap();
//! assert_eq!(queue.count().await, 1);
//! assert!(queue.delete(item.id).await);
//! # });
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix for the storage key of every queued item (`queue_<id>`)
pub const STORAGE_KEY_PREFIX: &str = "queue_";

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Identifier of a queued item
///
/// Assigned by the queue exactly once and never reused within a collection.
/// Valid identifiers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ItemId(i64);

impl ItemId {
    /// Smallest identifier the queue ever issues
    pub const MIN: ItemId = ItemId(1);

    /// Create item ID with validation
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < Self::MIN.0 {
            return Err(ValidationError::OutOfRange {
                field: "id".to_string(),
                message: format!("must be at least {}, got {}", Self::MIN.0, value),
            });
        }
        Ok(Self(value))
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Storage key derived from the identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use offline_queue_core::ItemId;
    ///
    /// let id = ItemId::new(7).unwrap();
    /// assert_eq!(id.storage_key(), "queue_7");
    /// ```
    pub fn storage_key(&self) -> String {
        format!("{}{}", STORAGE_KEY_PREFIX, self.0)
    }

    /// Recover the identifier from a `queue_<id>` storage key
    pub fn from_storage_key(key: &str) -> Result<Self, ParseError> {
        let raw = key
            .strip_prefix(STORAGE_KEY_PREFIX)
            .ok_or_else(|| ParseError::InvalidFormat {
                expected: format!("{}<id>", STORAGE_KEY_PREFIX),
                actual: key.to_string(),
            })?;
        raw.parse()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for ItemId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for i64 {
    fn from(value: ItemId) -> Self {
        value.0
    }
}

impl FromStr for ItemId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<i64>().map_err(|_| ParseError::InvalidFormat {
            expected: "positive integer".to_string(),
            actual: s.to_string(),
        })?;
        Self::new(value).map_err(|_| ParseError::InvalidFormat {
            expected: "positive integer".to_string(),
            actual: s.to_string(),
        })
    }
}

/// Name of a logically isolated collection within the document store
///
/// The filesystem adapter uses the name as a directory name, so it is limited
/// to characters that are safe in a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Maximum length of a collection name
    pub const MAX_LENGTH: usize = 64;

    /// Create new collection name with validation
    ///
    /// # Validation Rules
    /// - Must be 1-64 characters
    /// - Must contain only ASCII alphanumerics, hyphens and underscores
    /// - Must start with an ASCII letter
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "collection".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: "collection".to_string(),
                max_length: Self::MAX_LENGTH,
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidCharacters {
                field: "collection".to_string(),
                invalid_chars: "non-alphanumeric except hyphens and underscores".to_string(),
            });
        }

        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: "collection".to_string(),
                message: "must start with a letter".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for CollectionName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(value: CollectionName) -> Self {
        value.0
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp, persisted as an RFC 3339 string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Add seconds to timestamp
    pub fn add_seconds(&self, seconds: u64) -> Self {
        let duration = chrono::Duration::seconds(seconds as i64);
        Self(self.0 + duration)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' is out of range: {message}")]
    OutOfRange { field: String, message: String },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Queued item model and its persisted document shape
pub mod queued_item;

/// Storage backend contract consumed by the queue engine
pub mod document_store;

/// Storage adapters module for infrastructure implementations
pub mod adapters;

/// Crash-safe monotonic identifier generation
pub mod id_generator;

/// Queue engine exposing the producer-facing operations
pub mod queue_engine;

/// Configuration loading for queue hosts
pub mod config;

/// Tracing subscriber setup for queue hosts
pub mod telemetry;

// Re-export key types for convenience
pub use adapters::{FilesystemDocumentStore, InMemoryDocumentStore};
pub use config::{LoggingConfig, QueueConfig, StorageConfig};
pub use document_store::{
    DocumentQuery, DocumentStore, StorageError, StoreHealthStatus, StoredDocument,
};
pub use id_generator::IdGenerator;
pub use queue_engine::{OfflineQueue, QueueEngine, QueueError};
pub use queued_item::{ItemKind, QueuedItem};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
