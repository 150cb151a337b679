//! Common test utilities for offline queue integration tests
//!
//! This module provides:
//! - The item kinds used across the suites
//! - Helpers for opening filesystem-backed engines over a temp directory
//! - Fixed timestamps for ordering assertions

use offline_queue_core::{
    CollectionName, FilesystemDocumentStore, ItemId, QueueEngine, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Collection used by every suite unless a test needs its own
pub const COLLECTION: &str = "pending-work";

/// Kinds of work a point-of-sale producer enqueues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(dead_code)]
pub enum Work {
    Transaction,
    Payment,
    PrintJob,
}

/// Temp directory holding a queue's data; removed on drop
pub struct QueueHome {
    dir: TempDir,
}

impl QueueHome {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File backing `id` in the default collection
    #[allow(dead_code)]
    pub fn item_file(&self, id: i64) -> PathBuf {
        self.path().join(COLLECTION).join(format!("queue_{}.json", id))
    }

    /// Open a fresh engine over this directory, as a restarted process would
    pub async fn open(&self) -> QueueEngine<Work> {
        let store = FilesystemDocumentStore::new(self.path().to_path_buf())
            .await
            .expect("Failed to open filesystem store");
        QueueEngine::new(Arc::new(store), collection())
    }
}

pub fn collection() -> CollectionName {
    CollectionName::new(COLLECTION).expect("Invalid collection name")
}

pub fn id(value: i64) -> ItemId {
    ItemId::new(value).expect("Invalid item id")
}

/// Timestamp `seconds` after a fixed base instant
#[allow(dead_code)]
pub fn at(seconds: u64) -> Timestamp {
    Timestamp::from_rfc3339("2024-06-01T08:00:00Z")
        .expect("Invalid base timestamp")
        .add_seconds(seconds)
}
