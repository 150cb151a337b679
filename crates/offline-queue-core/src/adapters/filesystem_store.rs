//! # Filesystem Document Store Adapter
//!
//! Durable local implementation of [`DocumentStore`]. Each collection is a
//! directory under the base path and each document is one `<key>.json` file:
//!
//! ```text
//! {base}/{collection}/{key}.json
//! ```
//!
//! Files hold an envelope carrying the serialized document and its SHA-256
//! checksum. Writes land in a temporary sibling which is synced and then
//! renamed over the target, so a reader sees either the old document or the
//! new one and a crash never leaves a torn file behind.

use crate::document_store::{
    validate_key, DocumentQuery, DocumentStore, StorageError, StoreHealthStatus, StoredDocument,
};
use crate::CollectionName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const DOCUMENT_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// On-disk envelope around a document
#[derive(Debug, Serialize, Deserialize)]
struct DocumentEnvelope {
    /// Hex-encoded SHA-256 of `document`
    checksum_sha256: String,

    /// Serialized document body
    document: String,
}

/// Compute hex-encoded SHA-256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Filesystem-based document store
///
/// # Examples
///
/// ```no_run
/// use offline_queue_core::adapters::FilesystemDocumentStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemDocumentStore::new(PathBuf::from("./data/queue")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemDocumentStore {
    base_path: PathBuf,
    temp_counter: Arc<AtomicU64>,
}

impl FilesystemDocumentStore {
    /// Open (or create) a store rooted at `base_path`
    ///
    /// Leftover temporary files from writes interrupted by a crash are removed.
    ///
    /// # Errors
    ///
    /// Returns error if base path cannot be created or scanned.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StorageError::io("create base directory", e))?;
        sync_directory(parent_dir(&base_path)).await?;

        let store = Self {
            base_path,
            temp_counter: Arc::new(AtomicU64::new(0)),
        };
        store.remove_stale_temp_files().await?;

        Ok(store)
    }

    /// Base directory of the store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, collection: &CollectionName) -> PathBuf {
        self.base_path.join(collection.as_str())
    }

    fn document_path(&self, collection: &CollectionName, key: &str) -> PathBuf {
        self.collection_path(collection)
            .join(format!("{}.{}", key, DOCUMENT_EXTENSION))
    }

    fn temp_path(&self, collection: &CollectionName, key: &str) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.collection_path(collection)
            .join(format!("{}.{}.{}", key, n, TEMP_EXTENSION))
    }

    /// Create the collection directory if needed and make its entry durable
    async fn ensure_collection_dir(&self, dir: &Path) -> Result<(), StorageError> {
        match fs::create_dir(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
            // Base directory removed underneath us
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(dir)
                    .await
                    .map_err(|e| StorageError::io("create collection directory", e))?;
                sync_directory(parent_dir(&self.base_path)).await?;
            }
            Err(e) => return Err(StorageError::io("create collection directory", e)),
        }

        sync_directory(&self.base_path).await
    }

    async fn remove_stale_temp_files(&self) -> Result<(), StorageError> {
        let mut collections = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| StorageError::io("read base directory", e))?;

        while let Some(entry) = collections
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read base directory entry", e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io("read base directory entry type", e))?
                .is_dir();
            if !is_dir {
                continue;
            }

            let path = entry.path();
            let mut files = fs::read_dir(&path)
                .await
                .map_err(|e| StorageError::io("read collection directory", e))?;

            while let Some(file) = files
                .next_entry()
                .await
                .map_err(|e| StorageError::io("read collection directory entry", e))?
            {
                let file_path = file.path();
                if has_extension(&file_path, TEMP_EXTENSION) {
                    warn!(path = %file_path.display(), "Removing interrupted write");
                    if let Err(e) = fs::remove_file(&file_path).await {
                        if e.kind() != ErrorKind::NotFound {
                            return Err(StorageError::io("remove temporary file", e));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Read and verify one document file
    ///
    /// Returns `None` if the file does not exist.
    async fn read_document(
        &self,
        path: &Path,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io("read document", e)),
        };

        let envelope: DocumentEnvelope =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                message: format!("Unreadable envelope: {}", e),
            })?;

        let actual = compute_checksum(envelope.document.as_bytes());
        if actual != envelope.checksum_sha256 {
            return Err(StorageError::Corrupted {
                key: key.to_string(),
                message: format!(
                    "Checksum mismatch: expected {}, got {}",
                    envelope.checksum_sha256, actual
                ),
            });
        }

        let document =
            serde_json::from_str(&envelope.document).map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                message: format!("Unreadable document: {}", e),
            })?;

        Ok(Some(document))
    }

    /// Keys of every document file in a collection, in no particular order
    async fn document_keys(&self, collection: &CollectionName) -> Result<Vec<String>, StorageError> {
        let dir = self.collection_path(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("read collection directory", e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read collection directory entry", e))?
        {
            let path = entry.path();
            if !has_extension(&path, DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        Ok(keys)
    }
}

/// Directory holding `path`; the working directory for a bare relative name
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Make a completed rename or unlink in `dir` durable
async fn sync_directory(dir: &Path) -> Result<(), StorageError> {
    #[cfg(unix)]
    {
        let handle = fs::File::open(dir)
            .await
            .map_err(|e| StorageError::io("open directory for sync", e))?;
        handle
            .sync_all()
            .await
            .map_err(|e| StorageError::io("sync directory", e))?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FilesystemDocumentStore {
    async fn put(
        &self,
        collection: &CollectionName,
        key: &str,
        document: serde_json::Value,
    ) -> Result<(), StorageError> {
        validate_key(key)?;

        let dir = self.collection_path(collection);
        self.ensure_collection_dir(&dir).await?;

        let body = serde_json::to_string(&document).map_err(|e| StorageError::Serialization {
            message: format!("Failed to serialize document: {}", e),
        })?;
        let envelope = DocumentEnvelope {
            checksum_sha256: compute_checksum(body.as_bytes()),
            document: body,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| StorageError::Serialization {
            message: format!("Failed to serialize envelope: {}", e),
        })?;

        let temp_path = self.temp_path(collection, key);
        let target_path = self.document_path(collection, key);

        let write_result = async {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| StorageError::io("create temporary file", e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| StorageError::io("write document", e))?;
            file.flush()
                .await
                .map_err(|e| StorageError::io("flush document", e))?;
            file.sync_all()
                .await
                .map_err(|e| StorageError::io("sync document", e))?;
            drop(file);

            fs::rename(&temp_path, &target_path)
                .await
                .map_err(|e| StorageError::io("rename document into place", e))
        }
        .await;

        if let Err(e) = write_result {
            // Best effort; a leftover temp file is also cleaned up on next open.
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        sync_directory(&dir).await?;

        debug!(collection = %collection, key, size_bytes = bytes.len(), "Document written");
        Ok(())
    }

    async fn get(
        &self,
        collection: &CollectionName,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        let path = self.document_path(collection, key);
        self.read_document(&path, key).await
    }

    async fn delete(&self, collection: &CollectionName, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let path = self.document_path(collection, key);

        match fs::remove_file(&path).await {
            Ok(()) => {
                sync_directory(&self.collection_path(collection)).await?;
                debug!(collection = %collection, key, "Document deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("delete document", e)),
        }
    }

    async fn query(
        &self,
        collection: &CollectionName,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        let mut documents = Vec::new();

        for key in self.document_keys(collection).await? {
            let path = self.document_path(collection, &key);
            match self.read_document(&path, &key).await {
                Ok(Some(document)) => documents.push(StoredDocument { key, document }),
                // Deleted between directory scan and read
                Ok(None) => {}
                Err(e) if e.is_corrupted() => {
                    warn!(collection = %collection, key = %key, error = %e, "Skipping corrupted document");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(query.apply(documents))
    }

    async fn keys(&self, collection: &CollectionName) -> Result<Vec<String>, StorageError> {
        let mut keys = self.document_keys(collection).await?;
        keys.sort();
        Ok(keys)
    }

    async fn count(&self, collection: &CollectionName) -> Result<usize, StorageError> {
        Ok(self.query(collection, &DocumentQuery::all()).await?.len())
    }

    async fn health_check(&self) -> Result<StoreHealthStatus, StorageError> {
        match fs::metadata(&self.base_path).await {
            Ok(metadata) if metadata.is_dir() && !metadata.permissions().readonly() => {
                Ok(StoreHealthStatus::healthy())
            }
            Ok(_) => Ok(StoreHealthStatus::unhealthy(
                "Base path is not a writable directory",
            )),
            Err(e) => Ok(StoreHealthStatus::unhealthy(format!(
                "Base path not accessible: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
