//! Configuration types for queue hosts
//!
//! Sources, applied in order (later sources override earlier ones):
//!
//! 1. `config/offline-queue.{yaml,toml,json}` in the working directory, if present
//! 2. An explicit file given by the host, which must exist
//! 3. Environment variables prefixed `OFFLINE_QUEUE__` with `__` as the
//!    separator, e.g. `OFFLINE_QUEUE__STORAGE__BACKEND=memory`
//!
//! Every field has a default, so an unconfigured host gets a filesystem-backed
//! queue under `data/offline-queue`.

use crate::adapters::{FilesystemDocumentStore, InMemoryDocumentStore};
use crate::document_store::DocumentStore;
use crate::queue_engine::QueueError;
use crate::CollectionName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "OFFLINE_QUEUE";

const DEFAULT_COLLECTION: &str = "offline-queue";
const DEFAULT_DATA_PATH: &str = "data/offline-queue";
const LOCAL_CONFIG_FILE: &str = "config/offline-queue";

/// Queue host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Collection the queue owns
    pub collection: CollectionName,

    /// Storage backend settings
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            collection: CollectionName(DEFAULT_COLLECTION.to_string()),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Load configuration from the standard sources
    ///
    /// # Errors
    ///
    /// Returns error if a file is malformed, the explicit file is missing, an
    /// environment override has the wrong type, or the result fails validation.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, QueueError> {
        Self::load_with_prefix(explicit_path, ENV_PREFIX)
    }

    /// Load configuration reading environment overrides under `env_prefix`
    pub fn load_with_prefix(
        explicit_path: Option<&Path>,
        env_prefix: &str,
    ) -> Result<Self, QueueError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name(LOCAL_CONFIG_FILE).required(false));

        if let Some(path) = explicit_path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| QueueError::Configuration {
                message: format!("Failed to read configuration: {}", e),
            })?;

        let loaded: Self = settings
            .try_deserialize()
            .map_err(|e| QueueError::Configuration {
                message: format!("Failed to deserialize configuration: {}", e),
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), QueueError> {
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local store; nothing survives a restart
    Memory,

    /// Durable store rooted at `path`
    Filesystem { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl StorageConfig {
    /// Validate storage settings
    pub fn validate(&self) -> Result<(), QueueError> {
        match self {
            Self::Memory => Ok(()),
            Self::Filesystem { path } if path.as_os_str().is_empty() => {
                Err(QueueError::Configuration {
                    message: "storage.path must not be empty".to_string(),
                })
            }
            Self::Filesystem { .. } => Ok(()),
        }
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Filesystem { path } => write!(f, "filesystem:{}", path.display()),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or filter directive, e.g. `info` or `offline_queue_core=debug`
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate that the level parses as a filter directive
    pub fn validate(&self) -> Result<(), QueueError> {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| QueueError::Configuration {
                message: format!("Invalid logging.level '{}': {}", self.level, e),
            })
    }
}

/// Build the configured document store
///
/// # Errors
///
/// Returns error if a filesystem store cannot be created at the configured path.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>, QueueError> {
    config.validate()?;
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryDocumentStore::new())),
        StorageConfig::Filesystem { path } => {
            let store = FilesystemDocumentStore::new(path.clone()).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
