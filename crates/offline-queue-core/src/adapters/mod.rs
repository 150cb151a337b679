//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the document store interface.

pub mod filesystem_store;
pub mod memory_store;

pub use filesystem_store::FilesystemDocumentStore;
pub use memory_store::InMemoryDocumentStore;
