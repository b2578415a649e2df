//! In-memory APOD storage backend for the AstroVista API.
//!
//! Records are kept in a date-ordered map, so range queries and "latest" are
//! cheap. Intended for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! use astrovista_db_memory::InMemoryStorage;
//! use astrovista_storage::ApodStorage;
//!
//! let storage = InMemoryStorage::new();
//! let stored = storage.insert(apod).await?;
//! assert!(stored.id.is_some());
//! ```

mod storage;

pub use astrovista_storage::{ApodStorage, StorageError};
pub use storage::InMemoryStorage;

/// Creates a new shareable in-memory storage instance.
pub fn create_storage() -> astrovista_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
