//! # astrovista-storage
//!
//! Storage abstraction layer for the AstroVista API.
//!
//! This crate defines the [`ApodStorage`] trait and the query types shared by
//! every backend. Implementations live in `astrovista-db-memory` and
//! `astrovista-db-postgres`.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::ApodStorage;
pub use types::{
    DEFAULT_PER_PAGE, DateRange, MAX_PER_PAGE, MediaTypeFilter, SearchPage, SearchQuery,
    SortOrder,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn ApodStorage>;

/// Assigns a fresh `_id` to a record that does not have one yet.
#[must_use]
pub fn with_new_id(mut apod: astrovista_core::Apod) -> astrovista_core::Apod {
    if apod.id.is_none() {
        apod.id = Some(uuid::Uuid::new_v4());
    }
    apod
}
