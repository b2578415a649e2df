//! Storage traits for APOD records.

use async_trait::async_trait;

use astrovista_core::{Apod, ApodDate};

use crate::error::StorageError;
use crate::types::{DateRange, SearchPage, SearchQuery};

/// The store-of-record for APOD entries.
///
/// Dates are unique: at most one record exists per [`ApodDate`].
///
/// # Example
///
/// ```ignore
/// async fn newest_title(storage: &dyn ApodStorage) -> Result<Option<String>, StorageError> {
///     Ok(storage.latest().await?.map(|apod| apod.title))
/// }
/// ```
#[async_trait]
pub trait ApodStorage: Send + Sync {
    /// Returns the record with the greatest date, if any.
    async fn latest(&self) -> Result<Option<Apod>, StorageError>;

    async fn find_by_date(&self, date: &ApodDate) -> Result<Option<Apod>, StorageError>;

    /// Returns every record, newest first.
    async fn list_all(&self) -> Result<Vec<Apod>, StorageError>;

    /// Returns the records within `range`, oldest first.
    async fn date_range(&self, range: &DateRange) -> Result<Vec<Apod>, StorageError>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StorageError>;

    /// Stores a new record and returns it with its assigned `_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same date
    /// is already stored.
    async fn insert(&self, apod: Apod) -> Result<Apod, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Human-readable backend name, used in logs and `/readyz`.
    fn backend_name(&self) -> &'static str;
}
