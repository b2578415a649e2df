use std::collections::BTreeMap;
use std::sync::Arc;

use astrovista_core::{Apod, ApodDate};
use astrovista_storage::{
    ApodStorage, DateRange, SearchPage, SearchQuery, SortOrder, StorageError, with_new_id,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory APOD storage keyed by date.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<ApodDate, Apod>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-populated with `apods`. Later duplicates replace
    /// earlier ones.
    pub fn with_records(apods: impl IntoIterator<Item = Apod>) -> Self {
        let data = apods
            .into_iter()
            .map(|apod| (apod.date, with_new_id(apod)))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl ApodStorage for InMemoryStorage {
    async fn latest(&self) -> Result<Option<Apod>, StorageError> {
        let guard = self.data.read().await;
        Ok(guard.values().next_back().cloned())
    }

    async fn find_by_date(&self, date: &ApodDate) -> Result<Option<Apod>, StorageError> {
        let guard = self.data.read().await;
        Ok(guard.get(date).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Apod>, StorageError> {
        let guard = self.data.read().await;
        Ok(guard.values().rev().cloned().collect())
    }

    async fn date_range(&self, range: &DateRange) -> Result<Vec<Apod>, StorageError> {
        if let Some(start) = range.start
            && start > range.end
        {
            return Ok(Vec::new());
        }
        let guard = self.data.read().await;
        let items = match range.start {
            Some(start) => guard.range(start..=range.end).map(|(_, v)| v.clone()).collect(),
            None => guard.range(..=range.end).map(|(_, v)| v.clone()).collect(),
        };
        Ok(items)
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StorageError> {
        let guard = self.data.read().await;
        let mut matching: Vec<&Apod> = guard.values().filter(|apod| query.matches(apod)).collect();
        if query.sort == SortOrder::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(SearchPage::new(total, items))
    }

    async fn insert(&self, apod: Apod) -> Result<Apod, StorageError> {
        let mut guard = self.data.write().await;
        if guard.contains_key(&apod.date) {
            return Err(StorageError::already_exists(apod.date.to_string()));
        }
        let stored = with_new_id(apod);
        guard.insert(stored.date, stored.clone());
        tracing::debug!(date = %stored.date, "stored APOD in memory");
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrovista_storage::MediaTypeFilter;

    fn apod(date: &str, title: &str) -> Apod {
        Apod::new(date.parse().unwrap(), title)
    }

    fn sample() -> InMemoryStorage {
        InMemoryStorage::with_records([
            apod("2023-01-10", "Orion Nebula").with_explanation("Stellar nursery"),
            apod("2023-01-12", "Solar Eclipse").with_media_type("video"),
            apod("2023-01-15", "Andromeda Galaxy").with_explanation("A spiral galaxy"),
        ])
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let storage = InMemoryStorage::new();
        let stored = storage.insert(apod("2023-01-15", "Andromeda")).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_duplicate_date_conflicts() {
        let storage = sample();
        let err = storage
            .insert(apod("2023-01-15", "Another"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(storage.len().await, 3);
    }

    #[tokio::test]
    async fn test_latest_and_find() {
        let storage = sample();
        assert_eq!(storage.latest().await.unwrap().unwrap().title, "Andromeda Galaxy");

        let found = storage
            .find_by_date(&"2023-01-12".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(found.unwrap().title, "Solar Eclipse");

        let missing = storage
            .find_by_date(&"2020-01-01".parse().unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());

        assert!(InMemoryStorage::new().latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let titles: Vec<String> = sample()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, ["Andromeda Galaxy", "Solar Eclipse", "Orion Nebula"]);
    }

    #[tokio::test]
    async fn test_date_range_inclusive() {
        let storage = sample();
        let range = DateRange::new(
            Some("2023-01-10".parse().unwrap()),
            "2023-01-12".parse().unwrap(),
        );
        let items = storage.date_range(&range).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Orion Nebula");

        let inverted = DateRange::new(
            Some("2023-01-15".parse().unwrap()),
            "2023-01-10".parse().unwrap(),
        );
        assert!(storage.date_range(&inverted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let storage = sample();

        let page = storage
            .search(&SearchQuery::new().with_text("GALAXY"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Andromeda Galaxy");

        let page = storage
            .search(&SearchQuery::new().with_media_type(MediaTypeFilter::Image))
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let page = storage
            .search(&SearchQuery::new().with_per_page(2).with_page(2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Orion Nebula");

        let page = storage
            .search(&SearchQuery::new().with_sort(SortOrder::Asc).with_per_page(1))
            .await
            .unwrap();
        assert_eq!(page.items[0].title, "Orion Nebula");
    }

    #[tokio::test]
    async fn test_search_page_past_end_is_empty() {
        let page = sample()
            .search(&SearchQuery::new().with_page(10))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.is_empty());
    }
}
