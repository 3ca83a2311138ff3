//! In-memory itinerary storage
//!
//! A thread-safe reference implementation behind a `HashMap` guarded by an
//! async `RwLock`. Suitable for development, tests, and single-instance
//! deployments; the spec treats persistent backends as an opaque external
//! collaborator this crate does not ship.

use crate::error::{ItineraryError, ItineraryResult};
use crate::itinerary::Itinerary;
use crate::storage::ItineraryStore;
use crate::types::ItineraryId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct InMemoryItineraryStore {
    records: Arc<RwLock<HashMap<ItineraryId, Itinerary>>>,
}

impl InMemoryItineraryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryItineraryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItineraryStore for InMemoryItineraryStore {
    async fn create(&self, itinerary: Itinerary) -> ItineraryResult<ItineraryId> {
        let id = itinerary.id;
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(ItineraryError::AlreadyExists(id));
        }
        records.insert(id, itinerary);
        Ok(id)
    }

    async fn get(&self, id: &ItineraryId) -> ItineraryResult<Option<Itinerary>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save_if_version(
        &self,
        itinerary: Itinerary,
        expected_version: u64,
    ) -> ItineraryResult<Itinerary> {
        let mut records = self.records.write().await;
        let current = records
            .get(&itinerary.id)
            .ok_or(ItineraryError::NotFound(itinerary.id))?;

        if current.version != expected_version {
            return Err(ItineraryError::ConcurrentModification(itinerary.id));
        }

        let mut saved = itinerary;
        saved.version = expected_version + 1;
        records.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete(&self, id: &ItineraryId) -> ItineraryResult<()> {
        let mut records = self.records.write().await;
        if records.remove(id).is_none() {
            return Err(ItineraryError::NotFound(*id));
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> ItineraryResult<Vec<ItineraryId>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|it| it.owner_id == owner_id)
            .map(|it| it.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryItineraryStore::new();
        let itinerary = Itinerary::new("Trip to Portugal", "user-1");
        let id = itinerary.id;

        store.create(itinerary).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let store = InMemoryItineraryStore::new();
        let itinerary = Itinerary::new("Trip", "user-1");
        let clone = itinerary.clone();

        store.create(itinerary).await.unwrap();
        let result = store.create(clone).await;
        assert!(matches!(result, Err(ItineraryError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_save_if_version_succeeds_and_bumps() {
        let store = InMemoryItineraryStore::new();
        let itinerary = Itinerary::new("Trip", "user-1");
        let id = itinerary.id;
        store.create(itinerary.clone()).await.unwrap();

        let mut mutated = itinerary.clone();
        mutated.title = "Trip to Lisbon".to_string();
        let saved = store.save_if_version(mutated, 1).await.unwrap();

        assert_eq!(saved.version, 2);
        let reloaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Trip to Lisbon");
        assert_eq!(reloaded.version, 2);
    }

    #[tokio::test]
    async fn test_save_if_version_conflict() {
        let store = InMemoryItineraryStore::new();
        let itinerary = Itinerary::new("Trip", "user-1");
        store.create(itinerary.clone()).await.unwrap();

        let result = store.save_if_version(itinerary, 99).await;
        assert!(matches!(result, Err(ItineraryError::ConcurrentModification(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent() {
        let store = InMemoryItineraryStore::new();
        let result = store.delete(&ItineraryId::new()).await;
        assert!(matches!(result, Err(ItineraryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_owner_filters() {
        let store = InMemoryItineraryStore::new();
        store.create(Itinerary::new("A", "user-1")).await.unwrap();
        store.create(Itinerary::new("B", "user-1")).await.unwrap();
        store.create(Itinerary::new("C", "user-2")).await.unwrap();

        let ids = store.list_by_owner("user-1").await.unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_exists() {
        let store = InMemoryItineraryStore::new();
        let itinerary = Itinerary::new("Trip", "user-1");
        let id = itinerary.id;

        assert!(!store.exists(&id).await.unwrap());
        store.create(itinerary).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
    }
}
