//! Itinerary storage backend
//!
//! A key-value mapping of itinerary id to record, with optimistic-concurrency
//! writes. Session storage is not pluggable: sessions live only in
//! [`crate::session_manager::SessionManager`]'s in-memory map and are lost on
//! restart by design, so no trait abstraction is needed for them.

use crate::error::{ItineraryError, ItineraryResult};
use crate::itinerary::Itinerary;
use crate::types::ItineraryId;
use async_trait::async_trait;

pub mod memory;

/// Trait for itinerary storage backends.
///
/// All backends must validate records against the itinerary schema on load
/// and persist a single save atomically; concurrent writers are expected to
/// be serialized via `save_if_version`'s compare-and-swap on `version`.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// Insert a brand-new itinerary. Fails if the id already exists.
    async fn create(&self, itinerary: Itinerary) -> ItineraryResult<ItineraryId>;

    /// Load an itinerary by id.
    async fn get(&self, id: &ItineraryId) -> ItineraryResult<Option<Itinerary>>;

    /// Persist `itinerary` iff the stored record's current version equals
    /// `expected_version`; on success the stored copy's version is bumped by
    /// one and returned. On mismatch returns `ConcurrentModification`.
    async fn save_if_version(
        &self,
        itinerary: Itinerary,
        expected_version: u64,
    ) -> ItineraryResult<Itinerary>;

    /// Delete an itinerary by id.
    async fn delete(&self, id: &ItineraryId) -> ItineraryResult<()>;

    /// List itinerary ids owned by `owner_id`.
    async fn list_by_owner(&self, owner_id: &str) -> ItineraryResult<Vec<ItineraryId>>;

    /// Whether an itinerary with this id exists.
    async fn exists(&self, id: &ItineraryId) -> ItineraryResult<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Convenience error for callers that expect an itinerary to already exist.
pub fn not_found(id: ItineraryId) -> ItineraryError {
    ItineraryError::NotFound(id)
}
