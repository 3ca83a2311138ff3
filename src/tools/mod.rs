//! Concrete `Tool` catalog
//!
//! One file per tool family, grounded on spec.md §4.2's catalog. Every
//! mutating tool holds its own `Arc<dyn ItineraryStore>` and routes its
//! mutation through [`mutate_with_retry`], which owns the
//! load-clone-mutate-validate-save-retry-once cycle spec.md §4.3/§5
//! describes so that cycle lives in exactly one place rather than being
//! duplicated across ten `Tool::call` impls.

pub mod mutate;
pub mod read;
pub mod search;
pub mod segments;

use crate::error::{ItineraryError, ToolError, ToolResult as ToolCallResult};
use crate::itinerary::Itinerary;
use crate::storage::ItineraryStore;
use crate::tool::ToolRegistry;
use crate::types::ItineraryId;
use std::sync::Arc;

/// Load, clone, mutate, validate, and persist an itinerary with optimistic
/// concurrency: on a version conflict the whole cycle (including `mutate`)
/// is retried up to `retries` times before surfacing
/// `ConcurrentModification`.
///
/// `mutate` returns a structured error in place, without touching storage,
/// so a validation failure never leaves a partial write behind.
pub(crate) async fn mutate_with_retry<F>(
    store: &Arc<dyn ItineraryStore>,
    itinerary_id: ItineraryId,
    retries: u32,
    mutate: F,
) -> ToolCallResult<Itinerary>
where
    F: Fn(&mut Itinerary) -> Result<(), ItineraryError>,
{
    let mut attempts_left = retries + 1;
    loop {
        let current = store
            .get(&itinerary_id)
            .await?
            .ok_or(ItineraryError::NotFound(itinerary_id))?;
        let expected_version = current.version;

        let mut candidate = current;
        mutate(&mut candidate)?;
        candidate.validate_invariants()?;

        match store.save_if_version(candidate, expected_version).await {
            Ok(saved) => return Ok(saved),
            Err(ItineraryError::ConcurrentModification(id)) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    return Err(ToolError::Itinerary(ItineraryError::ConcurrentModification(id)));
                }
                tracing::debug!(%itinerary_id, attempts_left, "retrying mutation after version conflict");
                continue;
            }
            Err(e) => return Err(ToolError::Itinerary(e)),
        }
    }
}

/// Build and register the full ~15-tool catalog spec.md §4.2 names,
/// backed by a single shared itinerary store.
pub async fn build_default_registry(store: Arc<dyn ItineraryStore>) -> ToolCallResult<ToolRegistry> {
    let registry = ToolRegistry::new();

    registry.register(Arc::new(read::GetItineraryTool::new(store.clone()))).await?;
    registry.register(Arc::new(read::GetSegmentTool::new(store.clone()))).await?;

    registry.register(Arc::new(mutate::UpdateItineraryTool::new(store.clone()))).await?;
    registry.register(Arc::new(mutate::UpdatePreferencesTool::new(store.clone()))).await?;
    registry.register(Arc::new(mutate::AddTravelerTool::new(store.clone()))).await?;

    registry.register(Arc::new(segments::AddFlightTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::AddHotelTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::AddActivityTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::AddTransferTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::AddMeetingTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::UpdateSegmentTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::DeleteSegmentTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::MoveSegmentTool::new(store.clone()))).await?;
    registry.register(Arc::new(segments::ReorderSegmentsTool::new(store.clone()))).await?;

    registry.register(Arc::new(search::SearchWebTool::new())).await?;
    registry.register(Arc::new(search::SearchFlightsTool::new())).await?;
    registry.register(Arc::new(search::SearchHotelsTool::new())).await?;
    registry.register(Arc::new(search::SearchTransfersTool::new())).await?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryItineraryStore;

    #[tokio::test]
    async fn test_build_default_registry_registers_all_tools() {
        let store: Arc<dyn ItineraryStore> = Arc::new(InMemoryItineraryStore::new());
        let registry = build_default_registry(store).await.unwrap();
        let names: Vec<String> = registry.list().await.iter().map(|t| t.name().to_string()).collect();

        for expected in [
            "get_itinerary",
            "get_segment",
            "update_itinerary",
            "update_preferences",
            "add_traveler",
            "add_flight",
            "add_hotel",
            "add_activity",
            "add_transfer",
            "add_meeting",
            "update_segment",
            "delete_segment",
            "move_segment",
            "reorder_segments",
            "search_web",
            "search_flights",
            "search_hotels",
            "search_transfers",
        ] {
            assert!(names.contains(&expected.to_string()), "missing tool: {expected}");
        }
    }
}
