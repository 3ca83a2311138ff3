//! Read-only tools: `get_itinerary`, `get_segment`
//!
//! Pure projections; never touch storage beyond a single load and never
//! retry, since there is nothing to retry.

use crate::error::{ToolError, ToolResult as ToolCallResult};
use crate::storage::ItineraryStore;
use crate::summarizer::summarize_for_tool;
use crate::tool::{Tool, ToolOutcome};
use crate::types::{ItineraryId, SegmentId};
use serde_json::json;
use std::sync::Arc;
use std::str::FromStr;
use uuid::Uuid;

fn schema_no_args() -> serde_json::Value {
    json!({ "type": "object", "properties": {} })
}

/// Returns `summarizeForTool(current)` (spec.md §4.1/§4.2).
pub struct GetItineraryTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

impl GetItineraryTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: schema_no_args(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for GetItineraryTool {
    fn name(&self) -> &str {
        "get_itinerary"
    }

    fn description(&self) -> &str {
        "Return the current itinerary's summarized state: dates, destinations, segment list with inferred booking tiers, trip preferences, and travelers. Call this first in a new session to see what already exists."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        _arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let itinerary = self
            .store
            .get(&itinerary_id)
            .await?
            .ok_or_else(|| ToolError::Itinerary(crate::error::ItineraryError::NotFound(itinerary_id)))?;

        Ok(ToolOutcome::ok(summarize_for_tool(&itinerary)))
    }
}

/// Returns one segment by id, or a structured `{success:false,...}` result
/// if the id does not exist (never a thrown error, per spec.md §4.2/§4.3).
pub struct GetSegmentTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

impl GetSegmentTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "segmentId": { "type": "string", "description": "Id of the segment to fetch" },
                },
                "required": ["segmentId"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for GetSegmentTool {
    fn name(&self) -> &str {
        "get_segment"
    }

    fn description(&self) -> &str {
        "Return a single itinerary segment by id, with its full typed details (not the summarized projection `get_itinerary` returns)."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let raw_id = arguments
            .get("segmentId")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let segment_id = match Uuid::from_str(raw_id).map(SegmentId::from) {
            Ok(id) => id,
            Err(_) => {
                return Ok(ToolOutcome {
                    output: json!({"success": false, "error": format!("invalid segmentId: {raw_id}")}),
                    error: Some(format!("invalid segmentId: {raw_id}")),
                    metadata: Default::default(),
                })
            }
        };

        let itinerary = self
            .store
            .get(&itinerary_id)
            .await?
            .ok_or_else(|| ToolError::Itinerary(crate::error::ItineraryError::NotFound(itinerary_id)))?;

        match itinerary.find_segment(segment_id) {
            Some(segment) => Ok(ToolOutcome::ok(serde_json::to_value(segment).unwrap_or(json!(null)))),
            None => Ok(ToolOutcome {
                output: json!({"success": false, "error": format!("segment not found: {segment_id}")}),
                error: Some(format!("segment not found: {segment_id}")),
                metadata: Default::default(),
            }),
        }
    }
}
