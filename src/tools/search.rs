//! External search collaborators: `search_web`, `search_flights`,
//! `search_hotels`, `search_transfers`
//!
//! spec.md §4.2 treats these as opaque lookups against services outside this
//! crate's boundary (a web search API, a flight/hotel/transfer inventory
//! provider). They are read-only, never touch `ItineraryStore`, and this
//! crate ships no real backend for them: each returns a structured
//! "not configured" result rather than reaching out over the network, so a
//! deployment wires in its own implementation of the same `Tool` trait
//! without needing to fork this crate.

use crate::error::ToolResult as ToolCallResult;
use crate::tool::{Tool, ToolOutcome};
use crate::types::ItineraryId;
use serde_json::json;

fn not_configured(tool_name: &str) -> ToolOutcome {
    let message = format!("{tool_name} has no backend configured for this deployment");
    ToolOutcome {
        output: json!({"success": false, "error": message}),
        error: Some(message),
        metadata: Default::default(),
    }
}

/// General-purpose web search, for questions a travel-domain tool can't answer.
#[derive(Default)]
pub struct SearchWebTool {
    schema: serde_json::Value,
}

impl SearchWebTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "query": {"type": "string"} },
                "required": ["query"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for general travel information not covered by the other search tools."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(&self, _itinerary_id: ItineraryId, _arguments: serde_json::Value) -> ToolCallResult<ToolOutcome> {
        Ok(not_configured(self.name()))
    }
}

/// Flight inventory lookup.
#[derive(Default)]
pub struct SearchFlightsTool {
    schema: serde_json::Value,
}

impl SearchFlightsTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "originCode": {"type": "string"},
                    "destinationCode": {"type": "string"},
                    "departDate": {"type": "string", "description": "YYYY-MM-DD"},
                    "returnDate": {"type": "string", "description": "YYYY-MM-DD"},
                    "cabinClass": {"type": "string", "enum": ["economy", "premium_economy", "business", "first", "suite"]},
                },
                "required": ["originCode", "destinationCode", "departDate"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchFlightsTool {
    fn name(&self) -> &str {
        "search_flights"
    }

    fn description(&self) -> &str {
        "Search for flight options between two airports on a given date."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(&self, _itinerary_id: ItineraryId, _arguments: serde_json::Value) -> ToolCallResult<ToolOutcome> {
        Ok(not_configured(self.name()))
    }
}

/// Hotel inventory lookup.
#[derive(Default)]
pub struct SearchHotelsTool {
    schema: serde_json::Value,
}

impl SearchHotelsTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "checkIn": {"type": "string", "description": "YYYY-MM-DD"},
                    "checkOut": {"type": "string", "description": "YYYY-MM-DD"},
                    "roomCount": {"type": "integer"},
                },
                "required": ["city", "checkIn", "checkOut"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchHotelsTool {
    fn name(&self) -> &str {
        "search_hotels"
    }

    fn description(&self) -> &str {
        "Search for hotel options in a city for a given date range."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(&self, _itinerary_id: ItineraryId, _arguments: serde_json::Value) -> ToolCallResult<ToolOutcome> {
        Ok(not_configured(self.name()))
    }
}

/// Ground transfer inventory lookup.
#[derive(Default)]
pub struct SearchTransfersTool {
    schema: serde_json::Value,
}

impl SearchTransfersTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "pickupLocation": {"type": "string"},
                    "dropoffLocation": {"type": "string"},
                    "datetime": {"type": "string"},
                },
                "required": ["pickupLocation", "dropoffLocation", "datetime"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchTransfersTool {
    fn name(&self) -> &str {
        "search_transfers"
    }

    fn description(&self) -> &str {
        "Search for ground transfer options between two locations at a given time."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn call(&self, _itinerary_id: ItineraryId, _arguments: serde_json::Value) -> ToolCallResult<ToolOutcome> {
        Ok(not_configured(self.name()))
    }
}
