//! Common type definitions used throughout the crate
//!
//! This module provides newtype wrappers around UUID for type-safe identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_newtype!(ItineraryId, "Unique identifier for an Itinerary");
uuid_newtype!(SegmentId, "Unique identifier for a Segment");
uuid_newtype!(TravelerId, "Unique identifier for a Traveler");
uuid_newtype!(SessionId, "Unique identifier for a Session");
uuid_newtype!(MessageId, "Unique identifier for a Message");

/// Identifier assigned by the LLM provider to a single tool call within a turn.
///
/// Unlike the other ids in this module this is not locally generated: it is
/// whatever opaque string the provider hands back, and must be echoed
/// verbatim in the matching `tool` message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallId(String);

impl ToolCallId {
    /// Wrap a provider-assigned tool call id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ToolCallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ToolCallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itinerary_id_creation() {
        let id1 = ItineraryId::new();
        let id2 = ItineraryId::new();
        assert_ne!(id1, id2, "ItineraryIds should be unique");
    }

    #[test]
    fn test_segment_id_display() {
        let id = SegmentId::new();
        let display_str = format!("{}", id);
        assert!(!display_str.is_empty());
    }

    #[test]
    fn test_ids_serialization() {
        let id = TravelerId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: TravelerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_all_ids_from_uuid() {
        let uuid = Uuid::new_v4();

        assert_eq!(ItineraryId::from(uuid).as_uuid(), &uuid);
        assert_eq!(SegmentId::from(uuid).as_uuid(), &uuid);
        assert_eq!(TravelerId::from(uuid).as_uuid(), &uuid);
        assert_eq!(SessionId::from(uuid).as_uuid(), &uuid);
        assert_eq!(MessageId::from(uuid).as_uuid(), &uuid);
    }

    #[test]
    fn test_tool_call_id() {
        let id = ToolCallId::new("call_abc123");
        assert_eq!(id.as_str(), "call_abc123");
        assert_eq!(format!("{}", id), "call_abc123");
    }
}
