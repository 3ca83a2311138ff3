//! Stream event envelope — the wire contract with clients (spec.md §4.6)
//!
//! Seven tagged variants emitted in order by [`crate::engine::ConversationEngine::chat_stream`].
//! Exactly one of `Done`/`Error` terminates a stream; clients must tolerate
//! unknown event types, so new variants should stay additive.

use crate::message::StructuredQuestion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event in a `chat_stream` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental user-facing text chunk.
    Text { delta: String },

    /// A tool call the engine is about to execute.
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },

    /// The outcome of a previously emitted `ToolCall`.
    ToolResult {
        id: String,
        name: String,
        success: bool,
        result: Value,
    },

    /// At most one per turn, during the discovery phase.
    StructuredQuestions { questions: Vec<StructuredQuestion> },

    /// A non-fatal deviation from the discovery-phase protocol (spec.md §4.5.2).
    ProtocolWarning { code: String, detail: String },

    /// Fatal; ends the stream.
    Error { code: String, message: String },

    /// Terminal on success; emitted exactly once.
    Done {
        prompt_tokens: u64,
        completion_tokens: u64,
        cost_usd: f64,
        itinerary_updated: bool,
    },
}

impl StreamEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text { delta: delta.into() }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_result(
        id: impl Into<String>,
        name: impl Into<String>,
        success: bool,
        result: Value,
    ) -> Self {
        Self::ToolResult {
            id: id.into(),
            name: name.into(),
            success,
            result,
        }
    }

    pub fn protocol_warning(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProtocolWarning {
            code: code.into(),
            detail: detail.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this event terminates the stream (`Done` or `Error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization_shape() {
        let event = StreamEvent::text("hello");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["delta"], "hello");
    }

    #[test]
    fn test_done_and_error_are_terminal() {
        let done = StreamEvent::Done {
            prompt_tokens: 1,
            completion_tokens: 1,
            cost_usd: 0.0,
            itinerary_updated: false,
        };
        let error = StreamEvent::error("LLM_TIMEOUT", "timed out");
        assert!(done.is_terminal());
        assert!(error.is_terminal());
        assert!(!StreamEvent::text("x").is_terminal());
    }

    #[test]
    fn test_tool_call_roundtrip() {
        let event = StreamEvent::tool_call("call_1", "get_itinerary", serde_json::json!({}));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
