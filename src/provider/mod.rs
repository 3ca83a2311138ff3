//! LLM provider abstraction and implementations
//!
//! This module provides a trait-based abstraction for LLM providers, letting
//! the conversation engine work with different function-calling chat APIs
//! (OpenAI, Anthropic, ...) behind one contract.

use crate::error::EngineError;
use crate::message::{Message, ToolCall};
use crate::types::ToolCallId;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Configuration for an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model name to use
    pub model: String,
    /// Temperature for response generation (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Top-p sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: None,
            top_p: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p.clamp(0.0, 1.0));
        self
    }
}

/// A tool definition in the shape a function-calling `tools` field expects,
/// sourced from [`crate::tool::ToolRegistry::schema_definitions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Requested shape of the final assistant message, per spec.md §6.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// Token usage reported once at the end of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One chunk of a tool-calling stream. Providers emit `ToolCallDelta`
/// fragments that the engine concatenates by `index` into a complete
/// [`ToolCall`] once the stream ends (mirrors how `async-openai`'s raw
/// streaming deltas are handled upstream).
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    TextDelta(String),
    ToolCallDelta {
        index: usize,
        id: Option<ToolCallId>,
        name: Option<String>,
        arguments_fragment: String,
    },
    Usage(Usage),
}

pub type ProviderResult<T> = std::result::Result<T, EngineError>;
pub type TextStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;
pub type EventStream = Pin<Box<dyn Stream<Item = ProviderResult<ProviderEvent>> + Send>>;

/// Trait for LLM provider implementations backing the conversation engine.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Non-streaming completion, used for the one-shot compaction call
    /// (spec.md §4.5.1).
    async fn complete(&self, messages: &[Message]) -> ProviderResult<String>;

    /// Plain text streaming, with no tool-calling surface.
    async fn stream(&self, messages: &[Message]) -> ProviderResult<TextStream>;

    /// Streaming completion with the function-calling contract: `tools`
    /// must be supplied on every call in a turn, including the second call
    /// after tool results are appended (spec.md §4.5/§6.1's critical
    /// invariant — omitting it there causes empty responses).
    async fn stream_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        response_format: Option<ResponseFormat>,
    ) -> ProviderResult<EventStream>;

    fn name(&self) -> &str;

    fn config(&self) -> &ProviderConfig;
}

/// Accumulates `ToolCallDelta` fragments by index into complete tool calls
/// once a tool-calling stream ends. Owned by the engine, not the provider.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    entries: Vec<PartialToolCall>,
}

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<ToolCallId>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, id: Option<ToolCallId>, name: Option<String>, fragment: &str) {
        if self.entries.len() <= index {
            self.entries.resize(index + 1, PartialToolCall::default());
        }
        let entry = &mut self.entries[index];
        if id.is_some() {
            entry.id = id;
        }
        if name.is_some() {
            entry.name = name;
        }
        entry.arguments.push_str(fragment);
    }

    /// Finalize all accumulated fragments into [`ToolCall`]s, skipping any
    /// slot that never received an id or name (defensive against a
    /// malformed provider stream).
    pub fn finish(self) -> Vec<ToolCall> {
        self.entries
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id?;
                let name = entry.name?;
                let arguments = if entry.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&entry.arguments).unwrap_or(serde_json::Value::Null)
                };
                Some(ToolCall {
                    id,
                    tool_name: name,
                    arguments,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_temperature_clamping() {
        let config = ProviderConfig::new("gpt-5").with_temperature(3.0);
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn test_tool_call_accumulator_concatenates_fragments() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(0, Some(ToolCallId::new("call_1")), Some("add_flight".to_string()), "{\"flight");
        acc.push(0, None, None, "Number\": \"UA100\"}");

        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "add_flight");
        assert_eq!(calls[0].arguments["flightNumber"], "UA100");
    }

    #[test]
    fn test_tool_call_accumulator_multiple_indices() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(1, Some(ToolCallId::new("call_2")), Some("get_itinerary".to_string()), "{}");
        acc.push(0, Some(ToolCallId::new("call_1")), Some("get_segment".to_string()), "{}");

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool_name, "get_segment");
        assert_eq!(calls[1].tool_name, "get_itinerary");
    }

    #[test]
    fn test_tool_call_accumulator_drops_incomplete_slot() {
        let mut acc = ToolCallAccumulator::new();
        acc.push(0, None, None, "{}");
        assert!(acc.finish().is_empty());
    }
}
