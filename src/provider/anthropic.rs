//! Anthropic LLM provider implementation
//!
//! `anthropic-sdk` 0.1's builder chain covers the non-streaming `complete()`
//! call well but has no tool-calling streaming surface, so `stream` and
//! `stream_with_tools` talk to the Messages API directly over SSE (the same
//! `reqwest` + `eventsource-stream` pairing the rest of the agent-SDK pack
//! uses for this).

use crate::error::EngineError;
use crate::message::Message;
use crate::provider::{
    EventStream, LlmProvider, ProviderConfig, ProviderEvent, ProviderResult, ResponseFormat,
    TextStream, ToolDefinition, Usage,
};
use crate::types::ToolCallId;
use anthropic_sdk::Client as AnthropicSdkClient;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, trace, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic LLM provider.
pub struct AnthropicProvider {
    api_key: String,
    http: reqwest::Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            config: ProviderConfig::new("claude-sonnet-4-20250514")
                .with_max_tokens(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| EngineError::LlmApiError("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config = self.config.with_temperature(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config = self.config.with_max_tokens(max_tokens);
        self
    }

    /// Anthropic pulls `system` out of the message list; everything else maps
    /// to `{role, content}` pairs, folding tool results into `user` turns as
    /// `tool_result` content blocks per the Messages API shape.
    fn split_system_and_turns(
        &self,
        messages: &[Message],
    ) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system = None;
        let mut turns = Vec::with_capacity(messages.len());

        for message in messages {
            match message {
                Message::System { content } => {
                    system = Some(match system.take() {
                        Some(existing) => format!("{existing}\n\n{content}"),
                        None => content.clone(),
                    });
                }
                Message::User { content } => {
                    turns.push(json!({ "role": "user", "content": content }));
                }
                Message::Assistant { content, tool_calls } => {
                    let mut blocks = Vec::new();
                    if !content.is_empty() {
                        blocks.push(json!({ "type": "text", "text": content }));
                    }
                    for call in tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id.as_str(),
                            "name": call.tool_name,
                            "input": call.arguments,
                        }));
                    }
                    turns.push(json!({ "role": "assistant", "content": blocks }));
                }
                Message::Tool {
                    tool_call_id,
                    result,
                    ..
                } => {
                    turns.push(json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": tool_call_id.as_str(),
                            "content": result.to_string(),
                        }]
                    }));
                }
            }
        }

        (system, turns)
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect()
    }

    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        response_format: Option<ResponseFormat>,
        stream: bool,
    ) -> serde_json::Value {
        let (system, turns) = self.split_system_and_turns(messages);
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": self.config.temperature,
            "messages": turns,
            "stream": stream,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if !tools.is_empty() {
            body["tools"] = json!(self.convert_tools(tools));
        }
        // Anthropic has no `response_format` field; a JSON-object request is
        // steered by appending an instruction to the system prompt instead.
        if matches!(response_format, Some(ResponseFormat::JsonObject)) {
            let note = "Respond with a single valid JSON object and nothing else.";
            body["system"] = json!(match body.get("system").and_then(|v| v.as_str()) {
                Some(existing) => format!("{existing}\n\n{note}"),
                None => note.to_string(),
            });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    MessageStart {
        #[serde(default)]
        message: Option<AnthropicMessageStart>,
    },
    ContentBlockStart {
        index: usize,
        content_block: AnthropicContentBlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: AnthropicDelta,
    },
    ContentBlockStop {
        #[serde(default)]
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageStart {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, messages: &[Message]) -> ProviderResult<String> {
        info!(model = %self.config.model, message_count = messages.len(), "requesting Anthropic completion");

        let (system, turns) = self.split_system_and_turns(messages);
        let user_text = turns
            .iter()
            .filter_map(|turn| turn.get("content").and_then(|c| c.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let mut builder = AnthropicSdkClient::new()
            .auth(&self.api_key)
            .model(&self.config.model)
            .messages(&json!([{ "role": "user", "content": user_text }]))
            .max_tokens(self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS) as i32)
            .temperature(self.config.temperature as f32);

        if let Some(system) = system {
            builder = builder.system(&system);
        }

        let mut reply = String::new();
        builder
            .build()
            .map_err(|e| EngineError::LlmApiError(format!("failed to build Anthropic request: {e}")))?
            .execute(|text| {
                reply.push_str(&text);
                async move {}
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic API error");
                EngineError::LlmApiError(format!("Anthropic API error: {e}"))
            })?;

        debug!(response_length = reply.len(), "Anthropic completion successful");
        Ok(reply)
    }

    async fn stream(&self, messages: &[Message]) -> ProviderResult<TextStream> {
        let events = self.stream_with_tools(messages, &[], None).await?;
        let text_only = events.filter_map(|event| async move {
            match event {
                Ok(ProviderEvent::TextDelta(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(text_only))
    }

    async fn stream_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        response_format: Option<ResponseFormat>,
    ) -> ProviderResult<EventStream> {
        info!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "requesting Anthropic tool-calling stream"
        );

        let body = self.build_request_body(messages, tools, response_format, true);

        trace!("sending tool-calling streaming request to Anthropic");
        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic streaming request failed");
                EngineError::LlmApiError(format!("Anthropic streaming request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::LlmApiError(format!(
                "Anthropic API returned {status}: {detail}"
            )));
        }

        // `index` -> (id, name) so a later `input_json_delta` (which carries
        // neither) can still be attributed to the right tool call.
        let mut tool_use_index: std::collections::HashMap<usize, (ToolCallId, String)> =
            std::collections::HashMap::new();

        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(move |frame| {
                let resolved = match frame {
                    Err(e) => Some(vec![Err(EngineError::LlmApiError(format!(
                        "Anthropic SSE error: {e}"
                    )))]),
                    Ok(frame) => {
                        if frame.data == "[DONE]" || frame.data.trim().is_empty() {
                            None
                        } else {
                            match serde_json::from_str::<AnthropicStreamEvent>(&frame.data) {
                                Err(_) => None,
                                Ok(parsed) => Some(translate_event(parsed, &mut tool_use_index)),
                            }
                        }
                    }
                };
                async move { resolved.map(futures::stream::iter) }
            });

        Ok(Box::pin(events.flatten()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

fn translate_event(
    event: AnthropicStreamEvent,
    tool_use_index: &mut std::collections::HashMap<usize, (ToolCallId, String)>,
) -> Vec<ProviderResult<ProviderEvent>> {
    match event {
        AnthropicStreamEvent::MessageStart { message } => message
            .and_then(|m| m.usage)
            .map(|usage| {
                vec![Ok(ProviderEvent::Usage(Usage {
                    prompt_tokens: usage.input_tokens,
                    completion_tokens: usage.output_tokens,
                }))]
            })
            .unwrap_or_default(),
        AnthropicStreamEvent::ContentBlockStart { index, content_block } => match content_block {
            AnthropicContentBlockStart::Text { text } if !text.is_empty() => {
                vec![Ok(ProviderEvent::TextDelta(text))]
            }
            AnthropicContentBlockStart::ToolUse { id, name } => {
                let tool_call_id = ToolCallId::new(id);
                tool_use_index.insert(index, (tool_call_id.clone(), name.clone()));
                vec![Ok(ProviderEvent::ToolCallDelta {
                    index,
                    id: Some(tool_call_id),
                    name: Some(name),
                    arguments_fragment: String::new(),
                })]
            }
            _ => Vec::new(),
        },
        AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
            AnthropicDelta::TextDelta { text } => vec![Ok(ProviderEvent::TextDelta(text))],
            AnthropicDelta::InputJsonDelta { partial_json } => {
                vec![Ok(ProviderEvent::ToolCallDelta {
                    index,
                    id: None,
                    name: None,
                    arguments_fragment: partial_json,
                })]
            }
            AnthropicDelta::Unknown => Vec::new(),
        },
        AnthropicStreamEvent::MessageDelta { usage } => usage
            .map(|usage| {
                vec![Ok(ProviderEvent::Usage(Usage {
                    prompt_tokens: usage.input_tokens,
                    completion_tokens: usage.output_tokens,
                }))]
            })
            .unwrap_or_default(),
        AnthropicStreamEvent::ContentBlockStop { .. }
        | AnthropicStreamEvent::MessageStop
        | AnthropicStreamEvent::Ping
        | AnthropicStreamEvent::Unknown => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_provider_creation() {
        let provider = AnthropicProvider::new("test-key");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.config().max_tokens, Some(DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn test_with_model_and_temperature() {
        let provider = AnthropicProvider::new("test-key")
            .with_model("claude-haiku-4-20250514")
            .with_temperature(0.1);
        assert_eq!(provider.config().model, "claude-haiku-4-20250514");
        assert_eq!(provider.config().temperature, 0.1);
    }

    #[test]
    fn test_split_system_and_turns() {
        let provider = AnthropicProvider::new("test-key");
        let messages = vec![
            Message::System { content: "be concise".to_string() },
            Message::User { content: "hi".to_string() },
        ];
        let (system, turns) = provider.split_system_and_turns(&messages);
        assert_eq!(system.as_deref(), Some("be concise"));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0]["role"], "user");
    }

    #[test]
    fn test_convert_tools_shape() {
        let provider = AnthropicProvider::new("test-key");
        let tools = vec![ToolDefinition {
            name: "get_itinerary".to_string(),
            description: "Returns the current itinerary".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let converted = provider.convert_tools(&tools);
        assert_eq!(converted[0]["name"], "get_itinerary");
        assert!(converted[0].get("input_schema").is_some());
    }

    #[test]
    fn test_translate_tool_use_start_then_delta() {
        let mut index = std::collections::HashMap::new();
        let start = AnthropicStreamEvent::ContentBlockStart {
            index: 0,
            content_block: AnthropicContentBlockStart::ToolUse {
                id: "call_1".to_string(),
                name: "add_flight".to_string(),
            },
        };
        let events = translate_event(start, &mut index);
        assert_eq!(events.len(), 1);

        let delta = AnthropicStreamEvent::ContentBlockDelta {
            index: 0,
            delta: AnthropicDelta::InputJsonDelta {
                partial_json: "{\"flightNumber\":\"UA100\"}".to_string(),
            },
        };
        let events = translate_event(delta, &mut index);
        match &events[0] {
            Ok(ProviderEvent::ToolCallDelta { arguments_fragment, .. }) => {
                assert!(arguments_fragment.contains("UA100"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
