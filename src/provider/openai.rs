//! OpenAI LLM provider implementation
//!
//! Implements [`LlmProvider`] against OpenAI-compatible chat-completions,
//! including the tool-calling streaming surface spec.md §4.5/§6.1 requires.

use crate::error::EngineError;
use crate::message::{Message, ToolCall};
use crate::provider::{
    EventStream, LlmProvider, ProviderConfig, ProviderEvent, ProviderResult, ResponseFormat,
    TextStream, ToolDefinition, Usage,
};
use crate::types::ToolCallId;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestToolMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionObject, ResponseFormat as OpenAiResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, trace, warn};

/// OpenAI LLM provider.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(openai_config),
            config: ProviderConfig::new("gpt-4o"),
        }
    }

    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EngineError::LlmApiError("OPENAI_API_KEY not set".to_string()))?;
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

    fn convert_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                            content.clone(),
                        ),
                        name: None,
                    },
                ),
                Message::User { content } => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                            content.clone(),
                        ),
                        name: None,
                    },
                ),
                Message::Assistant { content, tool_calls } => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    builder.content(content.clone());
                    if !tool_calls.is_empty() {
                        builder.tool_calls(
                            tool_calls
                                .iter()
                                .map(to_openai_tool_call)
                                .collect::<Vec<_>>(),
                        );
                    }
                    ChatCompletionRequestMessage::Assistant(
                        builder
                            .build()
                            .unwrap_or_else(|_| ChatCompletionRequestAssistantMessage {
                                content: None,
                                name: None,
                                tool_calls: None,
                                refusal: None,
                                #[allow(deprecated)]
                                function_call: None,
                            }),
                    )
                }
                Message::Tool {
                    tool_call_id,
                    result,
                    ..
                } => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                    tool_call_id: tool_call_id.as_str().to_string(),
                    content: async_openai::types::ChatCompletionRequestToolMessageContent::Text(
                        result.to_string(),
                    ),
                }),
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
        tools
            .iter()
            .map(|t| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: t.name.clone(),
                    description: Some(t.description.clone()),
                    parameters: Some(t.parameters.clone()),
                    strict: None,
                },
            })
            .collect()
    }
}

fn to_openai_tool_call(call: &ToolCall) -> async_openai::types::ChatCompletionMessageToolCall {
    async_openai::types::ChatCompletionMessageToolCall {
        id: call.id.as_str().to_string(),
        r#type: ChatCompletionToolType::Function,
        function: async_openai::types::FunctionCall {
            name: call.tool_name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> ProviderResult<String> {
        info!(model = %self.config.model, message_count = messages.len(), "requesting OpenAI completion");

        let openai_messages = self.convert_messages(messages);
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.config.model)
            .messages(openai_messages)
            .temperature(self.config.temperature);
        if let Some(max_tokens) = self.config.max_tokens {
            builder.max_tokens(max_tokens);
        }

        let request = builder
            .build()
            .map_err(|e| EngineError::LlmApiError(format!("failed to build request: {e}")))?;

        trace!("sending request to OpenAI");
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!(error = %e, "OpenAI API error");
            EngineError::LlmApiError(format!("OpenAI API error: {e}"))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| EngineError::LlmApiError("no content in OpenAI response".to_string()))?;

        debug!(response_length = content.len(), "OpenAI completion successful");
        Ok(content)
    }

    async fn stream(&self, messages: &[Message]) -> ProviderResult<TextStream> {
        let openai_messages = self.convert_messages(messages);
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.config.model)
            .messages(openai_messages)
            .temperature(self.config.temperature)
            .stream(true);

        let request = builder
            .build()
            .map_err(|e| EngineError::LlmApiError(format!("failed to build request: {e}")))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| EngineError::LlmApiError(format!("OpenAI streaming error: {e}")))?;

        let mapped = stream.map(|result| {
            result
                .map_err(|e| EngineError::LlmApiError(format!("stream error: {e}")))
                .map(|response| {
                    response
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.clone())
                        .unwrap_or_default()
                })
        });

        Ok(Box::pin(mapped))
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
            "requesting OpenAI tool-calling stream"
        );

        let openai_messages = self.convert_messages(messages);
        let openai_tools = self.convert_tools(tools);

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.config.model)
            .messages(openai_messages)
            .temperature(self.config.temperature)
            .stream(true);

        if !openai_tools.is_empty() {
            builder.tools(openai_tools);
            builder.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        if let Some(max_tokens) = self.config.max_tokens {
            builder.max_tokens(max_tokens);
        }

        if matches!(response_format, Some(ResponseFormat::JsonObject)) {
            builder.response_format(OpenAiResponseFormat::JsonObject);
        }

        let request = builder
            .build()
            .map_err(|e| EngineError::LlmApiError(format!("failed to build request: {e}")))?;

        trace!("sending tool-calling streaming request to OpenAI");
        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI streaming error");
                EngineError::LlmApiError(format!("OpenAI streaming error: {e}"))
            })?;

        let events = stream.flat_map(|result| {
            let chunks: Vec<ProviderResult<ProviderEvent>> = match result {
                Err(e) => vec![Err(EngineError::LlmApiError(format!("stream error: {e}")))],
                Ok(response) => {
                    let mut out = Vec::new();
                    if let Some(choice) = response.choices.first() {
                        if let Some(content) = &choice.delta.content {
                            if !content.is_empty() {
                                out.push(Ok(ProviderEvent::TextDelta(content.clone())));
                            }
                        }
                        if let Some(tool_calls) = &choice.delta.tool_calls {
                            for delta in tool_calls {
                                let id = delta.id.as_ref().map(|s| ToolCallId::new(s.clone()));
                                let name = delta
                                    .function
                                    .as_ref()
                                    .and_then(|f| f.name.clone());
                                let fragment = delta
                                    .function
                                    .as_ref()
                                    .and_then(|f| f.arguments.clone())
                                    .unwrap_or_default();
                                out.push(Ok(ProviderEvent::ToolCallDelta {
                                    index: delta.index as usize,
                                    id,
                                    name,
                                    arguments_fragment: fragment,
                                }));
                            }
                        }
                    }
                    if let Some(usage) = &response.usage {
                        out.push(Ok(ProviderEvent::Usage(Usage {
                            prompt_tokens: usage.prompt_tokens as u64,
                            completion_tokens: usage.completion_tokens as u64,
                        })));
                    }
                    out
                }
            };
            futures::stream::iter(chunks)
        });

        Ok(Box::pin(events))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAiProvider::new("test-key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().model, "gpt-4o");
    }

    #[test]
    fn test_with_model_and_temperature() {
        let provider = OpenAiProvider::new("test-key")
            .with_model("gpt-4o-mini")
            .with_temperature(0.2);
        assert_eq!(provider.config().model, "gpt-4o-mini");
        assert_eq!(provider.config().temperature, 0.2);
    }

    #[test]
    fn test_convert_messages_covers_all_variants() {
        let provider = OpenAiProvider::new("test-key");
        let messages = vec![
            Message::System { content: "sys".to_string() },
            Message::User { content: "hi".to_string() },
            Message::Assistant { content: "hello".to_string(), tool_calls: vec![] },
            Message::Tool {
                tool_call_id: ToolCallId::new("call_1"),
                tool_name: "get_itinerary".to_string(),
                result: serde_json::json!({"ok": true}),
            },
        ];
        let converted = provider.convert_messages(&messages);
        assert_eq!(converted.len(), 4);
    }

    #[test]
    fn test_convert_tools_shape() {
        let provider = OpenAiProvider::new("test-key");
        let tools = vec![ToolDefinition {
            name: "get_itinerary".to_string(),
            description: "Returns the current itinerary".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let converted = provider.convert_tools(&tools);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "get_itinerary");
    }
}
