//! Integration test contracts for the LlmProvider trait
//!
//! These tests define the contract every `LlmProvider` implementation must
//! satisfy, exercised through a mock provider rather than a live API.

use futures::StreamExt;
use trip_designer_core::error::EngineError;
use trip_designer_core::message::Message;
use trip_designer_core::provider::{
    EventStream, LlmProvider, ProviderConfig, ProviderEvent, ProviderResult, ResponseFormat,
    TextStream, ToolDefinition, Usage,
};

/// Mock LLM provider for exercising the `LlmProvider` contract.
#[derive(Debug, Clone)]
struct MockProvider {
    config: ProviderConfig,
    response: String,
    should_fail: bool,
}

impl MockProvider {
    fn new(response: impl Into<String>) -> Self {
        Self {
            config: ProviderConfig::new("mock-model"),
            response: response.into(),
            should_fail: false,
        }
    }

    fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, _messages: &[Message]) -> ProviderResult<String> {
        if self.should_fail {
            Err(EngineError::LlmApiError("mock provider error".to_string()))
        } else {
            Ok(self.response.clone())
        }
    }

    async fn stream(&self, _messages: &[Message]) -> ProviderResult<TextStream> {
        if self.should_fail {
            return Err(EngineError::LlmApiError("mock provider error".to_string()));
        }
        let chunks: Vec<String> = self.response.chars().map(|c| c.to_string()).collect();
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }

    async fn stream_with_tools(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _response_format: Option<ResponseFormat>,
    ) -> ProviderResult<EventStream> {
        if self.should_fail {
            return Err(EngineError::LlmApiError("mock provider error".to_string()));
        }
        let events = vec![
            Ok(ProviderEvent::TextDelta(self.response.clone())),
            Ok(ProviderEvent::Usage(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
            })),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn name(&self) -> &str {
        "MockProvider"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Test the contract for LlmProvider::complete
#[tokio::test]
async fn test_llm_provider_complete_contract() {
    let provider = MockProvider::new("This is a test response");
    let messages = vec![
        Message::System { content: "You are a helpful assistant".to_string() },
        Message::User { content: "Hello".to_string() },
    ];

    let result = provider.complete(&messages).await;
    assert!(result.is_ok(), "LlmProvider::complete should succeed with valid messages");
    assert_eq!(result.unwrap(), "This is a test response");
}

/// Test the contract for LlmProvider::complete when the provider fails.
#[tokio::test]
async fn test_llm_provider_complete_error_contract() {
    let provider = MockProvider::new("Response").with_failure();
    let messages = vec![Message::User { content: "Hello".to_string() }];

    let result = provider.complete(&messages).await;
    assert!(matches!(result, Err(EngineError::LlmApiError(_))));
}

/// Test the contract for LlmProvider::stream
#[tokio::test]
async fn test_llm_provider_stream_contract() {
    let provider = MockProvider::new("Hello");
    let messages = vec![Message::User { content: "Hi".to_string() }];

    let mut stream = provider.stream(&messages).await.expect("stream should succeed");

    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.expect("stream chunks should not error"));
    }

    assert!(!chunks.is_empty(), "LlmProvider::stream should produce at least one chunk");
    assert_eq!(chunks.join(""), "Hello");
}

/// Test the contract for LlmProvider::stream when the provider fails.
#[tokio::test]
async fn test_llm_provider_stream_error_contract() {
    let provider = MockProvider::new("Response").with_failure();
    let messages = vec![Message::User { content: "Hello".to_string() }];

    let result = provider.stream(&messages).await;
    assert!(matches!(result, Err(EngineError::LlmApiError(_))));
}

/// Test the contract for LlmProvider::stream_with_tools: it must accept a
/// tool list and response format on every call, and surface usage via
/// `ProviderEvent::Usage`.
#[tokio::test]
async fn test_llm_provider_stream_with_tools_contract() {
    let provider = MockProvider::new("tool-capable response");
    let messages = vec![Message::User { content: "plan my trip".to_string() }];
    let tools: Vec<ToolDefinition> = Vec::new();

    let mut stream = provider
        .stream_with_tools(&messages, &tools, Some(ResponseFormat::JsonObject))
        .await
        .expect("stream_with_tools should succeed");

    let mut saw_usage = false;
    let mut text = String::new();
    while let Some(event) = stream.next().await {
        match event.expect("events should not error") {
            ProviderEvent::TextDelta(delta) => text.push_str(&delta),
            ProviderEvent::Usage(usage) => {
                saw_usage = true;
                assert_eq!(usage.prompt_tokens, 10);
                assert_eq!(usage.completion_tokens, 5);
            }
            ProviderEvent::ToolCallDelta { .. } => {}
        }
    }

    assert_eq!(text, "tool-capable response");
    assert!(saw_usage, "a completed stream should report usage");
}

/// Test the contract for LlmProvider::name
#[tokio::test]
async fn test_llm_provider_name_contract() {
    let provider = MockProvider::new("Response");
    assert_eq!(provider.name(), "MockProvider");
}

/// Test the contract for LlmProvider::config
#[tokio::test]
async fn test_llm_provider_config_contract() {
    let provider = MockProvider::new("Response");
    let config = provider.config();
    assert!(!config.model.is_empty());
    assert!(config.temperature >= 0.0 && config.temperature <= 2.0);
}

/// Providers must handle an empty message list without panicking.
#[tokio::test]
async fn test_llm_provider_empty_messages_contract() {
    let provider = MockProvider::new("Response");
    let messages: Vec<Message> = Vec::new();
    let result = provider.complete(&messages).await;
    assert!(result.is_ok());
}

/// Providers must be usable behind `Arc<dyn LlmProvider>` across tasks.
#[tokio::test]
async fn test_llm_provider_thread_safety_contract() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MockProvider>();
}

/// Concurrent calls against a shared provider should all complete
/// independently.
#[tokio::test]
async fn test_llm_provider_concurrent_calls_contract() {
    let provider = std::sync::Arc::new(MockProvider::new("Response"));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move {
                let messages = vec![Message::User { content: "Test".to_string() }];
                provider.complete(&messages).await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
