//! Scripted walkthrough of a single trip-planning turn, no network access
//!
//! Runs the full two-phase tool-calling loop against a canned provider that
//! plays back one recorded exchange: the assistant calls `add_flight`, the
//! engine executes it against a real in-memory itinerary, and the assistant
//! produces a final discovery-mode response.
//!
//! Run with: cargo run --example plan_trip

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use trip_designer_core::error::EngineError;
use trip_designer_core::message::Message;
use trip_designer_core::provider::{
    EventStream, LlmProvider, ProviderConfig, ProviderEvent, ProviderResult, ResponseFormat,
    TextStream, ToolDefinition, Usage,
};
use trip_designer_core::session::{AgentMode, Session};
use trip_designer_core::storage::memory::InMemoryItineraryStore;
use trip_designer_core::storage::ItineraryStore;
use trip_designer_core::tools::build_default_registry;
use trip_designer_core::types::ToolCallId;
use trip_designer_core::{ConversationEngine, EngineConfig, Itinerary, StreamEvent, ToolExecutor, ToolExecutorConfig};

/// Plays back a fixed script of provider turns: first a tool call, then a
/// plain text reply. A real provider would call out to an LLM API instead.
struct ScriptedProvider {
    config: ProviderConfig,
    turns: Mutex<std::collections::VecDeque<Vec<ProviderEvent>>>,
}

impl ScriptedProvider {
    fn new(turns: Vec<Vec<ProviderEvent>>) -> Self {
        Self {
            config: ProviderConfig::new("gpt-4o"),
            turns: Mutex::new(turns.into()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _messages: &[Message]) -> ProviderResult<String> {
        Ok("summary unavailable in this demo".to_string())
    }

    async fn stream(&self, _messages: &[Message]) -> ProviderResult<TextStream> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn stream_with_tools(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _response_format: Option<ResponseFormat>,
    ) -> ProviderResult<EventStream> {
        let mut turns = self.turns.lock().await;
        let turn = turns
            .pop_front()
            .ok_or_else(|| EngineError::LlmApiError("scripted provider ran out of turns".to_string()))?;
        Ok(Box::pin(futures::stream::iter(turn.into_iter().map(Ok))))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let store: Arc<dyn ItineraryStore> = Arc::new(InMemoryItineraryStore::new());
    let itinerary_id = store.create(Itinerary::new("Lisbon long weekend", "user-1")).await.unwrap();

    let registry = Arc::new(build_default_registry(store.clone()).await.unwrap());
    let executor = Arc::new(ToolExecutor::new(registry.clone(), ToolExecutorConfig::default()));

    let provider = Arc::new(ScriptedProvider::new(vec![
        vec![
            ProviderEvent::ToolCallDelta {
                index: 0,
                id: Some(ToolCallId::new("call_1")),
                name: Some("add_flight".to_string()),
                arguments_fragment: serde_json::json!({
                    "airlineName": "TAP Air Portugal",
                    "airlineCode": "TP",
                    "flightNumber": "TP1234",
                    "originName": "New York JFK",
                    "originCode": "JFK",
                    "destinationName": "Lisbon",
                    "destinationCode": "LIS",
                    "cabinClass": "economy",
                    "startDatetime": "2026-09-10T19:30:00Z",
                    "endDatetime": "2026-09-11T08:45:00Z",
                }).to_string(),
            },
            ProviderEvent::Usage(Usage { prompt_tokens: 420, completion_tokens: 60 }),
        ],
        vec![
            ProviderEvent::TextDelta(
                serde_json::json!({
                    "message": "Booked your flight to Lisbon. Who else is traveling with you?",
                    "structuredQuestions": [],
                })
                .to_string(),
            ),
            ProviderEvent::Usage(Usage { prompt_tokens: 510, completion_tokens: 28 }),
        ],
    ]));

    let engine = ConversationEngine::new(provider, registry, executor, store, EngineConfig::default());

    let initial_context = engine
        .build_initial_context(itinerary_id, AgentMode::TripDesigner)
        .await
        .expect("itinerary was just created, so this cannot be NotFound");

    let mut session = Session::new(itinerary_id, AgentMode::TripDesigner);
    session.append(trip_designer_core::message::HistoryEntry::system(initial_context));

    let mut stream = engine
        .chat_stream(&mut session, itinerary_id, "Book me a flight to Lisbon for mid-September")
        .await;

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::ToolCall { name, arguments, .. } => {
                println!("-> calling {name} with {arguments}");
            }
            StreamEvent::ToolResult { name, success, .. } => {
                println!("<- {name} returned success={success}");
            }
            StreamEvent::Text { delta } => {
                println!("assistant: {delta}");
            }
            StreamEvent::Done { cost_usd, itinerary_updated, .. } => {
                println!("turn finished, cost=${cost_usd:.4} itinerary_updated={itinerary_updated}");
            }
            other => println!("{other:?}"),
        }
    }
}
