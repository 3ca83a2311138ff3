//! Live trip-planning turn against a real LLM provider
//!
//! Drives one `chatStream` turn over whichever provider is configured, using
//! the real tool catalog against a freshly created in-memory itinerary.
//!
//! Prerequisites: set one of
//!   - OPENAI_API_KEY (uses gpt-4o)
//!   - ANTHROPIC_API_KEY (uses claude-sonnet-4-20250514)
//!
//! Run with: cargo run --example plan_trip_live

use futures::StreamExt;
use std::sync::Arc;
use trip_designer_core::message::HistoryEntry;
use trip_designer_core::provider::LlmProvider;
use trip_designer_core::session::{AgentMode, Session};
use trip_designer_core::storage::memory::InMemoryItineraryStore;
use trip_designer_core::storage::ItineraryStore;
use trip_designer_core::tools::build_default_registry;
use trip_designer_core::{
    AnthropicProvider, ConversationEngine, EngineConfig, Itinerary, OpenAiProvider, StreamEvent,
    ToolExecutor, ToolExecutorConfig,
};

fn provider_from_env() -> Arc<dyn LlmProvider> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        Arc::new(OpenAiProvider::new(key))
    } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        Arc::new(AnthropicProvider::new(key))
    } else {
        panic!("set OPENAI_API_KEY or ANTHROPIC_API_KEY to run this example");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let provider = provider_from_env();
    let store: Arc<dyn ItineraryStore> = Arc::new(InMemoryItineraryStore::new());
    let itinerary_id = store.create(Itinerary::new("Weekend in Kyoto", "user-1")).await.unwrap();

    let registry = Arc::new(build_default_registry(store.clone()).await.unwrap());
    let executor = Arc::new(ToolExecutor::new(registry.clone(), ToolExecutorConfig::default()));

    let engine = ConversationEngine::new(provider, registry, executor, store, EngineConfig::default());

    let initial_context = engine
        .build_initial_context(itinerary_id, AgentMode::TripDesigner)
        .await
        .expect("itinerary was just created, so this cannot be NotFound");

    let mut session = Session::new(itinerary_id, AgentMode::TripDesigner);
    session.append(HistoryEntry::system(initial_context));

    let mut stream = engine
        .chat_stream(&mut session, itinerary_id, "I want to plan a long weekend trip to Kyoto in late October")
        .await;

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Text { delta } => print!("{delta}"),
            StreamEvent::ToolCall { name, arguments, .. } => {
                eprintln!("\n[tool call] {name} {arguments}");
            }
            StreamEvent::ToolResult { name, success, .. } => {
                eprintln!("[tool result] {name} success={success}");
            }
            StreamEvent::StructuredQuestions { questions } => {
                eprintln!("[structured questions] {questions:?}");
            }
            StreamEvent::ProtocolWarning { code, detail } => {
                eprintln!("[protocol warning] {code}: {detail}");
            }
            StreamEvent::Error { code, message } => {
                eprintln!("\n[error] {code}: {message}");
            }
            StreamEvent::Done { cost_usd, itinerary_updated, .. } => {
                println!("\n\n(turn cost ${cost_usd:.4}, itinerary_updated={itinerary_updated})");
            }
        }
    }
}
