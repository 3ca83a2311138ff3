//! Conversation engine: the per-turn state machine (spec.md §4.5)
//!
//! `ConversationEngine::chat_stream` runs one user turn to completion:
//! append the message, compact history if it's grown past budget, stream
//! the LLM's response, execute any tool calls it emits, and loop back with
//! the same tool catalog until the assistant stops calling tools or the
//! per-turn round cap is hit. Every step along the way is pushed onto an
//! unbounded channel as a [`StreamEvent`], which the caller drains as a
//! `Stream`.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ItineraryError};
use crate::event::StreamEvent;
use crate::executor::ToolExecutor;
use crate::message::{HistoryEntry, Message, StructuredQuestion};
use crate::prompts::{compaction_prompt, prompt_kind_for, system_prompt_for};
use crate::provider::{LlmProvider, ProviderEvent, ResponseFormat, ToolCallAccumulator, ToolDefinition};
use crate::session::{AgentMode, CompactedPrefix, Session};
use crate::session_manager::compute_cost_usd;
use crate::storage::ItineraryStore;
use crate::summarizer::{estimate_tokens, summarize};
use crate::tool::ToolRegistry;
use crate::types::ItineraryId;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

/// Process-wide cache of engines keyed by API key (spec.md §5), so a
/// deployment wires its provider/registry/store once per key rather than
/// reconstructing them on every `chatStream` call.
pub type ConversationEngineCache = Arc<RwLock<HashMap<String, Arc<ConversationEngine>>>>;

/// Ties an [`LlmProvider`], a [`ToolExecutor`]/[`ToolRegistry`] pair, and the
/// backing [`ItineraryStore`] together into the per-turn algorithm.
pub struct ConversationEngine {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    executor: Arc<ToolExecutor>,
    store: Arc<dyn ItineraryStore>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        executor: Arc<ToolExecutor>,
        store: Arc<dyn ItineraryStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            executor,
            store,
            config,
        }
    }

    /// Build the system-prompt-plus-trip-summary text a new session is
    /// seeded with (spec.md §4.4's "initial context priming message"):
    /// today's date, the mode's system prompt, and the current itinerary
    /// state so the assistant never opens a session blind to existing
    /// bookings.
    pub async fn build_initial_context(
        &self,
        itinerary_id: ItineraryId,
        agent_mode: AgentMode,
    ) -> crate::error::Result<String> {
        let itinerary = self
            .store
            .get(&itinerary_id)
            .await?
            .ok_or(ItineraryError::NotFound(itinerary_id))?;

        let system_prompt = system_prompt_for(prompt_kind_for(agent_mode));
        let today = Utc::now().date_naive();
        let trip_summary = summarize(&itinerary);

        Ok(format!(
            "{system_prompt}\n\nToday's date: {today}.\n\nCurrent itinerary state:\n{trip_summary}"
        ))
    }

    /// Run one user turn to completion, returning a stream of the events
    /// produced along the way. The channel is fully populated before this
    /// future resolves — callers get a `Stream` to drain, not a live feed
    /// racing the turn's own progress.
    pub async fn chat_stream(
        &self,
        session: &mut Session,
        itinerary_id: ItineraryId,
        user_message: impl Into<String>,
    ) -> UnboundedReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        if session.total_cost_usd > self.config.cost_ceiling_usd {
            let _ = tx.send(StreamEvent::error(
                "COST_LIMIT_EXCEEDED",
                format!(
                    "session cost ${:.4} exceeds ceiling ${:.4}",
                    session.total_cost_usd, self.config.cost_ceiling_usd
                ),
            ));
            return UnboundedReceiverStream::new(rx);
        }

        session.append(HistoryEntry::user(user_message));

        if self.needs_compaction(session) {
            if let Err(err) = self.compact(session).await {
                warn!(error = %err, "compaction failed, continuing with full history");
                let _ = tx.send(StreamEvent::protocol_warning(
                    "COMPACTION_FAILED",
                    err.to_string(),
                ));
            }
        }

        self.run_turn(session, itinerary_id, &tx).await;
        UnboundedReceiverStream::new(rx)
    }

    /// Estimate whether the session's effective message list, plus the
    /// reserved system-prompt/tool-catalog allowance, has crossed the
    /// compaction threshold (spec.md §4.5.1).
    fn needs_compaction(&self, session: &Session) -> bool {
        let estimated: usize = session
            .effective_messages()
            .iter()
            .map(message_token_estimate)
            .sum();
        estimated + self.config.system_prompt_budget_tokens > self.config.compaction_token_budget()
    }

    /// Summarize everything but the most recent `compaction_tail_messages`
    /// entries into a single system message via one non-streaming LLM call,
    /// always preserving the session's first entry (the context-priming
    /// system message) verbatim.
    pub async fn compact(&self, session: &mut Session) -> EngineResult<()> {
        let tail_len = self.config.compaction_tail_messages;
        if session.history.len() <= tail_len {
            return Ok(());
        }

        let keep_first_system = session.history.first().is_some_and(|e| e.is_system());
        let summarize_from = if keep_first_system { 1 } else { 0 };
        let split_at = session.history.len() - tail_len;
        if split_at <= summarize_from {
            return Ok(());
        }

        let mut compaction_messages = vec![Message::System {
            content: compaction_prompt().to_string(),
        }];
        compaction_messages.extend(
            session.history[summarize_from..split_at]
                .iter()
                .map(|e| e.message.clone()),
        );

        let summary = tokio::time::timeout(
            self.config.compaction_timeout,
            self.provider.complete(&compaction_messages),
        )
        .await
        .map_err(|_| EngineError::LlmTimeout(self.config.compaction_timeout))??;

        session.compacted_prefix = Some(CompactedPrefix {
            summary,
            replaced_through_index: split_at,
            compacted_at: Utc::now(),
        });
        Ok(())
    }

    async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .schema_definitions()
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// The two-phase tool-call loop: stream a response, execute any tool
    /// calls it emits in order, append their results, and stream again with
    /// the same tool catalog until the assistant stops calling tools or the
    /// round cap (`max_tool_iterations`) is reached.
    async fn run_turn(
        &self,
        session: &mut Session,
        itinerary_id: ItineraryId,
        tx: &mpsc::UnboundedSender<StreamEvent>,
    ) {
        let tool_defs = self.tool_definitions().await;
        let response_format = match session.agent_mode {
            AgentMode::TripDesigner => Some(ResponseFormat::JsonObject),
            AgentMode::Help | AgentMode::TravelAgent => None,
        };
        let buffer_text = response_format == Some(ResponseFormat::JsonObject);

        let mut itinerary_updated = false;
        let mut round: u32 = 0;

        loop {
            if tx.is_closed() {
                return;
            }

            round += 1;
            if round > self.config.max_tool_iterations {
                let _ = tx.send(StreamEvent::protocol_warning(
                    "MAX_TOOL_ITERATIONS",
                    format!(
                        "exceeded {} tool-call round(s) for this turn",
                        self.config.max_tool_iterations
                    ),
                ));
                break;
            }

            let messages = session.effective_messages();
            let stream_result = tokio::time::timeout(
                self.config.llm_call_timeout,
                self.provider.stream_with_tools(&messages, &tool_defs, response_format),
            )
            .await;

            let mut provider_stream = match stream_result {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => {
                    let _ = tx.send(StreamEvent::error("LLM_API_ERROR", err.to_string()));
                    return;
                }
                Err(_) => {
                    let _ = tx.send(StreamEvent::error(
                        "LLM_TIMEOUT",
                        format!("LLM call timed out after {:?}", self.config.llm_call_timeout),
                    ));
                    return;
                }
            };

            let mut content = String::new();
            let mut accumulator = ToolCallAccumulator::new();
            let mut usage = crate::provider::Usage::default();

            while let Some(event) = provider_stream.next().await {
                match event {
                    Ok(ProviderEvent::TextDelta(delta)) => {
                        content.push_str(&delta);
                        if !buffer_text {
                            let _ = tx.send(StreamEvent::text(delta));
                        }
                    }
                    Ok(ProviderEvent::ToolCallDelta { index, id, name, arguments_fragment }) => {
                        accumulator.push(index, id, name, &arguments_fragment);
                    }
                    Ok(ProviderEvent::Usage(reported)) => usage = reported,
                    Err(err) => {
                        let _ = tx.send(StreamEvent::error("LLM_API_ERROR", err.to_string()));
                        return;
                    }
                }
            }

            let cost = compute_cost_usd(
                &self.provider.config().model,
                usage.prompt_tokens,
                usage.completion_tokens,
            );
            session.record_usage(usage.prompt_tokens, usage.completion_tokens, cost);

            let tool_calls = accumulator.finish();

            if tool_calls.is_empty() {
                session.append(HistoryEntry::assistant(content.clone()));
                finalize_turn(session, &content, response_format, itinerary_updated, tx);
                return;
            }

            session.append(HistoryEntry::assistant_with_tool_calls(content.clone(), tool_calls.clone()));

            for call in tool_calls {
                if tx.is_closed() {
                    return;
                }

                let _ = tx.send(StreamEvent::tool_call(
                    call.id.to_string(),
                    call.tool_name.clone(),
                    call.arguments.clone(),
                ));

                let outcome = self
                    .executor
                    .execute(&call.tool_name, itinerary_id, call.arguments.clone())
                    .await;
                let success = outcome.error.is_none();

                if success {
                    if let Some(tool) = self.registry.get(&call.tool_name).await {
                        if tool.is_mutating() {
                            itinerary_updated = true;
                        }
                    }
                }

                let _ = tx.send(StreamEvent::tool_result(
                    call.id.to_string(),
                    call.tool_name.clone(),
                    success,
                    outcome.output.clone(),
                ));
                session.append(HistoryEntry::tool_result(call.id, call.tool_name, outcome.output));
            }
        }

        let _ = tx.send(StreamEvent::Done {
            prompt_tokens: session.prompt_tokens,
            completion_tokens: session.completion_tokens,
            cost_usd: session.total_cost_usd,
            itinerary_updated,
        });
    }
}

fn message_token_estimate(message: &Message) -> usize {
    match message {
        Message::System { content } | Message::User { content } => estimate_tokens(content),
        Message::Assistant { content, tool_calls } => {
            let args: usize = tool_calls
                .iter()
                .map(|c| estimate_tokens(&c.arguments.to_string()))
                .sum();
            estimate_tokens(content) + args
        }
        Message::Tool { result, .. } => estimate_tokens(&result.to_string()),
    }
}

/// Parse the final assistant content once the tool-call loop has ended.
/// In `TripDesigner` discovery turns the content is a JSON envelope
/// (`{"message": ..., "structuredQuestions": [...]}`, spec.md §4.5.2); in
/// every other mode `content` was already streamed verbatim as `Text`
/// deltas and nothing further is emitted here besides `Done`.
fn finalize_turn(
    session: &Session,
    content: &str,
    response_format: Option<ResponseFormat>,
    itinerary_updated: bool,
    tx: &mpsc::UnboundedSender<StreamEvent>,
) {
    if response_format == Some(ResponseFormat::JsonObject) {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) => {
                let message_text = value.get("message").and_then(|m| m.as_str()).unwrap_or(content);
                let _ = tx.send(StreamEvent::text(message_text));

                if let Some(questions_value) = value.get("structuredQuestions") {
                    match serde_json::from_value::<Vec<StructuredQuestion>>(questions_value.clone()) {
                        Ok(questions) if questions.len() <= 1 => {
                            if !questions.is_empty() {
                                let _ = tx.send(StreamEvent::StructuredQuestions { questions });
                            }
                        }
                        Ok(questions) => {
                            let _ = tx.send(StreamEvent::protocol_warning(
                                "STRUCTURED_QUESTIONS_PROTOCOL",
                                format!(
                                    "assistant emitted {} structured questions in one turn, expected 0 or 1",
                                    questions.len()
                                ),
                            ));
                        }
                        Err(err) => {
                            let _ = tx.send(StreamEvent::protocol_warning(
                                "STRUCTURED_QUESTIONS_PROTOCOL",
                                format!("malformed structuredQuestions: {err}"),
                            ));
                        }
                    }
                }
            }
            Err(err) => {
                let _ = tx.send(StreamEvent::protocol_warning(
                    "STRUCTURED_QUESTIONS_PROTOCOL",
                    format!("expected a JSON object response, got malformed content: {err}"),
                ));
                let _ = tx.send(StreamEvent::text(content));
            }
        }
    }

    let _ = tx.send(StreamEvent::Done {
        prompt_tokens: session.prompt_tokens,
        completion_tokens: session.completion_tokens,
        cost_usd: session.total_cost_usd,
        itinerary_updated,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::Itinerary;
    use crate::provider::{ProviderConfig, ProviderResult, TextStream, Usage};
    use crate::storage::memory::InMemoryItineraryStore;
    use crate::tools::build_default_registry;
    use crate::types::ToolCallId;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex as AsyncMutex;

    struct ScriptedProvider {
        config: ProviderConfig,
        turns: AsyncMutex<VecDeque<Vec<ProviderEvent>>>,
        completions: AsyncMutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(turns: Vec<Vec<ProviderEvent>>) -> Self {
            Self {
                config: ProviderConfig::new("mock-model"),
                turns: AsyncMutex::new(turns.into()),
                completions: AsyncMutex::new(VecDeque::new()),
            }
        }

        fn with_completions(self, completions: Vec<String>) -> Self {
            Self {
                completions: AsyncMutex::new(completions.into()),
                ..self
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _messages: &[Message]) -> ProviderResult<String> {
            Ok(self.completions.lock().await.pop_front().unwrap_or_default())
        }

        async fn stream(&self, _messages: &[Message]) -> ProviderResult<TextStream> {
            unimplemented!("not exercised by engine tests")
        }

        async fn stream_with_tools(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _response_format: Option<ResponseFormat>,
        ) -> ProviderResult<crate::provider::EventStream> {
            let events = self.turns.lock().await.pop_front().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn config(&self) -> &ProviderConfig {
            &self.config
        }
    }

    async fn build_engine(
        provider: ScriptedProvider,
    ) -> (ConversationEngine, ItineraryId) {
        let store: Arc<dyn ItineraryStore> = Arc::new(InMemoryItineraryStore::new());
        let itinerary_id = store.create(Itinerary::new("Lisbon trip", "user-1")).await.unwrap();
        let registry = Arc::new(build_default_registry(store.clone()).await.unwrap());
        let executor = Arc::new(ToolExecutor::new(registry.clone(), Default::default()));
        let engine = ConversationEngine::new(Arc::new(provider), registry, executor, store, EngineConfig::default());
        (engine, itinerary_id)
    }

    async fn drain(mut stream: UnboundedReceiverStream<StreamEvent>) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        while let Some(event) = stream.next().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_turn_without_tool_calls_streams_text_and_completes() {
        let provider = ScriptedProvider::new(vec![vec![
            ProviderEvent::TextDelta("Hello".to_string()),
            ProviderEvent::TextDelta(" there".to_string()),
            ProviderEvent::Usage(Usage { prompt_tokens: 50, completion_tokens: 10 }),
        ]]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TravelAgent);

        let events = drain(engine.chat_stream(&mut session, itinerary_id, "hi").await).await;

        let texts: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Text { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hello", " there"]);
        assert!(matches!(events.last(), Some(StreamEvent::Done { itinerary_updated: false, .. })));
    }

    #[tokio::test]
    async fn test_turn_with_tool_call_executes_and_reinvokes_provider() {
        let call_id = ToolCallId::new("call_1");
        let provider = ScriptedProvider::new(vec![
            vec![ProviderEvent::ToolCallDelta {
                index: 0,
                id: Some(call_id.clone()),
                name: Some("get_itinerary".to_string()),
                arguments_fragment: "{}".to_string(),
            }],
            vec![ProviderEvent::TextDelta("All set.".to_string())],
        ]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TravelAgent);

        let events = drain(engine.chat_stream(&mut session, itinerary_id, "what's booked?").await).await;

        assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolCall { name, .. } if name == "get_itinerary")));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolResult { success: true, .. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { delta } if delta == "All set.")));
        assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));

        let tool_entries = session
            .history
            .iter()
            .filter(|e| matches!(e.message, Message::Tool { .. }))
            .count();
        assert_eq!(tool_entries, 1);
    }

    #[tokio::test]
    async fn test_cost_ceiling_exceeded_rejects_next_message() {
        let provider = ScriptedProvider::new(vec![]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TravelAgent);
        session.total_cost_usd = 100.0;

        let events = drain(engine.chat_stream(&mut session, itinerary_id, "anything").await).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error { code, .. } if code == "COST_LIMIT_EXCEEDED"));
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_max_tool_iterations_cap_emits_protocol_warning() {
        let mut turns = Vec::new();
        for i in 0..6 {
            turns.push(vec![ProviderEvent::ToolCallDelta {
                index: 0,
                id: Some(ToolCallId::new(format!("call_{i}"))),
                name: Some("get_itinerary".to_string()),
                arguments_fragment: "{}".to_string(),
            }]);
        }
        let provider = ScriptedProvider::new(turns);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TravelAgent);

        let events = drain(engine.chat_stream(&mut session, itinerary_id, "loop forever").await).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::ProtocolWarning { code, .. } if code == "MAX_TOOL_ITERATIONS")));
        assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_structured_questions_over_limit_warns_instead_of_emitting() {
        let content = serde_json::json!({
            "message": "A couple of quick questions.",
            "structuredQuestions": [
                {"id": "q1", "type": "text", "question": "When?"},
                {"id": "q2", "type": "text", "question": "Who?"},
            ],
        })
        .to_string();
        let provider = ScriptedProvider::new(vec![vec![ProviderEvent::TextDelta(content)]]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TripDesigner);

        let events = drain(engine.chat_stream(&mut session, itinerary_id, "hi").await).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::ProtocolWarning { code, .. } if code == "STRUCTURED_QUESTIONS_PROTOCOL")));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::StructuredQuestions { .. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { delta } if delta == "A couple of quick questions.")));
    }

    #[tokio::test]
    async fn test_compact_preserves_first_system_message_and_tail() {
        let provider = ScriptedProvider::new(vec![]).with_completions(vec!["user wants a 5-day Lisbon trip".to_string()]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TripDesigner);
        session.append(HistoryEntry::system("You are a trip designer."));
        for i in 0..20 {
            session.append(HistoryEntry::user(format!("message {i}")));
        }

        engine.compact(&mut session).await.unwrap();

        assert!(session.compacted_prefix.is_some());
        let messages = session.effective_messages();
        assert!(matches!(&messages[0], Message::System { content } if content == "You are a trip designer."));
        assert!(matches!(&messages[1], Message::System { content } if content.contains("5-day Lisbon trip")));
        let tail_len = engine.config.compaction_tail_messages;
        assert_eq!(messages.len(), 2 + tail_len);
    }

    #[tokio::test]
    async fn test_compact_is_noop_below_tail_length() {
        let provider = ScriptedProvider::new(vec![]);
        let (engine, itinerary_id) = build_engine(provider).await;
        let mut session = Session::new(itinerary_id, AgentMode::TripDesigner);
        session.append(HistoryEntry::user("short conversation"));

        engine.compact(&mut session).await.unwrap();
        assert!(session.compacted_prefix.is_none());
    }
}
