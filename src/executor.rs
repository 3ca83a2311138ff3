//! Tool executor: the infallible boundary between the conversation engine
//! and the fallible `ToolRegistry`/`Tool` layer
//!
//! spec.md §4.2/§4.3 requires that a tool call never throws out to the
//! engine: whatever goes wrong — unknown name, schema validation, a timeout,
//! a version conflict that survived its retry, storage failure — becomes a
//! `{"success": false, "error": "..."}` outcome the LLM can see and react to
//! in its next turn, never a propagated `Result::Err`. `ToolRegistry::call`
//! and every `Tool::call` impl are still fallible internally (that's how
//! `mutate_with_retry` composes with `?`); this module is where that
//! fallibility is finally discharged.

use crate::config::ToolExecutorConfig;
use crate::error::ToolError;
use crate::tool::{ToolOutcome, ToolRegistry};
use crate::types::ItineraryId;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

const TRUNCATION_SUFFIX: &str = "... [truncated]";

/// Truncate a serialized tool result to `max_chars`, appending the literal
/// `"... [truncated]"` sentinel spec.md §4.2 specifies. Operates on the
/// string form of `value`, not the parsed JSON, since truncating structured
/// data mid-key would produce invalid JSON.
pub fn truncate_output(value: &serde_json::Value, max_chars: usize) -> serde_json::Value {
    let serialized = value.to_string();
    if serialized.chars().count() <= max_chars {
        return value.clone();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_SUFFIX.len());
    let truncated: String = serialized.chars().take(keep).collect();
    json!(format!("{truncated}{TRUNCATION_SUFFIX}"))
}

fn error_outcome(message: impl Into<String>) -> ToolOutcome {
    let message = message.into();
    ToolOutcome {
        output: json!({"success": false, "error": message}),
        error: Some(message),
        metadata: Default::default(),
    }
}

/// Wraps a [`ToolRegistry`] with the timeout/truncation/error-normalization
/// policy spec.md §4.2/§4.3 describes.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ToolExecutorConfig,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, config: ToolExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Execute a tool call by name. Never returns `Err`: any failure from
    /// the registry or the underlying tool is normalized into a
    /// `ToolOutcome` whose `error` field is set, so the engine always has a
    /// well-formed history entry to hand back to the LLM.
    pub async fn execute(
        &self,
        tool_name: &str,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolOutcome {
        let result = self
            .registry
            .call_with_timeout(tool_name, itinerary_id, arguments, self.config.tool_timeout)
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(tool_name, error = %err, "tool call failed");
                error_outcome(describe(&err))
            }
        };

        ToolOutcome {
            output: truncate_output(&outcome.output, self.config.max_result_chars),
            ..outcome
        }
    }
}

fn describe(err: &ToolError) -> String {
    match err {
        ToolError::UnknownTool(name) => format!("unknown tool: {name}"),
        ToolError::AlreadyRegistered(name) => format!("tool already registered: {name}"),
        ToolError::ValidationFailed { tool_name, reason } => {
            format!("invalid arguments for {tool_name}: {reason}")
        }
        ToolError::ExecutionFailed { tool_name, reason } => format!("{tool_name} failed: {reason}"),
        ToolError::Timeout { tool_name, timeout } => {
            format!("{tool_name} timed out after {timeout:?}")
        }
        ToolError::Itinerary(inner) => inner.to_string(),
    }
}
