//! Tunables for the conversation engine and tool executor
//!
//! Mirrors `talk::agent::AgentConfig`'s builder-with-defaults shape: every
//! field has a `serde(default = ...)` so a partial JSON config (or none at
//! all) produces sane values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_compaction_threshold() -> f64 {
    0.5
}

fn default_context_window() -> usize {
    200_000
}

fn default_system_prompt_budget_tokens() -> usize {
    7_000
}

fn default_compaction_tail_messages() -> usize {
    10
}

fn default_max_tool_iterations() -> u32 {
    5
}

fn default_llm_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_compaction_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_cost_ceiling_usd() -> f64 {
    5.0
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Tunables for [`crate::engine::ConversationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fraction of `context_window` at which compaction (§4.5.1) triggers.
    /// Fixed at 0.5 per the open-question decision in DESIGN.md.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: f64,

    /// Model context window, in tokens, used for the compaction-threshold check.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Allowance reserved for the system prompt + tool catalog when
    /// estimating whether compaction is needed.
    #[serde(default = "default_system_prompt_budget_tokens")]
    pub system_prompt_budget_tokens: usize,

    /// Number of most-recent history entries kept verbatim across compaction.
    #[serde(default = "default_compaction_tail_messages")]
    pub compaction_tail_messages: usize,

    /// Cap on tool-call rounds within a single user turn (§4.5 step 4d).
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Per-call timeout for a streaming LLM turn.
    #[serde(
        default = "default_llm_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub llm_call_timeout: Duration,

    /// Per-call timeout for the non-streaming compaction LLM call.
    #[serde(
        default = "default_compaction_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub compaction_timeout: Duration,

    /// Idle duration after which a session becomes eligible for eviction.
    #[serde(
        default = "default_session_ttl",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub session_ttl: Duration,

    /// Cumulative per-session cost ceiling in USD.
    #[serde(default = "default_cost_ceiling_usd")]
    pub cost_ceiling_usd: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: default_compaction_threshold(),
            context_window: default_context_window(),
            system_prompt_budget_tokens: default_system_prompt_budget_tokens(),
            compaction_tail_messages: default_compaction_tail_messages(),
            max_tool_iterations: default_max_tool_iterations(),
            llm_call_timeout: default_llm_timeout(),
            compaction_timeout: default_compaction_timeout(),
            session_ttl: default_session_ttl(),
            cost_ceiling_usd: default_cost_ceiling_usd(),
        }
    }
}

impl EngineConfig {
    /// Token budget at which compaction should trigger for this config.
    pub fn compaction_token_budget(&self) -> usize {
        (self.context_window as f64 * self.compaction_threshold) as usize
    }
}

/// Tunables for [`crate::executor::ToolExecutor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutorConfig {
    /// Wall-clock timeout applied to every individual tool call.
    #[serde(
        default = "default_tool_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub tool_timeout: Duration,

    /// Maximum length, in characters, of a serialized tool result before
    /// the `"... [truncated]"` sentinel is applied (spec.md §4.2).
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,

    /// Number of optimistic-concurrency retries on a version conflict
    /// before surfacing `CONCURRENT_MODIFICATION` (spec.md §5).
    #[serde(default = "default_version_conflict_retries")]
    pub version_conflict_retries: u32,
}

fn default_max_result_chars() -> usize {
    2_000
}

fn default_version_conflict_retries() -> u32 {
    1
}

impl Default for ToolExecutorConfig {
    fn default() -> Self {
        Self {
            tool_timeout: default_tool_timeout(),
            max_result_chars: default_max_result_chars(),
            version_conflict_retries: default_version_conflict_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.compaction_threshold, 0.5);
        assert_eq!(config.context_window, 200_000);
        assert_eq!(config.compaction_token_budget(), 100_000);
        assert_eq!(config.max_tool_iterations, 5);
    }

    #[test]
    fn test_tool_executor_config_defaults() {
        let config = ToolExecutorConfig::default();
        assert_eq!(config.max_result_chars, 2_000);
        assert_eq!(config.version_conflict_retries, 1);
    }

    #[test]
    fn test_engine_config_serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_engine_config_partial_json_uses_defaults() {
        let partial: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(partial, EngineConfig::default());
    }
}
