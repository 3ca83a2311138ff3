//! Tool integration for the function-calling contract
//!
//! Tools are described to the LLM provider as JSON-Schema objects (the
//! `parameters()` method) and addressed by name rather than id, since the
//! provider's `tool_calls` only ever carry a name back.

use crate::error::{ToolError, ToolResult as ToolCallResult};
use crate::types::ItineraryId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Outcome of a single tool execution, returned to the engine for inclusion
/// in a `tool` history entry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolOutcome {
    pub output: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolOutcome {
    pub fn ok(output: serde_json::Value) -> Self {
        Self {
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }
}

/// A single tool available to the LLM for function calling.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Name the LLM addresses this tool by; also the registry key.
    fn name(&self) -> &str;

    /// Description surfaced to the LLM in the tools list.
    fn description(&self) -> &str;

    /// JSON-Schema object describing this tool's parameters, in the shape
    /// an OpenAI/Anthropic-style function-calling `parameters` field expects
    /// (`{"type": "object", "properties": {...}, "required": [...]}`).
    fn parameters_schema(&self) -> &serde_json::Value;

    /// Whether this tool mutates itinerary state (read tools bypass the
    /// optimistic-concurrency retry path in the executor).
    fn is_mutating(&self) -> bool;

    /// Execute the tool against the itinerary it was invoked for and
    /// already-validated arguments. Read tools ignore `itinerary_id` beyond
    /// loading; mutating tools route through it for the load-mutate-persist
    /// cycle.
    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome>;

    /// Validate `arguments` against `parameters_schema`'s required list and
    /// coarse JSON types. This is a lightweight check, not a full JSON
    /// Schema validator: it exists to reject obviously malformed tool calls
    /// before touching storage.
    fn validate_arguments(&self, arguments: &serde_json::Value) -> ToolCallResult<()> {
        trace!(tool_name = %self.name(), "validating tool arguments");

        let schema = self.parameters_schema();
        let properties = schema.get("properties").and_then(|p| p.as_object());
        let required = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();

        let args_obj = arguments.as_object().ok_or_else(|| ToolError::ValidationFailed {
            tool_name: self.name().to_string(),
            reason: "arguments must be a JSON object".to_string(),
        })?;

        for field in &required {
            if !args_obj.contains_key(*field) {
                warn!(tool_name = %self.name(), field = %field, "missing required argument");
                return Err(ToolError::ValidationFailed {
                    tool_name: self.name().to_string(),
                    reason: format!("missing required argument: {}", field),
                });
            }
        }

        if let Some(properties) = properties {
            for (key, value) in args_obj {
                if let Some(prop_schema) = properties.get(key) {
                    if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                        if !json_type_matches(value, expected_type) {
                            warn!(tool_name = %self.name(), field = %key, expected_type, "argument type mismatch");
                            return Err(ToolError::ValidationFailed {
                                tool_name: self.name().to_string(),
                                reason: format!(
                                    "argument '{}' has wrong type, expected {}",
                                    key, expected_type
                                ),
                            });
                        }
                    }
                }
            }
        }

        debug!(tool_name = %self.name(), arg_count = args_obj.len(), "argument validation successful");
        Ok(())
    }
}

fn json_type_matches(value: &serde_json::Value, expected_type: &str) -> bool {
    use serde_json::Value;
    match expected_type {
        "string" => matches!(value, Value::String(_)),
        "number" | "integer" => matches!(value, Value::Number(_)),
        "boolean" => matches!(value, Value::Bool(_)),
        "object" => matches!(value, Value::Object(_)),
        "array" => matches!(value, Value::Array(_)),
        "null" => matches!(value, Value::Null),
        _ => true,
    }
}

/// Name-keyed registry of tools available to the conversation engine.
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        info!("creating new tool registry");
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) -> ToolCallResult<()> {
        let name = tool.name().to_string();
        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            warn!(tool_name = %name, "attempted to register duplicate tool");
            return Err(ToolError::AlreadyRegistered(name));
        }
        debug!(tool_name = %name, total_tools = tools.len() + 1, "tool registered");
        tools.insert(name, tool);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.read().await.values().cloned().collect()
    }

    /// JSON-Schema tool definitions in the shape a provider's `tools` field
    /// expects: `[{"name", "description", "parameters"}, ...]`.
    pub async fn schema_definitions(&self) -> Vec<serde_json::Value> {
        let tools = self.tools.read().await;
        tools
            .values()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                })
            })
            .collect()
    }

    /// Validate and invoke a tool by name against a specific itinerary.
    pub async fn call(
        &self,
        name: &str,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        info!(tool_name = %name, %itinerary_id, "executing tool");

        let tool = self
            .get(name)
            .await
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.validate_arguments(&arguments)?;
        let result = tool.call(itinerary_id, arguments).await?;

        debug!(tool_name = %name, has_error = result.error.is_some(), "tool execution completed");
        Ok(result)
    }

    /// Invoke a tool by name with a hard wall-clock timeout.
    pub async fn call_with_timeout(
        &self,
        name: &str,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
        timeout_duration: Duration,
    ) -> ToolCallResult<ToolOutcome> {
        match timeout(timeout_duration, self.call(name, itinerary_id, arguments)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(tool_name = %name, timeout_secs = timeout_duration.as_secs(), "tool execution timed out");
                Err(ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout: timeout_duration,
                })
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        schema: serde_json::Value,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                schema: json!({
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"],
                }),
            }
        }
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the message argument back"
        }

        fn parameters_schema(&self) -> &serde_json::Value {
            &self.schema
        }

        fn is_mutating(&self) -> bool {
            false
        }

        async fn call(
            &self,
            _itinerary_id: ItineraryId,
            arguments: serde_json::Value,
        ) -> ToolCallResult<ToolOutcome> {
            Ok(ToolOutcome::ok(arguments))
        }
    }

    struct SlowTool;

    #[async_trait::async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Sleeps past any reasonable timeout"
        }

        fn parameters_schema(&self) -> &serde_json::Value {
            static SCHEMA: std::sync::OnceLock<serde_json::Value> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| json!({"type": "object", "properties": {}}))
        }

        fn is_mutating(&self) -> bool {
            false
        }

        async fn call(
            &self,
            _itinerary_id: ItineraryId,
            _arguments: serde_json::Value,
        ) -> ToolCallResult<ToolOutcome> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutcome::ok(json!(null)))
        }
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).await.unwrap();

        let result = registry
            .call("echo", ItineraryId::new(), json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result.output["message"], "hi");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).await.unwrap();
        let result = registry.register(Arc::new(EchoTool::new())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool_call_fails() {
        let registry = ToolRegistry::new();
        let result = registry.call("nonexistent", ItineraryId::new(), json!({})).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_missing_required_argument_rejected() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).await.unwrap();
        let result = registry.call("echo", ItineraryId::new(), json!({})).await;
        assert!(matches!(result, Err(ToolError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn test_call_with_timeout_expires() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(SlowTool)).await.unwrap();

        let result = registry
            .call_with_timeout("slow", ItineraryId::new(), json!({}), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(ToolError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_schema_definitions_shape() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).await.unwrap();

        let defs = registry.schema_definitions().await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0]["name"], "echo");
        assert!(defs[0]["parameters"]["required"].as_array().unwrap().contains(&json!("message")));
    }
}
