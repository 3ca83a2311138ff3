//! Integration tests for the Tool trait and ToolRegistry
//!
//! Exercises registration, name-keyed lookup, JSON-Schema argument
//! validation, execution, and timeout behavior against mock tools, mirroring
//! how the executor drives real tools in `src/tools/`.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use trip_designer_core::tool::{Tool, ToolOutcome, ToolRegistry};
use trip_designer_core::{ItineraryId, ToolError};

/// Mock tool that echoes its input arguments back as the tool output.
struct EchoTool {
    schema: serde_json::Value,
}

impl EchoTool {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": [],
            }),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input arguments"
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
    ) -> Result<ToolOutcome, ToolError> {
        Ok(ToolOutcome::ok(arguments))
    }
}

/// Mock tool requiring a single required string argument.
struct RequiredParamTool {
    schema: serde_json::Value,
}

impl RequiredParamTool {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "required_field": { "type": "string" } },
                "required": ["required_field"],
            }),
        }
    }
}

#[async_trait]
impl Tool for RequiredParamTool {
    fn name(&self) -> &str {
        "required_param_tool"
    }

    fn description(&self) -> &str {
        "A tool with a required argument"
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
    ) -> Result<ToolOutcome, ToolError> {
        Ok(ToolOutcome::ok(arguments))
    }
}

/// Mock tool that sleeps past any reasonable timeout.
struct SlowTool {
    schema: serde_json::Value,
    delay: Duration,
}

impl SlowTool {
    fn new(delay: Duration) -> Self {
        Self {
            schema: json!({"type": "object", "properties": {}}),
            delay,
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "A tool that takes time to execute"
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
        _arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolOutcome::ok(json!({"status": "completed"})))
    }
}

/// Mock tool that always fails.
struct FailingTool {
    schema: serde_json::Value,
}

impl FailingTool {
    fn new() -> Self {
        Self {
            schema: json!({"type": "object", "properties": {}}),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "A tool that always fails"
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
        _arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "failing".to_string(),
            reason: "simulated failure".to_string(),
        })
    }
}

// ============================================================================
// Tool registration and lookup
// ============================================================================

#[tokio::test]
async fn test_register_and_get_tool() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.expect("registration should succeed");

    let tool = registry.get("echo").await;
    assert!(tool.is_some());
    assert_eq!(tool.unwrap().name(), "echo");
}

#[tokio::test]
async fn test_register_duplicate_name_fails() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.unwrap();

    let result = registry.register(Arc::new(EchoTool::new())).await;
    assert!(matches!(result, Err(ToolError::AlreadyRegistered(_))));
}

#[tokio::test]
async fn test_list_tools() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.unwrap();
    registry.register(Arc::new(SlowTool::new(Duration::from_millis(100)))).await.unwrap();

    let tools = registry.list().await;
    assert_eq!(tools.len(), 2);
}

#[tokio::test]
async fn test_schema_definitions_shape() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(RequiredParamTool::new())).await.unwrap();

    let defs = registry.schema_definitions().await;
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0]["name"], "required_param_tool");
    assert!(defs[0]["parameters"]["required"]
        .as_array()
        .unwrap()
        .contains(&json!("required_field")));
}

// ============================================================================
// Tool execution lifecycle
// ============================================================================

#[tokio::test]
async fn test_call_tool_basic() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.unwrap();

    let result = registry
        .call("echo", ItineraryId::new(), json!({"message": "hello"}))
        .await
        .expect("call should succeed");

    assert!(result.error.is_none());
    assert_eq!(result.output["message"], "hello");
}

#[tokio::test]
async fn test_call_tool_multiple_times() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.unwrap();

    for i in 0..5 {
        let result = registry
            .call("echo", ItineraryId::new(), json!({"count": i}))
            .await
            .unwrap();
        assert_eq!(result.output["count"], i);
    }
}

#[tokio::test]
async fn test_call_unknown_tool_fails() {
    let registry = ToolRegistry::new();
    let result = registry.call("nonexistent", ItineraryId::new(), json!({})).await;
    assert!(matches!(result, Err(ToolError::UnknownTool(_))));
}

// ============================================================================
// Argument validation
// ============================================================================

#[tokio::test]
async fn test_missing_required_argument_rejected() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(RequiredParamTool::new())).await.unwrap();

    let result = registry.call("required_param_tool", ItineraryId::new(), json!({})).await;
    assert!(matches!(result, Err(ToolError::ValidationFailed { .. })));
}

#[tokio::test]
async fn test_wrong_argument_type_rejected() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(RequiredParamTool::new())).await.unwrap();

    let result = registry
        .call("required_param_tool", ItineraryId::new(), json!({"required_field": 42}))
        .await;
    assert!(matches!(result, Err(ToolError::ValidationFailed { .. })));
}

#[tokio::test]
async fn test_non_object_arguments_rejected() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new())).await.unwrap();

    let result = registry.call("echo", ItineraryId::new(), json!(["not", "an", "object"])).await;
    assert!(matches!(result, Err(ToolError::ValidationFailed { .. })));
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn test_tool_execution_failure_propagates() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(FailingTool::new())).await.unwrap();

    let result = registry.call("failing", ItineraryId::new(), json!({})).await;
    match result {
        Err(ToolError::ExecutionFailed { tool_name, reason }) => {
            assert_eq!(tool_name, "failing");
            assert!(reason.contains("simulated failure"));
        }
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
}

// ============================================================================
// Timeout behavior
// ============================================================================

#[tokio::test]
async fn test_call_with_timeout_expires() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(SlowTool::new(Duration::from_secs(5)))).await.unwrap();

    let result = registry
        .call_with_timeout("slow", ItineraryId::new(), json!({}), Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(ToolError::Timeout { .. })));
}

#[tokio::test]
async fn test_call_with_timeout_within_budget_succeeds() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(SlowTool::new(Duration::from_millis(10)))).await.unwrap();

    let result = registry
        .call_with_timeout("slow", ItineraryId::new(), json!({}), Duration::from_secs(5))
        .await;
    assert!(result.is_ok());
}
