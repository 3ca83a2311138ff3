//! Error types for the trip designer core
//!
//! Layered `thiserror` enums per subsystem, aggregated into a single
//! [`CoreError`] the way the rest of this crate is composed: each
//! subsystem owns its error kinds and converts into the top-level type
//! via `#[from]`.

use crate::types::{ItineraryId, SegmentId, SessionId};
use thiserror::Error;

/// Itinerary/segment invariant and lookup errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ItineraryError {
    /// Referenced itinerary missing from storage
    #[error("itinerary not found: {0}")]
    NotFound(ItineraryId),

    /// Itinerary already exists under this id
    #[error("itinerary already exists: {0}")]
    AlreadyExists(ItineraryId),

    /// Referenced segment missing within an otherwise valid itinerary
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// Post-mutation global invariant breach (duplicate ids, dates out of bounds, etc.)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Optimistic-concurrency version mismatch survived a retry
    #[error("concurrent modification on itinerary {0}")]
    ConcurrentModification(ItineraryId),

    /// Serialization/deserialization of a persisted record failed
    #[error("itinerary serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal storage error
    #[error("storage error: {0}")]
    Storage(String),
}

/// Tool lookup, validation, and execution errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool registered under this name
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered
    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),

    /// Arguments failed schema validation
    #[error("tool argument validation failed for {tool_name}: {reason}")]
    ValidationFailed { tool_name: String, reason: String },

    /// Tool ran but failed (storage error, invariant breach, etc.)
    #[error("tool execution failed for {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// Tool exceeded its allotted execution time
    #[error("tool {tool_name} timed out after {timeout:?}")]
    Timeout {
        tool_name: String,
        timeout: std::time::Duration,
    },

    /// The mutation the tool attempted broke an itinerary invariant
    #[error(transparent)]
    Itinerary(#[from] ItineraryError),
}

/// Session lifecycle and accounting errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// Unknown or evicted session id
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// A chatStream is already in flight for this session id
    #[error("session busy: {0}")]
    Busy(SessionId),

    /// Cumulative cost for this session exceeds its configured ceiling
    #[error("session cost limit exceeded: {session_id} (${spent:.4} > ${limit:.4})")]
    CostLimitExceeded {
        session_id: SessionId,
        spent: f64,
        limit: f64,
    },

    /// The itinerary backing this session is missing
    #[error(transparent)]
    Itinerary(#[from] ItineraryError),
}

/// Conversation engine and LLM-provider errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// Provider call did not complete in time
    #[error("LLM call timed out after {0:?}")]
    LlmTimeout(std::time::Duration),

    /// Provider returned an error or malformed response
    #[error("LLM API error: {0}")]
    LlmApiError(String),

    /// Tool-call loop exceeded the per-turn iteration cap
    #[error("exceeded maximum tool-call iterations ({0}) for this turn")]
    MaxToolIterations(u32),

    /// Context could not be reduced to fit the model's window even after compaction
    #[error("context limit exceeded: estimated {estimated} tokens > window {window}")]
    ContextLimitExceeded { estimated: usize, window: usize },

    /// Propagated session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Propagated tool error
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Malformed JSON from the provider or in tool arguments
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error type for the crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Itinerary-layer error
    #[error(transparent)]
    Itinerary(#[from] ItineraryError),

    /// Tool-layer error
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Session-layer error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Engine-layer error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid input that does not fit a more specific variant
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (bad env var, invalid builder value)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catch-all for conditions that should not occur in normal operation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result alias for itinerary-layer operations
pub type ItineraryResult<T> = std::result::Result<T, ItineraryError>;

/// Result alias for tool-layer operations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Result alias for session-layer operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result alias for engine-layer operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
