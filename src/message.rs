//! Conversation message model
//!
//! `Message` is a tagged-variant type mirroring the wire shape a
//! function-calling chat API expects: system/user messages carry only
//! content, assistant messages may carry tool calls, and tool messages
//! carry the result keyed by the call id they answer.

use crate::types::{MessageId, ToolCallId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tool call emitted by the assistant, to be matched by exactly one
/// subsequent `tool` message carrying the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Kind of structured question the client should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredQuestionType {
    SingleChoice,
    MultipleChoice,
    Scale,
    DateRange,
    Text,
}

/// A machine-parseable discovery-phase question, at most one per assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: StructuredQuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<i32>,
}

/// One append-only entry in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: ToolCallId,
        tool_name: String,
        result: serde_json::Value,
    },
}

/// Wraps a [`Message`] with its id and creation timestamp for storage in a
/// session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: MessageId,
    #[serde(flatten)]
    pub message: Message,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn wrap(message: Message) -> Self {
        Self {
            id: MessageId::new(),
            message,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::wrap(Message::System {
            content: content.into(),
        })
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::wrap(Message::User {
            content: content.into(),
        })
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::wrap(Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        })
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::wrap(Message::Assistant {
            content: content.into(),
            tool_calls,
        })
    }

    pub fn tool_result(
        tool_call_id: ToolCallId,
        tool_name: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self::wrap(Message::Tool {
            tool_call_id,
            tool_name: tool_name.into(),
            result,
        })
    }

    /// Plain-text content, where applicable (empty for `tool` entries).
    pub fn content(&self) -> &str {
        match &self.message {
            Message::System { content } => content,
            Message::User { content } => content,
            Message::Assistant { content, .. } => content,
            Message::Tool { .. } => "",
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.message {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.message, Message::System { .. })
    }
}

/// Verifies the tool-call/tool-result pairing invariant from the testable
/// properties: every tool call id emitted by an assistant entry must be
/// immediately followed, before the next `assistant`/`user` entry, by
/// exactly one `tool` entry with a matching id.
pub fn validate_tool_call_pairing(history: &[HistoryEntry]) -> Result<(), String> {
    let mut i = 0;
    while i < history.len() {
        let calls = history[i].tool_calls();
        if calls.is_empty() {
            i += 1;
            continue;
        }

        let mut pending: std::collections::HashSet<&str> =
            calls.iter().map(|c| c.id.as_str()).collect();
        let mut j = i + 1;
        while j < history.len() && !pending.is_empty() {
            match &history[j].message {
                Message::Tool { tool_call_id, .. } => {
                    if !pending.remove(tool_call_id.as_str()) {
                        return Err(format!(
                            "tool message with id {} does not match any pending call",
                            tool_call_id
                        ));
                    }
                }
                Message::Assistant { .. } | Message::User { .. } => {
                    return Err(format!(
                        "{} tool call(s) unanswered before next turn",
                        pending.len()
                    ));
                }
                Message::System { .. } => {}
            }
            j += 1;
        }

        if !pending.is_empty() {
            return Err(format!("{} tool call(s) never answered", pending.len()));
        }
        i = j;
    }
    Ok(())
}
