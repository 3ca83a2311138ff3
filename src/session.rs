//! Session lifecycle and conversation state
//!
//! A `Session` binds a conversation's message history to an itinerary and
//! tracks token/cost accounting. Sessions are held in-memory only by the
//! [`crate::session_manager::SessionManager`]; a process restart drops them.

use crate::message::{HistoryEntry, Message};
use crate::types::{ItineraryId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which system prompt and tool posture the session operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentMode {
    TripDesigner,
    Help,
    TravelAgent,
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Expired,
}

/// A summary placed in history in place of an older message run, produced
/// by [`crate::engine::compact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactedPrefix {
    pub summary: String,
    pub replaced_through_index: usize,
    pub compacted_at: DateTime<Utc>,
}

/// Per-session conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub itinerary_id: ItineraryId,
    pub agent_mode: AgentMode,
    pub status: SessionStatus,
    pub history: Vec<HistoryEntry>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_cost_usd: f64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub compacted_prefix: Option<CompactedPrefix>,
}

impl Session {
    pub fn new(itinerary_id: ItineraryId, agent_mode: AgentMode) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            itinerary_id,
            agent_mode,
            status: SessionStatus::Active,
            history: Vec::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_cost_usd: 0.0,
            created_at: now,
            last_active_at: now,
            compacted_prefix: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.touch();
        self.history.push(entry);
    }

    pub fn record_usage(&mut self, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.total_cost_usd += cost_usd;
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
    }

    pub fn expire(&mut self) {
        self.status = SessionStatus::Expired;
    }

    pub fn is_idle_longer_than(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.last_active_at > ttl
    }

    /// The user-visible transcript, excluding system-role entries (the
    /// context-priming message and any compaction summary marker).
    pub fn visible_history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().filter(|e| !e.is_system())
    }

    /// The full message list sent to the LLM provider: the original first
    /// system entry (if compaction summarized past it), the compacted
    /// prefix summary, then the verbatim tail.
    pub fn effective_messages(&self) -> Vec<Message> {
        let mut out = Vec::new();
        if let Some(prefix) = &self.compacted_prefix {
            if let Some(first) = self.history.first() {
                if first.is_system() && prefix.replaced_through_index > 0 {
                    out.push(first.message.clone());
                }
            }
            out.push(Message::System {
                content: format!("Earlier in this conversation: {}", prefix.summary),
            });
            out.extend(
                self.history[prefix.replaced_through_index..]
                    .iter()
                    .map(|e| e.message.clone()),
            );
        } else {
            out.extend(self.history.iter().map(|e| e.message.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItineraryId;

    #[test]
    fn test_session_creation_defaults() {
        let session = Session::new(ItineraryId::new(), AgentMode::TripDesigner);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.prompt_tokens, 0);
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_record_usage_accumulates() {
        let mut session = Session::new(ItineraryId::new(), AgentMode::TripDesigner);
        session.record_usage(100, 50, 0.002);
        session.record_usage(200, 75, 0.004);
        assert_eq!(session.prompt_tokens, 300);
        assert_eq!(session.completion_tokens, 125);
        assert!((session.total_cost_usd - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_visible_history_excludes_system() {
        let mut session = Session::new(ItineraryId::new(), AgentMode::TripDesigner);
        session.append(HistoryEntry::system("priming"));
        session.append(HistoryEntry::user("hi"));
        let visible: Vec<_> = session.visible_history().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content(), "hi");
    }

    #[test]
    fn test_effective_messages_with_compacted_prefix() {
        let mut session = Session::new(ItineraryId::new(), AgentMode::TripDesigner);
        session.append(HistoryEntry::system("prompt"));
        session.append(HistoryEntry::user("message 1"));
        session.append(HistoryEntry::assistant("reply 1"));
        session.append(HistoryEntry::user("message 2"));

        session.compacted_prefix = Some(CompactedPrefix {
            summary: "user asked about trips".to_string(),
            replaced_through_index: 3,
            compacted_at: Utc::now(),
        });

        let messages = session.effective_messages();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], Message::System { .. }));
        assert!(matches!(messages[1], Message::System { .. }));
    }

    #[test]
    fn test_is_idle_longer_than() {
        let mut session = Session::new(ItineraryId::new(), AgentMode::Help);
        session.last_active_at = Utc::now() - chrono::Duration::minutes(45);
        assert!(session.is_idle_longer_than(chrono::Duration::minutes(30)));
        assert!(!session.is_idle_longer_than(chrono::Duration::minutes(60)));
    }
}
