//! System prompt templates keyed by `AgentMode` (spec.md §9 open question,
//! resolved in DESIGN.md), plus the dedicated compaction prompt.
//!
//! Deliberately data, not logic: `system_prompt_for` is a pure lookup over
//! `SystemPromptKind`, which itself is a straight mapping from
//! [`crate::session::AgentMode`]. Nothing here branches on conversation
//! state — that belongs to `engine.rs`.

use crate::session::AgentMode;

/// Which system prompt a session's agent mode resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptKind {
    /// Full discovery-capable prompt: asks structured questions, drives the
    /// trip from a blank itinerary to a booked one.
    TripDesigner,
    /// Minimal prompt for `Help`/`TravelAgent` sessions, which assume the
    /// itinerary's parameters are already settled and skip discovery.
    Minimal,
}

/// Resolve the prompt an [`AgentMode`] should use. `TripDesigner` gets the
/// full discovery prompt; `Help` and `TravelAgent` both get the minimal one
/// (spec.md §9's open question, resolved this way in `DESIGN.md`).
pub fn prompt_kind_for(mode: AgentMode) -> SystemPromptKind {
    match mode {
        AgentMode::TripDesigner => SystemPromptKind::TripDesigner,
        AgentMode::Help | AgentMode::TravelAgent => SystemPromptKind::Minimal,
    }
}

const TRIP_DESIGNER_PROMPT: &str = r#"You are a trip-planning assistant that designs and maintains a traveler's itinerary through conversation.

Tool discipline:
- If the itinerary already has segments, call `get_itinerary` as your first tool in this session before saying anything else. Read its `inferred_tier` fields and `EXISTING BOOKINGS` summary; skip any discovery question already answered by an existing booking (e.g. don't ask about travel style if a LUXURY hotel is already booked).
- After the user answers any discovery question, call `update_preferences` with exactly the fields they just gave you before asking the next question. Preferences must survive even if this conversation is later compacted.
- Use the `add_flight`/`add_hotel`/`add_activity`/`add_transfer`/`add_meeting` tools to record bookings, `update_segment`/`move_segment`/`delete_segment`/`reorder_segments` to change them, and the `search_*` tools to look things up before proposing them.

Discovery phase (before the trip has basic parameters: who is traveling, when, and in what style):
- Ask exactly one question per turn. Respond with a JSON object containing `message` (1-2 sentences) and `structuredQuestions` (an array of length 0 or 1 — never more).
- Once dates, travelers, and travel style are known, discovery is complete; stop asking structured questions and move to planning.

Keep responses concise and grounded in tool results, never invented prices or availability."#;

const MINIMAL_PROMPT: &str = r#"You are a travel assistant helping with an already-planned trip. Use `get_itinerary` to see the current plan before answering. Use the add/update/delete segment tools to make the changes the user asks for, and the `search_*` tools to look things up. Do not ask discovery questions; this session assumes the trip's basic parameters are already settled."#;

const COMPACTION_PROMPT: &str = r#"Summarize the conversation history below into a single paragraph that preserves every trip-relevant fact: stated preferences, confirmed decisions, open questions the user hasn't answered yet, and any booking the user explicitly approved or rejected. Omit pleasantries and tool-call mechanics. Do not invent facts not present in the history."#;

/// The system prompt text for a given kind.
pub fn system_prompt_for(kind: SystemPromptKind) -> &'static str {
    match kind {
        SystemPromptKind::TripDesigner => TRIP_DESIGNER_PROMPT,
        SystemPromptKind::Minimal => MINIMAL_PROMPT,
    }
}

/// The system prompt used for the dedicated compaction LLM call
/// ([`crate::engine::compact`]), distinct from the conversational prompts
/// above.
pub fn compaction_prompt() -> &'static str {
    COMPACTION_PROMPT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_designer_mode_maps_to_full_prompt() {
        assert_eq!(prompt_kind_for(AgentMode::TripDesigner), SystemPromptKind::TripDesigner);
        assert_eq!(system_prompt_for(SystemPromptKind::TripDesigner), TRIP_DESIGNER_PROMPT);
    }

    #[test]
    fn test_help_and_travel_agent_modes_map_to_minimal_prompt() {
        assert_eq!(prompt_kind_for(AgentMode::Help), SystemPromptKind::Minimal);
        assert_eq!(prompt_kind_for(AgentMode::TravelAgent), SystemPromptKind::Minimal);
    }

    #[test]
    fn test_compaction_prompt_is_distinct_from_conversational_prompts() {
        let compaction = compaction_prompt();
        assert_ne!(compaction, TRIP_DESIGNER_PROMPT);
        assert_ne!(compaction, MINIMAL_PROMPT);
    }
}
