//! Per-API-key session registry (spec.md §4.4/§5)
//!
//! Two-level map (`api_key -> session_id -> Session`), the same
//! `Arc<RwLock<HashMap<...>>>` shape the in-memory itinerary store uses,
//! namespaced one level deeper so two API keys never share sessions. Each
//! session is held behind its own `tokio::sync::Mutex`, which doubles as
//! the `SESSION_BUSY` guard: the same lock a `chatStream` call holds for its
//! duration is the lock `try_lock` finds contended when a second call comes
//! in for the same session id, so there is no separate busy-flag to keep in
//! sync with the data.

use crate::error::{SessionError, SessionResult};
use crate::message::HistoryEntry;
use crate::session::{AgentMode, Session};
use crate::types::{ItineraryId, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Per-1k-token USD pricing for known models, used to compute
/// `Session::total_cost_usd` from provider-reported usage (spec.md §4.4).
/// Unknown models fall back to a conservative default rate rather than
/// panicking, since the model string is a caller-supplied opaque value.
fn price_per_1k_tokens(model: &str) -> (f64, f64) {
    match model {
        "gpt-4o" => (0.0025, 0.010),
        "gpt-4o-mini" => (0.00015, 0.0006),
        "claude-sonnet-4-20250514" => (0.003, 0.015),
        "claude-haiku-4-20250514" => (0.0008, 0.004),
        _ => (0.003, 0.015),
    }
}

/// Compute the USD cost of one LLM call from its reported token usage.
pub fn compute_cost_usd(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let (prompt_rate, completion_rate) = price_per_1k_tokens(model);
    (prompt_tokens as f64 / 1000.0) * prompt_rate + (completion_tokens as f64 / 1000.0) * completion_rate
}

/// A handle to a locked session, held for the duration of one `chatStream`
/// call. Dropping it releases the lock.
pub struct SessionHandle {
    guard: OwnedMutexGuard<Session>,
}

impl std::ops::Deref for SessionHandle {
    type Target = Session;
    fn deref(&self) -> &Session {
        &self.guard
    }
}

impl std::ops::DerefMut for SessionHandle {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.guard
    }
}

type SessionMap = HashMap<SessionId, Arc<Mutex<Session>>>;

/// Process-wide per-API-key session registry.
#[derive(Clone, Default)]
pub struct SessionManager {
    by_api_key: Arc<RwLock<HashMap<String, SessionMap>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            by_api_key: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new session for `api_key`, seeded with the system prompt
    /// entry `initial_system_message` (spec.md §4.4's "initial context
    /// priming message").
    pub async fn create(
        &self,
        api_key: &str,
        itinerary_id: ItineraryId,
        agent_mode: AgentMode,
        initial_system_message: impl Into<String>,
    ) -> SessionId {
        let mut session = Session::new(itinerary_id, agent_mode);
        session.append(HistoryEntry::system(initial_system_message));
        let id = session.id;

        let mut by_key = self.by_api_key.write().await;
        by_key
            .entry(api_key.to_string())
            .or_default()
            .insert(id, Arc::new(Mutex::new(session)));

        info!(%id, api_key_len = api_key.len(), "session created");
        id
    }

    /// Acquire the session for the duration of a `chatStream` call. Fails
    /// with `SessionError::Busy` if another call already holds it, and with
    /// `SessionError::NotFound` if the id is unknown under this API key
    /// (including silently-evicted sessions, per spec.md §4.4).
    pub async fn acquire(&self, api_key: &str, session_id: SessionId) -> SessionResult<SessionHandle> {
        let session_arc = {
            let by_key = self.by_api_key.read().await;
            by_key
                .get(api_key)
                .and_then(|sessions| sessions.get(&session_id))
                .cloned()
                .ok_or(SessionError::NotFound(session_id))?
        };

        match session_arc.try_lock_owned() {
            Ok(guard) => Ok(SessionHandle { guard }),
            Err(_) => {
                warn!(%session_id, "session busy: concurrent chatStream rejected");
                Err(SessionError::Busy(session_id))
            }
        }
    }

    /// Delete a session. Used for explicit client-driven teardown; silent
    /// TTL eviction goes through `sweep_expired` instead.
    pub async fn delete(&self, api_key: &str, session_id: SessionId) -> SessionResult<()> {
        let mut by_key = self.by_api_key.write().await;
        match by_key.get_mut(api_key).and_then(|sessions| sessions.remove(&session_id)) {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(session_id)),
        }
    }

    /// Evict every session across all API keys idle longer than `ttl`.
    /// Caller-driven (spec.md §9 suggests a `tokio::time::interval` every 5
    /// minutes); this crate spawns no background task of its own. Returns
    /// the count of sessions removed. A session currently held by an
    /// in-flight `chatStream` (locked) is skipped rather than forcibly
    /// evicted out from under it.
    pub async fn sweep_expired(&self, ttl: chrono::Duration) -> usize {
        let mut by_key = self.by_api_key.write().await;
        let mut removed = 0;

        for sessions in by_key.values_mut() {
            let mut expired_ids = Vec::new();
            for (id, session_arc) in sessions.iter() {
                if let Ok(session) = session_arc.try_lock() {
                    if session.is_idle_longer_than(ttl) {
                        expired_ids.push(*id);
                    }
                }
            }
            for id in expired_ids {
                sessions.remove(&id);
                removed += 1;
            }
        }

        by_key.retain(|_, sessions| !sessions.is_empty());
        debug!(removed, "session sweep completed");
        removed
    }

    /// Number of sessions currently held for `api_key`, for diagnostics/tests.
    pub async fn session_count(&self, api_key: &str) -> usize {
        self.by_api_key
            .read()
            .await
            .get(api_key)
            .map(|sessions| sessions.len())
            .unwrap_or(0)
    }
}
