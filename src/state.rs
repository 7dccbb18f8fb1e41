//! Conversation state and session storage.
//!
//! A [`ConversationState`] holds everything a session accumulates: the full
//! turn history plus the per-query routing bookkeeping (`visited`,
//! `hop_count`, `trail`, `notes`). Turn history persists across the whole
//! session; the routing fields scope a single top-level query and are reset
//! at the start of each one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::llm::Role;
use crate::routing::Referral;

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the turn (user or assistant).
    pub role: Role,
    /// Turn text.
    pub text: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Internal audit note recorded when a chain degrades.
///
/// Notes are for observability and debugging only; they are never shown
/// verbatim to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainNote {
    /// A referral targeted an already-visited specialist.
    CycleDetected {
        /// Module of the repeated target.
        module: String,
        /// Agent of the repeated target.
        agent: String,
    },
    /// The hop budget was exhausted before the chain settled.
    HopBudgetExhausted {
        /// The budget that was hit.
        budget: usize,
    },
    /// A referral named an agent registered nowhere.
    UnresolvedReferral {
        /// The unresolvable target as written.
        target: String,
    },
    /// A generation call failed terminally during the chain.
    GenerationFailed {
        /// Agent whose call failed.
        agent: String,
        /// Failure description.
        message: String,
    },
}

/// Per-session conversation state.
///
/// `turns` accumulates for the lifetime of the session. `visited`,
/// `hop_count`, `trail`, and `notes` scope one top-level query: they are
/// cleared by [`ConversationState::begin_query`] and mutated only by the
/// router, coordinators, and the referral guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Session identifier.
    pub session_id: String,
    /// Full turn history, in request order.
    pub turns: Vec<Turn>,
    /// `(module, agent)` pairs dispatched within the current query.
    pub visited: Vec<(String, String)>,
    /// Specialist invocations within the current query.
    pub hop_count: usize,
    /// Referrals that drove the current query's chain, in order.
    pub trail: Vec<Referral>,
    /// Audit notes recorded while resolving the current query.
    pub notes: Vec<ChainNote>,
}

impl ConversationState {
    /// Creates empty state for a session.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            visited: Vec::new(),
            hop_count: 0,
            trail: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Resets the per-query routing fields.
    ///
    /// Idempotent and safe to call after a cancelled chain: applying it
    /// twice leaves the same empty `visited`/`trail`/`notes` and zero
    /// `hop_count`, and never touches `turns`.
    pub fn begin_query(&mut self) {
        self.visited.clear();
        self.hop_count = 0;
        self.trail.clear();
        self.notes.clear();
    }

    /// Appends a turn with the current timestamp.
    pub fn push_turn(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Whether the given target was already dispatched in this query.
    #[must_use]
    pub fn has_visited(&self, module: &str, agent: &str) -> bool {
        self.visited
            .iter()
            .any(|(m, a)| m == module && a == agent)
    }

    /// The most recent turns up to `window`, excluding the final turn.
    ///
    /// The final turn is the in-flight user query, which specialists
    /// receive separately; including it here would duplicate it in prompts.
    #[must_use]
    pub fn recent_history(&self, window: usize) -> &[Turn] {
        let Some(prior) = self.turns.len().checked_sub(1) else {
            return &[];
        };
        let start = prior.saturating_sub(window);
        &self.turns[start..prior]
    }
}

/// Session-scoped store of conversation state.
///
/// States are created lazily on first use. Each session's state sits behind
/// its own mutex, so concurrent sessions only contend on the map itself.
/// Expiry is external policy: callers drop sessions via [`SessionStore::remove`].
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `session_id`, creating it if absent.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ConversationState>> {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new(session_id)))),
        )
    }

    /// Returns the state for `session_id` without creating it.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<ConversationState>>> {
        self.sessions.lock().await.get(session_id).map(Arc::clone)
    }

    /// Removes a session's state, if present.
    pub async fn remove(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

/// Generates a fresh session identifier.
#[must_use]
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_query_resets_routing_fields() {
        let mut state = ConversationState::new("s1");
        state.push_turn(Role::User, "q");
        state.visited.push(("network".to_string(), "issues".to_string()));
        state.hop_count = 3;
        state.trail.push(Referral {
            from_agent: "issues".to_string(),
            to_agent: "api_ref".to_string(),
            reason: "parameters".to_string(),
        });
        state.notes.push(ChainNote::HopBudgetExhausted { budget: 10 });

        state.begin_query();

        assert!(state.visited.is_empty());
        assert_eq!(state.hop_count, 0);
        assert!(state.trail.is_empty());
        assert!(state.notes.is_empty());
        assert_eq!(state.turns.len(), 1);
    }

    #[test]
    fn test_begin_query_idempotent() {
        let mut state = ConversationState::new("s1");
        state.push_turn(Role::User, "first");
        state.push_turn(Role::Assistant, "answer");
        state.hop_count = 2;

        state.begin_query();
        state.begin_query();

        assert!(state.visited.is_empty());
        assert_eq!(state.hop_count, 0);
        assert!(state.trail.is_empty());
        assert_eq!(state.turns.len(), 2);
    }

    #[test]
    fn test_has_visited() {
        let mut state = ConversationState::new("s1");
        state.visited.push(("network".to_string(), "issues".to_string()));
        assert!(state.has_visited("network", "issues"));
        assert!(!state.has_visited("network", "api_ref"));
        assert!(!state.has_visited("auth", "issues"));
    }

    #[test]
    fn test_recent_history_excludes_current_query() {
        let mut state = ConversationState::new("s1");
        state.push_turn(Role::User, "first question");
        state.push_turn(Role::Assistant, "first answer");
        state.push_turn(Role::User, "current question");

        let history = state.recent_history(10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "first answer");
    }

    #[test]
    fn test_recent_history_window_bounds() {
        let mut state = ConversationState::new("s1");
        for i in 0..8 {
            state.push_turn(Role::User, format!("turn {i}"));
        }
        assert_eq!(state.recent_history(3).len(), 3);
        assert_eq!(state.recent_history(100).len(), 7);
        assert!(ConversationState::new("empty").recent_history(5).is_empty());
    }

    #[tokio::test]
    async fn test_session_store_lazy_creation() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let first = store.get_or_create("abc").await;
        let second = store.get_or_create("abc").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);

        store.remove("abc").await;
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_new_session_id_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
