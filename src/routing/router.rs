//! Top-level router: module classification, cross-module escalation, and
//! session turn bookkeeping.
//!
//! The router never answers domain questions itself. It classifies each
//! query to a module coordinator, resolves any cross-module escalations
//! the chain produces, and falls back to a canned response — with zero
//! service calls beyond the classification itself — when nothing matches.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classify;
use super::coordinator::ModuleCoordinator;
use super::descriptor::ModuleDescriptor;
use super::guard::ReferralGuard;
use super::referral::{Referral, ReferralTarget};
use crate::config::RoutingConfig;
use crate::llm::{GenerationProvider, Role};
use crate::prompt::{
    build_router_classifier_prompt, cycle_response, generation_failure_response,
    hop_budget_response, router_fallback,
};
use crate::retrieval::Retriever;
use crate::state::{ChainNote, ConversationState, SessionStore, new_session_id};

/// Response returned to the caller.
///
/// The referral trail and audit notes stay on [`ConversationState`] for
/// observability; they are not part of the response surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Final answer text.
    pub content: String,
    /// Session the answer belongs to.
    pub session_id: String,
}

/// Routes queries to module coordinators.
pub struct Router {
    modules: BTreeMap<String, ModuleCoordinator>,
    provider: Arc<dyn GenerationProvider>,
    guard: ReferralGuard,
    config: RoutingConfig,
    classifier_prompt: String,
    fallback: String,
}

impl Router {
    /// Creates a builder for explicit assembly.
    #[must_use]
    pub fn builder(
        provider: Arc<dyn GenerationProvider>,
        retriever: Arc<dyn Retriever>,
        config: RoutingConfig,
    ) -> RouterBuilder {
        RouterBuilder {
            provider,
            retriever,
            config,
            modules: BTreeMap::new(),
        }
    }

    /// Routes one query through the agent hierarchy.
    ///
    /// Resets the per-query routing state (idempotent, so a previously
    /// cancelled chain leaves no residue), appends the user and assistant
    /// turns, and always returns a response — every failure mode degrades
    /// to best-effort content.
    pub async fn route(&self, query: &str, state: &mut ConversationState) -> Response {
        state.begin_query();
        state.push_turn(Role::User, query);

        let content = self.resolve(query, state).await;

        state.push_turn(Role::Assistant, content.as_str());
        Response {
            content,
            session_id: state.session_id.clone(),
        }
    }

    /// Classifies, dispatches, and resolves escalations until the chain
    /// settles.
    async fn resolve(&self, query: &str, state: &mut ConversationState) -> String {
        let Some(module) = self.classify(query).await else {
            info!("no module match, returning router fallback");
            return self.fallback.clone();
        };
        let Some(mut coordinator) = self.modules.get(&module) else {
            // classify() validates against registered names
            return self.fallback.clone();
        };
        info!(module, "routed to module");

        let mut entry: Option<Referral> = None;
        let mut last_content: Option<String> = None;

        loop {
            let outcome = coordinator.handle(query, state, entry.take(), &self.guard).await;
            if let Some(content) = outcome.content {
                last_content = Some(content);
            }

            let Some(referral) = outcome.escalation else {
                break;
            };
            let ReferralTarget::Qualified { module, agent } = referral.target() else {
                break;
            };
            match self.modules.get(&module) {
                Some(next) if next.descriptor().agents.contains_key(&agent) => {
                    info!(module, agent, "escalating cross-module referral");
                    coordinator = next;
                    entry = Some(referral);
                }
                _ => {
                    warn!(target = %referral.to_agent, "cross-module referral target not registered");
                    state.notes.push(ChainNote::UnresolvedReferral {
                        target: referral.to_agent,
                    });
                    break;
                }
            }
        }

        last_content.unwrap_or_else(|| Self::empty_chain_response(state))
    }

    /// Explains a chain that produced no content at all, based on why it
    /// terminated. Coordinators record the reason as a [`ChainNote`] but
    /// never synthesize fallback text themselves: a refusal deep in an
    /// escalated module must not displace earlier content.
    fn empty_chain_response(state: &ConversationState) -> String {
        match state.notes.last() {
            Some(ChainNote::CycleDetected { .. }) => cycle_response(),
            Some(ChainNote::HopBudgetExhausted { budget }) => hop_budget_response(*budget),
            _ => generation_failure_response(),
        }
    }

    /// Classifies a query against the registered modules.
    async fn classify(&self, query: &str) -> Option<String> {
        let registered: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        match classify::classify(
            &*self.provider,
            &self.config,
            &self.classifier_prompt,
            query,
            &registered,
        )
        .await
        {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "module classification failed");
                None
            }
        }
    }

    /// Registered module names.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("provider", &self.provider.name())
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Router`].
///
/// Assembly is explicit: an external loader registers module descriptors
/// here at startup, and the built router is shared read-only across
/// sessions. No process-wide singletons.
pub struct RouterBuilder {
    provider: Arc<dyn GenerationProvider>,
    retriever: Arc<dyn Retriever>,
    config: RoutingConfig,
    modules: BTreeMap<String, ModuleCoordinator>,
}

impl RouterBuilder {
    /// Registers a module, constructing its coordinator and specialists.
    #[must_use]
    pub fn module(mut self, descriptor: ModuleDescriptor) -> Self {
        let coordinator = ModuleCoordinator::new(
            descriptor,
            Arc::clone(&self.provider),
            Arc::clone(&self.retriever),
            self.config.clone(),
        );
        self.modules
            .insert(coordinator.descriptor().name.clone(), coordinator);
        self
    }

    /// Registers a pre-built coordinator (custom specialists).
    #[must_use]
    pub fn coordinator(mut self, coordinator: ModuleCoordinator) -> Self {
        self.modules
            .insert(coordinator.descriptor().name.clone(), coordinator);
        self
    }

    /// Builds the router.
    #[must_use]
    pub fn build(self) -> Router {
        let roster: Vec<(&str, &str)> = self
            .modules
            .values()
            .map(|c| {
                (
                    c.descriptor().name.as_str(),
                    c.descriptor().description.as_str(),
                )
            })
            .collect();
        let classifier_prompt = build_router_classifier_prompt(&roster);
        let fallback = router_fallback(&roster);
        Router {
            guard: ReferralGuard::new(self.config.max_hops),
            provider: self.provider,
            config: self.config,
            modules: self.modules,
            classifier_prompt,
            fallback,
        }
    }
}

/// Session-aware facade over a [`Router`].
///
/// Owns the [`SessionStore`], creating conversation state lazily per
/// session. Chains within one session run sequentially under the
/// session's own lock; independent sessions proceed concurrently.
#[derive(Debug)]
pub struct RoutingService {
    router: Router,
    sessions: SessionStore,
}

impl RoutingService {
    /// Wraps a router with a fresh session store.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            sessions: SessionStore::new(),
        }
    }

    /// Answers a query within a session, creating the session if needed.
    ///
    /// When `session_id` is `None` a fresh session is started; its id is
    /// returned in the response for subsequent turns.
    pub async fn ask(&self, query: &str, session_id: Option<&str>) -> Response {
        let session_id = session_id.map_or_else(new_session_id, str::to_string);
        let state = self.sessions.get_or_create(&session_id).await;
        let mut state = state.lock().await;
        self.router.route(query, &mut state).await
    }

    /// Exports a session's audit view: visited targets, referral trail,
    /// and notes from its most recent query. `None` for unknown sessions.
    pub async fn audit(&self, session_id: &str) -> Option<ConversationState> {
        let state = self.sessions.get(session_id).await?;
        let state = state.lock().await;
        Some(state.clone())
    }

    /// Drops a session.
    pub async fn end_session(&self, session_id: &str) {
        self.sessions.remove(session_id).await;
    }
}
