//! Per-module coordinator: classifies queries to specialists and drives
//! the referral loop.
//!
//! The state machine per top-level query is
//! `CLASSIFY → DISPATCH → AWAIT_RESPONSE → CHECK_REFERRAL → {DISPATCH | TERMINATE}`.
//! Every dispatch passes through the shared [`ReferralGuard`]; cross-module
//! referrals are returned to the router as an escalation rather than
//! resolved here.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::classify;
use super::descriptor::ModuleDescriptor;
use super::guard::{ReferralGuard, Refusal};
use super::referral::{Referral, ReferralTarget};
use crate::config::RoutingConfig;
use crate::llm::GenerationProvider;
use crate::prompt::{build_module_classifier_prompt, module_fallback};
use crate::retrieval::Retriever;
use crate::specialist::{RagSpecialist, SpecialistAgent};
use crate::state::{ChainNote, ConversationState};

/// Result of a coordinator handling one entry into its module.
#[derive(Debug)]
pub struct ModuleOutcome {
    /// Content generated within this module, if any. `None` when the
    /// entry produced nothing (guard refusal or failure before a reply);
    /// the router keeps the chain's prior content in that case.
    pub content: Option<String>,
    /// A cross-module referral the router must resolve, if the chain
    /// left this module.
    pub escalation: Option<Referral>,
}

/// Owns one module's specialists and dispatches among them.
pub struct ModuleCoordinator {
    descriptor: ModuleDescriptor,
    specialists: BTreeMap<String, Box<dyn SpecialistAgent>>,
    provider: Arc<dyn GenerationProvider>,
    config: RoutingConfig,
    classifier_prompt: String,
}

impl ModuleCoordinator {
    /// Creates a coordinator with RAG specialists built from the module
    /// descriptor.
    #[must_use]
    pub fn new(
        descriptor: ModuleDescriptor,
        provider: Arc<dyn GenerationProvider>,
        retriever: Arc<dyn Retriever>,
        config: RoutingConfig,
    ) -> Self {
        let specialists = descriptor
            .agents
            .values()
            .map(|agent| {
                let siblings = agent
                    .siblings
                    .iter()
                    .filter_map(|name| descriptor.agents.get(name))
                    .cloned()
                    .collect();
                let specialist = RagSpecialist::new(
                    agent.clone(),
                    siblings,
                    Arc::clone(&retriever),
                    config.clone(),
                );
                (
                    agent.name.clone(),
                    Box::new(specialist) as Box<dyn SpecialistAgent>,
                )
            })
            .collect();
        Self::with_specialists(descriptor, specialists, provider, config)
    }

    /// Creates a coordinator with caller-supplied specialists.
    ///
    /// The registry is fixed here; nothing is discovered at request time.
    #[must_use]
    pub fn with_specialists(
        descriptor: ModuleDescriptor,
        specialists: BTreeMap<String, Box<dyn SpecialistAgent>>,
        provider: Arc<dyn GenerationProvider>,
        config: RoutingConfig,
    ) -> Self {
        let roster: Vec<(&str, &str)> = descriptor
            .agents
            .values()
            .map(|a| (a.name.as_str(), a.description.as_str()))
            .collect();
        let classifier_prompt = build_module_classifier_prompt(&descriptor.name, &roster);
        Self {
            descriptor,
            specialists,
            provider,
            config,
            classifier_prompt,
        }
    }

    /// The module descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// Handles one entry into this module.
    ///
    /// `entry` is `Some` when the router escalated an explicit referral
    /// into this module; classification is bypassed and the named agent is
    /// dispatched directly (still subject to the guard). Otherwise the
    /// query is classified against this module's specialists first.
    pub async fn handle(
        &self,
        query: &str,
        state: &mut ConversationState,
        entry: Option<Referral>,
        guard: &ReferralGuard,
    ) -> ModuleOutcome {
        // CLASSIFY (bypassed for an explicit escalated target)
        let (mut next, mut trigger) = match entry {
            Some(referral) => {
                let agent = match referral.target() {
                    ReferralTarget::Qualified { agent, .. } | ReferralTarget::Sibling(agent) => {
                        agent
                    }
                };
                (agent, Some(referral))
            }
            None => match self.classify(query).await {
                Some(agent) => (agent, None),
                None => {
                    info!(module = %self.descriptor.name, "no sub-agent match, using module fallback");
                    return ModuleOutcome {
                        content: Some(module_fallback(
                            &self.descriptor.name,
                            &self.descriptor.description,
                        )),
                        escalation: None,
                    };
                }
            },
        };

        let mut last_content: Option<String> = None;

        loop {
            // Referrals may name agents that exist nowhere; degrade silently
            let Some(specialist) = self.specialists.get(&next) else {
                state.notes.push(ChainNote::UnresolvedReferral {
                    target: next.clone(),
                });
                warn!(module = %self.descriptor.name, target = %next, "unresolved referral target");
                break;
            };

            // DISPATCH: the guard is consulted before every invocation.
            // A refusal records why and nothing more; only the router
            // knows whether the whole chain produced content.
            if let Err(refusal) = guard.allow(state, &self.descriptor.name, &next) {
                match refusal {
                    Refusal::Cycle { module, agent } => {
                        state.notes.push(ChainNote::CycleDetected { module, agent });
                    }
                    Refusal::BudgetExhausted { budget } => {
                        state.notes.push(ChainNote::HopBudgetExhausted { budget });
                    }
                }
                break;
            }
            guard.record(state, &self.descriptor.name, &next, trigger.take().as_ref());
            info!(
                module = %self.descriptor.name,
                agent = %next,
                hop = state.hop_count,
                "dispatching to specialist"
            );

            // AWAIT_RESPONSE
            let reply = match specialist.answer(&*self.provider, query, state).await {
                Ok(reply) => reply,
                Err(e) => {
                    state.notes.push(ChainNote::GenerationFailed {
                        agent: next.clone(),
                        message: e.to_string(),
                    });
                    break;
                }
            };
            last_content = Some(reply.content);

            // CHECK_REFERRAL
            let Some(referral) = reply.referral else {
                break;
            };
            match referral.target() {
                ReferralTarget::Sibling(agent) => {
                    next = agent;
                    trigger = Some(referral);
                }
                ReferralTarget::Qualified { module, agent } if module == self.descriptor.name => {
                    next = agent;
                    trigger = Some(referral);
                }
                ReferralTarget::Qualified { .. } => {
                    // Cross-module: the router resolves it against the
                    // target module, bypassing classification there.
                    return ModuleOutcome {
                        content: last_content,
                        escalation: Some(referral),
                    };
                }
            }
        }

        ModuleOutcome {
            content: last_content,
            escalation: None,
        }
    }

    /// Classifies a query against this module's specialists.
    ///
    /// Classification failures — garbage output or a failed generation
    /// call — are "no match", never an error.
    async fn classify(&self, query: &str) -> Option<String> {
        let registered: Vec<&str> = self.specialists.keys().map(String::as_str).collect();
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
                warn!(module = %self.descriptor.name, error = %e, "sub-agent classification failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for ModuleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCoordinator")
            .field("module", &self.descriptor.name)
            .field("specialists", &self.specialists.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
