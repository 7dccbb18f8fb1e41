//! Cycle and hop-budget enforcement.
//!
//! The [`ReferralGuard`] is the single enforcement point for loop
//! prevention: every specialist dispatch — classification-driven, sibling
//! referral, or cross-module escalation — must pass [`ReferralGuard::allow`]
//! first and be committed with [`ReferralGuard::record`]. No component may
//! bypass the guard, even for dispatches that look obviously safe.

use tracing::warn;

use super::referral::Referral;
use crate::state::ConversationState;

/// Why the guard refused a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The target was already dispatched within this query's chain.
    Cycle {
        /// Module of the repeated target.
        module: String,
        /// Agent of the repeated target.
        agent: String,
    },
    /// The chain has spent its hop budget.
    BudgetExhausted {
        /// The configured budget.
        budget: usize,
    },
}

/// Shared cycle/hop-budget tracker.
///
/// Holds only the immutable budget; all per-query bookkeeping lives in
/// [`ConversationState`], so one guard instance is safely shared across
/// concurrent sessions.
#[derive(Debug, Clone, Copy)]
pub struct ReferralGuard {
    max_hops: usize,
}

impl ReferralGuard {
    /// Creates a guard with the given hop budget.
    #[must_use]
    pub const fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    /// The configured hop budget.
    #[must_use]
    pub const fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Checks whether dispatching to `(module, agent)` is allowed.
    ///
    /// Refuses on a repeated target (cycle) or an exhausted hop budget.
    /// The budget check runs first: a chain that is out of hops is refused
    /// even for a fresh target.
    ///
    /// # Errors
    ///
    /// Returns the [`Refusal`] reason; the caller terminates the chain
    /// with its last good content.
    pub fn allow(&self, state: &ConversationState, module: &str, agent: &str) -> Result<(), Refusal> {
        if state.hop_count >= self.max_hops {
            warn!(
                module,
                agent,
                budget = self.max_hops,
                "hop budget exhausted, refusing dispatch"
            );
            return Err(Refusal::BudgetExhausted {
                budget: self.max_hops,
            });
        }
        if state.has_visited(module, agent) {
            warn!(module, agent, "cycle detected, refusing dispatch");
            return Err(Refusal::Cycle {
                module: module.to_string(),
                agent: agent.to_string(),
            });
        }
        Ok(())
    }

    /// Commits a successful dispatch: appends the target to `visited`,
    /// increments `hop_count`, and — when the dispatch was driven by a
    /// referral — appends it to the audit `trail`.
    pub fn record(
        &self,
        state: &mut ConversationState,
        module: &str,
        agent: &str,
        referral: Option<&Referral>,
    ) {
        state.visited.push((module.to_string(), agent.to_string()));
        state.hop_count += 1;
        if let Some(referral) = referral {
            state.trail.push(referral.clone());
        }
    }
}
