//! The routing core: classification-driven dispatch with guarded
//! referrals.
//!
//! # Architecture
//!
//! ```text
//! User query → Router (module classification)
//!   └── ModuleCoordinator (sub-agent classification)
//!       └── SpecialistAgent (retrieval + generation)
//!           └── optional Referral → sibling (loop) or module.agent
//!               (escalate back through the Router)
//! ```
//!
//! Every specialist dispatch passes through the shared [`ReferralGuard`],
//! which enforces cycle detection and the hop budget. Chains always
//! terminate: the guard refuses once a target repeats or the budget is
//! spent, and the caller receives the last good content.

pub mod classify;
pub mod coordinator;
pub mod descriptor;
pub mod guard;
pub mod referral;
pub mod router;

pub use coordinator::{ModuleCoordinator, ModuleOutcome};
pub use descriptor::{AgentDescriptor, ModuleDescriptor, RoutingDecision};
pub use guard::{ReferralGuard, Refusal};
pub use referral::{Referral, ReferralTarget, parse_referral};
pub use router::{Response, Router, RouterBuilder, RoutingService};
