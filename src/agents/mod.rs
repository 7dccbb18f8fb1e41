//! Built-in knowledge modules and router assembly.
//!
//! Two modules ship with the crate: `network` (API reference and issue
//! troubleshooting) and `auth` (OAuth specifications and authentication
//! errors). Deployments with their own knowledge domains register
//! [`crate::routing::ModuleDescriptor`]s through [`Router::builder`]
//! instead.

pub mod auth;
pub mod network;

use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::llm::GenerationProvider;
use crate::retrieval::Retriever;
use crate::routing::Router;

/// Assembles a router with the built-in module catalog.
///
/// This is the explicit construction step: descriptors are registered
/// once, the router is built, and the result is shared read-only across
/// sessions.
#[must_use]
pub fn default_router(
    provider: Arc<dyn GenerationProvider>,
    retriever: Arc<dyn Retriever>,
    config: RoutingConfig,
) -> Router {
    Router::builder(provider, retriever, config)
        .module(network::descriptor())
        .module(auth::descriptor())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_descriptors_are_wired() {
        let network = network::descriptor();
        assert_eq!(network.name, "network");
        assert!(network.agents.contains_key("api_ref"));
        assert!(network.agents.contains_key("issues"));
        // Sibling awareness is wired both ways
        assert!(
            network
                .agents
                .get("issues")
                .is_some_and(|a| a.siblings.contains("api_ref"))
        );

        let auth = auth::descriptor();
        assert_eq!(auth.name, "auth");
        assert!(auth.agents.contains_key("oauth"));
        assert!(auth.agents.contains_key("errors"));
    }

    #[test]
    fn test_collections_are_distinct() {
        let mut collections: Vec<String> = Vec::new();
        for descriptor in [network::descriptor(), auth::descriptor()] {
            for agent in descriptor.agents.values() {
                collections.push(agent.collection.clone());
            }
        }
        let unique: std::collections::BTreeSet<_> = collections.iter().collect();
        assert_eq!(unique.len(), collections.len());
    }
}
