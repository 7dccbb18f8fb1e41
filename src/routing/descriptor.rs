//! Registration descriptors and classification decisions.
//!
//! Descriptors are supplied by an external loader at startup and are
//! immutable afterwards; all request-time lookups go through read-only
//! maps built from them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Describes one specialist sub-agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique name within the owning module.
    pub name: String,
    /// Short description, used both for classification and for injecting
    /// sibling-awareness into other agents' prompts.
    pub description: String,
    /// Retrieval collection this agent queries.
    pub collection: String,
    /// Role instructions for the agent's generation calls.
    pub system_prompt: String,
    /// Names of co-located agents this one should know about.
    pub siblings: BTreeSet<String>,
}

/// Describes one knowledge module and its specialists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub name: String,
    /// Short description used for router classification.
    pub description: String,
    /// Specialists keyed by name.
    pub agents: BTreeMap<String, AgentDescriptor>,
}

impl ModuleDescriptor {
    /// Creates a module descriptor from a list of agents, wiring each
    /// agent's sibling set to the other agents in the module.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agents: Vec<AgentDescriptor>,
    ) -> Self {
        let names: BTreeSet<String> = agents.iter().map(|a| a.name.clone()).collect();
        let agents = agents
            .into_iter()
            .map(|mut agent| {
                agent.siblings = names.iter().filter(|n| **n != agent.name).cloned().collect();
                (agent.name.clone(), agent)
            })
            .collect();
        Self {
            name: name.into(),
            description: description.into(),
            agents,
        }
    }
}

/// Outcome of a classification call.
///
/// `target == None` is the "no match" sentinel; malformed classifier
/// output always parses to it, never to an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected target name, if any.
    pub target: Option<String>,
    /// Classifier's self-reported confidence, if provided.
    pub confidence: Option<f32>,
    /// Classifier's one-line rationale, if provided.
    pub rationale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentDescriptor {
        AgentDescriptor {
            name: name.to_string(),
            description: String::new(),
            collection: String::new(),
            system_prompt: String::new(),
            siblings: BTreeSet::new(),
        }
    }

    #[test]
    fn test_module_descriptor_wires_siblings() {
        let module = ModuleDescriptor::new(
            "network",
            "network questions",
            vec![agent("api_ref"), agent("issues")],
        );
        let issues = module.agents.get("issues").map(|a| a.siblings.clone());
        assert_eq!(
            issues,
            Some(["api_ref".to_string()].into_iter().collect())
        );
        let api_ref = module.agents.get("api_ref").map(|a| a.siblings.clone());
        assert_eq!(api_ref, Some(["issues".to_string()].into_iter().collect()));
    }

    #[test]
    fn test_single_agent_module_has_no_siblings() {
        let module = ModuleDescriptor::new("solo", "", vec![agent("only")]);
        assert!(
            module
                .agents
                .get("only")
                .is_some_and(|a| a.siblings.is_empty())
        );
    }
}
