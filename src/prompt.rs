//! System prompts and template builders for classification and specialists.
//!
//! Prompts are the core instructions that define each agent's behavior.
//! Builders format classifier rosters, retrieved context, sibling
//! awareness, and turn history into message text. All builders are pure
//! functions over immutable descriptors, computed fresh per call.

use std::fmt::Write;

use crate::retrieval::Passage;
use crate::routing::descriptor::AgentDescriptor;
use crate::state::Turn;

/// Shared instruction block for classification calls.
///
/// Classifiers return a small JSON object; the decision parser accepts
/// bare-word output as a fallback and maps anything unrecognized to
/// "no match".
const CLASSIFIER_FORMAT: &str = r#"Respond with a JSON object:
{"target": "<name>" | null, "confidence": <0.0-1.0>, "rationale": "<one sentence>"}

Set "target" to null when no listed name fits. Output ONLY the JSON object."#;

/// Grounding rules appended to every specialist system prompt.
const SPECIALIST_GROUNDING: &str = r"Use the provided context passages to answer the user's question.
Cite sources by their bracketed labels. If the context does not contain
the answer, say so clearly. Never fabricate citations or invent sources
that do not appear in the context.";

/// Referral protocol appended when a specialist has siblings.
const REFERRAL_PROTOCOL: &str = r"If the question would be better answered by one of the agents above,
finish your answer and then add one final line, exactly:

REFER(<agent_name>): <one-line reason>

Use a plain agent name for a sibling, or module.agent for an agent in
another module. At most one REFER line. Omit it entirely when you can
answer fully yourself.";

/// Builds the system prompt for the router's module classification call.
#[must_use]
pub fn build_router_classifier_prompt(modules: &[(&str, &str)]) -> String {
    let mut roster = String::new();
    for (name, description) in modules {
        let _ = writeln!(roster, "- {name}: {description}");
    }
    format!(
        "You are a query router. Determine which module should handle the \
         user's query based on the module descriptions below.\n\n\
         Available modules:\n{roster}\n\
         Rules:\n\
         - Pick a module only when the query clearly matches its expertise.\n\
         - For general conversation or queries matching no module, use null.\n\n\
         {CLASSIFIER_FORMAT}"
    )
}

/// Builds the system prompt for a coordinator's sub-agent classification call.
#[must_use]
pub fn build_module_classifier_prompt(module: &str, agents: &[(&str, &str)]) -> String {
    let mut roster = String::new();
    for (name, description) in agents {
        let _ = writeln!(roster, "- {name}: {description}");
    }
    format!(
        "You are a query classifier for the {module} module. Determine which \
         sub-agent should handle the user's query.\n\n\
         Available sub-agents:\n{roster}\n\
         {CLASSIFIER_FORMAT}"
    )
}

/// Builds a specialist's full system prompt.
///
/// Combines the agent's role instructions, the grounding rules, and —
/// when siblings exist — the sibling roster plus the referral protocol.
#[must_use]
pub fn build_specialist_system_prompt(
    descriptor: &AgentDescriptor,
    siblings: &[&AgentDescriptor],
) -> String {
    let mut prompt = format!("{}\n\n{SPECIALIST_GROUNDING}", descriptor.system_prompt);

    if !siblings.is_empty() {
        let mut roster = String::new();
        for sibling in siblings {
            let _ = writeln!(roster, "- {}: {}", sibling.name, sibling.description);
        }
        let _ = write!(
            prompt,
            "\n\nYou are part of a team of specialized agents. Your sibling \
             agents:\n{roster}\n{REFERRAL_PROTOCOL}"
        );
    }

    prompt
}

/// Builds a specialist's user message from context, history, and the query.
///
/// Empty retrieval results inject an explicit no-documents notice so the
/// model answers honestly instead of fabricating support.
#[must_use]
pub fn build_specialist_user_prompt(query: &str, passages: &[Passage], history: &[Turn]) -> String {
    let mut msg = String::new();

    if passages.is_empty() {
        msg.push_str(
            "Context: no supporting documents were found for this question. \
             Answer from the conversation only, and say explicitly that no \
             documentation was available.\n",
        );
    } else {
        msg.push_str("Context:\n");
        for passage in passages {
            let _ = writeln!(msg, "[{}]\n{}\n", passage.source, passage.text);
        }
    }

    if !history.is_empty() {
        msg.push_str("\nPrevious conversation:\n");
        for turn in history {
            let speaker = match turn.role {
                crate::llm::Role::User => "User",
                _ => "Assistant",
            };
            let _ = writeln!(msg, "{speaker}: {}", turn.text);
        }
    }

    let _ = write!(msg, "\nQuestion: {query}");
    msg
}

/// Canned router fallback for queries matching no module.
#[must_use]
pub fn router_fallback(modules: &[(&str, &str)]) -> String {
    let mut roster = String::new();
    for (name, description) in modules {
        let _ = writeln!(roster, "- {name}: {description}");
    }
    format!(
        "I couldn't match your question to a knowledge module. I can help \
         with the following areas:\n{roster}\
         Try rephrasing your question to mention one of these topics."
    )
}

/// Canned in-module fallback when sub-agent classification finds no match.
#[must_use]
pub fn module_fallback(module: &str, description: &str) -> String {
    format!(
        "The {module} module handles the following: {description} \
         I couldn't match your question to one of its specialists — could \
         you rephrase it with more detail?"
    )
}

/// Explanatory response when the hop budget is exhausted with no content.
#[must_use]
pub fn hop_budget_response(budget: usize) -> String {
    format!(
        "I was unable to resolve your question after {budget} specialist \
         consultations. Please try a more specific question."
    )
}

/// Explanatory response when a cycle is refused with no content.
#[must_use]
pub fn cycle_response() -> String {
    "I already consulted this specialist for your question and could not \
     make further progress. Please try rephrasing."
        .to_string()
}

/// Generic apology when generation fails and no prior content exists.
#[must_use]
pub fn generation_failure_response() -> String {
    "I'm sorry — I wasn't able to generate an answer to your question right \
     now. Please try again shortly."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use chrono::Utc;

    fn descriptor(name: &str, siblings: &[&str]) -> AgentDescriptor {
        AgentDescriptor {
            name: name.to_string(),
            description: format!("{name} description"),
            collection: format!("col_{name}"),
            system_prompt: format!("You are the {name} expert."),
            siblings: siblings.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_router_classifier_prompt_lists_modules() {
        let prompt = build_router_classifier_prompt(&[
            ("network", "network library questions"),
            ("auth", "authentication questions"),
        ]);
        assert!(prompt.contains("- network: network library questions"));
        assert!(prompt.contains("- auth: authentication questions"));
        assert!(prompt.contains("JSON object"));
    }

    #[test]
    fn test_specialist_prompt_with_siblings() {
        let me = descriptor("issues", &["api_ref"]);
        let sib = descriptor("api_ref", &[]);
        let prompt = build_specialist_system_prompt(&me, &[&sib]);
        assert!(prompt.contains("You are the issues expert."));
        assert!(prompt.contains("- api_ref: api_ref description"));
        assert!(prompt.contains("REFER(<agent_name>)"));
    }

    #[test]
    fn test_specialist_prompt_without_siblings() {
        let me = descriptor("api_ref", &[]);
        let prompt = build_specialist_system_prompt(&me, &[]);
        assert!(!prompt.contains("REFER"));
        assert!(prompt.contains("Never fabricate citations"));
    }

    #[test]
    fn test_user_prompt_empty_retrieval_notice() {
        let msg = build_specialist_user_prompt("what is a 504?", &[], &[]);
        assert!(msg.contains("no supporting documents"));
        assert!(msg.contains("Question: what is a 504?"));
    }

    #[test]
    fn test_user_prompt_renders_passages_and_history() {
        let passages = vec![Passage {
            source: "errors.md".to_string(),
            text: "504 means gateway timeout.".to_string(),
            score: 0.9,
        }];
        let history = vec![Turn {
            role: Role::User,
            text: "earlier question".to_string(),
            timestamp: Utc::now(),
        }];
        let msg = build_specialist_user_prompt("and now?", &passages, &history);
        assert!(msg.contains("[errors.md]"));
        assert!(msg.contains("User: earlier question"));
        assert!(!msg.contains("no supporting documents"));
    }

    #[test]
    fn test_fallback_texts() {
        let fallback = router_fallback(&[("network", "networking")]);
        assert!(fallback.contains("- network: networking"));
        assert!(module_fallback("auth", "auth topics").contains("auth topics"));
        assert!(hop_budget_response(10).contains("10"));
    }
}
