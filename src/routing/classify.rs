//! Classification calls and lenient decision parsing.
//!
//! Both the router and every coordinator classify with the same shape:
//! one generation call over a roster of registered names, expecting a
//! small JSON decision. Parsing is lenient — bare-word output is accepted
//! as a target, anything unrecognized becomes "no match", and no parse
//! path is an error.

use tracing::{debug, warn};

use super::descriptor::RoutingDecision;
use crate::config::RoutingConfig;
use crate::error::GenerationError;
use crate::llm::{ChatRequest, GenerationProvider, generate_with_retry, system_message, user_message};

/// Runs one classification call and resolves it against `registered` names.
///
/// Returns the validated target name, or `None` for "no match". The name
/// comparison is case-insensitive; the registered spelling is returned.
///
/// # Errors
///
/// Returns [`GenerationError`] only when the call itself fails terminally;
/// callers treat that the same as "no match" but may record it.
pub async fn classify(
    provider: &dyn GenerationProvider,
    config: &RoutingConfig,
    system_prompt: &str,
    query: &str,
    registered: &[&str],
) -> Result<Option<String>, GenerationError> {
    let request = ChatRequest {
        model: config.classifier_model.clone(),
        messages: vec![system_message(system_prompt), user_message(query)],
        temperature: Some(0.0),
        max_tokens: Some(config.classifier_max_tokens),
        json_mode: true,
    };

    let response = generate_with_retry(
        provider,
        &request,
        config.timeout,
        config.max_retries,
        config.retry_backoff,
    )
    .await?;

    let decision = parse_decision(&response.content);
    debug!(?decision, "classification decision");
    Ok(resolve_target(&decision, registered))
}

/// Parses classifier output into a [`RoutingDecision`].
///
/// Accepts a JSON object, a JSON object wrapped in a markdown code block,
/// or a bare word (taken as the target). Everything else parses to the
/// "no match" decision.
#[must_use]
pub fn parse_decision(content: &str) -> RoutingDecision {
    let trimmed = content.trim();

    // Handle markdown code blocks
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    if let Ok(decision) = serde_json::from_str::<RoutingDecision>(json_str) {
        return decision;
    }

    // Bare single-word output: treat as the target name
    if !json_str.is_empty() && !json_str.contains(char::is_whitespace) && !json_str.contains('{') {
        return RoutingDecision {
            target: Some(json_str.to_string()),
            confidence: None,
            rationale: None,
        };
    }

    RoutingDecision::default()
}

/// Validates a decision's target against the registered names.
fn resolve_target(decision: &RoutingDecision, registered: &[&str]) -> Option<String> {
    let target = decision.target.as_deref()?.trim();
    let matched = registered
        .iter()
        .find(|name| name.eq_ignore_ascii_case(target));
    if matched.is_none() && !target.is_empty() {
        warn!(target, "classifier named an unregistered target");
    }
    matched.map(|name| (*name).to_string())
}
