//! Referral representation and the directive parser.
//!
//! Specialists signal a hand-off by appending a single trailing directive
//! line to their output:
//!
//! ```text
//! REFER(api_ref): the fix needs exact endpoint parameters
//! REFER(auth.errors): this is an authentication failure, not a network one
//! ```
//!
//! The parser is deliberately narrow: it validates structure only, never
//! semantics. Any malformed directive parses to "no referral" — a parse
//! failure must never abort a chain.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A specialist's request that another specialist continue the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    /// Agent that emitted the referral.
    pub from_agent: String,
    /// Target as written: `agent` (sibling) or `module.agent`.
    pub to_agent: String,
    /// One-line reason from the emitting agent.
    pub reason: String,
}

/// A referral target split into its addressing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralTarget {
    /// Unqualified name: a sibling within the emitting agent's module.
    Sibling(String),
    /// `module.agent` qualified name: may cross module boundaries.
    Qualified {
        /// Target module name.
        module: String,
        /// Target agent name.
        agent: String,
    },
}

impl Referral {
    /// Splits `to_agent` into sibling or qualified form.
    #[must_use]
    pub fn target(&self) -> ReferralTarget {
        self.to_agent.split_once('.').map_or_else(
            || ReferralTarget::Sibling(self.to_agent.clone()),
            |(module, agent)| ReferralTarget::Qualified {
                module: module.to_string(),
                agent: agent.to_string(),
            },
        )
    }
}

/// `REFER(target): reason` on its own line. Target is a name or a
/// single-dotted `module.agent` pair.
static REFER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*REFER\(([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)?)\)\s*:\s*(.*\S)\s*$")
        .unwrap_or_else(|e| unreachable!("invalid referral directive pattern: {e}"))
});

/// Extracts a referral directive from generated text.
///
/// Returns the user-visible content with the directive line removed, plus
/// the parsed referral if exactly one structurally valid directive was
/// found. Multiple directives keep only the last one (the model's final
/// decision). Malformed directives are left in place and ignored.
#[must_use]
pub fn parse_referral(from_agent: &str, content: &str) -> (String, Option<Referral>) {
    let mut referral = None;
    for captures in REFER_RE.captures_iter(content) {
        let (Some(target), Some(reason)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        referral = Some(Referral {
            from_agent: from_agent.to_string(),
            to_agent: target.as_str().to_string(),
            reason: reason.as_str().to_string(),
        });
    }

    if referral.is_none() {
        return (content.trim().to_string(), None);
    }

    let stripped = REFER_RE.replace_all(content, "");
    (stripped.trim().to_string(), referral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_sibling_referral() {
        let text = "The fix needs specific parameters.\n\nREFER(api_ref): needs endpoint details";
        let (content, referral) = parse_referral("issues", text);
        assert_eq!(content, "The fix needs specific parameters.");
        let referral = referral.unwrap_or_else(|| unreachable!("expected referral"));
        assert_eq!(referral.from_agent, "issues");
        assert_eq!(referral.to_agent, "api_ref");
        assert_eq!(referral.reason, "needs endpoint details");
        assert_eq!(referral.target(), ReferralTarget::Sibling("api_ref".to_string()));
    }

    #[test]
    fn test_parse_qualified_referral() {
        let text = "This is an auth problem.\nREFER(auth.errors): 401 handling";
        let (_, referral) = parse_referral("issues", text);
        let referral = referral.unwrap_or_else(|| unreachable!("expected referral"));
        assert_eq!(
            referral.target(),
            ReferralTarget::Qualified {
                module: "auth".to_string(),
                agent: "errors".to_string(),
            }
        );
    }

    #[test]
    fn test_multiple_directives_keep_last() {
        let text = "Answer.\nREFER(api_ref): first thought\nREFER(issues): final decision";
        let (content, referral) = parse_referral("oauth", text);
        assert_eq!(
            referral.map(|r| r.to_agent),
            Some("issues".to_string())
        );
        assert!(!content.contains("REFER"));
    }

    #[test_case("Just an answer with no directive." ; "no directive")]
    #[test_case("REFER(): empty target" ; "empty target")]
    #[test_case("REFER(a.b.c): too many dots" ; "double qualified")]
    #[test_case("REFER(api_ref) missing colon" ; "missing colon")]
    #[test_case("REFER(api_ref):" ; "empty reason")]
    #[test_case("as discussed, refer to api_ref for details" ; "prose mention")]
    fn test_malformed_is_no_referral(text: &str) {
        let (_, referral) = parse_referral("issues", text);
        assert!(referral.is_none());
    }

    #[test]
    fn test_directive_mid_text_is_parsed_by_line() {
        // The directive must start its own line; inline mentions don't count.
        let text = "See REFER(api_ref): style notes in the docs.";
        let (_, referral) = parse_referral("issues", text);
        assert!(referral.is_none());
    }

    #[test]
    fn test_content_without_referral_is_trimmed() {
        let (content, referral) = parse_referral("issues", "  spaced answer  \n");
        assert_eq!(content, "spaced answer");
        assert!(referral.is_none());
    }
}
