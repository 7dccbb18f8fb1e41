//! Auth module: OAuth specifications and authentication errors.

use std::collections::BTreeSet;

use crate::routing::{AgentDescriptor, ModuleDescriptor};

/// Role instructions for the OAuth specialist.
const OAUTH_PROMPT: &str = r"You are an OAuth 2.0 expert for the Auth module.
Your role is to answer questions about:
- OAuth 2.0 grant types (authorization code, client credentials, etc.)
- Token formats (JWT, opaque tokens)
- Token claims and validation
- Scope definitions and permissions
- Authorization and authentication flows

When answering:
- Be precise about OAuth specifications
- Reference RFC specifications when applicable
- If the question involves authentication errors, refer to the errors agent

Always base your answers on the provided context.";

/// Role instructions for the auth-errors specialist.
const ERRORS_PROMPT: &str = r"You are an authentication troubleshooting expert for the Auth module.
Your role is to help diagnose and fix authentication-related issues:
- 401 Unauthorized errors (invalid/missing credentials)
- 403 Forbidden errors (insufficient permissions)
- Token expiration and refresh issues
- Invalid or malformed tokens
- Scope and permission problems

When answering:
- Start by identifying the likely root cause
- Provide step-by-step debugging instructions
- If the issue requires understanding OAuth specs, refer to the oauth agent
- Include common fixes and workarounds

Always base your answers on the provided context.";

/// Builds the auth module descriptor.
#[must_use]
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(
        "auth",
        "Handles authentication questions: OAuth 2.0 flows, tokens, scopes, \
         and troubleshooting authentication errors.",
        vec![
            AgentDescriptor {
                name: "oauth".to_string(),
                description: "OAuth 2.0 grant types, token formats, claims, \
                              scopes, and authorization flows."
                    .to_string(),
                collection: "auth_oauth".to_string(),
                system_prompt: OAUTH_PROMPT.to_string(),
                siblings: BTreeSet::new(),
            },
            AgentDescriptor {
                name: "errors".to_string(),
                description: "Authentication error troubleshooting: 401/403 \
                              errors, token expiration, and invalid credentials."
                    .to_string(),
                collection: "auth_errors".to_string(),
                system_prompt: ERRORS_PROMPT.to_string(),
                siblings: BTreeSet::new(),
            },
        ],
    )
}
