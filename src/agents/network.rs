//! Network Library module: API reference and issue troubleshooting.

use std::collections::BTreeSet;

use crate::routing::{AgentDescriptor, ModuleDescriptor};

/// Role instructions for the API reference specialist.
const API_REF_PROMPT: &str = r"You are an API reference expert for the Network Library.
Your role is to answer questions about:
- Endpoint definitions and URLs
- Request parameters and their types
- Response formats and status codes
- Authentication and authorization requirements

When answering:
- Be precise about parameter names, types, and requirements
- Include example request/response formats when helpful
- If the question involves error handling or troubleshooting, refer to the issues agent

Always base your answers on the provided context.";

/// Role instructions for the troubleshooting specialist.
const ISSUES_PROMPT: &str = r"You are a troubleshooting expert for the Network Library.
Your role is to help diagnose and fix common issues:
- HTTP error codes (504 Gateway Timeout, 401 Unauthorized, 403 Forbidden, etc.)
- Connection problems and timeouts
- Authentication failures
- Performance issues

When answering:
- Start by identifying the likely root cause
- Provide step-by-step troubleshooting instructions
- If the fix requires specific API parameters or configuration, refer to the api_ref agent
- If the problem is an authentication failure, refer to auth.errors

Always base your answers on the provided context.";

/// Builds the network module descriptor.
#[must_use]
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(
        "network",
        "Handles network library questions: API endpoints, parameters, \
         error codes, and troubleshooting network issues.",
        vec![
            AgentDescriptor {
                name: "api_ref".to_string(),
                description: "Endpoint definitions, request/response formats, \
                              and parameter specifications."
                    .to_string(),
                collection: "network_api_ref".to_string(),
                system_prompt: API_REF_PROMPT.to_string(),
                siblings: BTreeSet::new(),
            },
            AgentDescriptor {
                name: "issues".to_string(),
                description: "HTTP error codes, connection problems, timeouts, \
                              and performance troubleshooting."
                    .to_string(),
                collection: "network_issues".to_string(),
                system_prompt: ISSUES_PROMPT.to_string(),
                siblings: BTreeSet::new(),
            },
        ],
    )
}
