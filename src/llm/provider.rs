//! Pluggable generation provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. This keeps all routing logic decoupled
//! from any particular LLM vendor.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::GenerationError;

/// Trait for generation service backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls) for a
/// specific provider while presenting a uniform interface to the routing
/// core. Transient failures must be reported as
/// [`GenerationError::Transient`] or [`GenerationError::Timeout`] so the
/// retry layer can distinguish them from permanent request errors.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"azure"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on API failures, timeouts, or invalid
    /// requests.
    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError>;
}
