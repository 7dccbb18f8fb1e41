//! Generation service abstraction.
//!
//! Provider-agnostic message types, the [`GenerationProvider`] trait, the
//! timeout/retry wrapper used for every generation call, and the bundled
//! `OpenAI`-compatible backend.

pub mod message;
pub mod provider;
pub mod providers;
pub mod retry;

pub use message::{
    ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage, assistant_message, system_message,
    user_message,
};
pub use provider::GenerationProvider;
pub use retry::generate_with_retry;
