//! Specialist sub-agents: retrieval-augmented responders for one
//! knowledge category.
//!
//! A specialist retrieves passages from its own collection, generates an
//! answer grounded in them (with sibling-awareness injected so it can
//! suggest hand-offs), and may emit a [`Referral`]. Classification and
//! generation are model-driven; the contract here guarantees only the
//! structural validity of the returned shape, never semantic stability
//! across calls.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::error::GenerationError;
use crate::llm::{ChatRequest, GenerationProvider, generate_with_retry, system_message, user_message};
use crate::prompt::{build_specialist_system_prompt, build_specialist_user_prompt};
use crate::retrieval::{Passage, Retriever};
use crate::routing::descriptor::AgentDescriptor;
use crate::routing::referral::{Referral, parse_referral};
use crate::state::ConversationState;
use std::sync::Arc;

/// A specialist's answer: user-visible content plus an optional hand-off.
#[derive(Debug, Clone)]
pub struct SpecialistReply {
    /// Answer text with any referral directive stripped.
    pub content: String,
    /// Referral request, if the specialist emitted a valid directive.
    pub referral: Option<Referral>,
}

/// Capability contract for specialist sub-agents.
///
/// Coordinators hold specialists as trait objects in a read-only map fixed
/// at startup — explicit registration, no request-time discovery.
#[async_trait]
pub trait SpecialistAgent: Send + Sync {
    /// The immutable descriptor this specialist was registered with.
    fn descriptor(&self) -> &AgentDescriptor;

    /// Answers a query using the session's conversation state.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] only on terminal generation failure;
    /// empty retrieval and referral parse failures degrade internally.
    async fn answer(
        &self,
        provider: &dyn GenerationProvider,
        query: &str,
        state: &ConversationState,
    ) -> Result<SpecialistReply, GenerationError>;
}

/// Retrieval-augmented specialist implementation.
pub struct RagSpecialist {
    descriptor: AgentDescriptor,
    siblings: Vec<AgentDescriptor>,
    retriever: Arc<dyn Retriever>,
    config: RoutingConfig,
}

impl RagSpecialist {
    /// Creates a specialist from its descriptor and sibling descriptors.
    ///
    /// `siblings` should contain the descriptors named by
    /// `descriptor.siblings`; they feed the sibling-awareness section of
    /// the system prompt.
    #[must_use]
    pub fn new(
        descriptor: AgentDescriptor,
        siblings: Vec<AgentDescriptor>,
        retriever: Arc<dyn Retriever>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            descriptor,
            siblings,
            retriever,
            config,
        }
    }

    /// Retrieves context passages, degrading failures to empty results.
    ///
    /// Backend errors and timeouts are logged and treated as "no supporting
    /// documents" — retrieval problems must not abort the chain.
    async fn retrieve(&self, query: &str) -> Vec<Passage> {
        let search = self
            .retriever
            .search(&self.descriptor.collection, query, self.config.top_k);
        match tokio::time::timeout(self.config.timeout, search).await {
            Ok(Ok(passages)) => {
                debug!(
                    agent = %self.descriptor.name,
                    collection = %self.descriptor.collection,
                    count = passages.len(),
                    "retrieved passages"
                );
                passages
            }
            Ok(Err(e)) => {
                warn!(agent = %self.descriptor.name, error = %e, "retrieval failed, proceeding without context");
                Vec::new()
            }
            Err(_) => {
                warn!(agent = %self.descriptor.name, "retrieval timed out, proceeding without context");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for RagSpecialist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSpecialist")
            .field("name", &self.descriptor.name)
            .field("collection", &self.descriptor.collection)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SpecialistAgent for RagSpecialist {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn answer(
        &self,
        provider: &dyn GenerationProvider,
        query: &str,
        state: &ConversationState,
    ) -> Result<SpecialistReply, GenerationError> {
        let passages = self.retrieve(query).await;

        let sibling_refs: Vec<&AgentDescriptor> = self.siblings.iter().collect();
        let system = build_specialist_system_prompt(&self.descriptor, &sibling_refs);
        let history = state.recent_history(self.config.history_window);
        let user = build_specialist_user_prompt(query, &passages, history);

        let request = ChatRequest {
            model: self.config.specialist_model.clone(),
            messages: vec![system_message(&system), user_message(&user)],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.specialist_max_tokens),
            json_mode: false,
        };

        let response = generate_with_retry(
            provider,
            &request,
            self.config.timeout,
            self.config.max_retries,
            self.config.retry_backoff,
        )
        .await?;

        let (content, referral) = parse_referral(&self.descriptor.name, &response.content);
        if let Some(ref referral) = referral {
            info!(
                from = %referral.from_agent,
                to = %referral.to_agent,
                reason = %referral.reason,
                "specialist emitted referral"
            );
        }

        Ok(SpecialistReply { content, referral })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalError;
    use crate::llm::{ChatResponse, TokenUsage};
    use crate::retrieval::InMemoryRetriever;

    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Provider that returns a fixed response and records request prompts.
    struct ScriptedProvider {
        response: String,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_user_prompt(&self) -> String {
            self.requests
                .lock()
                .map(|reqs| {
                    reqs.last()
                        .and_then(|r| r.messages.last())
                        .map(|m| m.content.clone())
                        .unwrap_or_default()
                })
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError> {
            if let Ok(mut reqs) = self.requests.lock() {
                reqs.push(request.clone());
            }
            Ok(ChatResponse {
                content: self.response.clone(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    /// Retriever that always fails.
    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn search(
            &self,
            _collection: &str,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<Passage>, RetrievalError> {
            Err(RetrievalError::Backend {
                message: "index offline".to_string(),
            })
        }
    }

    fn descriptor() -> AgentDescriptor {
        AgentDescriptor {
            name: "issues".to_string(),
            description: "troubleshooting".to_string(),
            collection: "network_issues".to_string(),
            system_prompt: "You are a troubleshooting expert.".to_string(),
            siblings: BTreeSet::from(["api_ref".to_string()]),
        }
    }

    fn config() -> RoutingConfig {
        RoutingConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn specialist(retriever: Arc<dyn Retriever>) -> RagSpecialist {
        let sibling = AgentDescriptor {
            name: "api_ref".to_string(),
            description: "API reference".to_string(),
            collection: "network_api_ref".to_string(),
            system_prompt: String::new(),
            siblings: BTreeSet::new(),
        };
        RagSpecialist::new(descriptor(), vec![sibling], retriever, config())
    }

    #[tokio::test]
    async fn test_answer_with_empty_retrieval() {
        let provider = ScriptedProvider::new("No documentation was available, but a 504 is a gateway timeout.");
        let agent = specialist(Arc::new(InMemoryRetriever::new()));
        let state = ConversationState::new("s1");

        let reply = agent
            .answer(&provider, "what is a 504?", &state)
            .await
            .unwrap_or_else(|e| unreachable!("answer failed: {e}"));

        assert!(!reply.content.is_empty());
        assert!(reply.referral.is_none());
        // The prompt must carry the explicit no-documents notice
        assert!(provider.last_user_prompt().contains("no supporting documents"));
    }

    #[tokio::test]
    async fn test_answer_degrades_retrieval_failure() {
        let provider = ScriptedProvider::new("answer");
        let agent = specialist(Arc::new(FailingRetriever));
        let state = ConversationState::new("s1");

        let reply = agent
            .answer(&provider, "query", &state)
            .await
            .unwrap_or_else(|e| unreachable!("answer failed: {e}"));
        assert_eq!(reply.content, "answer");
    }

    #[tokio::test]
    async fn test_answer_parses_referral() {
        let provider =
            ScriptedProvider::new("Check the endpoint spec.\nREFER(api_ref): needs parameter types");
        let agent = specialist(Arc::new(InMemoryRetriever::new()));
        let state = ConversationState::new("s1");

        let reply = agent
            .answer(&provider, "how do I set the retry parameter?", &state)
            .await
            .unwrap_or_else(|e| unreachable!("answer failed: {e}"));

        assert_eq!(reply.content, "Check the endpoint spec.");
        assert_eq!(
            reply.referral.map(|r| r.to_agent),
            Some("api_ref".to_string())
        );
    }

    #[tokio::test]
    async fn test_answer_includes_history_window() {
        let provider = ScriptedProvider::new("answer");
        let agent = specialist(Arc::new(InMemoryRetriever::new()));
        let mut state = ConversationState::new("s1");
        state.push_turn(crate::llm::Role::User, "what was my previous question");
        state.push_turn(crate::llm::Role::Assistant, "you asked about timeouts");
        state.push_turn(crate::llm::Role::User, "current");

        let _ = agent
            .answer(&provider, "current", &state)
            .await
            .unwrap_or_else(|e| unreachable!("answer failed: {e}"));

        let prompt = provider.last_user_prompt();
        assert!(prompt.contains("you asked about timeouts"));
        // The in-flight query appears once, as the question — not in history
        assert_eq!(prompt.matches("current").count(), 1);
    }
}
