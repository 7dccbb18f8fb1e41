//! MIT-RS: hierarchical knowledge-agent routing.
//!
//! A query enters at the top-level [`routing::Router`], which classifies it
//! to one of the registered knowledge modules. Each module's
//! [`routing::ModuleCoordinator`] classifies again among its specialist
//! sub-agents, and the chosen [`specialist::SpecialistAgent`] answers with
//! retrieval-augmented generation. Specialists may hand a query off to a
//! sibling or to an agent in another module via an explicit referral
//! directive; the shared [`routing::ReferralGuard`] bounds every chain with
//! cycle detection and a hop budget, so routing always terminates with a
//! best-effort answer.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mit_rs::agents::default_router;
//! use mit_rs::config::RoutingConfig;
//! use mit_rs::llm::providers::OpenAiProvider;
//! use mit_rs::retrieval::InMemoryRetriever;
//! use mit_rs::routing::RoutingService;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = RoutingConfig::from_env()?;
//! let provider = Arc::new(OpenAiProvider::new(&config));
//! let retriever = Arc::new(InMemoryRetriever::new());
//!
//! let service = RoutingService::new(default_router(provider, retriever, config));
//! let response = service.ask("why am I getting a 504?", None).await;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod retrieval;
pub mod routing;
pub mod specialist;
pub mod state;

pub use config::RoutingConfig;
pub use error::{ConfigError, GenerationError, RetrievalError};
pub use routing::{Response, Router, RoutingService};
pub use state::{ConversationState, SessionStore};
