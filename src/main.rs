//! Interactive REPL for the knowledge-agent router.
//!
//! Starts a routing service with the built-in module catalog and a small
//! demo corpus, then answers queries line by line within one session.

// A REPL's job is to print
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use mit_rs::agents::default_router;
use mit_rs::config::RoutingConfig;
use mit_rs::llm::providers::OpenAiProvider;
use mit_rs::retrieval::InMemoryRetriever;
use mit_rs::routing::RoutingService;

/// MIT-RS: hierarchical knowledge-agent router.
///
/// Routes questions through module and specialist classification, with
/// retrieval-augmented answers and guarded cross-agent referrals.
#[derive(Parser, Debug)]
#[command(name = "mit-rs")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Model for classification calls.
    #[arg(long, env = "MIT_CLASSIFIER_MODEL")]
    classifier_model: Option<String>,

    /// Model for specialist answers.
    #[arg(long, env = "MIT_SPECIALIST_MODEL")]
    specialist_model: Option<String>,

    /// Maximum referral hops per query.
    #[arg(long, env = "MIT_MAX_HOPS")]
    max_hops: Option<usize>,

    /// Enable verbose tracing output.
    #[arg(short, long)]
    verbose: bool,

    /// Ask a single question and exit instead of starting the REPL.
    #[arg(short, long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "mit_rs=debug" } else { "mit_rs=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut builder = RoutingConfig::builder().from_env();
    if let Some(model) = cli.classifier_model {
        builder = builder.classifier_model(model);
    }
    if let Some(model) = cli.specialist_model {
        builder = builder.specialist_model(model);
    }
    if let Some(hops) = cli.max_hops {
        builder = builder.max_hops(hops);
    }
    let config = builder.build().context("configuration error")?;

    let provider = Arc::new(OpenAiProvider::new(&config));
    let retriever = Arc::new(demo_retriever());
    let service = RoutingService::new(default_router(provider, retriever, config));

    if let Some(query) = cli.query {
        let response = service.ask(&query, None).await;
        println!("{}", response.content);
        return Ok(());
    }

    repl(&service).await
}

/// Reads queries from stdin until EOF or `quit`.
async fn repl(service: &RoutingService) -> anyhow::Result<()> {
    println!("mit-rs interactive session. Type 'new' for a fresh session, 'quit' to exit.");

    let mut session_id: Option<String> = None;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        match query {
            "" => {}
            "quit" | "exit" => break,
            "new" => {
                if let Some(ref id) = session_id {
                    service.end_session(id).await;
                }
                session_id = None;
                println!("Started a new session.");
            }
            _ => {
                let response = service.ask(query, session_id.as_deref()).await;
                session_id = Some(response.session_id);
                println!("{}\n", response.content);
            }
        }
    }

    Ok(())
}

/// Seeds the in-memory retriever with a small demo corpus, one snippet
/// per specialist collection.
fn demo_retriever() -> InMemoryRetriever {
    let mut retriever = InMemoryRetriever::new();
    retriever.add_document(
        "network_api_ref",
        "api-reference.md",
        "GET /v1/items lists items. Parameters: limit (integer, max 100), \
         cursor (string, opaque pagination token), timeout_ms (integer, \
         request deadline in milliseconds, default 30000).",
    );
    retriever.add_document(
        "network_issues",
        "troubleshooting.md",
        "A 504 Gateway Timeout means the upstream service did not respond \
         before the deadline. Retry with exponential backoff and check the \
         timeout_ms request parameter.",
    );
    retriever.add_document(
        "auth_oauth",
        "oauth-guide.md",
        "The client credentials grant exchanges a client id and secret for \
         an access token. Tokens are JWTs carrying scope and exp claims.",
    );
    retriever.add_document(
        "auth_errors",
        "auth-troubleshooting.md",
        "A 401 Unauthorized response means the access token is missing, \
         expired, or malformed. Refresh the token and confirm the \
         Authorization header uses the Bearer scheme.",
    );
    retriever
}
