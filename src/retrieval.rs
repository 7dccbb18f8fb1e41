//! Retrieval service abstraction.
//!
//! The routing core treats retrieval as an external collaborator: given a
//! collection identifier, a query, and a result count, a [`Retriever`]
//! returns ranked passages. Document ingestion, embedding, and index
//! persistence all live behind this trait.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A retrieved passage with its ranking score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Source label for attribution (document name, URL, etc.).
    pub source: String,
    /// Passage text.
    pub text: String,
    /// Ranking score; higher is more relevant.
    pub score: f32,
}

/// Trait for retrieval backends.
///
/// Implementations must be safe to call with an unknown collection:
/// that returns an empty result set, never an error. [`RetrievalError`]
/// is reserved for genuine backend failures.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns the top-`k` passages for `query` from `collection`,
    /// ordered by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] only on backend failure; missing
    /// collections and empty results are `Ok(vec![])`.
    async fn search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError>;
}

/// In-memory keyword retriever.
///
/// Scores documents by query-token overlap. Intended for demos and tests;
/// a production deployment plugs a vector index in behind [`Retriever`]
/// instead.
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    collections: HashMap<String, Vec<(String, String)>>,
}

impl InMemoryRetriever {
    /// Creates an empty retriever.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document to a collection.
    pub fn add_document(
        &mut self,
        collection: impl Into<String>,
        source: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push((source.into(), text.into()));
    }

    fn tokenize(text: &str) -> BTreeSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect()
    }

    fn score(query_tokens: &BTreeSet<String>, text: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let doc_tokens = Self::tokenize(text);
        let overlap = query_tokens.intersection(&doc_tokens).count();
        #[allow(clippy::cast_precision_loss)]
        {
            overlap as f32 / query_tokens.len() as f32
        }
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        // Unknown collection: empty, not an error
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let query_tokens = Self::tokenize(query);
        let mut scored: Vec<Passage> = docs
            .iter()
            .map(|(source, text)| Passage {
                source: source.clone(),
                text: text.clone(),
                score: Self::score(&query_tokens, text),
            })
            .filter(|p| p.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever() -> InMemoryRetriever {
        let mut r = InMemoryRetriever::new();
        r.add_document(
            "network_issues",
            "troubleshooting.md",
            "A 504 gateway timeout usually means the upstream service did not respond in time.",
        );
        r.add_document(
            "network_issues",
            "errors.md",
            "401 unauthorized responses indicate missing or invalid credentials.",
        );
        r
    }

    #[tokio::test]
    async fn test_unknown_collection_returns_empty() {
        let r = retriever();
        let passages = r
            .search("no_such_collection", "timeout", 5)
            .await
            .unwrap_or_else(|e| unreachable!("search failed: {e}"));
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn test_ranked_results() {
        let r = retriever();
        let passages = r
            .search("network_issues", "504 gateway timeout", 5)
            .await
            .unwrap_or_else(|e| unreachable!("search failed: {e}"));
        assert!(!passages.is_empty());
        assert_eq!(passages[0].source, "troubleshooting.md");
        for pair in passages.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_top_k_truncation() {
        let mut r = retriever();
        for i in 0..10 {
            r.add_document("network_issues", format!("doc{i}.md"), "timeout timeout");
        }
        let passages = r
            .search("network_issues", "timeout", 3)
            .await
            .unwrap_or_else(|e| unreachable!("search failed: {e}"));
        assert_eq!(passages.len(), 3);
    }

    #[tokio::test]
    async fn test_no_overlap_returns_empty() {
        let r = retriever();
        let passages = r
            .search("network_issues", "zebra quantum", 5)
            .await
            .unwrap_or_else(|e| unreachable!("search failed: {e}"));
        assert!(passages.is_empty());
    }
}
