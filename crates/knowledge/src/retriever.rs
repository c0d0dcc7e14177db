//! Retrievers over the knowledge index.

use async_trait::async_trait;
use outreach_core::error::RetrievalError;
use outreach_core::knowledge::{Embedder, RetrievedContext, Retriever};
use std::sync::Arc;
use tracing::debug;

use crate::index::KnowledgeIndex;

/// Embeds the query and returns the nearest index entry.
pub struct IndexRetriever {
    index: Arc<KnowledgeIndex>,
    embedder: Arc<dyn Embedder>,
}

impl IndexRetriever {
    pub fn new(index: Arc<KnowledgeIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    /// The `k` nearest entries, best first.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedContext>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::Embedding("empty query".into()));
        }
        if self.embedder.model() != self.index.embedding_model() {
            return Err(RetrievalError::IndexUnavailable(format!(
                "index was built with '{}', query embedder is '{}'",
                self.index.embedding_model(),
                self.embedder.model()
            )));
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_embedding = vectors
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("embedder returned no vector".into()))?;

        let hits = self.index.search(&query_embedding, k)?;
        debug!(
            hits = hits.len(),
            best = hits.first().map(|h| h.score).unwrap_or_default(),
            "Knowledge search"
        );
        Ok(hits)
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str) -> Result<RetrievedContext, RetrievalError> {
        self.search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or(RetrievalError::EmptyIndex)
    }
}

/// Stands in for an index that could not be opened at startup.
///
/// Every retrieval fails with the recorded reason, so generation degrades
/// to the failure sentinel instead of the process refusing to start.
pub struct UnavailableRetriever {
    reason: RetrievalError,
}

impl UnavailableRetriever {
    pub fn new(reason: RetrievalError) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl Retriever for UnavailableRetriever {
    async fn retrieve(&self, _query: &str) -> Result<RetrievedContext, RetrievalError> {
        Err(self.reason.clone())
    }
}
