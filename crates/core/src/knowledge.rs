//! Knowledge base domain types and the retrieval traits.
//!
//! A knowledge entry summarizes one promotable item. Entries are written
//! once by ingestion and only ever read afterwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// One promotable item in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Product or service name
    #[serde(alias = "product_name")]
    pub item_name: String,

    /// Short description of what the item is good for
    pub key_benefits: String,

    /// The referral link to promote. Never empty in a valid entry.
    pub referral_link: String,

    /// Who the item is aimed at
    pub target_audience: String,
}

impl KnowledgeEntry {
    pub fn new(
        item_name: impl Into<String>,
        key_benefits: impl Into<String>,
        referral_link: impl Into<String>,
        target_audience: impl Into<String>,
    ) -> Self {
        let mut entry = Self {
            item_name: item_name.into(),
            key_benefits: key_benefits.into(),
            referral_link: referral_link.into(),
            target_audience: target_audience.into(),
        };
        entry.normalize();
        entry
    }

    /// Trim surrounding whitespace from every field, in place.
    ///
    /// Afterwards the stored referral link is exactly the one that appears
    /// in [`searchable_text`](Self::searchable_text).
    pub fn normalize(&mut self) {
        for field in [
            &mut self.item_name,
            &mut self.key_benefits,
            &mut self.referral_link,
            &mut self.target_audience,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
    }

    /// The searchable chunk: all four fields whitespace-joined, in order.
    ///
    /// The referral link is always a substring of the result.
    pub fn searchable_text(&self) -> String {
        [
            self.item_name.trim(),
            self.key_benefits.trim(),
            self.referral_link.trim(),
            self.target_audience.trim(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Check the entry invariants.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.referral_link.trim().is_empty() {
            return Err(RetrievalError::InvalidEntry(format!(
                "entry '{}' has no referral link",
                self.item_name
            )));
        }
        Ok(())
    }
}

/// The single best knowledge entry for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// The matched entry
    pub entry: KnowledgeEntry,

    /// The stored searchable text of the entry
    pub text: String,

    /// Cosine similarity between the query and the entry
    pub score: f32,
}

impl RetrievedContext {
    /// Build a context directly from an entry (score 1.0).
    pub fn from_entry(entry: KnowledgeEntry) -> Self {
        let text = entry.searchable_text();
        Self {
            entry,
            text,
            score: 1.0,
        }
    }

    pub fn referral_link(&self) -> &str {
        &self.entry.referral_link
    }
}

/// Nearest-neighbour lookup over the knowledge index.
///
/// Implementations are read-only and may be shared across invocations.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the single most similar entry for `query`.
    async fn retrieve(&self, query: &str) -> Result<RetrievedContext, RetrievalError>;
}

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, recorded in the index.
    fn model(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;
}
