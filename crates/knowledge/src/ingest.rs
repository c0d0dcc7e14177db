//! One-time ingestion: a JSON catalog of promotable items → knowledge index.
//!
//! The source is a JSON array of objects with `item_name` (or
//! `product_name`), `key_benefits`, `referral_link`, and `target_audience`.
//! Each item becomes exactly one index entry.

use outreach_core::error::RetrievalError;
use outreach_core::knowledge::{Embedder, KnowledgeEntry};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::index::{IndexedEntry, KnowledgeIndex};

/// Summary of a finished ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub entries: usize,
    pub dimensions: usize,
    pub embedding_model: String,
    pub index_dir: PathBuf,
}

/// Parse and validate a catalog.
pub fn parse_catalog(json: &str) -> Result<Vec<KnowledgeEntry>, RetrievalError> {
    let mut items: Vec<KnowledgeEntry> = serde_json::from_str(json)
        .map_err(|e| RetrievalError::InvalidEntry(format!("catalog is not valid JSON: {e}")))?;

    if items.is_empty() {
        return Err(RetrievalError::InvalidEntry("catalog contains no items".into()));
    }

    for (i, item) in items.iter_mut().enumerate() {
        item.normalize();
        item.validate()
            .map_err(|e| RetrievalError::InvalidEntry(format!("item #{i}: {e}")))?;
    }

    Ok(items)
}

/// Embed `items` and write them as a new index into `index_dir`.
pub async fn build_index(
    items: Vec<KnowledgeEntry>,
    index_dir: &Path,
    embedder: &dyn Embedder,
) -> Result<IngestReport, RetrievalError> {
    let texts: Vec<String> = items.iter().map(|e| e.searchable_text()).collect();
    let vectors = embedder.embed(&texts).await?;

    if vectors.len() != items.len() {
        return Err(RetrievalError::Embedding(format!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            items.len()
        )));
    }

    let dimensions = vectors.first().map(Vec::len).unwrap_or_default();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(RetrievalError::DimensionMismatch {
            expected: dimensions,
            actual: bad.len(),
        });
    }

    let entries: Vec<IndexedEntry> = items
        .into_iter()
        .zip(vectors)
        .map(|(item, v)| IndexedEntry::new(item, v))
        .collect();
    let count = entries.len();

    KnowledgeIndex::write(index_dir, embedder.model(), dimensions, entries)?;

    info!(
        entries = count,
        dimensions,
        model = %embedder.model(),
        dir = %index_dir.display(),
        "Knowledge index written"
    );

    Ok(IngestReport {
        entries: count,
        dimensions,
        embedding_model: embedder.model().to_string(),
        index_dir: index_dir.to_path_buf(),
    })
}

/// Read a catalog file and build the index from it.
pub async fn ingest_file(
    source: &Path,
    index_dir: &Path,
    embedder: &dyn Embedder,
) -> Result<IngestReport, RetrievalError> {
    let json = tokio::fs::read_to_string(source).await.map_err(|e| {
        RetrievalError::IndexUnavailable(format!("cannot read {}: {e}", source.display()))
    })?;
    let items = parse_catalog(&json)?;
    info!(items = items.len(), source = %source.display(), "Catalog loaded");
    build_index(items, index_dir, embedder).await
}
