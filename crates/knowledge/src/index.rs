//! Knowledge index: a persisted, read-only similarity store.
//!
//! The index is a directory holding one `index.json`. Ingestion writes it
//! once (temp file + rename); the orchestrator opens it read-only at
//! startup and shares it across every retrieval in the process.
//!
//! Storage location: `<index_dir>/index.json`

use chrono::{DateTime, Utc};
use outreach_core::error::RetrievalError;
use outreach_core::knowledge::{KnowledgeEntry, RetrievedContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::vector;

/// Current on-disk format version.
pub const INDEX_VERSION: u32 = 1;

/// Name of the index file inside the index directory.
pub const INDEX_FILE: &str = "index.json";

/// A knowledge entry with its searchable text and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,

    /// Whitespace-joined fields, the text that was embedded
    pub text: String,

    pub embedding: Vec<f32>,
}

impl IndexedEntry {
    pub fn new(mut entry: KnowledgeEntry, embedding: Vec<f32>) -> Self {
        entry.normalize();
        let text = entry.searchable_text();
        Self {
            entry,
            text,
            embedding,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    embedding_model: String,
    dimensions: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexedEntry>,
}

/// An opened knowledge index. Immutable once opened.
#[derive(Debug)]
pub struct KnowledgeIndex {
    dir: PathBuf,
    embedding_model: String,
    dimensions: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexedEntry>,
}

impl KnowledgeIndex {
    /// Open an index directory read-only.
    ///
    /// Fails if the directory or file is missing, unparsable, of an unknown
    /// version, or holds an entry that breaks the index invariants. An index
    /// with zero entries opens fine; searching it returns `EmptyIndex`.
    pub fn open(dir: &Path) -> Result<Self, RetrievalError> {
        let path = dir.join(INDEX_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            RetrievalError::IndexUnavailable(format!("{}: {e}", path.display()))
        })?;

        let file: IndexFile = serde_json::from_str(&content).map_err(|e| {
            RetrievalError::IndexUnavailable(format!("{}: {e}", path.display()))
        })?;

        if file.version != INDEX_VERSION {
            return Err(RetrievalError::IndexUnavailable(format!(
                "unsupported index version {} (expected {INDEX_VERSION})",
                file.version
            )));
        }

        for (i, e) in file.entries.iter().enumerate() {
            e.entry.validate().map_err(|_| {
                RetrievalError::InvalidEntry(format!("entry #{i} has no referral link"))
            })?;
            if e.embedding.len() != file.dimensions {
                return Err(RetrievalError::DimensionMismatch {
                    expected: file.dimensions,
                    actual: e.embedding.len(),
                });
            }
        }

        debug!(
            path = %path.display(),
            count = file.entries.len(),
            model = %file.embedding_model,
            "Knowledge index opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            embedding_model: file.embedding_model,
            dimensions: file.dimensions,
            created_at: file.created_at,
            entries: file.entries,
        })
    }

    /// Write a new index into `dir`, replacing any previous one.
    pub fn write(
        dir: &Path,
        embedding_model: &str,
        dimensions: usize,
        entries: Vec<IndexedEntry>,
    ) -> Result<(), RetrievalError> {
        let storage = |e: std::io::Error| {
            RetrievalError::IndexUnavailable(format!("{}: {e}", dir.display()))
        };

        std::fs::create_dir_all(dir).map_err(storage)?;

        let file = IndexFile {
            version: INDEX_VERSION,
            embedding_model: embedding_model.to_string(),
            dimensions,
            created_at: Utc::now(),
            entries,
        };
        let json = serde_json::to_string(&file)
            .map_err(|e| RetrievalError::IndexUnavailable(format!("serialize index: {e}")))?;

        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, json).map_err(storage)?;
        std::fs::rename(&tmp, dir.join(INDEX_FILE)).map_err(storage)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }

    /// The `k` nearest entries to `query_embedding`, best first.
    pub fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedContext>, RetrievalError> {
        if self.entries.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        if query_embedding.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_embedding.len(),
            });
        }

        Ok(vector::rank(&self.entries, query_embedding, k.max(1))
            .into_iter()
            .map(|(i, score)| {
                let e = &self.entries[i];
                RetrievedContext {
                    entry: e.entry.clone(),
                    text: e.text.clone(),
                    score,
                }
            })
            .collect())
    }
}
