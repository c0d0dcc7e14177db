//! Knowledge index, embedding, and retrieval for the outreach agent.

pub mod embedder;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod vector;

pub use embedder::HashEmbedder;
pub use index::{IndexedEntry, KnowledgeIndex};
pub use ingest::{IngestReport, build_index, ingest_file, parse_catalog};
pub use retriever::{IndexRetriever, UnavailableRetriever};
pub use vector::cosine_similarity;
