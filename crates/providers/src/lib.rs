//! Generation backends for the outreach agent.
//!
//! Every backend implements `outreach_core::GenerationBackend`.
//! [`build_tiers`] turns configuration into the ordered fallback list.

pub mod gigachat;
mod http;
pub mod huggingface;
pub mod template;
pub mod tiers;

pub use gigachat::GigaChatBackend;
pub use huggingface::{HuggingFaceBackend, HuggingFaceEmbedder};
pub use template::TemplateBackend;
pub use tiers::{ConfiguredTier, TierPlan, build_embedder, build_tiers};
