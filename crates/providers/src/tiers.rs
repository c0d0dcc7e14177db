//! Tier assembly: turns configuration into the ordered backend list.
//!
//! Primary and secondary are included when enabled, even if their
//! credentials are missing; such tiers fail fast with `NotConfigured` at
//! generation time and a warning is reported here. The template tier is
//! always last.

use std::sync::Arc;

use outreach_config::{AppConfig, EmbedderKind};
use outreach_core::error::RetrievalError;
use outreach_core::generation::{GenerationBackend, TierKind};
use outreach_core::knowledge::Embedder;
use outreach_knowledge::HashEmbedder;
use tracing::{info, warn};

use crate::gigachat::GigaChatBackend;
use crate::huggingface::{HuggingFaceBackend, HuggingFaceEmbedder};
use crate::template::TemplateBackend;

/// One backend at its rank.
#[derive(Clone)]
pub struct ConfiguredTier {
    pub kind: TierKind,
    pub backend: Arc<dyn GenerationBackend>,
}

/// The tiers to try, in order, plus anything worth telling the operator.
#[derive(Clone, Default)]
pub struct TierPlan {
    pub tiers: Vec<ConfiguredTier>,
    pub warnings: Vec<String>,
}

impl TierPlan {
    pub fn kinds(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|t| t.kind).collect()
    }

    fn push(&mut self, kind: TierKind, backend: Arc<dyn GenerationBackend>) {
        self.tiers.push(ConfiguredTier { kind, backend });
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Build the generation tiers from configuration.
pub fn build_tiers(config: &AppConfig) -> TierPlan {
    let mut plan = TierPlan::default();

    if config.primary.enabled {
        if !config.has_primary_credentials() {
            plan.warn("Primary tier enabled but GIGACHAT_CREDENTIALS is not set; it will be skipped at runtime".into());
        }
        match GigaChatBackend::new(&config.primary) {
            Ok(backend) => plan.push(TierKind::Primary, Arc::new(backend)),
            Err(e) => plan.warn(format!("Primary tier unavailable: {e}")),
        }
    }

    if config.secondary.enabled {
        if !config.has_secondary_credentials() {
            plan.warn("Secondary tier enabled but HF_TOKEN is not set; it will be skipped at runtime".into());
        }
        match HuggingFaceBackend::new(&config.secondary) {
            Ok(backend) => plan.push(TierKind::Secondary, Arc::new(backend)),
            Err(e) => plan.warn(format!("Secondary tier unavailable: {e}")),
        }
    }

    plan.push(TierKind::Template, Arc::new(TemplateBackend::new()));

    info!(
        tiers = ?plan.kinds(),
        warnings = plan.warnings.len(),
        "Generation tiers configured"
    );
    plan
}

/// Build the embedder used for both ingestion and queries.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, RetrievalError> {
    match config.knowledge.embedder {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbedder::new(config.knowledge.dimensions))),
        EmbedderKind::Huggingface => Ok(Arc::new(HuggingFaceEmbedder::new(
            &config.knowledge.embedding_model,
            &config.secondary.base_url,
            config.secondary.token.clone(),
            config.secondary.timeout_secs,
        )?)),
    }
}
