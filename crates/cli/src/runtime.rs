//! Process wiring shared by the commands: config, index, tiers, orchestrator.

use std::sync::Arc;

use anyhow::Context;
use outreach_agent::TieredOrchestrator;
use outreach_config::AppConfig;
use outreach_core::knowledge::Retriever;
use outreach_knowledge::{IndexRetriever, KnowledgeIndex, UnavailableRetriever};
use outreach_providers::{build_embedder, build_tiers};
use tracing::warn;

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("failed to load ~/.outreach/config.toml")
}

/// Everything a generation needs, built once per process.
pub struct Runtime {
    pub orchestrator: Arc<TieredOrchestrator>,
    /// `None` when the index could not be opened
    pub index: Option<Arc<IndexRetriever>>,
    pub warnings: Vec<String>,
}

impl Runtime {
    pub fn build(config: &AppConfig) -> Runtime {
        let mut warnings = Vec::new();

        let retriever: Arc<dyn Retriever>;
        let mut index = None;
        match open_index(config) {
            Ok(r) => {
                let r = Arc::new(r);
                retriever = r.clone();
                index = Some(r);
            }
            Err(reason) => {
                warn!(error = %reason, "Knowledge index unavailable");
                warnings.push(format!("Knowledge index unavailable: {reason}"));
                retriever = Arc::new(UnavailableRetriever::new(reason));
            }
        }

        let plan = build_tiers(config);
        warnings.extend(plan.warnings.iter().cloned());

        let orchestrator = plan
            .tiers
            .into_iter()
            .fold(TieredOrchestrator::builder(retriever), |builder, tier| {
                builder.tier(tier.kind, tier.backend)
            })
            .build();

        Runtime {
            orchestrator: Arc::new(orchestrator),
            index,
            warnings,
        }
    }
}

fn open_index(
    config: &AppConfig,
) -> Result<IndexRetriever, outreach_core::error::RetrievalError> {
    let embedder = build_embedder(config)?;
    let index = KnowledgeIndex::open(&config.knowledge.index_dir)?;
    Ok(IndexRetriever::new(Arc::new(index), embedder))
}
