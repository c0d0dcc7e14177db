//! Tiered orchestrator: retrieval, prompt composition, then an ordered
//! fallback over generation backends.
//!
//! # Flow
//!
//! 1. Build the [`GenerationRequest`] and its search query
//! 2. Retrieve the single most relevant knowledge entry (once)
//! 3. Compose the prompt
//! 4. Try each tier in order; the first non-empty output wins
//! 5. If every tier failed, return [`FAILURE_SENTINEL`]
//!
//! Each tier is attempted at most once per invocation and tiers never run
//! concurrently. Nothing from a tier escapes as an error.

use std::sync::Arc;

use outreach_core::error::GenerationError;
use outreach_core::generation::{
    BackendInput, FAILURE_SENTINEL, Generation, GenerationBackend, GenerationRequest, TierAttempt,
    TierKind,
};
use outreach_core::knowledge::Retriever;
use tracing::{debug, error, info, warn};

use crate::prompt::PromptComposer;

struct Tier {
    kind: TierKind,
    backend: Arc<dyn GenerationBackend>,
}

pub struct TieredOrchestrator {
    retriever: Arc<dyn Retriever>,
    composer: PromptComposer,
    tiers: Vec<Tier>,
}

/// Assembles a [`TieredOrchestrator`]. Tiers are tried in the order added.
pub struct OrchestratorBuilder {
    retriever: Arc<dyn Retriever>,
    composer: PromptComposer,
    tiers: Vec<Tier>,
}

impl OrchestratorBuilder {
    pub fn tier(mut self, kind: TierKind, backend: Arc<dyn GenerationBackend>) -> Self {
        self.tiers.push(Tier { kind, backend });
        self
    }

    pub fn composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn build(self) -> TieredOrchestrator {
        TieredOrchestrator {
            retriever: self.retriever,
            composer: self.composer,
            tiers: self.tiers,
        }
    }
}

impl TieredOrchestrator {
    pub fn builder(retriever: Arc<dyn Retriever>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            retriever,
            composer: PromptComposer::default(),
            tiers: Vec::new(),
        }
    }

    /// Tier kinds in attempt order.
    pub fn tiers(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|t| t.kind).collect()
    }

    /// Produce a referral message, or the failure sentinel. Never fails.
    pub async fn generate_referral_message(&self, contact_info: &str, chat_history: &str) -> String {
        self.generate(contact_info, chat_history).await.text
    }

    /// Like [`generate_referral_message`](Self::generate_referral_message),
    /// with the winning tier and every attempt recorded.
    pub async fn generate(&self, contact_info: &str, chat_history: &str) -> Generation {
        let request = GenerationRequest::new(contact_info, chat_history);
        let total = self.tiers.len();

        debug!(query = %request.search_query, "Retrieving knowledge context");

        let context = match self.retriever.retrieve(&request.search_query).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Retrieval failed; no tier can run");
                let attempts = self
                    .tiers
                    .iter()
                    .map(|t| TierAttempt {
                        tier: t.kind,
                        outcome: Err(GenerationError::Retrieval(e.clone())),
                    })
                    .collect();
                return total_failure(attempts);
            }
        };

        debug!(
            item = %context.entry.item_name,
            score = context.score,
            "Knowledge context retrieved"
        );

        let prompt = self.composer.compose(&request, &context);
        let mut attempts = Vec::with_capacity(total);

        for (i, tier) in self.tiers.iter().enumerate() {
            info!(tier = %tier.kind, attempt = i + 1, total, "Trying generation tier");

            let input = BackendInput {
                prompt: &prompt,
                request: &request,
                context: &context,
            };

            let outcome = match tier.backend.generate(input).await {
                Ok(text) if text.trim().is_empty() => Err(GenerationError::EmptyOutput),
                Ok(text) => Ok(text.trim().to_string()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(text) => {
                    attempts.push(TierAttempt {
                        tier: tier.kind,
                        outcome: Ok(()),
                    });
                    info!(tier = %tier.kind, len = text.len(), "Message generated");
                    return Generation {
                        text,
                        tier: Some(tier.kind),
                        attempts,
                    };
                }
                Err(e) => {
                    warn!(tier = %tier.kind, error = %e, "Generation tier failed, trying next");
                    attempts.push(TierAttempt {
                        tier: tier.kind,
                        outcome: Err(e),
                    });
                }
            }
        }

        total_failure(attempts)
    }
}

fn total_failure(attempts: Vec<TierAttempt>) -> Generation {
    error!(attempts = attempts.len(), "All generation tiers failed");
    Generation {
        text: FAILURE_SENTINEL.to_string(),
        tier: None,
        attempts,
    }
}
