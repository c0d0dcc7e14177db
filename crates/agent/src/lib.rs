//! The outreach agent: prompt composition, tiered generation, and the
//! campaign loop that ties discovery to delivery.
//!
//! The orchestrator follows a **Retrieve → Compose → Fallback** cycle:
//!
//! 1. **Retrieve** the most relevant knowledge entry for the contact
//! 2. **Compose** the prompt from the template, contact and context
//! 3. **Generate** through each tier in order until one succeeds
//! 4. **Degrade** to a recognizable sentinel when none does

pub mod campaign;
pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use campaign::{Campaign, CampaignOptions, CampaignReport, ContactOutcome, ContactStatus};
pub use orchestrator::{OrchestratorBuilder, TieredOrchestrator};
pub use prompt::{NO_HISTORY, PromptComposer};
