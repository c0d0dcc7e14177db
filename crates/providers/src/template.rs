//! Template tier: a fixed message filled from the retrieved entry.
//!
//! Never touches the network, so it succeeds whenever retrieval did.

use async_trait::async_trait;
use outreach_core::error::GenerationError;
use outreach_core::generation::{BackendInput, GenerationBackend};
use outreach_core::knowledge::KnowledgeEntry;

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateBackend;

impl TemplateBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn render(contact_info: &str, entry: &KnowledgeEntry) -> String {
        let product = describe(entry);
        let link = entry.referral_link.trim();
        let contact_info = contact_info.trim();

        if contact_info.is_empty() {
            format!(
                "Привет! Хочу порекомендовать тебе продукт: {product}. \
                 Это может быть полезно! Подробнее: {link}"
            )
        } else {
            format!(
                "Привет! Я заметил, что ты интересовался темой, связанной с '{contact_info}'. \
                 Хочу порекомендовать тебе продукт: {product}. \
                 Это может быть полезно! Подробнее: {link}"
            )
        }
    }
}

fn describe(entry: &KnowledgeEntry) -> String {
    let name = entry.item_name.trim();
    let benefits = entry.key_benefits.trim();
    match (name.is_empty(), benefits.is_empty()) {
        (false, false) => format!("{name} ({benefits})"),
        (false, true) => name.to_string(),
        (true, false) => benefits.to_string(),
        (true, true) => "наше предложение".to_string(),
    }
}

#[async_trait]
impl GenerationBackend for TemplateBackend {
    async fn generate(&self, input: BackendInput<'_>) -> Result<String, GenerationError> {
        Ok(Self::render(
            &input.request.contact_info,
            &input.context.entry,
        ))
    }
}
