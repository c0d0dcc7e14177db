//! Generation domain types and the backend trait.
//!
//! A generation backend turns a composed prompt into outreach text, or
//! fails with a [`GenerationError`]. Backends are tried in tier order by
//! the orchestrator; none of them shares state with another.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GenerationError;
use crate::knowledge::RetrievedContext;

/// Returned instead of a message when every tier failed.
///
/// Callers must recognize it and suppress delivery.
pub const FAILURE_SENTINEL: &str =
    "КРИТИЧЕСКАЯ ОШИБКА: Все сервисы генерации недоступны. Сообщение не отправлено.";

/// Whether `text` is the total-failure sentinel.
pub fn is_failure_sentinel(text: &str) -> bool {
    text == FAILURE_SENTINEL
}

/// Per-invocation input assembled from caller-supplied contact data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text description of the contact
    pub contact_info: String,

    /// Recent chat history, oldest first; empty means "no history"
    pub chat_history: String,

    /// Query used against the knowledge index
    pub search_query: String,
}

impl GenerationRequest {
    pub fn new(contact_info: impl Into<String>, chat_history: impl Into<String>) -> Self {
        let contact_info = contact_info.into();
        let chat_history = chat_history.into();
        let search_query = format!(
            "Интересы контакта: {contact_info}. История чата: {chat_history}"
        );
        Self {
            contact_info,
            chat_history,
            search_query,
        }
    }

    pub fn has_history(&self) -> bool {
        !self.chat_history.trim().is_empty()
    }
}

/// Everything a backend may use to produce one message.
#[derive(Debug, Clone)]
pub struct BackendInput<'a> {
    /// The composed prompt (instruction template + variables)
    pub prompt: &'a str,

    /// The original request
    pub request: &'a GenerationRequest,

    /// The retrieved knowledge entry
    pub context: &'a RetrievedContext,
}

/// A capability that produces outreach text from a composed prompt.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce message text. An `Ok` with blank text is treated as a failure.
    async fn generate(&self, input: BackendInput<'_>) -> Result<String, GenerationError>;
}

/// A ranked attempt in the fallback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    Primary,
    Secondary,
    Template,
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TierKind::Primary => "primary",
            TierKind::Secondary => "secondary",
            TierKind::Template => "template",
        };
        f.write_str(s)
    }
}

/// Outcome of one tier within one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TierAttempt {
    pub tier: TierKind,
    pub outcome: Result<(), GenerationError>,
}

impl TierAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Result of one orchestrated generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The message, or [`FAILURE_SENTINEL`]
    pub text: String,

    /// The tier that produced `text`; `None` on total failure
    pub tier: Option<TierKind>,

    /// Every tier attempted, in order
    pub attempts: Vec<TierAttempt>,
}

impl Generation {
    pub fn is_failure(&self) -> bool {
        self.tier.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_combines_contact_and_history() {
        let req = GenerationRequest::new("Анна, приватность данных", "потеря файлов");
        assert_eq!(
            req.search_query,
            "Интересы контакта: Анна, приватность данных. История чата: потеря файлов"
        );
        assert!(req.has_history());
    }

    #[test]
    fn blank_history_is_no_history() {
        let req = GenerationRequest::new("Олег", "  \n");
        assert!(!req.has_history());
    }

    #[test]
    fn sentinel_is_recognized() {
        assert!(is_failure_sentinel(FAILURE_SENTINEL));
        assert!(!is_failure_sentinel("Привет!"));
    }

    #[test]
    fn tier_display() {
        assert_eq!(TierKind::Primary.to_string(), "primary");
        assert_eq!(TierKind::Template.to_string(), "template");
    }
}
