//! Prompt Composer: the fixed instruction template plus per-request variables.

use outreach_core::generation::GenerationRequest;
use outreach_core::knowledge::RetrievedContext;

/// Substituted for a blank chat history.
pub const NO_HISTORY: &str = "нет истории переписки";

const DEFAULT_TEMPLATE: &str = "\
Ты - ИИ-агент, работающий от имени пользователя для реферального маркетинга в Telegram.
Твоя задача - проактивно рекомендовать реферальные продукты из предоставленной базы знаний.
Твой стиль общения должен быть дружелюбным, но профессиональным, имитируя стиль твоего владельца.

Контекст о контакте: {contact_info}
История чата с контактом (для анализа интересов): {chat_history}
База знаний (наиболее релевантный продукт): {context}

Инструкция:
1. Проанализируй историю чата и информацию о контакте, чтобы выявить его текущие потребности и интересы.
2. Сформулируй короткое, персонализированное сообщение, которое начинается с вопроса или утверждения, связанного с интересами контакта.
3. Включи в сообщение ключевые преимущества продукта и реферальную ссылку.
4. Сообщение должно быть не более 4-5 предложений.

Сообщение для контакта:
";

/// Merges the instruction template with one request's variables.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom template with `{contact_info}`, `{chat_history}` and `{context}`.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn compose(&self, request: &GenerationRequest, context: &RetrievedContext) -> String {
        let history = if request.has_history() {
            request.chat_history.as_str()
        } else {
            NO_HISTORY
        };

        // Single pass over the template, so braces inside values stay literal.
        let mut out = String::with_capacity(self.template.len() + context.text.len() + 256);
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let value = [
                ("{contact_info}", request.contact_info.as_str()),
                ("{chat_history}", history),
                ("{context}", context.text.as_str()),
            ]
            .into_iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder));

            match value {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
