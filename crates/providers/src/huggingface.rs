//! Hugging Face inference: the secondary generation tier and a hosted embedder.
//!
//! Both talk to `POST {base_url}/models/{model}` with a bearer token. The
//! generation payload depends on the configured task; the response is an
//! array of `{summary_text}` or `{generated_text}` objects.

use async_trait::async_trait;
use outreach_config::{InferenceTask, SecondaryConfig};
use outreach_core::error::{GenerationError, RetrievalError};
use outreach_core::generation::{BackendInput, GenerationBackend};
use outreach_core::knowledge::Embedder;
use serde_json::{Value, json};
use tracing::debug;

use crate::http;

pub struct HuggingFaceBackend {
    config: SecondaryConfig,
    client: reqwest::Client,
}

impl HuggingFaceBackend {
    pub fn new(config: &SecondaryConfig) -> Result<Self, GenerationError> {
        let client = http::build_client(config.timeout_secs, true)?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn token(&self) -> Result<&str, GenerationError> {
        self.config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GenerationError::NotConfigured("HF_TOKEN is not set".into()))
    }

    fn url(&self) -> String {
        model_url(&self.config.base_url, &self.config.model)
    }

    fn payload(&self, prompt: &str) -> Value {
        let parameters = match self.config.task {
            InferenceTask::Summarization => json!({
                "max_length": self.config.max_new_tokens,
                "temperature": self.config.temperature,
            }),
            InferenceTask::TextGeneration => json!({
                "max_new_tokens": self.config.max_new_tokens,
                "temperature": self.config.temperature,
                "return_full_text": false,
            }),
            InferenceTask::Text2textGeneration => json!({
                "max_new_tokens": self.config.max_new_tokens,
                "temperature": self.config.temperature,
            }),
        };

        json!({
            "inputs": prompt,
            "parameters": parameters,
            "options": { "wait_for_model": true },
        })
    }
}

#[async_trait]
impl GenerationBackend for HuggingFaceBackend {
    async fn generate(&self, input: BackendInput<'_>) -> Result<String, GenerationError> {
        let token = self.token()?;

        debug!(
            model = %self.config.model,
            task = self.config.task.as_str(),
            "Sending Hugging Face inference request"
        );

        let response = self
            .client
            .post(self.url())
            .bearer_auth(token)
            .json(&self.payload(input.prompt))
            .send()
            .await
            .map_err(http::network)?;

        let response = http::check_status(response).await?;
        let body: Value = response.json().await.map_err(|e| {
            GenerationError::InvalidOutput(format!("Failed to parse response: {e}"))
        })?;

        let text = extract_text(&body)?;
        http::non_empty(strip_prompt_echo(&text, input.prompt))
    }
}

fn model_url(base_url: &str, model: &str) -> String {
    format!("{}/models/{model}", base_url.trim_end_matches('/'))
}

/// Pull the generated text out of an inference response.
fn extract_text(body: &Value) -> Result<String, GenerationError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(GenerationError::InvalidOutput(error.to_string()));
    }

    let first = match body {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(body),
        _ => None,
    }
    .ok_or_else(|| GenerationError::InvalidOutput("No results in response".into()))?;

    ["summary_text", "generated_text"]
        .iter()
        .find_map(|key| first.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| {
            GenerationError::InvalidOutput("Response has no summary_text or generated_text".into())
        })
}

/// Some models echo the prompt before the continuation.
fn strip_prompt_echo<'a>(text: &'a str, prompt: &str) -> &'a str {
    text.strip_prefix(prompt).unwrap_or(text)
}

/// Sentence embeddings via the hosted feature-extraction pipeline.
pub struct HuggingFaceEmbedder {
    model: String,
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HuggingFaceEmbedder {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, RetrievalError> {
        let client = http::build_client(timeout_secs, true)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        Ok(Self {
            model: model.into(),
            base_url: base_url.into(),
            token: token.filter(|t| !t.trim().is_empty()),
            client,
        })
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| RetrievalError::Embedding("HF_TOKEN is not set".into()))?;

        let url = format!(
            "{}/pipeline/feature-extraction",
            model_url(&self.base_url, &self.model)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "inputs": texts, "options": { "wait_for_model": true } }))
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let response = http::check_status(response)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("Unexpected embedding shape: {e}")))?;

        if vectors.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::generation::GenerationRequest;
    use outreach_core::knowledge::{KnowledgeEntry, RetrievedContext};

    fn config(server: &mockito::ServerGuard, task: InferenceTask) -> SecondaryConfig {
        SecondaryConfig {
            token: Some("hf_test".into()),
            base_url: server.url(),
            task,
            timeout_secs: 5,
            ..SecondaryConfig::default()
        }
    }

    async fn run(backend: &HuggingFaceBackend, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerationRequest::new("Олег", "");
        let context = RetrievedContext::from_entry(KnowledgeEntry::new(
            "TaskFlow",
            "планирование",
            "https://ref/tf",
            "команды",
        ));
        backend
            .generate(BackendInput {
                prompt,
                request: &request,
                context: &context,
            })
            .await
    }

    #[tokio::test]
    async fn summarization_response_is_used() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/models/facebook/bart-large-cnn")
            .match_header("authorization", "Bearer hf_test")
            .match_body(mockito::Matcher::PartialJson(json!({
                "inputs": "prompt",
                "parameters": {"max_length": 100},
                "options": {"wait_for_model": true}
            })))
            .with_status(200)
            .with_body(r#"[{"summary_text": "Попробуй TaskFlow: https://ref/tf"}]"#)
            .create_async()
            .await;

        let backend =
            HuggingFaceBackend::new(&config(&server, InferenceTask::Summarization)).unwrap();
        assert_eq!(
            run(&backend, "prompt").await.unwrap(),
            "Попробуй TaskFlow: https://ref/tf"
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn text_generation_strips_echoed_prompt() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/facebook/bart-large-cnn")
            .match_body(mockito::Matcher::PartialJson(json!({
                "parameters": {"max_new_tokens": 100, "return_full_text": false}
            })))
            .with_status(200)
            .with_body(r#"[{"generated_text": "Напиши: Привет, Олег!"}]"#)
            .create_async()
            .await;

        let backend =
            HuggingFaceBackend::new(&config(&server, InferenceTask::TextGeneration)).unwrap();
        assert_eq!(run(&backend, "Напиши:").await.unwrap(), "Привет, Олег!");
    }

    #[tokio::test]
    async fn loading_model_error_is_invalid_output() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/facebook/bart-large-cnn")
            .with_status(200)
            .with_body(r#"{"error": "Model is currently loading"}"#)
            .create_async()
            .await;

        let backend =
            HuggingFaceBackend::new(&config(&server, InferenceTask::Summarization)).unwrap();
        assert!(matches!(
            run(&backend, "p").await,
            Err(GenerationError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/facebook/bart-large-cnn")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let backend =
            HuggingFaceBackend::new(&config(&server, InferenceTask::Summarization)).unwrap();
        assert_eq!(
            run(&backend, "p").await,
            Err(GenerationError::ApiError {
                status_code: 503,
                message: "unavailable".into()
            })
        );
    }

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let server = mockito::Server::new_async().await;
        let mut cfg = config(&server, InferenceTask::Summarization);
        cfg.token = Some("  ".into());
        let backend = HuggingFaceBackend::new(&cfg).unwrap();
        assert!(matches!(
            run(&backend, "p").await,
            Err(GenerationError::NotConfigured(_))
        ));
    }

    #[test]
    fn extract_text_handles_shapes() {
        assert_eq!(
            extract_text(&json!([{"generated_text": "a"}])).unwrap(),
            "a"
        );
        assert_eq!(extract_text(&json!({"summary_text": "b"})).unwrap(), "b");
        assert!(extract_text(&json!([])).is_err());
        assert!(extract_text(&json!([{"label": "x"}])).is_err());
    }

    #[tokio::test]
    async fn embedder_returns_one_vector_per_text() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock(
                "POST",
                "/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction",
            )
            .match_header("authorization", "Bearer hf_test")
            .with_status(200)
            .with_body("[[0.1, 0.2], [0.3, 0.4]]")
            .create_async()
            .await;

        let embedder = HuggingFaceEmbedder::new(
            "sentence-transformers/all-MiniLM-L6-v2",
            server.url(),
            Some("hf_test".into()),
            5,
        )
        .unwrap();
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn embedder_without_token_fails() {
        let embedder = HuggingFaceEmbedder::new("m", "http://127.0.0.1:1", None, 1).unwrap();
        assert!(matches!(
            embedder.embed(&["a".to_string()]).await,
            Err(RetrievalError::Embedding(_))
        ));
    }
}
