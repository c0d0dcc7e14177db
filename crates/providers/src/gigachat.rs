//! GigaChat backend, the primary generation tier.
//!
//! Two-step protocol:
//! 1. OAuth: `POST {auth_url}` with `Authorization: Basic <credentials>`,
//!    a fresh `RqUID`, and form `scope=...` ⇒ `{access_token, expires_at}`.
//! 2. Chat: `POST {base_url}/chat/completions` with the bearer token and an
//!    OpenAI-shaped body ⇒ `choices[0].message.content`.
//!
//! The access token is cached inside this backend only and refreshed a
//! minute before it expires.

use async_trait::async_trait;
use outreach_config::PrimaryConfig;
use outreach_core::error::GenerationError;
use outreach_core::generation::{BackendInput, GenerationBackend};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::http;

/// Refresh the token this long before it expires.
const TOKEN_REFRESH_MARGIN_MS: i64 = 60_000;

pub struct GigaChatBackend {
    config: PrimaryConfig,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at_ms: i64,
}

impl AccessToken {
    fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms + TOKEN_REFRESH_MARGIN_MS < self.expires_at_ms
    }
}

impl GigaChatBackend {
    pub fn new(config: &PrimaryConfig) -> Result<Self, GenerationError> {
        let client = http::build_client(config.timeout_secs, config.verify_tls)?;
        Ok(Self {
            config: config.clone(),
            client,
            token: Mutex::new(None),
        })
    }

    fn credentials(&self) -> Result<&str, GenerationError> {
        self.config
            .credentials
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenerationError::NotConfigured("GIGACHAT_CREDENTIALS is not set".into()))
    }

    async fn access_token(&self) -> Result<String, GenerationError> {
        let credentials = self.credentials()?;
        let mut cached = self.token.lock().await;
        let now_ms = chrono::Utc::now().timestamp_millis();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now_ms)) {
            return Ok(token.value.clone());
        }

        debug!(scope = %self.config.scope, "Requesting GigaChat access token");

        let response = self
            .client
            .post(&self.config.auth_url)
            .header("Authorization", format!("Basic {credentials}"))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .form(&[("scope", self.config.scope.as_str())])
            .send()
            .await
            .map_err(http::network)?;

        let response = http::check_status(response).await?;
        let body: TokenResponse = response.json().await.map_err(|e| {
            GenerationError::AuthenticationFailed(format!("Failed to parse token response: {e}"))
        })?;

        if body.access_token.trim().is_empty() {
            return Err(GenerationError::AuthenticationFailed(
                "Empty access token".into(),
            ));
        }

        let token = AccessToken {
            value: body.access_token,
            expires_at_ms: body.expires_at,
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl GenerationBackend for GigaChatBackend {
    async fn generate(&self, input: BackendInput<'_>) -> Result<String, GenerationError> {
        let token = self.access_token().await?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: input.prompt,
            }],
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, prompt_len = input.prompt.len(), "Sending GigaChat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http::network)?;

        let response = match http::check_status(response).await {
            Ok(r) => r,
            Err(e @ GenerationError::AuthenticationFailed(_)) => {
                self.forget_token().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let api: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::InvalidOutput(format!("Failed to parse response: {e}"))
        })?;

        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidOutput("No choices in response".into()))?;

        http::non_empty(&choice.message.content.unwrap_or_default())
    }
}

// --- Wire types ---

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Unix epoch milliseconds
    expires_at: i64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
