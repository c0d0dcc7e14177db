//! Shared HTTP plumbing: client construction and status mapping.
//!
//! Each backend builds its own client, so a misconfigured or poisoned
//! transport in one tier cannot leak into another.

use outreach_core::error::GenerationError;
use std::time::Duration;
use tracing::warn;

/// Build a dedicated HTTP client for one backend.
pub(crate) fn build_client(
    timeout_secs: u64,
    verify_tls: bool,
) -> Result<reqwest::Client, GenerationError> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs.max(1)));
    if !verify_tls {
        warn!("TLS certificate verification disabled for this backend");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder
        .build()
        .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))
}

/// Map a transport error.
pub(crate) fn network(e: reqwest::Error) -> GenerationError {
    GenerationError::Network(e.to_string())
}

/// Turn a non-success response into the matching error, or pass it through.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(GenerationError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(GenerationError::AuthenticationFailed(
            "Invalid credentials or insufficient permissions".into(),
        ));
    }

    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        warn!(status, body = %body, "Backend returned error");
        return Err(GenerationError::ApiError {
            status_code: status,
            message: body,
        });
    }

    Ok(response)
}

/// Trim backend output and reject blank text.
pub(crate) fn non_empty(text: &str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GenerationError::EmptyOutput)
    } else {
        Ok(trimmed.to_string())
    }
}
