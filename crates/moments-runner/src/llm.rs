//! Generation backends over HTTP.
//!
//! Enum dispatch over the two wire formats this runner speaks, the
//! `OpenAI`-compatible chat completions API and the Anthropic Messages API.
//! [`LlmBackend`] implements [`GenerationClient`], sending the persona as
//! the system prompt and the instruction as the single user message.
//!
//! No retries: a failed call is reported once and the scheduler skips the
//! action. The request timeout belongs to the `reqwest` client.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use moments_core::generation::{GenerationClient, GenerationError, GenerationRequest};

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;

/// Upper bound on generated tokens. Posts and comments are short.
const MAX_TOKENS: u32 = 300;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// A generation backend selected at start-up.
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// No backend configured. Every call fails with
    /// [`GenerationError::NotConfigured`].
    Unconfigured,
}

impl LlmBackend {
    /// Send a request and return the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotConfigured`] when the model or key is
    /// missing and [`GenerationError::Backend`] if the HTTP call fails or
    /// the response has no text.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request).await,
            Self::Anthropic(backend) => backend.complete(request).await,
            Self::Unconfigured => Err(GenerationError::NotConfigured(
                "LLM_BACKEND is not set".to_owned(),
            )),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Unconfigured => "unconfigured",
        }
    }
}

impl GenerationClient for LlmBackend {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, GenerationError>> {
        async move { self.complete(&request).await }.boxed()
    }
}

/// Fail fast when the model or credential is missing.
fn ensure_configured(config: &Endpoint) -> Result<(), GenerationError> {
    if config.model.is_empty() {
        return Err(GenerationError::NotConfigured("no model selected (LLM_MODEL)".to_owned()));
    }
    if config.api_key.is_empty() {
        return Err(GenerationError::NotConfigured("no API key (LLM_API_KEY)".to_owned()));
    }
    Ok(())
}

/// Connection details shared by both wire formats.
struct Endpoint {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl Endpoint {
    fn new(config: &LlmBackendConfig, timeout: Duration) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunnerError::LlmBackend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

/// Read a non-success response body into a backend error.
async fn error_from(provider: &str, response: reqwest::Response) -> GenerationError {
    let status = response.status();
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_owned());
    GenerationError::Backend(format!("{provider} returned {status}: {error_body}"))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for `OpenAI`-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP client cannot be built.
    pub fn new(config: &LlmBackendConfig, timeout: Duration) -> Result<Self, RunnerError> {
        Ok(Self {
            endpoint: Endpoint::new(config, timeout)?,
        })
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let endpoint = &self.endpoint;
        ensure_configured(endpoint)?;
        let url = format!("{}/chat/completions", endpoint.api_url);

        let body = serde_json::json!({
            "model": endpoint.model,
            "messages": [
                {"role": "system", "content": request.persona},
                {"role": "user", "content": request.instruction}
            ],
            "temperature": 0.9,
            "max_tokens": MAX_TOKENS
        });

        let response = endpoint
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", endpoint.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from("OpenAI", response).await);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            GenerationError::Backend("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// The persona goes in the top-level `system` field, authentication uses
/// the `x-api-key` header, and the text comes back in `content[0].text`.
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP client cannot be built.
    pub fn new(config: &LlmBackendConfig, timeout: Duration) -> Result<Self, RunnerError> {
        Ok(Self {
            endpoint: Endpoint::new(config, timeout)?,
        })
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let endpoint = &self.endpoint;
        ensure_configured(endpoint)?;
        let url = format!("{}/messages", endpoint.api_url);

        let body = serde_json::json!({
            "model": endpoint.model,
            "max_tokens": MAX_TOKENS,
            "system": request.persona,
            "messages": [
                {"role": "user", "content": request.instruction}
            ]
        });

        let response = endpoint
            .client
            .post(&url)
            .header("x-api-key", &endpoint.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(format!("Anthropic request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from("Anthropic", response).await);
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            GenerationError::Backend(format!("Anthropic response parse failed: {e}"))
        })?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            GenerationError::Backend("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a generation backend from configuration.
///
/// `None` yields [`LlmBackend::Unconfigured`].
///
/// # Errors
///
/// Returns [`RunnerError::LlmBackend`] if the HTTP client cannot be built.
pub fn create_backend(
    config: Option<&LlmBackendConfig>,
    timeout: Duration,
) -> Result<LlmBackend, RunnerError> {
    let Some(config) = config else {
        return Ok(LlmBackend::Unconfigured);
    };
    Ok(match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config, timeout)?),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config, timeout)?),
    })
}
