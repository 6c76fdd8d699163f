//! Configuration types for the runner.
//!
//! The roster and scheduler settings live in a YAML file (see
//! [`MomentsSettings`]). Everything about reaching the generation backend
//! comes from environment variables, so credentials never sit next to the
//! roster.
//!
//! [`MomentsSettings`]: moments_core::settings::MomentsSettings

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the settings file.
    pub settings_path: PathBuf,
    /// Generation backend, if `LLM_BACKEND` is set.
    pub backend: Option<LlmBackendConfig>,
    /// Seed for reproducible draws. Thread RNG when absent.
    pub rng_seed: Option<u64>,
    /// Per-request timeout for generation calls.
    pub request_timeout: Duration,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication. Empty when not provided.
    pub api_key: String,
    /// Model identifier. Empty when not provided.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `MOMENTS_CONFIG` -- settings file path (default `moments.yaml`)
    /// - `LLM_BACKEND` -- `openai`, `deepseek`, `ollama`, `anthropic`, or `claude`
    /// - `LLM_API_URL` -- API base URL (default depends on the backend)
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    /// - `LLM_TIMEOUT_MS` -- per-request timeout in milliseconds (default 30000)
    /// - `RNG_SEED` -- seed for reproducible runs
    ///
    /// A missing key or model is not an error here: the backend reports
    /// itself as not configured on every call instead.
    pub fn from_env() -> Result<Self, RunnerError> {
        let settings_path = PathBuf::from(
            std::env::var("MOMENTS_CONFIG").unwrap_or_else(|_| "moments.yaml".to_owned()),
        );

        let backend = match optional_env("LLM_BACKEND") {
            Some(name) => Some(load_backend_config(&name)?),
            None => None,
        };

        let request_timeout_ms: u64 = std::env::var("LLM_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid LLM_TIMEOUT_MS: {e}")))?;

        let rng_seed = optional_env("RNG_SEED")
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| RunnerError::Config(format!("invalid RNG_SEED: {e}")))?;

        Ok(Self {
            settings_path,
            backend,
            rng_seed,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }
}

/// Read an environment variable, treating blank values as unset.
fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Load the backend config for `LLM_BACKEND=name`.
fn load_backend_config(name: &str) -> Result<LlmBackendConfig, RunnerError> {
    let flavor = name.to_lowercase();
    let backend_type = parse_backend_type(&flavor)?;
    let api_url = optional_env("LLM_API_URL").unwrap_or_else(|| default_api_url(&flavor).to_owned());
    let api_key = optional_env("LLM_API_KEY").unwrap_or_else(|| default_api_key(&flavor).to_owned());
    let model = optional_env("LLM_MODEL").unwrap_or_default();

    Ok(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
    })
}

/// Map a lowercase backend name to its wire format.
fn parse_backend_type(flavor: &str) -> Result<BackendType, RunnerError> {
    match flavor {
        "openai" | "deepseek" | "ollama" => Ok(BackendType::OpenAi),
        "anthropic" | "claude" => Ok(BackendType::Anthropic),
        other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
    }
}

fn default_api_url(flavor: &str) -> &'static str {
    match flavor {
        "deepseek" => "https://api.deepseek.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "anthropic" | "claude" => "https://api.anthropic.com/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Ollama ignores the bearer token but the request still needs one.
fn default_api_key(flavor: &str) -> &'static str {
    if flavor == "ollama" { "ollama" } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parsing() {
        for name in ["openai", "deepseek", "ollama"] {
            assert_eq!(parse_backend_type(name).ok(), Some(BackendType::OpenAi));
        }
        for name in ["anthropic", "claude"] {
            assert_eq!(parse_backend_type(name).ok(), Some(BackendType::Anthropic));
        }
        assert!(matches!(
            parse_backend_type("gemini"),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn default_urls_follow_flavor() {
        assert_eq!(default_api_url("openai"), "https://api.openai.com/v1");
        assert_eq!(default_api_url("claude"), "https://api.anthropic.com/v1");
        assert!(default_api_url("ollama").starts_with("http://localhost"));
    }

    #[test]
    fn only_ollama_gets_a_placeholder_key() {
        assert_eq!(default_api_key("ollama"), "ollama");
        assert!(default_api_key("openai").is_empty());
        assert!(default_api_key("anthropic").is_empty());
    }
}
