//! Text generation backends
//!
//! The engine only sees the [`Generator`] trait. [`Provider`] picks a concrete
//! backend from configuration.

mod ollama;
mod openai_compat;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::conversation::PromptMessage;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;

/// How long an availability probe may take
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The backend could not be reached at all
    #[error("{0}")]
    Unavailable(String),

    #[error("LLM request timed out after {0}s. Try again.")]
    Timeout(u64),

    #[error("LLM generation failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short label for logs and message metadata
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::UnknownProvider(_) => "unknown_provider",
            ProviderError::Unavailable(_) => "unavailable",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::RequestFailed(_) | ProviderError::InvalidResponse(_) => "failed",
        }
    }

    fn from_send(
        err: reqwest::Error,
        timeout: Duration,
        unavailable: impl FnOnce() -> String,
    ) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout.as_secs())
        } else if err.is_connect() {
            ProviderError::Unavailable(unavailable())
        } else {
            ProviderError::RequestFailed(err)
        }
    }

    fn from_body(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout.as_secs())
        } else {
            ProviderError::InvalidResponse(err.to_string())
        }
    }
}

/// Anything that can turn an ordered message list into a reply
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name, for display
    fn name(&self) -> &str;

    /// Model the backend is asked to use
    fn model(&self) -> &str;

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError>;

    /// Cheap reachability probe; never errors
    async fn check_availability(&self) -> bool {
        true
    }
}

pub enum Provider {
    Ollama(OllamaProvider),
    OpenAiCompat(OpenAiCompatProvider),
}

impl Provider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        match config.provider.to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama(OllamaProvider::new(config)?)),
            "openai" | "openai_compat" | "openai-compat" => {
                let api_key = config
                    .api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok());
                Ok(Provider::OpenAiCompat(OpenAiCompatProvider::new(
                    config, api_key,
                )?))
            }
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

#[async_trait]
impl Generator for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::Ollama(p) => p.name(),
            Provider::OpenAiCompat(p) => p.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Provider::Ollama(p) => p.model(),
            Provider::OpenAiCompat(p) => p.model(),
        }
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
        match self {
            Provider::Ollama(p) => p.generate(messages).await,
            Provider::OpenAiCompat(p) => p.generate(messages).await,
        }
    }

    async fn check_availability(&self) -> bool {
        match self {
            Provider::Ollama(p) => p.check_availability().await,
            Provider::OpenAiCompat(p) => p.check_availability().await,
        }
    }
}
