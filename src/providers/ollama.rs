//! Ollama provider implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::conversation::PromptMessage;

use super::{Generator, ProviderError, PROBE_TIMEOUT};

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    options: OllamaOptions,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    options: &'a OllamaOptions,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: OllamaOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
            timeout,
        })
    }

    fn unavailable(&self) -> String {
        format!(
            "Cannot connect to Ollama at {}. Make sure Ollama is running \
             (install from https://ollama.ai and run 'ollama serve')",
            self.base_url
        )
    }
}

#[async_trait]
impl Generator for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
        let request = OllamaRequest {
            model: &self.model,
            messages,
            stream: false,
            options: &self.options,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "Sending chat request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, self.timeout, || self.unavailable()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::InvalidResponse(format!(
                "{}: {}",
                status, body
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_body(e, self.timeout))?;

        Ok(ollama_response
            .message
            .map(|message| message.content)
            .unwrap_or_default())
    }

    async fn check_availability(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Ollama availability probe failed");
                false
            }
        }
    }
}
