//! OpenAI-compatible provider
//!
//! Talks to any server that implements the chat completions format, which
//! covers most local inference servers (LM Studio, vLLM, llama.cpp server,
//! LocalAI) as well as hosted APIs.
//!
//! # Configuration
//!
//! ```toml
//! [llm]
//! provider = "openai"
//! endpoint = "http://localhost:1234/v1"
//! model = "qwen2.5-7b-instruct"
//! api_key_env = "LOCAL_LLM_KEY"  # optional
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::conversation::PromptMessage;

use super::{Generator, ProviderError, PROBE_TIMEOUT};

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OpenAI-compatible API provider
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.bearer_auth(api_key),
            None => builder,
        }
    }

    fn unavailable(&self) -> String {
        format!(
            "Cannot connect to the model server at {}. Make sure it is running.",
            self.base_url
        )
    }
}

fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let completion: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse response: {} - Body: {}", e, body))
    })?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .authorize(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, self.timeout, || self.unavailable()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_body(e, self.timeout))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(ProviderError::InvalidResponse(format!(
                    "API error: {}",
                    error_resp.error.message
                )));
            }
            return Err(ProviderError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        parse_completion(&body)
    }

    async fn check_availability(&self) -> bool {
        let request = self
            .authorize(self.client.get(format!("{}/models", self.base_url)))
            .timeout(PROBE_TIMEOUT);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Model server availability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let messages = vec![PromptMessage::user("Hello")];
        let request = ChatCompletionRequest {
            model: "local-model",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 256,
            stream: false,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "local-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Hi!"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hi!");

        let empty = r#"{"choices": []}"#;
        assert!(matches!(
            parse_completion(empty),
            Err(ProviderError::InvalidResponse(_))
        ));

        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = LlmConfig {
            endpoint: "http://localhost:1234/v1/".to_string(),
            ..LlmConfig::default()
        };
        let provider = OpenAiCompatProvider::new(&config, Some("key".to_string())).unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
        assert_eq!(provider.api_key.as_deref(), Some("key"));
    }
}
