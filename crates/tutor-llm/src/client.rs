//! Chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use tutor_types::{ChatMessage, LlmSettings};

use crate::error::LlmError;

/// Chat-completion capability.
///
/// One call sends the whole message list and returns one complete payload.
/// The payload must expose the completion text at
/// `choices[0].message.content`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Value, LlmError>;
}

/// Configuration for [`ApiLlmClient`].
#[derive(Debug, Clone)]
pub struct ApiLlmConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,
}

impl ApiLlmConfig {
    /// Create config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            temperature: None,
        }
    }

    /// Build from settings; fails when no API key is configured.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            LlmError::Config(
                "no API key: set TUTOR_LLM__API_KEY or OPENAI_API_KEY".to_string(),
            )
        })?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
            temperature: settings.temperature,
            ..Self::openai(api_key, settings.model.clone())
        })
    }
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ApiLlmClient {
    client: Client,
    config: ApiLlmConfig,
}

impl ApiLlmClient {
    pub fn new(config: ApiLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[async_trait]
impl LlmClient for ApiLlmClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Value, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(url = %url, messages = messages.len(), "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if response.status() == 429 {
            return Err(LlmError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::Api(format!("invalid response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiLlmConfig {
        ApiLlmConfig {
            base_url: server.uri(),
            ..ApiLlmConfig::openai("test-key", "gpt-4o-mini")
        }
    }

    #[tokio::test]
    async fn test_chat_returns_raw_payload() {
        let server = MockServer::start().await;
        let payload = json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "{\"response\": \"hi\"}"}}]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiLlmClient::new(config_for(&server)).unwrap();
        let result = client.chat(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(result, payload);
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ApiLlmClient::new(config_for(&server)).unwrap();
        let err = client.chat(&[ChatMessage::user("hello")]).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn test_server_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = ApiLlmClient::new(config_for(&server)).unwrap();
        match client.chat(&[ChatMessage::user("hello")]).await {
            Err(LlmError::Api(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("upstream down"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:8080/v1/".to_string(),
            ..LlmSettings::default()
        };
        let config = ApiLlmConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api_key.expose_secret(), "sk-test");
    }
}
