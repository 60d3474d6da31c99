//! Chat-completion client for the translation model

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ChatRequest, ChatResponse};

/// Markers providers use when their content filter rejects a prompt
const CONTENT_POLICY_MARKERS: &[&str] = &["ResponsibleAIPolicyViolation", "content_filter"];

/// Anything that turns a system instruction plus a user message into generated text
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        (**self).complete(request).await
    }
}

/// HTTP client for Azure AI Inference / OpenAI-compatible `chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl ChatClient {
    /// Create a new client
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        let base = self.config.api_endpoint.trim_end_matches('/');
        if self.config.api_version.is_empty() {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/chat/completions?api-version={}", base, self.config.api_version)
        }
    }

    fn body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": request.messages(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        });

        if !self.config.model.is_empty() {
            body["model"] = serde_json::json!(self.config.model);
        }

        body
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::TimeoutError
                } else {
                    TranslationError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let json: serde_json::Value =
                response
                    .json()
                    .await
                    .map_err(|e| TranslationError::InvalidResponseError {
                        message: e.to_string(),
                    })?;

            return parse_completion(&json);
        }

        let status_code = status.as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let error_text = response.text().await.unwrap_or_default();

        Err(classify_failure(status_code, retry_after, error_text))
    }
}

/// Extract generated text from a successful response body
fn parse_completion(json: &serde_json::Value) -> Result<ChatResponse> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "No choices in response".to_string(),
        })?;

    let content = choice["message"]["content"].as_str();

    if content.is_none() && choice["finish_reason"].as_str() == Some("content_filter") {
        return Err(TranslationError::ContentPolicyError {
            message: "completion withheld by content_filter".to_string(),
        });
    }

    let content = content.ok_or_else(|| TranslationError::InvalidResponseError {
        message: "No message content in response".to_string(),
    })?;

    let total_tokens = json["usage"]["total_tokens"].as_u64().map(|t| t as usize);
    debug!("Completion received ({:?} tokens)", total_tokens);

    Ok(ChatResponse {
        content: content.to_string(),
        total_tokens,
    })
}

/// Map a failed HTTP exchange onto the retry taxonomy
fn classify_failure(status: u16, retry_after: Option<u64>, body: String) -> TranslationError {
    if status == 429 || body.contains("Too Many Requests") {
        return TranslationError::RateLimitError { retry_after };
    }

    if CONTENT_POLICY_MARKERS.iter().any(|m| body.contains(m)) {
        return TranslationError::ContentPolicyError { message: body };
    }

    TranslationError::ApiError {
        status,
        message: body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Arc<TranslatorConfig> {
        Arc::new(TranslatorConfig {
            api_key: "test_key".to_string(),
            api_endpoint: "https://example.services.ai.azure.com/models/".to_string(),
            api_version: "2024-05-01-preview".to_string(),
            model: "DeepSeek-V3".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_client_creation() {
        assert!(ChatClient::new(config()).is_ok());
        assert!(ChatClient::new(Arc::new(TranslatorConfig::default())).is_err());
    }

    #[test]
    fn test_url_and_body() {
        let client = ChatClient::new(config()).unwrap();
        assert_eq!(
            client.url(),
            "https://example.services.ai.azure.com/models/chat/completions?api-version=2024-05-01-preview"
        );

        let body = client.body(&ChatRequest::new("sys", "text"));
        assert_eq!(body["model"], "DeepSeek-V3");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "text");
    }

    #[test]
    fn test_parse_completion() {
        let response = parse_completion(&json!({
            "choices": [{"message": {"content": "번역"}, "finish_reason": "stop"}],
            "usage": {"total_tokens": 12}
        }))
        .unwrap();
        assert_eq!(response, ChatResponse::new("번역").with_tokens(12));

        let filtered = parse_completion(&json!({
            "choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]
        }));
        assert!(filtered.unwrap_err().is_content_policy());

        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(429, Some(3), String::new()).is_rate_limited());
        assert!(classify_failure(503, None, "Too Many Requests".to_string()).is_rate_limited());
        assert!(classify_failure(
            400,
            None,
            r#"{"error":{"code":"content_filter","innererror":{"code":"ResponsibleAIPolicyViolation"}}}"#
                .to_string()
        )
        .is_content_policy());
        assert!(matches!(
            classify_failure(500, None, "boom".to_string()),
            TranslationError::ApiError { status: 500, .. }
        ));
    }
}
