//! Google Gemini client implementation.
//!
//! Sends a single-turn prompt to `models/{model}:generateContent` and returns
//! the concatenated text of the first candidate.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::config::{RemoteLlmConfig, GEMINI_BASE_URL};
//! use llm::remote::GeminiClient;
//! use llm::TextGenerator;
//!
//! let config = RemoteLlmConfig::from_env("GEMINI_API_KEY", GEMINI_BASE_URL, "gemini-2.5-flash-lite")?
//!     .with_tools(true);
//! let client = GeminiClient::new(config)?;
//! let text = client.generate("Summarize these reviews: ...").await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::generator::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Google Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        let tools = if self.config.enable_tools {
            vec![
                GeminiTool {
                    url_context: Some(EmptyObject {}),
                    google_search: None,
                },
                GeminiTool {
                    url_context: None,
                    google_search: Some(EmptyObject {}),
                },
            ]
        } else {
            Vec::new()
        };

        GeminiRequest {
            contents: vec![GeminiMessage {
                role: "user".to_string(),
                parts: vec![GeminiPart::new(prompt.to_string())],
            }],
            tools,
        }
    }

    async fn send_once(&self, body: &GeminiRequest) -> Result<String> {
        // Gemini API URL format: base_url/models/{model}:generateContent
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        // Gemini uses API key as query parameter
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.config.api_key)])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, error_text));
        }

        let gemini_resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        extract_text(gemini_resp)
    }
}

/// Pull the reply text out of a response, rejecting empty or blocked replies.
fn extract_text(resp: GeminiResponse) -> Result<String> {
    if let Some(feedback) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::Blocked(feedback));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response contained no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(LlmError::InvalidResponse(format!(
            "empty reply (finish reason: {})",
            reason
        )));
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = self.build_request(prompt);
        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        model = %self.config.model,
                        attempt,
                        error = %e,
                        "Gemini call failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl GeminiPart {
    fn new(text: String) -> Self {
        Self { text: Some(text) }
    }
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    url_context: Option<EmptyObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<EmptyObject>,
}

#[derive(Debug, Serialize)]
struct EmptyObject {}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GEMINI_BASE_URL;

    fn client(tools: bool) -> GeminiClient {
        let config = RemoteLlmConfig::new("test-key", GEMINI_BASE_URL, "gemini-2.5-flash-lite")
            .with_tools(tools);
        GeminiClient::new(config).unwrap()
    }

    #[test]
    fn test_request_without_tools() {
        let body = serde_json::to_value(client(false).build_request("hi")).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_request_with_tools() {
        let body = serde_json::to_value(client(true).build_request("hi")).unwrap();
        assert_eq!(body["tools"][0], serde_json::json!({"url_context": {}}));
        assert_eq!(body["tools"][1], serde_json::json!({"google_search": {}}));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "type|"}, {"text": "category"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(resp).unwrap(), "type|category");
    }

    #[test]
    fn test_extract_text_rejects_empty_and_blocked() {
        let empty: GeminiResponse = serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert!(matches!(extract_text(empty), Err(LlmError::InvalidResponse(_))));

        let blocked: GeminiResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(extract_text(blocked), Err(LlmError::Blocked(_))));

        let no_text: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        let err = extract_text(no_text).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(client(false).model_name(), "gemini-2.5-flash-lite");
    }
}
