//! OpenAI-compatible chat completions client
//!
//! Used for receipt vision OCR (text + image message) and expense review
//! (text-only message).

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};

use super::LlmError;
use crate::metrics;

/// Configuration for the OpenAI client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL (default: https://api.openai.com)
    pub base_url: String,

    /// API key; requests fail with `NotConfigured` while unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model name (default: gpt-4o-mini)
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            timeout_secs: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn with_config(config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::with_config(OpenAiConfig::from_env())
    }

    /// Model name reported back to callers
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a text prompt together with a JPEG image
    pub async fn complete_with_image(
        &self,
        prompt: &str,
        jpeg: &[u8],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
        let content = json!([
            { "type": "text", "text": prompt },
            {
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{encoded}") }
            }
        ]);
        self.chat(content, temperature).await
    }

    /// Send a text-only prompt
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.chat(json!(prompt), temperature).await
    }

    async fn chat(&self, content: serde_json::Value, temperature: f32) -> Result<String, LlmError> {
        let started = Instant::now();
        let result = self.send_chat(content, temperature).await;
        metrics::record_llm_request("openai", result.is_ok(), started.elapsed());
        result
    }

    async fn send_chat(
        &self,
        content: serde_json::Value,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "temperature": temperature,
            "messages": [{ "role": "user", "content": content }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
