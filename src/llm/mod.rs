//! LLM clients and response handling
//!
//! Two backends are used by the server:
//!
//! - [`ollama::OllamaClient`] - a local lightweight model used for intent
//!   extraction and short performance insights
//! - [`openai::OpenAiClient`] - an OpenAI-compatible chat endpoint used for
//!   receipt vision OCR and expense review
//!
//! Text generation is exposed through the [`TextGenerator`] trait so the intent
//! pipeline and the services can run against a scripted generator in tests.

pub mod json;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorInfo};

pub use json::{extract_object, ExtractionFailed, ExtractionStrategy};
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};

/// Errors raised by LLM backends
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (connection refused, DNS, TLS, ...)
    #[error("LLM request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The request did not complete within its timeout
    #[error("LLM request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("LLM request failed: {status} - {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode LLM response: {0}")]
    Decode(String),

    /// Response decoded but carried no text
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Backend is missing required configuration (API key, model)
    #[error("LLM backend not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl ErrorInfo for LlmError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NotConfigured(_))
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Http(_) => "AI 서버에 연결할 수 없습니다".to_string(),
            Self::Timeout => "AI 응답 시간이 초과되었습니다".to_string(),
            Self::Status { status, .. } => format!("AI 서버 응답 오류 (HTTP {status})"),
            Self::Decode(_) | Self::EmptyResponse => "AI 응답을 해석할 수 없습니다".to_string(),
            Self::NotConfigured(what) => format!("AI 설정이 없습니다: {what}"),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Timeout => ErrorCategory::Network,
            Self::Status { .. } | Self::EmptyResponse => ErrorCategory::Llm,
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::NotConfigured(_) => ErrorCategory::Config,
        }
    }
}

/// Per-call sampling and timeout overrides
///
/// Unset fields fall back to the backend's configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A backend that turns a prompt into free text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend label used in logs and metrics
    fn backend(&self) -> &'static str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_builder() {
        let opts = GenerationOptions::new()
            .temperature(0.3)
            .max_tokens(150)
            .timeout(Duration::from_secs(15));

        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(150));
        assert_eq!(opts.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_default_options_are_unset() {
        let opts = GenerationOptions::default();
        assert!(opts.temperature.is_none());
        assert!(opts.max_tokens.is_none());
        assert!(opts.timeout.is_none());
    }
}
