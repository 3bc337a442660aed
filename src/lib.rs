//! smartspend-ai - AI server for the SmartSpend back office
//!
//! Answers Korean natural-language questions about attendance and department
//! performance, reads receipts with a vision model and pre-screens expense
//! claims.
//!
//! # Architecture
//!
//! - [`intent`] - Question → structured intent (model + literal correction)
//! - [`llm`] - Ollama and OpenAI-compatible clients, JSON extraction
//! - [`services`] - Attendance, performance, receipt and approval flows
//! - [`storage`] - Department performance rows (PostgreSQL)
//! - [`report`] - Spreadsheets, charts and text summaries
//! - [`server`] - axum HTTP API
//! - [`config`] - Configuration from environment or TOML
//! - [`error`] - Unified error handling
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartspend_ai::intent::{AttendanceDomain, IntentExtractor};
//! use smartspend_ai::llm::OllamaClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ollama = Arc::new(OllamaClient::from_env()?);
//!     let extractor = IntentExtractor::new(ollama, AttendanceDomain);
//!     let intent = extractor.extract("개발1팀 2025년 1월 출결 엑셀로 뽑아줘").await;
//!     println!("{}", serde_json::to_string(&intent)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod llm;
pub mod metrics;
pub mod report;
pub mod server;
pub mod services;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, ErrorInfo, Result};
    pub use crate::intent::{
        AttendanceDomain, AttendanceIntent, AttendanceIntentType, ChartType, Department,
        IntentDomain, IntentExtractor, PerformanceDomain, PerformanceIntent, PerformanceQueryType,
    };
    pub use crate::llm::{GenerationOptions, LlmError, TextGenerator};
    pub use crate::server::{AppState, Server};
    pub use crate::services::{AttendanceService, PerformanceService};
}

// Direct re-exports for convenience
pub use intent::{AttendanceIntent, Department, PerformanceIntent};
