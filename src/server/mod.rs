//! HTTP server
//!
//! Builds the shared [`AppState`] from a [`Config`], wires the axum router
//! with CORS and request tracing, and serves until shutdown.

pub mod api;

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::Router;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ConfigError};
use crate::llm::{OllamaClient, OpenAiClient, TextGenerator};
use crate::report::ChartRenderer;
use crate::services::{
    ApprovalService, AttendanceService, BackendClient, PerformanceService, ReceiptService,
};
use crate::storage::PgPerformanceStore;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub attendance: Arc<AttendanceService>,
    pub performance: Arc<PerformanceService>,
    pub receipt: Arc<ReceiptService>,
    pub approval: Arc<ApprovalService>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Build every service from configuration
    ///
    /// Nothing connects here: the database pool and HTTP clients are lazy.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let ollama: Arc<dyn TextGenerator> = Arc::new(
            OllamaClient::with_config(config.ollama.clone())
                .map_err(|e| ServerError::Init(format!("ollama client: {e}")))?,
        );
        let openai = OpenAiClient::with_config(config.openai.clone())
            .map_err(|e| ServerError::Init(format!("openai client: {e}")))?;
        let backend = BackendClient::new(&config.backend)
            .map_err(|e| ServerError::Init(format!("attendance client: {e}")))?;
        let store = PgPerformanceStore::new(&config.database)
            .map_err(|e| ServerError::Init(format!("performance store: {e}")))?;

        Ok(Self {
            attendance: Arc::new(AttendanceService::new(
                ollama.clone(),
                Arc::new(backend),
                config.output.generated_dir.clone(),
            )),
            performance: Arc::new(PerformanceService::new(
                ollama,
                Arc::new(store),
                ChartRenderer::new(config.output.chart_font.clone()),
            )),
            receipt: Arc::new(ReceiptService::new(openai.clone())),
            approval: Arc::new(ApprovalService::new(
                openai,
                config.output.approval_policy.clone(),
            )),
            start_time: Instant::now(),
        })
    }
}

// ============================================================================
// Server
// ============================================================================

/// SmartSpend AI HTTP server
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config.validate()?;
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        create_router(self.state.clone())
            .layer(cors_layer(&self.config.server.cors_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

        tracing::info!(%addr, "SmartSpend AI server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// CORS for the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

// ============================================================================
// Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}
