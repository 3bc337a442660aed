//! Prometheus metrics for the AI server
//!
//! This module tracks:
//! - Intent extraction: which path produced the final intent, per domain
//! - LLM calls: request count by backend and outcome, latency
//! - HTTP API: requests by endpoint and outcome
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, or never happens (tests, CLI), metric operations
//! become no-ops.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Metrics Storage
// ============================================================================

struct ServerMetrics {
    intent_extractions: CounterVec,
    llm_requests: CounterVec,
    llm_duration: HistogramVec,
    api_requests: CounterVec,
}

static SERVER_METRICS: OnceLock<ServerMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = ServerMetrics {
        intent_extractions: register_counter_vec!(
            "smartspend_intent_extractions_total",
            "Intent extractions by domain and resolution path",
            &["domain", "path"]
        )?,
        llm_requests: register_counter_vec!(
            "smartspend_llm_requests_total",
            "LLM requests by backend and outcome",
            &["backend", "outcome"]
        )?,
        llm_duration: register_histogram_vec!(
            "smartspend_llm_request_duration_seconds",
            "LLM request duration in seconds",
            &["backend"],
            vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]
        )?,
        api_requests: register_counter_vec!(
            "smartspend_api_requests_total",
            "API requests by endpoint and outcome",
            &["endpoint", "outcome"]
        )?,
    };

    SERVER_METRICS
        .set(metrics)
        .map_err(|_| "Server metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SERVER_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record which path resolved an intent (`literal`, `model`, `fallback`, `default`)
pub fn record_intent_path(domain: &str, path: &str) {
    if let Some(m) = SERVER_METRICS.get() {
        m.intent_extractions.with_label_values(&[domain, path]).inc();
    }
}

/// Record an LLM request
pub fn record_llm_request(backend: &str, success: bool, elapsed: Duration) {
    let Some(m) = SERVER_METRICS.get() else {
        return;
    };

    let outcome = if success { "success" } else { "failure" };
    m.llm_requests.with_label_values(&[backend, outcome]).inc();
    m.llm_duration
        .with_label_values(&[backend])
        .observe(elapsed.as_secs_f64());
}

/// Record an API request outcome
pub fn record_api_request(endpoint: &str, ok: bool) {
    if let Some(m) = SERVER_METRICS.get() {
        let outcome = if ok { "ok" } else { "not_ok" };
        m.api_requests.with_label_values(&[endpoint, outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_before_init_is_noop() {
        // Must not panic whether or not another test initialised the registry
        record_intent_path("attendance", "model");
        record_llm_request("ollama", false, Duration::from_millis(5));
        record_api_request("/api/ai/attendance", true);
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(metrics_initialized());

        record_intent_path("performance", "literal");
        let text = encode_metrics().unwrap();
        assert!(text.contains("smartspend_intent_extractions_total"));
    }
}
