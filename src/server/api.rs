//! REST API handlers
//!
//! Domain failures are answered with `200` and an `ok: false` / `error`
//! body; only unknown downloads and metrics encoding errors use error statuses.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;
use crate::services::{
    ApprovalRecommendation, ApprovalRequest, AttendanceReply, PerformanceReply, ReceiptOutcome,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const RECEIPT_UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

// ============================================================================
// API Types
// ============================================================================

/// Natural-language question
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Root liveness response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error body for non-200 responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Attendance
        .route("/api/ai/attendance", post(attendance_query))
        .route("/api/ai/attendance/download/{filename}", get(download_file))
        // Performance
        .route("/api/ai/performance", post(performance_query))
        // Receipts
        .route(
            "/api/ai/receipt/extract",
            post(extract_receipt).layer(DefaultBodyLimit::max(RECEIPT_UPLOAD_LIMIT)),
        )
        .route("/api/ai/receipt/recommend-approval", post(recommend_approval))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "SmartSpend AI Server is running!",
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                detail: e.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn attendance_query(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Json<AttendanceReply> {
    let reply = state.attendance.process_query(&request.prompt).await;
    metrics::record_api_request("attendance", reply.ok);
    Json(reply)
}

async fn download_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let Some(path) = state.attendance.download_path(&filename) else {
        metrics::record_api_request("attendance_download", false);
        return not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            metrics::record_api_request("attendance_download", true);
            (
                [
                    (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                    (header::CONTENT_DISPOSITION, content_disposition(&filename)),
                ],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Download read failed");
            metrics::record_api_request("attendance_download", false);
            not_found()
        }
    }
}

async fn performance_query(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Json<PerformanceReply> {
    let reply = state.performance.process_query(&request.prompt).await;
    metrics::record_api_request("performance", reply.ok);
    Json(reply)
}

async fn extract_receipt(State(state): State<AppState>, mut multipart: Multipart) -> Json<ReceiptOutcome> {
    let upload = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                tracing::info!(filename = ?field.file_name(), "Receipt upload received");
                break field.bytes().await.map_err(|e| e.to_string());
            }
            Ok(Some(_)) => continue,
            Ok(None) => break Err("file 필드가 없습니다".to_string()),
            Err(e) => break Err(e.to_string()),
        }
    };

    let outcome = match upload {
        Ok(bytes) => state.receipt.analyze(bytes.to_vec()).await,
        Err(reason) => ReceiptOutcome::Failed {
            error: format!("이미지 처리 중 오류 발생: {reason}"),
        },
    };

    metrics::record_api_request("receipt_extract", matches!(outcome, ReceiptOutcome::Extracted(_)));
    Json(outcome)
}

async fn recommend_approval(
    State(state): State<AppState>,
    Json(request): Json<ApprovalRequest>,
) -> Json<ApprovalRecommendation> {
    let verdict = state.approval.recommend(&request).await;
    metrics::record_api_request("recommend_approval", verdict.error.is_none());
    Json(verdict)
}

// ============================================================================
// Helpers
// ============================================================================

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            detail: "파일 없음".to_string(),
        }),
    )
        .into_response()
}

/// `attachment` header with an RFC 5987 UTF-8 file name
fn content_disposition(filename: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", urlencoding::encode(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_percent_encodes_hangul() {
        assert_eq!(
            content_disposition("재무팀_1.xlsx"),
            "attachment; filename*=UTF-8''%EC%9E%AC%EB%AC%B4%ED%8C%80_1.xlsx"
        );
    }

    #[test]
    fn test_health_response_is_camel_case() {
        let json = serde_json::to_value(HealthResponse {
            status: "healthy".into(),
            version: "0.1.0".into(),
            uptime_secs: 3,
        })
        .unwrap();
        assert_eq!(json["uptimeSecs"], 3);
    }
}
