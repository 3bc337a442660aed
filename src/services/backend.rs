//! Internal attendance API client
//!
//! Reads per-employee daily attendance rows from the main application server:
//! `GET {base}/api/internal/attendance/detail?year=&month=&department=`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::error::{ErrorCategory, ErrorInfo};
use crate::intent::Department;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while talking to the attendance API
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to build HTTP client: {0}")]
    Init(String),

    #[error("Attendance API request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Attendance API request timed out")]
    Timeout,

    #[error("Attendance API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode attendance API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
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

impl ErrorInfo for BackendError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Init(_) | Self::Decode(_) => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Init(_) => "출결 서버 클라이언트를 만들 수 없습니다".to_string(),
            Self::Http(_) => "출결 서버에 연결할 수 없습니다".to_string(),
            Self::Timeout => "출결 서버 응답 시간이 초과되었습니다".to_string(),
            Self::Status { status, .. } => format!("출결 서버 응답 오류 (HTTP {status})"),
            Self::Decode(_) => "출결 서버 응답을 해석할 수 없습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Init(_) => ErrorCategory::Config,
            Self::Http(_) | Self::Timeout | Self::Status { .. } => ErrorCategory::Network,
            Self::Decode(_) => ErrorCategory::Parsing,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// One employee's attendance on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub employee_no: Option<String>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_korean: Option<String>,
    #[serde(default)]
    pub check_in_time: Option<String>,
    #[serde(default)]
    pub check_out_time: Option<String>,
}

impl AttendanceRecord {
    /// Whether the record belongs to an employee whose name contains `name`
    pub fn matches_employee(&self, name: &str) -> bool {
        self.employee_name
            .as_deref()
            .is_some_and(|employee| employee.contains(name))
    }
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    #[serde(default)]
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    #[serde(default)]
    details: Vec<AttendanceRecord>,
}

// ============================================================================
// Source trait and HTTP client
// ============================================================================

/// Where attendance rows come from
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// All rows for one department and month
    async fn fetch_month(
        &self,
        department: Department,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceRecord>, BackendError>;
}

/// HTTP client for the internal attendance API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Init(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AttendanceSource for BackendClient {
    async fn fetch_month(
        &self,
        department: Department,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        let url = format!("{}/api/internal/attendance/detail", self.base_url);
        tracing::debug!(%url, %department, year, month, "Requesting attendance detail");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("year", year.to_string()),
                ("month", month.to_string()),
                ("department", department.name().to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let envelope: DetailEnvelope = response.json().await?;
        let details = envelope.data.map(|d| d.details).unwrap_or_default();

        tracing::debug!(%department, count = details.len(), "Attendance detail received");
        Ok(details)
    }
}
