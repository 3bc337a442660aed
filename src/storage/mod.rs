//! Department performance storage
//!
//! Monthly sales figures live in the `department_performance` table. The
//! performance service reads them through [`PerformanceStore`] so tests can
//! substitute an in-memory store.

pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorInfo};
use crate::intent::Department;

pub use postgres::PgPerformanceStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create connection pool: {0}")]
    PoolInit(String),

    #[error("Failed to get a database connection: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Database operation timed out")]
    Timeout,
}

impl ErrorInfo for StorageError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::PoolInit(_))
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::PoolInit(_) => "데이터베이스 설정 오류".to_string(),
            Self::Pool(_) => "데이터베이스에 연결할 수 없습니다".to_string(),
            Self::Query(_) => "데이터 조회에 실패했습니다".to_string(),
            Self::Timeout => "데이터베이스 응답 시간이 초과되었습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::PoolInit(_) => ErrorCategory::Config,
            _ => ErrorCategory::Storage,
        }
    }
}

/// One department's results for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub department: Department,
    pub year: i32,
    pub month: u32,
    /// Sales in KRW
    pub sales_amount: i64,
    pub contract_count: i64,
    pub project_count: i64,
    /// Target achievement in percent
    pub target_achievement_rate: f64,
}

/// Read access to monthly performance rows
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Rows for `departments` in `year`, ordered by department then month
    async fn fetch(
        &self,
        departments: &[Department],
        year: i32,
    ) -> Result<Vec<PerformanceRecord>, StorageError>;
}
