//! Report artefacts
//!
//! - [`excel`] - `.xlsx` files from serializable rows
//! - [`chart`] - two-panel performance charts as PNG
//! - [`summary`] - Korean text summaries

pub mod chart;
pub mod excel;
pub mod summary;

use thiserror::Error;

use crate::error::{ErrorCategory, ErrorInfo};

pub use chart::{ChartRenderer, PerformanceChart};
pub use excel::{write_records, ColumnRename};
pub use summary::{attendance_summary, department_totals, performance_summary, DepartmentTotals};

/// Errors raised while producing report artefacts
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to serialize row: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Chart font unavailable: {0}")]
    Font(String),

    #[error("Chart drawing failed: {0}")]
    Chart(String),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ErrorInfo for ReportError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Task(_))
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Io(_) | Self::Xlsx(_) | Self::Serialize(_) => "엑셀 파일을 만들 수 없습니다".to_string(),
            Self::Font(_) => "차트 글꼴을 찾을 수 없습니다".to_string(),
            Self::Chart(_) | Self::Image(_) => "차트를 만들 수 없습니다".to_string(),
            Self::Task(_) => "작업 처리 중 오류가 발생했습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Font(_) => ErrorCategory::Config,
            Self::Serialize(_) => ErrorCategory::Parsing,
            Self::Task(_) => ErrorCategory::Other,
            _ => ErrorCategory::Storage,
        }
    }
}

/// KRW to 억 (100 million)
pub fn to_eok(amount: i64) -> f64 {
    amount as f64 / 100_000_000.0
}

/// KRW to 만원 (10 thousand)
pub fn to_man(amount: i64) -> f64 {
    amount as f64 / 10_000.0
}
