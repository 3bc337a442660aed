//! Error types shared across the crate
//!
//! Each module owns a `thiserror` enum ([`LlmError`], [`BackendError`],
//! [`StorageError`], [`ReportError`], [`ReceiptError`], [`ConfigError`]).
//! All of them implement [`ErrorInfo`], which is what the services use to turn
//! a failure into a Korean reply instead of an HTTP error. [`Error`] wraps them
//! for callers that want one type.
//!
//! ```rust,ignore
//! use smartspend_ai::error::{Error, ErrorInfo};
//!
//! fn reply_text(err: &Error) -> String {
//!     match err.is_recoverable() {
//!         true => format!("{} 잠시 후 다시 시도해주세요.", err.localized_desc()),
//!         false => err.localized_desc(),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::llm::LlmError;
pub use crate::report::ReportError;
pub use crate::services::backend::BackendError;
pub use crate::services::receipt::ReceiptError;
pub use crate::storage::StorageError;

/// Behaviour every crate error exposes to the services
pub trait ErrorInfo: std::error::Error {
    /// Whether retrying the same request later may succeed
    fn is_recoverable(&self) -> bool;

    /// Korean text suitable for an `ok: false` reply
    fn localized_desc(&self) -> String;

    fn category(&self) -> ErrorCategory;
}

/// Coarse error classes, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection failures, timeouts, HTTP status errors
    Network,
    /// Model or upstream output that could not be decoded
    Parsing,
    /// Database and filesystem
    Storage,
    /// Model backend answered but unusably
    Llm,
    Config,
    /// Input outside the accepted domain (bad image, out-of-range value)
    Validation,
    Other,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Llm => "llm",
            Self::Config => "config",
            Self::Validation => "validation",
            Self::Other => "other",
        }
    }

    /// Korean name of the category
    pub fn localized_desc(&self) -> &'static str {
        match self {
            Self::Network => "네트워크 오류",
            Self::Parsing => "파싱 오류",
            Self::Storage => "저장소 오류",
            Self::Llm => "AI 모델 오류",
            Self::Config => "설정 오류",
            Self::Validation => "입력 오류",
            Self::Other => "기타 오류",
        }
    }
}

/// Any error raised inside the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Attendance API error: {0}")]
    Backend(#[from] BackendError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    fn inner(&self) -> Option<&dyn ErrorInfo> {
        match self {
            Self::Llm(e) => Some(e),
            Self::Backend(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::Receipt(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(_) => None,
        }
    }
}

impl ErrorInfo for Error {
    fn is_recoverable(&self) -> bool {
        self.inner().map_or(true, ErrorInfo::is_recoverable)
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Io(e) => format!("입출력 오류: {e}"),
            other => other
                .inner()
                .map(ErrorInfo::localized_desc)
                .unwrap_or_default(),
        }
    }

    fn category(&self) -> ErrorCategory {
        self.inner()
            .map_or(ErrorCategory::Storage, ErrorInfo::category)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_follows_the_wrapped_error() {
        assert_eq!(Error::Llm(LlmError::Timeout).category(), ErrorCategory::Network);
        assert_eq!(Error::Storage(StorageError::Timeout).category(), ErrorCategory::Storage);
        assert_eq!(
            Error::Config(ConfigError::Invalid("port".into())).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            Error::Io(io::Error::new(io::ErrorKind::NotFound, "gone")).category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(Error::Llm(LlmError::Timeout).is_recoverable());
        assert!(!Error::Llm(LlmError::NotConfigured("OPENAI_API_KEY".into())).is_recoverable());
        assert!(!Error::Config(ConfigError::Invalid("x".into())).is_recoverable());
    }

    #[test]
    fn test_korean_descriptions() {
        assert_eq!(
            Error::Llm(LlmError::Timeout).localized_desc(),
            "AI 응답 시간이 초과되었습니다"
        );
        assert_eq!(ErrorCategory::Validation.localized_desc(), "입력 오류");
        assert_eq!(ErrorCategory::Parsing.label(), "parsing");
    }

    #[test]
    fn test_from_module_errors() {
        let unified: Error = BackendError::Timeout.into();
        assert!(matches!(unified, Error::Backend(_)));
    }
}
