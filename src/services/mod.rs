//! Request handling services
//!
//! Each service turns one kind of user request into a reply object that the
//! HTTP layer serializes as-is. Services never fail: collaborator errors are
//! logged and folded into an `ok: false` reply with a Korean message.

pub mod approval;
pub mod attendance;
pub mod backend;
pub mod performance;
pub mod receipt;

pub use approval::{ApprovalRecommendation, ApprovalRequest, ApprovalService, Recommendation};
pub use attendance::{AttendanceReply, AttendanceService};
pub use backend::{AttendanceRecord, AttendanceSource, BackendClient, BackendError};
pub use performance::{PerformanceReply, PerformanceService};
pub use receipt::{ReceiptError, ReceiptExtraction, ReceiptOutcome, ReceiptService};
