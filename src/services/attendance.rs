//! Attendance questions end to end
//!
//! Intent → attendance rows from the internal API → spreadsheet and/or
//! status counts.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::backend::{AttendanceRecord, AttendanceSource};
use crate::error::ErrorInfo;
use crate::intent::{AttendanceDomain, AttendanceIntent, Department, IntentExtractor};
use crate::llm::TextGenerator;
use crate::report::{attendance_summary, write_records, ColumnRename, ReportError};

const SHEET_NAME: &str = "출결현황";
const DOWNLOAD_PREFIX: &str = "/api/ai/attendance/download";
const GUIDANCE: &str = "출결 관련 질문을 해주세요. (예: '재무팀 1월 출결 엑셀로 뽑아줘')";

const COLUMN_RENAMES: &[ColumnRename] = &[
    ("employeeNo", "사번"),
    ("employeeName", "이름"),
    ("date", "날짜"),
    ("statusKorean", "상태"),
    ("checkInTime", "출근시간"),
    ("checkOutTime", "퇴근시간"),
];

/// Reply for `POST /api/ai/attendance`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReply {
    pub ok: bool,
    pub message: String,
    pub summary: Option<String>,
    pub has_file: bool,
    pub download_url: Option<String>,
    pub file_name: Option<String>,
}

impl AttendanceReply {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Attendance service
pub struct AttendanceService {
    extractor: IntentExtractor<AttendanceDomain>,
    source: Arc<dyn AttendanceSource>,
    generated_dir: PathBuf,
}

impl AttendanceService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        source: Arc<dyn AttendanceSource>,
        generated_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor: IntentExtractor::new(generator, AttendanceDomain),
            source,
            generated_dir: generated_dir.into(),
        }
    }

    /// Directory spreadsheets are written to
    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }

    /// Resolve a download name to a file inside the generated directory
    ///
    /// Names containing path separators or parent references are refused.
    pub fn download_path(&self, file_name: &str) -> Option<PathBuf> {
        let safe = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\'])
            && !file_name.contains("..");
        if !safe {
            return None;
        }

        let path = self.generated_dir.join(file_name);
        path.is_file().then_some(path)
    }

    pub async fn process_query(&self, prompt: &str) -> AttendanceReply {
        self.process_query_on(prompt, Local::now().date_naive()).await
    }

    /// Answer `prompt` with an explicit reference date
    pub async fn process_query_on(&self, prompt: &str, today: NaiveDate) -> AttendanceReply {
        tracing::info!(prompt, "Attendance query received");
        let intent = self.extractor.extract_on(prompt, today).await;
        self.answer(&intent).await
    }

    /// Produce the reply for an already extracted intent
    pub async fn answer(&self, intent: &AttendanceIntent) -> AttendanceReply {
        if intent.intent_type.is_excel() {
            self.excel_reply(intent).await
        } else if intent.intent_type.is_summary() {
            self.summary_reply(intent).await
        } else {
            AttendanceReply::failure(GUIDANCE)
        }
    }

    async fn excel_reply(&self, intent: &AttendanceIntent) -> AttendanceReply {
        let records = self.collect(intent).await;
        if records.is_empty() {
            return AttendanceReply::failure("데이터 없음");
        }

        let summary = attendance_summary(&records);
        let file_name = file_name_for(intent);
        let path = self.generated_dir.join(&file_name);

        let written = tokio::task::spawn_blocking(move || {
            write_records(&path, SHEET_NAME, &records, COLUMN_RENAMES)
        })
        .await
        .map_err(|e| ReportError::Task(e.to_string()))
        .and_then(|result| result);

        match written {
            Ok(rows) => {
                tracing::info!(file = %file_name, rows, "Attendance spreadsheet ready");
                AttendanceReply {
                    ok: true,
                    message: format!(
                        "{}의 {}년 {}월 출결 현황입니다.",
                        intent.target(),
                        intent.year,
                        intent.month
                    ),
                    summary: Some(summary),
                    has_file: true,
                    download_url: Some(format!("{DOWNLOAD_PREFIX}/{file_name}")),
                    file_name: Some(file_name),
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to write attendance spreadsheet");
                AttendanceReply::failure(format!(
                    "처리 중 오류가 발생했습니다: {}",
                    err.localized_desc()
                ))
            }
        }
    }

    async fn summary_reply(&self, intent: &AttendanceIntent) -> AttendanceReply {
        let records = self.collect(intent).await;
        let period = format!("{}의 {}년 {}월", intent.target(), intent.year, intent.month);

        if records.is_empty() {
            return AttendanceReply::failure(format!("{period} 출결 데이터가 없습니다."));
        }

        AttendanceReply {
            ok: true,
            message: format!("{period} 출결 통계입니다."),
            summary: Some(attendance_summary(&records)),
            ..Default::default()
        }
    }

    /// Rows for the intent's department, or every department for a name alone
    async fn collect(&self, intent: &AttendanceIntent) -> Vec<AttendanceRecord> {
        let name = intent.employee_name.as_deref();

        match (intent.department, name) {
            (Some(department), _) => self.fetch(department, name, intent.year, intent.month).await,
            (None, Some(name)) => {
                for department in Department::ALL {
                    let records = self
                        .fetch(department, Some(name), intent.year, intent.month)
                        .await;
                    if !records.is_empty() {
                        tracing::debug!(%department, employee = name, "Employee found");
                        return records;
                    }
                }
                Vec::new()
            }
            (None, None) => {
                tracing::warn!("Attendance intent has neither department nor employee");
                Vec::new()
            }
        }
    }

    async fn fetch(
        &self,
        department: Department,
        employee: Option<&str>,
        year: i32,
        month: u32,
    ) -> Vec<AttendanceRecord> {
        let records = match self.source.fetch_month(department, year, month).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    %department,
                    error = %err,
                    category = err.category().label(),
                    "Attendance fetch failed"
                );
                return Vec::new();
            }
        };

        match employee {
            Some(name) => records
                .into_iter()
                .filter(|r| r.matches_employee(name))
                .collect(),
            None => records,
        }
    }
}

fn file_name_for(intent: &AttendanceIntent) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}년_{}월_출결_{}.xlsx",
        intent.target(),
        intent.year,
        intent.month,
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::AttendanceIntentType;

    fn intent(intent_type: AttendanceIntentType, department: Option<Department>, name: Option<&str>) -> AttendanceIntent {
        AttendanceIntent {
            intent_type,
            department,
            employee_name: name.map(String::from),
            year: 2025,
            month: 1,
        }
    }

    #[test]
    fn test_file_name_shape() {
        let name = file_name_for(&intent(
            AttendanceIntentType::ExcelByDepartment,
            Some(Department::Dev1),
            None,
        ));
        assert!(name.starts_with("개발1팀_2025년_1월_출결_"));
        assert!(name.ends_with(".xlsx"));
        let suffix = name.trim_end_matches(".xlsx").rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_name_uses_employee_first() {
        let name = file_name_for(&intent(
            AttendanceIntentType::ExcelByEmployee,
            Some(Department::Dev1),
            Some("윤서현"),
        ));
        assert!(name.starts_with("윤서현_"));
    }

    #[test]
    fn test_reply_serializes_camel_case() {
        let reply = AttendanceReply::failure("데이터 없음");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["hasFile"], false);
        assert!(json["downloadUrl"].is_null());
    }
}
