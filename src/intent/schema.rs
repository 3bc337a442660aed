//! Intent data model
//!
//! Closed value domains for departments, attendance intent types, performance
//! query types and chart types, plus the tolerant [`Candidate`] view of a
//! model's JSON answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Department
// ============================================================================

/// Company departments (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "개발1팀")]
    Dev1,
    #[serde(rename = "개발2팀")]
    Dev2,
    #[serde(rename = "인사팀")]
    HumanResources,
    #[serde(rename = "재무팀")]
    Finance,
    #[serde(rename = "영업팀")]
    Sales,
    #[serde(rename = "마케팅팀")]
    Marketing,
    #[serde(rename = "기획팀")]
    Planning,
    #[serde(rename = "디자인팀")]
    Design,
}

impl Department {
    /// Canonical order; first-match searches follow it
    pub const ALL: [Department; 8] = [
        Department::Dev1,
        Department::Dev2,
        Department::HumanResources,
        Department::Finance,
        Department::Sales,
        Department::Marketing,
        Department::Planning,
        Department::Design,
    ];

    /// Korean display name, e.g. `개발1팀`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dev1 => "개발1팀",
            Self::Dev2 => "개발2팀",
            Self::HumanResources => "인사팀",
            Self::Finance => "재무팀",
            Self::Sales => "영업팀",
            Self::Marketing => "마케팅팀",
            Self::Planning => "기획팀",
            Self::Design => "디자인팀",
        }
    }

    /// Name without the `팀` suffix, e.g. `개발1`
    pub fn stem(&self) -> &'static str {
        let name = self.name();
        name.strip_suffix('팀').unwrap_or(name)
    }

    /// Exact lookup by canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }

    /// Normalize a free-form department string
    ///
    /// Whitespace is removed, then the value is accepted if it is contained in,
    /// or contains, a canonical name. Empty and `null` values are absent.
    pub fn normalize(raw: &str) -> Option<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() || compact.eq_ignore_ascii_case("null") {
            return None;
        }

        Self::ALL
            .into_iter()
            .find(|d| d.name().contains(compact.as_str()) || compact.contains(d.name()))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Attendance
// ============================================================================

/// What an attendance question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceIntentType {
    ExcelByDepartment,
    ExcelByEmployee,
    SummaryByDepartment,
    SummaryByEmployee,
    Unknown,
}

impl AttendanceIntentType {
    /// Parse either the prompt wire form (`ATTENDANCE_EXCEL_DEPARTMENT`) or
    /// the canonical form (`EXCEL_BY_DEPARTMENT`); anything else is `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ATTENDANCE_EXCEL_DEPARTMENT" | "EXCEL_BY_DEPARTMENT" => Self::ExcelByDepartment,
            "ATTENDANCE_EXCEL_EMPLOYEE" | "EXCEL_BY_EMPLOYEE" => Self::ExcelByEmployee,
            "ATTENDANCE_SUMMARY_DEPARTMENT" | "SUMMARY_BY_DEPARTMENT" => Self::SummaryByDepartment,
            "ATTENDANCE_SUMMARY_EMPLOYEE" | "SUMMARY_BY_EMPLOYEE" => Self::SummaryByEmployee,
            _ => Self::Unknown,
        }
    }

    pub fn is_excel(&self) -> bool {
        matches!(self, Self::ExcelByDepartment | Self::ExcelByEmployee)
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, Self::SummaryByDepartment | Self::SummaryByEmployee)
    }

    /// Pick the employee- or department-scoped variant
    pub fn scoped(excel: bool, employee: bool) -> Self {
        match (excel, employee) {
            (true, true) => Self::ExcelByEmployee,
            (true, false) => Self::ExcelByDepartment,
            (false, true) => Self::SummaryByEmployee,
            (false, false) => Self::SummaryByDepartment,
        }
    }
}

/// Structured attendance request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceIntent {
    #[serde(rename = "type")]
    pub intent_type: AttendanceIntentType,
    pub department: Option<Department>,
    pub employee_name: Option<String>,
    pub year: i32,
    pub month: u32,
}

impl AttendanceIntent {
    /// Who the request is about, for messages and file names
    pub fn target(&self) -> &str {
        self.employee_name
            .as_deref()
            .or(self.department.map(|d| d.name()))
            .unwrap_or("전체")
    }
}

// ============================================================================
// Performance
// ============================================================================

/// What a performance question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceQueryType {
    Ranking,
    Compare,
    Trend,
    All,
    YearCompare,
}

impl PerformanceQueryType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ranking" => Some(Self::Ranking),
            "compare" => Some(Self::Compare),
            "trend" => Some(Self::Trend),
            "all" => Some(Self::All),
            "year_compare" | "yearcompare" => Some(Self::YearCompare),
            _ => None,
        }
    }

    /// Whether a missing department list means "every department"
    pub fn spans_all_departments(&self) -> bool {
        matches!(self, Self::Ranking | Self::All)
    }
}

/// Chart style for the monthly sales panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "pie" => Some(Self::Pie),
            _ => None,
        }
    }
}

/// Structured performance request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceIntent {
    #[serde(rename = "type")]
    pub query_type: PerformanceQueryType,
    pub departments: Vec<Department>,
    pub year: i32,
    pub compare_year: Option<i32>,
    pub chart_type: ChartType,
}

// ============================================================================
// Candidate
// ============================================================================

/// A number-or-text field as a model may emit it (`2025`, `"25년"`, `"일월"`)
#[derive(Debug, Clone, PartialEq)]
pub enum LooseValue {
    Number(i64),
    Text(String),
}

impl LooseValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Number),
            Value::String(s) if !is_null_text(s) => Some(Self::Text(s.trim().to_string())),
            _ => None,
        }
    }
}

/// Parsed, unvalidated model answer
///
/// Conversion is field-by-field: a field of the wrong JSON type becomes
/// `None` instead of rejecting the whole object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub intent: Option<String>,
    pub department: Option<String>,
    pub departments: Vec<String>,
    pub employee_name: Option<String>,
    pub year: Option<LooseValue>,
    pub month: Option<LooseValue>,
    pub query_type: Option<String>,
    pub chart_type: Option<String>,
    pub compare_year: Option<LooseValue>,
}

impl Candidate {
    pub fn from_object(map: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(text_field));
        let loose = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(LooseValue::from_json));

        let departments = match map.get("departments") {
            Some(Value::Array(items)) => items.iter().filter_map(text_field).collect(),
            _ => Vec::new(),
        };

        Self {
            intent: text(&["intent", "type"]),
            department: text(&["department"]),
            departments,
            employee_name: text(&["employeeName", "employee_name"]),
            year: loose(&["year"]),
            month: loose(&["month"]),
            query_type: text(&["query_type", "queryType"]),
            chart_type: text(&["chart_type", "chartType"]),
            compare_year: loose(&["compare_year", "compareYear"]),
        }
    }
}

fn is_null_text(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("none")
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_null_text(s) => Some(s.trim().to_string()),
        _ => None,
    }
}
