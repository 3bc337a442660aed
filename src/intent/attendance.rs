//! Attendance questions
//!
//! "개발1팀 2025년 1월 출결 엑셀로 뽑아줘", "윤서현 25년 1월 출결 알려주세요", ...

use chrono::{Datelike, NaiveDate};
use std::time::Duration;

use super::literal::{
    confirm_model_name, contains_any, department_in_text, employee_name_in_text, month_from_value,
    month_in_text, year_from_value, year_in_text, EXCEL_KEYWORDS, SUMMARY_KEYWORDS,
};
use super::schema::{AttendanceIntent, AttendanceIntentType, Candidate, Department};
use super::IntentDomain;
use crate::llm::GenerationOptions;

/// Attendance intent domain
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendanceDomain;

impl IntentDomain for AttendanceDomain {
    type Intent = AttendanceIntent;

    fn name(&self) -> &'static str {
        "attendance"
    }

    fn build_prompt(&self, question: &str, today: NaiveDate) -> String {
        format!(
            "{}\n\n사용자 질문: {question}\n\nJSON 응답:",
            system_prompt(today.year(), today.month())
        )
    }

    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::new()
            .temperature(0.1)
            .timeout(Duration::from_secs(60))
    }

    fn correct(&self, candidate: &Candidate, question: &str, today: NaiveDate) -> AttendanceIntent {
        let year = candidate
            .year
            .as_ref()
            .and_then(year_from_value)
            .or_else(|| year_in_text(question))
            .unwrap_or_else(|| today.year());

        let month = candidate
            .month
            .as_ref()
            .and_then(month_from_value)
            .or_else(|| month_in_text(question))
            .unwrap_or_else(|| today.month());

        let department = candidate
            .department
            .as_deref()
            .and_then(Department::normalize)
            .or_else(|| department_in_text(question));

        let employee_name = employee_name_in_text(question).or_else(|| {
            candidate
                .employee_name
                .as_deref()
                .and_then(|name| confirm_model_name(question, name))
        });

        let mut intent_type = candidate
            .intent
            .as_deref()
            .map(AttendanceIntentType::parse)
            .unwrap_or(AttendanceIntentType::Unknown);

        if intent_type == AttendanceIntentType::Unknown {
            intent_type = derive_type(question, department.is_some(), employee_name.is_some());
        }

        AttendanceIntent {
            intent_type,
            department,
            employee_name,
            year,
            month,
        }
    }

    fn default_intent(&self, today: NaiveDate) -> AttendanceIntent {
        AttendanceIntent {
            intent_type: AttendanceIntentType::Unknown,
            department: None,
            employee_name: None,
            year: today.year(),
            month: today.month(),
        }
    }
}

/// Re-derive the type from keywords; excel keywords win over summary keywords
fn derive_type(question: &str, has_department: bool, has_employee: bool) -> AttendanceIntentType {
    if !has_department && !has_employee {
        return AttendanceIntentType::Unknown;
    }

    let excel = contains_any(question, EXCEL_KEYWORDS);
    if !excel && !contains_any(question, SUMMARY_KEYWORDS) {
        tracing::debug!("No attendance keyword found, assuming a summary");
    }
    AttendanceIntentType::scoped(excel, has_employee)
}

fn system_prompt(current_year: i32, current_month: u32) -> String {
    format!(
        r#"너는 출결 관리 AI 파서야. 사용자 질문에서 정보를 정확히 추출해서 JSON으로만 응답해.

가능한 intent:
- ATTENDANCE_EXCEL_DEPARTMENT: 부서 출결 엑셀
- ATTENDANCE_EXCEL_EMPLOYEE: 개인 출결 엑셀
- ATTENDANCE_SUMMARY_DEPARTMENT: 부서 통계
- ATTENDANCE_SUMMARY_EMPLOYEE: 개인 통계
- UNKNOWN: 출결 외 질문

부서 목록 (정확히 매칭):
- 개발1팀, 개발2팀, 인사팀, 재무팀, 영업팀, 마케팅팀, 기획팀, 디자인팀
- "개발 1팀", "개발1팀", "개발 1 팀" → 모두 "개발1팀"으로 정규화

JSON 형식 (반드시 이 형식):
{{"intent": "ATTENDANCE_EXCEL_DEPARTMENT", "department": "개발1팀", "employeeName": null, "year": 2025, "month": 1}}

추출 규칙:
1. 연도: "2025년", "2025", "25년" → 2025 (4자리 숫자로 변환)
   - 연도 미언급 시: {current_year}
2. 월: "1월", "01월", "1" → 1 (1-12 숫자), "일월", "이월" 같은 한글 월도 숫자로 변환
   - 월 미언급 시: {current_month}
3. 부서: 질문에서 부서명을 찾아 정확히 매칭, 미언급 시 null
4. 직원명: 부서명이 아닌 한글 이름(2-4글자), 없으면 null
5. intent 판단:
   - "엑셀", "다운로드", "뽑아", "추출", "뽑아줘", "엑셀로" → EXCEL
   - "현황", "어때", "통계", "보여줘", "알려줘", "알려주세요", "보여주세요" → SUMMARY

예시:
- "개발1팀 2025년 1월 출결 엑셀로 뽑아줘"
  → {{"intent": "ATTENDANCE_EXCEL_DEPARTMENT", "department": "개발1팀", "employeeName": null, "year": 2025, "month": 1}}
- "윤서현 2025년 1월 출결 엑셀"
  → {{"intent": "ATTENDANCE_EXCEL_EMPLOYEE", "department": null, "employeeName": "윤서현", "year": 2025, "month": 1}}
- "재무팀 1월 출결 현황"
  → {{"intent": "ATTENDANCE_SUMMARY_DEPARTMENT", "department": "재무팀", "employeeName": null, "year": {current_year}, "month": 1}}
- "재무팀 윤서현 25년 1월 출결 알려주세요"
  → {{"intent": "ATTENDANCE_SUMMARY_EMPLOYEE", "department": "재무팀", "employeeName": "윤서현", "year": 2025, "month": 1}}

중요:
- 부서명과 직원명이 모두 있으면 EMPLOYEE intent (부서명은 필터링용)
- 직원명만 있으면 EMPLOYEE intent, department는 null
- 부서명만 있으면 DEPARTMENT intent"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::schema::LooseValue;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_prompt_carries_question_and_date() {
        let prompt = AttendanceDomain.build_prompt("재무팀 1월 출결 현황", today());
        assert!(prompt.contains("연도 미언급 시: 2026"));
        assert!(prompt.contains("월 미언급 시: 3"));
        assert!(prompt.ends_with("사용자 질문: 재무팀 1월 출결 현황\n\nJSON 응답:"));
    }

    #[test]
    fn test_correct_keeps_valid_candidate() {
        let candidate = Candidate {
            intent: Some("ATTENDANCE_EXCEL_DEPARTMENT".into()),
            department: Some("개발 1팀".into()),
            year: Some(LooseValue::Number(2025)),
            month: Some(LooseValue::Number(1)),
            ..Default::default()
        };

        let intent = AttendanceDomain.correct(&candidate, "개발1팀 2025년 1월 출결 엑셀로 뽑아줘", today());
        assert_eq!(intent.intent_type, AttendanceIntentType::ExcelByDepartment);
        assert_eq!(intent.department, Some(Department::Dev1));
        assert_eq!(intent.employee_name, None);
        assert_eq!((intent.year, intent.month), (2025, 1));
    }

    #[test]
    fn test_out_of_range_values_fall_back_to_text() {
        let candidate = Candidate {
            year: Some(LooseValue::Number(1925)),
            month: Some(LooseValue::Number(13)),
            ..Default::default()
        };

        let intent = AttendanceDomain.correct(&candidate, "재무팀 2024년 7월 현황", today());
        assert_eq!((intent.year, intent.month), (2024, 7));
    }

    #[test]
    fn test_unknown_type_is_rederived_from_keywords() {
        let intent = AttendanceDomain.correct(&Candidate::default(), "영업팀 정도윤 출결 엑셀 다운로드", today());
        assert_eq!(intent.intent_type, AttendanceIntentType::ExcelByEmployee);
        assert_eq!(intent.employee_name.as_deref(), Some("정도윤"));
        assert_eq!(intent.department, Some(Department::Sales));
    }

    #[test]
    fn test_excel_keywords_win_over_summary_keywords() {
        let intent = AttendanceDomain.correct(&Candidate::default(), "재무팀 현황 엑셀로 뽑아줘", today());
        assert_eq!(intent.intent_type, AttendanceIntentType::ExcelByDepartment);
    }

    #[test]
    fn test_unrelated_question_stays_unknown() {
        let intent = AttendanceDomain.correct(&Candidate::default(), "오늘 날씨 어때", today());
        assert_eq!(intent.intent_type, AttendanceIntentType::Unknown);
        assert_eq!((intent.year, intent.month), (2026, 3));
    }

    #[test]
    fn test_model_name_equal_to_department_is_dropped() {
        let candidate = Candidate {
            intent: Some("ATTENDANCE_SUMMARY_EMPLOYEE".into()),
            employee_name: Some("재무팀".into()),
            ..Default::default()
        };

        let intent = AttendanceDomain.correct(&candidate, "재무팀 1월 출결 현황", today());
        assert_eq!(intent.employee_name, None);
    }

    #[test]
    fn test_hallucinated_model_name_is_dropped() {
        let candidate = Candidate {
            intent: Some("UNKNOWN".into()),
            employee_name: Some("김철수".into()),
            ..Default::default()
        };

        let intent = AttendanceDomain.correct(&candidate, "재무팀 1월 출결 현황", today());
        assert_eq!(intent.employee_name, None);
        assert_eq!(intent.intent_type, AttendanceIntentType::SummaryByDepartment);
    }
}
