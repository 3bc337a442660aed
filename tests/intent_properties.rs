//! Property tests: whatever the question and whatever the model says, the
//! extracted intent stays inside its domain.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{today, ScriptedGenerator};
use proptest::prelude::*;
use smartspend_ai::intent::{AttendanceDomain, IntentExtractor, PerformanceDomain};

const FRAGMENTS: &[&str] = &[
    "개발1팀", "개발 2 팀", "재무팀", "영업", "마케팅팀", "디자인", "윤서현", "정도윤", "김철수",
    "2025년", "25년", "1월", "12월", "13월", "일월", "작년", "대비", "순위", "전체", "추이",
    "비율", "출결", "엑셀", "뽑아줘", "알려줘", "현황", "실적", "비교", "?", "!",
];

const ANSWERS: &[&str] = &[
    "",
    "모르겠습니다",
    r#"{"intent": "ATTENDANCE_EXCEL_DEPARTMENT", "department": "재무팀", "year": 2025, "month": 1}"#,
    r#"{"intent": "ATTENDANCE_SUMMARY_EMPLOYEE", "employeeName": "김철수", "year": "99년", "month": "13월"}"#,
    r#"{"intent": "SOMETHING_ELSE", "department": "회계팀", "year": 1800, "month": 0}"#,
    r#"{"query_type": "ranking", "departments": ["영업팀", "없는팀"], "year": 2024, "chart_type": "pie"}"#,
    r#"{"query_type": "year_compare", "departments": "개발1팀", "year": "올해"}"#,
    r#"결과: {"query_type": "trend", "year": 3000} 입니다"#,
    "{ broken json",
];

fn question() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..6).prop_map(|parts| parts.join(" "))
}

fn generator(answer: Option<&str>) -> Arc<ScriptedGenerator> {
    Arc::new(match answer {
        Some(text) => ScriptedGenerator::new().answer(text),
        None => ScriptedGenerator::new().time_out(),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn attendance_intent_stays_in_domain(
        question in question(),
        answer in prop::option::of(prop::sample::select(ANSWERS)),
    ) {
        let extractor = IntentExtractor::new(generator(answer), AttendanceDomain);
        let intent = tokio_test::block_on(extractor.extract_on(&question, today()));

        prop_assert!((2000..=2100).contains(&intent.year));
        prop_assert!((1..=12).contains(&intent.month));
        if let Some(name) = &intent.employee_name {
            prop_assert!(question.contains(name.as_str()), "{name} not in {question}");
        }
    }

    #[test]
    fn performance_intent_stays_in_domain(
        question in question(),
        answer in prop::option::of(prop::sample::select(ANSWERS)),
    ) {
        let extractor = IntentExtractor::new(generator(answer), PerformanceDomain);
        let intent = tokio_test::block_on(extractor.extract_on(&question, today()));

        prop_assert!((2000..=2100).contains(&intent.year));
        if let Some(previous) = intent.compare_year {
            prop_assert_eq!(previous, intent.year - 1);
        }

        let unique: HashSet<_> = intent.departments.iter().collect();
        prop_assert_eq!(unique.len(), intent.departments.len());
    }
}
