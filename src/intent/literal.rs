//! Literal-text rules
//!
//! Everything here reads the user's question directly, independent of any
//! model output. The per-domain correctors combine these with the candidate.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

use super::schema::{Department, LooseValue};

/// Hangul syllables
const HANGUL: &str = "가-힣";

/// Words that are never an employee name
pub const EXCLUSION_WORDS: &[&str] = &[
    "년", "월", "출결", "엑셀", "엑셀로", "현황", "통계", "알려", "알려줘", "알려주세요", "보여",
    "보여줘", "보여주세요", "뽑아", "뽑아줘", "다운로드", "추출", "소속", "직원", "사원", "멤버",
    "근태", "근무", "출근", "퇴근", "지각", "결근", "휴가", "전체", "모든", "이번", "지난", "올해",
    "작년", "이번달", "지난달",
];

/// Keywords asking for a spreadsheet
pub const EXCEL_KEYWORDS: &[&str] = &["엑셀", "다운로드", "뽑아", "뽑아줘", "추출", "엑셀로"];

/// Keywords asking for a text summary
pub const SUMMARY_KEYWORDS: &[&str] = &[
    "현황", "어때", "통계", "보여줘", "알려줘", "알려주세요", "보여주세요", "알려",
];

/// Korean month words, longest first so `십일` wins over `일`
const MONTH_WORDS: [(&str, u32); 12] = [
    ("십이", 12),
    ("십일", 11),
    ("십", 10),
    ("일", 1),
    ("이", 2),
    ("삼", 3),
    ("사", 4),
    ("오", 5),
    ("육", 6),
    ("칠", 7),
    ("팔", 8),
    ("구", 9),
];

lazy_static! {
    static ref YEAR_IN_TEXT: Regex =
        Regex::new(r"(\d{4})년|(\d{2})년|(\d{4})").expect("valid year pattern");
    static ref DATED_YEAR_IN_TEXT: Regex =
        Regex::new(r"(\d{4})년|(\d{2})년").expect("valid year pattern");
    static ref LEADING_YEAR_DIGITS: Regex = Regex::new(r"\d{2,4}").expect("valid digit pattern");
    static ref MONTH_DIGITS: Regex = Regex::new(r"\d{1,2}").expect("valid digit pattern");
    static ref MONTH_IN_TEXT: Regex = Regex::new(r"(\d{1,2})\s*월").expect("valid month pattern");
    static ref MONTH_WORD_IN_TEXT: Regex =
        Regex::new(r"(십이|십일|십|일|이|삼|사|오|육|칠|팔|구)\s*월").expect("valid month pattern");

    /// Department mention, whitespace allowed between characters, `팀` optional
    static ref DEPARTMENT_MENTIONS: Vec<(Department, Regex)> = Department::ALL
        .into_iter()
        .map(|dept| {
            let stem = dept
                .stem()
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join(r"\s*");
            let pattern = format!(r"{stem}(?:\s*팀)?");
            (dept, Regex::new(&pattern).expect("valid department pattern"))
        })
        .collect();

    /// Name right after a department: ends at a number, keyword or end of text.
    /// The trailing group stands in for a lookahead; only group 1 is read.
    static ref NAME_AFTER_DEPARTMENT: Regex = Regex::new(&format!(
        r"^\s*([{HANGUL}]{{2,4}})(\s+\d|\s+년|\s+출결|\s+엑셀|\s+알려|\s+보여|\s*$)"
    ))
    .expect("valid name pattern");

    /// Looser form: the first Hangul run after a department, ended by whitespace
    static ref NAME_AFTER_DEPARTMENT_LOOSE: Regex =
        Regex::new(&format!(r"^\s*([{HANGUL}]{{2,4}})\s")).expect("valid name pattern");

    static ref NAME_AFTER_ROLE_NOUN: Regex = Regex::new(&format!(
        r"(?:소속|직원|사원|멤버)\s*([{HANGUL}]{{2,4}})(\s+\d|\s+년|\s+출결|\s+엑셀|\s+알려|\s+보여|\s*$)"
    ))
    .expect("valid name pattern");

    /// Name followed by a year or month token, anywhere in the text
    static ref NAME_BEFORE_DATE: Regex = Regex::new(&format!(
        r"(?:^|[^{HANGUL}])([{HANGUL}]{{2,4}})\s+(?:\d{{4}}년|\d{{2}}년|\d{{1,2}}월)"
    ))
    .expect("valid name pattern");

    static ref FIRST_HANGUL_RUN: Regex =
        Regex::new(&format!(r"\s+([{HANGUL}]{{2,4}})")).expect("valid name pattern");

    static ref NAME_SHAPE: Regex =
        Regex::new(&format!(r"^[{HANGUL}]{{2,4}}$")).expect("valid name pattern");
}

// ============================================================================
// Year / Month
// ============================================================================

/// Accept a year in `[2000, 2100]`, lifting two-digit values into the 2000s
pub fn coerce_year(value: i64) -> Option<i32> {
    let year = if value < 100 { 2000 + value } else { value };
    (2000..=2100).contains(&year).then_some(year as i32)
}

/// Year from a candidate value: a number, or the first 2-4 digit run of a string
pub fn year_from_value(value: &LooseValue) -> Option<i32> {
    match value {
        LooseValue::Number(n) => coerce_year(*n),
        LooseValue::Text(s) => LEADING_YEAR_DIGITS
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .and_then(coerce_year),
    }
}

/// First in-range year mentioned in the question (`2025년`, `25년`, or a bare `2025`)
pub fn year_in_text(text: &str) -> Option<i32> {
    first_year(&YEAR_IN_TEXT, text)
}

/// Like [`year_in_text`], but only years written with `년`
///
/// Amounts such as `2050만원` are never read as a year.
pub fn dated_year_in_text(text: &str) -> Option<i32> {
    first_year(&DATED_YEAR_IN_TEXT, text)
}

fn first_year(pattern: &Regex, text: &str) -> Option<i32> {
    pattern.captures_iter(text).find_map(|caps| {
        let digits = caps.get(1).or(caps.get(2)).or(caps.get(3))?;
        digits.as_str().parse().ok().and_then(coerce_year)
    })
}

fn valid_month(value: i64) -> Option<u32> {
    (1..=12).contains(&value).then_some(value as u32)
}

/// Month from a candidate value: a number, a 1-2 digit run, or a Korean numeral word
pub fn month_from_value(value: &LooseValue) -> Option<u32> {
    match value {
        LooseValue::Number(n) => valid_month(*n),
        LooseValue::Text(s) => match MONTH_DIGITS.find(s) {
            Some(m) => m.as_str().parse().ok().and_then(valid_month),
            None => MONTH_WORDS
                .iter()
                .find(|(word, _)| s.contains(word))
                .map(|(_, month)| *month),
        },
    }
}

/// Month mentioned in the question (`1월`, `01 월`, `십이월`)
pub fn month_in_text(text: &str) -> Option<u32> {
    if let Some(month) = MONTH_IN_TEXT
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .find_map(valid_month)
    {
        return Some(month);
    }

    let caps = MONTH_WORD_IN_TEXT.captures(text)?;
    MONTH_WORDS
        .iter()
        .find(|(word, _)| *word == &caps[1])
        .map(|(_, month)| *month)
}

// ============================================================================
// Departments
// ============================================================================

/// A department mentioned in the question and where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentMention {
    pub department: Department,
    pub span: Range<usize>,
}

/// Every department mentioned in the question, in canonical order
///
/// The full name, the `팀`-less stem and spaced variants (`개발 1 팀`) all count.
pub fn department_mentions(text: &str) -> Vec<DepartmentMention> {
    DEPARTMENT_MENTIONS
        .iter()
        .filter_map(|(department, pattern)| {
            pattern.find(text).map(|m| DepartmentMention {
                department: *department,
                span: m.range(),
            })
        })
        .collect()
}

/// First department mentioned in the question, in canonical order
pub fn department_in_text(text: &str) -> Option<Department> {
    department_mentions(text).first().map(|m| m.department)
}

/// All departments mentioned in the question, in canonical order
pub fn departments_in_text(text: &str) -> Vec<Department> {
    department_mentions(text)
        .into_iter()
        .map(|m| m.department)
        .collect()
}

// ============================================================================
// Employee name
// ============================================================================

/// Whether `candidate` may be used as an employee name
///
/// Rejects department names and their parts, exclusion words, and anything
/// starting with a multi-character exclusion word (`알려줘요`, `출결현황`).
pub fn is_acceptable_name(candidate: &str) -> bool {
    if !NAME_SHAPE.is_match(candidate) {
        return false;
    }

    let overlaps_department = Department::ALL
        .iter()
        .any(|d| d.name().contains(candidate) || candidate.contains(d.stem()));
    if overlaps_department {
        return false;
    }

    !EXCLUSION_WORDS.iter().any(|word| {
        candidate == *word || (word.chars().count() > 1 && candidate.starts_with(word))
    })
}

/// Employee name from the question text alone
///
/// Tried in order: a name right after a department mention, a name after a
/// role noun (`소속`, `직원`, ...), and, only when no department is mentioned,
/// a name right before a year or month token.
pub fn employee_name_in_text(text: &str) -> Option<String> {
    let mentions = department_mentions(text);

    for mention in &mentions {
        let after = &text[mention.span.end..];
        let found = [&*NAME_AFTER_DEPARTMENT, &*NAME_AFTER_DEPARTMENT_LOOSE, &*NAME_AFTER_ROLE_NOUN]
            .into_iter()
            .filter_map(|pattern| pattern.captures(after))
            .map(|caps| caps[1].to_string())
            .find(|name| is_acceptable_name(name));
        if found.is_some() {
            return found;
        }
    }

    if !mentions.is_empty() {
        return None;
    }

    NAME_BEFORE_DATE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .find(|name| is_acceptable_name(name))
}

/// Accept a model-supplied name only if the question confirms it
///
/// The name must appear verbatim and be the first Hangul run after a
/// department mention.
pub fn confirm_model_name(text: &str, name: &str) -> Option<String> {
    if !text.contains(name) || !is_acceptable_name(name) {
        return None;
    }

    department_mentions(text)
        .iter()
        .filter_map(|mention| FIRST_HANGUL_RUN.captures(&text[mention.span.end..]))
        .any(|caps| &caps[1] == name)
        .then(|| name.to_string())
}

// ============================================================================
// Keywords
// ============================================================================

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_coercion() {
        assert_eq!(year_from_value(&LooseValue::Text("25년".into())), Some(2025));
        assert_eq!(year_from_value(&LooseValue::Text("2025".into())), Some(2025));
        assert_eq!(year_from_value(&LooseValue::Number(25)), Some(2025));
        assert_eq!(year_from_value(&LooseValue::Number(1999)), None);
        assert_eq!(year_from_value(&LooseValue::Number(2101)), None);
        assert_eq!(year_from_value(&LooseValue::Text("올해".into())), None);
    }

    #[test]
    fn test_year_in_text() {
        assert_eq!(year_in_text("개발1팀 2025년 1월 출결"), Some(2025));
        assert_eq!(year_in_text("윤서현 25년 1월 출결"), Some(2025));
        assert_eq!(year_in_text("2024 실적"), Some(2024));
        assert_eq!(year_in_text("재무팀 1월 출결 현황"), None);
    }

    #[test]
    fn test_year_in_text_skips_out_of_range_numbers() {
        assert_eq!(year_in_text("사번 1234 윤서현 2025년 1월"), Some(2025));
        assert_eq!(year_in_text("사번 1234 출결"), None);
    }

    #[test]
    fn test_dated_year_needs_suffix() {
        assert_eq!(dated_year_in_text("개발1팀 2024년 실적"), Some(2024));
        assert_eq!(dated_year_in_text("24년 실적"), Some(2024));
        assert_eq!(dated_year_in_text("매출 2050만원 넘은 부서"), None);
        assert_eq!(dated_year_in_text("2000만원 이상 2023년 실적"), Some(2023));
    }

    #[test]
    fn test_month_from_value() {
        assert_eq!(month_from_value(&LooseValue::Number(1)), Some(1));
        assert_eq!(month_from_value(&LooseValue::Number(13)), None);
        assert_eq!(month_from_value(&LooseValue::Text("01월".into())), Some(1));
        assert_eq!(month_from_value(&LooseValue::Text("일월".into())), Some(1));
        assert_eq!(month_from_value(&LooseValue::Text("십일월".into())), Some(11));
        assert_eq!(month_from_value(&LooseValue::Text("십이월".into())), Some(12));
    }

    #[test]
    fn test_month_in_text() {
        assert_eq!(month_in_text("2025년 1월 출결"), Some(1));
        assert_eq!(month_in_text("25년11월"), Some(11));
        assert_eq!(month_in_text("재무팀 십이월 현황"), Some(12));
        assert_eq!(month_in_text("재무팀 출결 현황"), None);
        assert_eq!(month_in_text("2025 출결"), None);
    }

    #[test]
    fn test_department_mentions_variants() {
        for text in ["개발1팀 출결", "개발 1팀 출결", "개발 1 팀 출결", "개발1 출결"] {
            assert_eq!(department_in_text(text), Some(Department::Dev1), "{text}");
        }
    }

    #[test]
    fn test_departments_in_text_keeps_canonical_order() {
        assert_eq!(
            departments_in_text("영업팀이랑 개발1팀 비교"),
            vec![Department::Dev1, Department::Sales]
        );
        assert!(departments_in_text("제일 잘한 팀?").is_empty());
    }

    #[test]
    fn test_name_after_department() {
        assert_eq!(
            employee_name_in_text("재무팀 윤서현 25년 1월 출결 알려주세요").as_deref(),
            Some("윤서현")
        );
        assert_eq!(
            employee_name_in_text("영업팀 정도윤 출결 엑셀").as_deref(),
            Some("정도윤")
        );
        assert_eq!(employee_name_in_text("영업팀 정도윤").as_deref(), Some("정도윤"));
    }

    #[test]
    fn test_name_after_role_noun() {
        assert_eq!(
            employee_name_in_text("영업팀 소속 정도윤 출결 보여줘").as_deref(),
            Some("정도윤")
        );
        assert_eq!(
            employee_name_in_text("영업팀소속 정도윤 1월 출결").as_deref(),
            Some("정도윤")
        );
    }

    #[test]
    fn test_name_before_date_without_department() {
        assert_eq!(
            employee_name_in_text("윤서현 25년 1월 출결 알려주세요").as_deref(),
            Some("윤서현")
        );
        assert_eq!(employee_name_in_text("윤서현 3월 출결").as_deref(), Some("윤서현"));
    }

    #[test]
    fn test_no_name_in_department_queries() {
        assert_eq!(employee_name_in_text("개발1팀 2025년 1월 출결 엑셀로 뽑아줘"), None);
        assert_eq!(employee_name_in_text("재무팀 1월 출결 현황"), None);
        assert_eq!(employee_name_in_text("재무팀 현황"), None);
        assert_eq!(employee_name_in_text("재무팀 출결 현황 보여줘"), None);
    }

    #[test]
    fn test_name_before_date_is_skipped_when_department_found() {
        // "출결" would be rejected anyway; the date rule must not run at all
        assert_eq!(employee_name_in_text("재무팀 이번 25년 출결"), None);
    }

    #[test]
    fn test_department_names_are_never_names() {
        for dept in Department::ALL {
            assert!(!is_acceptable_name(dept.name()));
            assert!(!is_acceptable_name(dept.stem()));
        }
        assert!(!is_acceptable_name("알려줘요"));
        assert!(!is_acceptable_name("이번달"));
        assert!(!is_acceptable_name("윤"));
        assert!(!is_acceptable_name("Kim"));
        assert!(is_acceptable_name("윤서현"));
    }

    #[test]
    fn test_confirm_model_name() {
        let text = "재무팀 윤서현 1월 출결";
        assert_eq!(confirm_model_name(text, "윤서현").as_deref(), Some("윤서현"));
        assert_eq!(confirm_model_name(text, "김철수"), None);
        assert_eq!(confirm_model_name("윤서현 출결", "윤서현"), None);
        assert_eq!(confirm_model_name("재무팀 출결 현황", "출결"), None);
    }

    #[test]
    fn test_keywords() {
        assert!(contains_any("출결 엑셀로 뽑아줘", EXCEL_KEYWORDS));
        assert!(contains_any("출결 알려주세요", SUMMARY_KEYWORDS));
        assert!(!contains_any("출결", SUMMARY_KEYWORDS));
    }
}
