//! Department performance questions
//!
//! Departments, years and most query types are read straight from the
//! question. The model is only asked for a `query_type` when the question
//! carries no literal signal at all ("제일 잘한 팀?").

use chrono::{Datelike, NaiveDate};
use std::time::Duration;

use super::literal::{contains_any, dated_year_in_text, departments_in_text, year_from_value};
use super::schema::{Candidate, ChartType, Department, PerformanceIntent, PerformanceQueryType};
use super::IntentDomain;
use crate::llm::GenerationOptions;

const PREVIOUS_YEAR_KEYWORDS: &[&str] = &["작년", "전년"];
const RANKING_KEYWORDS: &[&str] = &["1위", "최고", "가장", "제일", "순위"];
const ALL_KEYWORDS: &[&str] = &["전체", "모든", "전부"];
const TREND_KEYWORDS: &[&str] = &["추이", "변화", "트렌드"];
const SHARE_KEYWORDS: &[&str] = &["비율", "점유", "파이", "pie"];

/// Performance intent domain
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceDomain;

impl PerformanceDomain {
    fn has_literal_signal(question: &str) -> bool {
        !departments_in_text(question).is_empty()
            || [PREVIOUS_YEAR_KEYWORDS, RANKING_KEYWORDS, ALL_KEYWORDS, TREND_KEYWORDS]
                .iter()
                .any(|keywords| contains_any(question, keywords))
    }
}

impl IntentDomain for PerformanceDomain {
    type Intent = PerformanceIntent;

    fn name(&self) -> &'static str {
        "performance"
    }

    fn build_prompt(&self, question: &str, _today: NaiveDate) -> String {
        format!(
            r#"질문 의도를 JSON으로 응답. query_type만 반환.
ranking: 순위질문(1위,최고,가장)
compare: 부서비교
trend: 추이분석
all: 전체부서
예: "제일 잘한 팀?" → {{"query_type":"ranking"}}
JSON만 응답.
질문:{question}
JSON:"#
        )
    }

    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::new()
            .max_tokens(50)
            .timeout(Duration::from_secs(10))
    }

    fn correct(&self, candidate: &Candidate, question: &str, today: NaiveDate) -> PerformanceIntent {
        let mut departments = departments_in_text(question);
        if departments.is_empty() {
            departments = model_departments(candidate);
        }

        let year = dated_year_in_text(question)
            .or_else(|| candidate.year.as_ref().and_then(year_from_value))
            .unwrap_or_else(|| today.year());

        let previous_year = contains_any(question, PREVIOUS_YEAR_KEYWORDS);
        let model_type = candidate
            .query_type
            .as_deref()
            .and_then(PerformanceQueryType::parse);

        let query_type = if contains_any(question, ALL_KEYWORDS) {
            PerformanceQueryType::All
        } else if contains_any(question, RANKING_KEYWORDS) {
            PerformanceQueryType::Ranking
        } else if previous_year {
            PerformanceQueryType::YearCompare
        } else if let Some(model_type) = model_type {
            model_type
        } else if contains_any(question, TREND_KEYWORDS) {
            PerformanceQueryType::Trend
        } else {
            PerformanceQueryType::Compare
        };

        let compare_year = if previous_year {
            Some(year - 1)
        } else if query_type == PerformanceQueryType::YearCompare {
            candidate
                .compare_year
                .as_ref()
                .and_then(year_from_value)
                .filter(|y| *y != year)
                .or(Some(year - 1))
        } else {
            None
        };

        let chart_type = if contains_any(question, TREND_KEYWORDS) {
            ChartType::Line
        } else if contains_any(question, SHARE_KEYWORDS) {
            ChartType::Pie
        } else {
            candidate
                .chart_type
                .as_deref()
                .and_then(ChartType::parse)
                .unwrap_or_default()
        };

        PerformanceIntent {
            query_type,
            departments,
            year,
            compare_year,
            chart_type,
        }
    }

    fn default_intent(&self, today: NaiveDate) -> PerformanceIntent {
        PerformanceIntent {
            query_type: PerformanceQueryType::Compare,
            departments: Vec::new(),
            year: today.year(),
            compare_year: None,
            chart_type: ChartType::Bar,
        }
    }

    /// Keep what the question itself says (year, chart keywords)
    fn failure_intent(&self, question: &str, today: NaiveDate) -> PerformanceIntent {
        self.fallback(question, today)
    }

    fn resolve_without_model(&self, question: &str, today: NaiveDate) -> Option<PerformanceIntent> {
        Self::has_literal_signal(question).then(|| self.fallback(question, today))
    }
}

/// Departments named by the model, normalized, deduplicated, canonical order
fn model_departments(candidate: &Candidate) -> Vec<Department> {
    let named: Vec<Department> = candidate
        .departments
        .iter()
        .map(String::as_str)
        .chain(candidate.department.as_deref())
        .filter_map(Department::normalize)
        .collect();

    Department::ALL
        .into_iter()
        .filter(|d| named.contains(d))
        .collect()
}
