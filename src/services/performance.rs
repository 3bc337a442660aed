//! Department performance questions end to end
//!
//! Intent → monthly rows from the store (plus the comparison year when asked)
//! → text summary with an optional model insight → two-panel chart.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ErrorInfo;
use crate::intent::{Department, IntentExtractor, PerformanceDomain, PerformanceIntent};
use crate::llm::{GenerationOptions, TextGenerator};
use crate::report::summary::{insight_input, with_insight};
use crate::report::{department_totals, performance_summary, ChartRenderer, PerformanceChart};
use crate::storage::{PerformanceRecord, PerformanceStore};

const NO_DEPARTMENT: &str = "부서명을 찾을 수 없습니다. 예: '개발1팀 영업팀 비교해줘'";
const INSIGHT_MAX_DEPARTMENTS: usize = 4;
const INSIGHT_MAX_TOKENS: u32 = 150;
const INSIGHT_TIMEOUT: Duration = Duration::from_secs(15);

/// Reply for `POST /api/ai/performance`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReply {
    pub ok: bool,
    pub message: String,
    pub summary: Option<String>,
    /// Base64-encoded PNG
    pub chart_image: Option<String>,
}

impl PerformanceReply {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Performance service
pub struct PerformanceService {
    extractor: IntentExtractor<PerformanceDomain>,
    store: Arc<dyn PerformanceStore>,
    insight: Arc<dyn TextGenerator>,
    charts: ChartRenderer,
}

impl PerformanceService {
    /// `generator` serves both intent extraction and insights
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn PerformanceStore>,
        charts: ChartRenderer,
    ) -> Self {
        Self {
            extractor: IntentExtractor::new(generator.clone(), PerformanceDomain),
            store,
            insight: generator,
            charts,
        }
    }

    pub async fn process_query(&self, prompt: &str) -> PerformanceReply {
        self.process_query_on(prompt, Local::now().date_naive()).await
    }

    /// Answer `prompt` with an explicit reference date
    pub async fn process_query_on(&self, prompt: &str, today: NaiveDate) -> PerformanceReply {
        tracing::info!(prompt, "Performance query received");
        let intent = self.extractor.extract_on(prompt, today).await;
        self.answer(&intent).await
    }

    /// Produce the reply for an already extracted intent
    pub async fn answer(&self, intent: &PerformanceIntent) -> PerformanceReply {
        let departments = target_departments(intent);
        if departments.is_empty() {
            return PerformanceReply::failure(NO_DEPARTMENT);
        }

        let data = self.load(&departments, intent.year).await;
        if data.is_empty() {
            let names: Vec<&str> = departments.iter().map(|d| d.name()).collect();
            return PerformanceReply::failure(format!(
                "{}의 {}년 데이터가 없습니다.",
                names.join(", "),
                intent.year
            ));
        }

        let compare_data = match intent.compare_year {
            Some(year) => Some(self.load(&departments, year).await),
            None => None,
        };

        let totals = department_totals(&data, &departments, compare_data.as_deref());
        let mut summary = performance_summary(intent.year, &totals);

        if departments.len() <= INSIGHT_MAX_DEPARTMENTS {
            if let Some(insight) = self.insight(&insight_input(&totals), intent.year).await {
                summary = with_insight(&summary, &insight);
            }
        }

        let chart = PerformanceChart {
            year: intent.year,
            compare_year: intent.compare_year,
            chart_type: intent.chart_type,
            departments,
            data,
            compare_data,
        };
        let chart_image = match self.charts.render_base64(chart).await {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(error = %err, "Chart rendering skipped");
                None
            }
        };

        PerformanceReply {
            ok: true,
            message: format!("{}년 실적 분석 완료!", intent.year),
            summary: Some(summary),
            chart_image,
        }
    }

    async fn load(&self, departments: &[Department], year: i32) -> Vec<PerformanceRecord> {
        match self.store.fetch(departments, year).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(year, error = %err, category = err.category().label(), "Performance query failed");
                Vec::new()
            }
        }
    }

    /// One-paragraph model commentary; `None` on any failure or empty answer
    async fn insight(&self, figures: &str, year: i32) -> Option<String> {
        let prompt = format!(
            "부서 실적 데이터를 보고 한줄 인사이트를 작성해.\n\
             데이터: {figures} ({year}년)\n\
             형식: ✅강점: (한줄) ⚠️주의: (한줄) 💡제안: (한줄)\n\
             3줄 이내, 한국어로."
        );
        let options = GenerationOptions::new()
            .max_tokens(INSIGHT_MAX_TOKENS)
            .timeout(INSIGHT_TIMEOUT);

        match self.insight.generate(&prompt, &options).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Insight generation failed");
                None
            }
        }
    }
}

/// Departments to query: the intent's own, or all of them for ranking/all questions
pub fn target_departments(intent: &PerformanceIntent) -> Vec<Department> {
    if intent.departments.is_empty() && intent.query_type.spans_all_departments() {
        Department::ALL.to_vec()
    } else {
        intent.departments.clone()
    }
}
