//! Generic extraction pipeline
//!
//! [`IntentExtractor::extract`] never fails: every error path ends in a
//! schema-conforming intent.

use chrono::{Local, NaiveDate};
use std::sync::Arc;

use super::schema::Candidate;
use super::IntentDomain;
use crate::llm::{extract_object, TextGenerator};
use crate::metrics;

/// Which path produced an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Question text alone, no model call
    Literal,
    /// Model JSON corrected against the question
    Model,
    /// Model answered without usable JSON
    Fallback,
    /// Model call failed
    Default,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Model => "model",
            Self::Fallback => "fallback",
            Self::Default => "default",
        }
    }
}

/// Intent extractor for one domain
pub struct IntentExtractor<D: IntentDomain> {
    generator: Arc<dyn TextGenerator>,
    domain: D,
}

impl<D: IntentDomain> IntentExtractor<D> {
    pub fn new(generator: Arc<dyn TextGenerator>, domain: D) -> Self {
        Self { generator, domain }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Extract an intent, using today's local date for defaults
    pub async fn extract(&self, question: &str) -> D::Intent {
        self.extract_on(question, Local::now().date_naive()).await
    }

    /// Extract an intent with an explicit reference date
    pub async fn extract_on(&self, question: &str, today: NaiveDate) -> D::Intent {
        let (intent, resolution) = self.resolve(question, today).await;

        metrics::record_intent_path(self.domain.name(), resolution.as_str());
        tracing::info!(
            domain = self.domain.name(),
            path = resolution.as_str(),
            intent = ?intent,
            "Intent resolved"
        );

        intent
    }

    /// Interpret a raw model answer for `question`
    ///
    /// Pure: the same answer, question and date always give the same intent.
    pub fn interpret(&self, raw: &str, question: &str, today: NaiveDate) -> D::Intent {
        self.interpret_with_path(raw, question, today).0
    }

    async fn resolve(&self, question: &str, today: NaiveDate) -> (D::Intent, Resolution) {
        if question.trim().is_empty() {
            return (self.domain.default_intent(today), Resolution::Default);
        }

        if let Some(intent) = self.domain.resolve_without_model(question, today) {
            return (intent, Resolution::Literal);
        }

        let prompt = self.domain.build_prompt(question, today);
        let options = self.domain.generation_options();

        match self.generator.generate(&prompt, &options).await {
            Ok(raw) => self.interpret_with_path(&raw, question, today),
            Err(e) => {
                tracing::warn!(
                    domain = self.domain.name(),
                    backend = self.generator.backend(),
                    error = %e,
                    "Intent model call failed"
                );
                (self.domain.failure_intent(question, today), Resolution::Default)
            }
        }
    }

    fn interpret_with_path(
        &self,
        raw: &str,
        question: &str,
        today: NaiveDate,
    ) -> (D::Intent, Resolution) {
        tracing::debug!(domain = self.domain.name(), raw = %raw, "Intent model answer");

        match extract_object(raw) {
            Ok(map) => {
                let candidate = Candidate::from_object(&map);
                (
                    self.domain.correct(&candidate, question, today),
                    Resolution::Model,
                )
            }
            Err(e) => {
                tracing::warn!(domain = self.domain.name(), error = %e, "Falling back to question text");
                (self.domain.fallback(question, today), Resolution::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::schema::{AttendanceIntentType, Department};
    use crate::intent::AttendanceDomain;
    use crate::llm::{GenerationOptions, LlmError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        answer: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err(()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn backend(&self) -> &'static str {
            "canned"
        }

        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(|_| LlmError::Timeout)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn test_model_failure_gives_default_intent() {
        let extractor = IntentExtractor::new(Canned::failing(), AttendanceDomain);
        let intent = extractor.extract_on("재무팀 1월 출결 현황", today()).await;

        assert_eq!(intent.intent_type, AttendanceIntentType::Unknown);
        assert_eq!(intent.department, None);
        assert_eq!((intent.year, intent.month), (2026, 3));
    }

    #[tokio::test]
    async fn test_blank_question_skips_model() {
        let generator = Canned::ok(r#"{"intent": "ATTENDANCE_SUMMARY_DEPARTMENT"}"#);
        let extractor = IntentExtractor::new(generator.clone(), AttendanceDomain);

        let intent = extractor.extract_on("   ", today()).await;
        assert_eq!(intent.intent_type, AttendanceIntentType::Unknown);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let extractor = IntentExtractor::new(Canned::failing(), AttendanceDomain);
        let raw = r#"{"intent": "UNKNOWN", "department": "재무"}"#;

        let first = extractor.interpret(raw, "재무팀 1월 출결 현황", today());
        let second = extractor.interpret(raw, "재무팀 1월 출결 현황", today());
        assert_eq!(first, second);
        assert_eq!(first.department, Some(Department::Finance));
    }

    #[test]
    fn test_interpret_reports_fallback_path() {
        let extractor = IntentExtractor::new(Canned::failing(), AttendanceDomain);
        let (_, path) = extractor.interpret_with_path("모르겠습니다", "재무팀 출결", today());
        assert_eq!(path, Resolution::Fallback);
    }
}
