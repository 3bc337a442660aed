//! Natural-language intent extraction
//!
//! A Korean question is turned into a structured intent in four stages:
//!
//! 1. the domain's prompt is sent to a [`TextGenerator`](crate::llm::TextGenerator)
//! 2. the first JSON object is pulled out of the answer ([`crate::llm::json`])
//! 3. the object is read as a tolerant [`Candidate`] and corrected against the
//!    literal question text ([`literal`])
//! 4. if no object could be extracted, the same correction runs with an empty
//!    candidate; if the model call itself failed, the domain decides through
//!    [`IntentDomain::failure_intent`] (attendance returns its default intent)
//!
//! Attendance and performance questions share this pipeline through the
//! [`IntentDomain`] trait.

pub mod attendance;
pub mod extractor;
pub mod literal;
pub mod performance;
pub mod schema;

use chrono::NaiveDate;
use serde::Serialize;

use crate::llm::GenerationOptions;

pub use attendance::AttendanceDomain;
pub use extractor::{IntentExtractor, Resolution};
pub use performance::PerformanceDomain;
pub use schema::{
    AttendanceIntent, AttendanceIntentType, Candidate, ChartType, Department, LooseValue,
    PerformanceIntent, PerformanceQueryType,
};

/// One family of questions the extractor understands
pub trait IntentDomain: Send + Sync {
    /// Structured result for this domain
    type Intent: Clone + std::fmt::Debug + Serialize + Send + Sync + 'static;

    /// Short label used in logs and metrics
    fn name(&self) -> &'static str;

    /// Full prompt for the model, including the question
    fn build_prompt(&self, question: &str, today: NaiveDate) -> String;

    /// Sampling and timeout settings for this domain's model call
    fn generation_options(&self) -> GenerationOptions;

    /// Reconcile a parsed model answer with the question text
    fn correct(&self, candidate: &Candidate, question: &str, today: NaiveDate) -> Self::Intent;

    /// Used when the model answered but no JSON object could be extracted
    fn fallback(&self, question: &str, today: NaiveDate) -> Self::Intent {
        self.correct(&Candidate::default(), question, today)
    }

    /// Intent for an empty question
    fn default_intent(&self, today: NaiveDate) -> Self::Intent;

    /// Used when the model call failed
    fn failure_intent(&self, _question: &str, today: NaiveDate) -> Self::Intent {
        self.default_intent(today)
    }

    /// Resolve from the question alone, skipping the model call
    fn resolve_without_model(&self, _question: &str, _today: NaiveDate) -> Option<Self::Intent> {
        None
    }
}
