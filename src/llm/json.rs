//! Best-effort JSON object extraction from LLM output
//!
//! Models often wrap the requested JSON in prose, markdown fences or trailing
//! commentary. [`extract_object`] tries an ordered list of strategies and
//! returns the first JSON object that parses.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    /// A JSON object with at most one level of nested braces
    static ref NESTED_OBJECT: Regex =
        Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("valid nested object pattern");
}

/// No strategy produced a JSON object
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no JSON object found in LLM output")]
pub struct ExtractionFailed;

/// Extraction strategies, applied in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// First `{` up to the `}` that brings the depth back to zero
    BalancedBraces,
    /// Regex tolerant of one nested object level
    NestedPattern,
    /// The whole (trimmed) text
    WholeText,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::BalancedBraces,
        ExtractionStrategy::NestedPattern,
        ExtractionStrategy::WholeText,
    ];

    /// Apply this strategy alone
    pub fn apply(self, text: &str) -> Option<Map<String, Value>> {
        let span = match self {
            Self::BalancedBraces => balanced_span(text)?,
            Self::NestedPattern => NESTED_OBJECT.find(text)?.as_str(),
            Self::WholeText => text.trim(),
        };

        match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Extract the first JSON object from `text`
pub fn extract_object(text: &str) -> Result<Map<String, Value>, ExtractionFailed> {
    for strategy in ExtractionStrategy::ORDER {
        if let Some(map) = strategy.apply(text) {
            tracing::debug!(?strategy, "JSON object extracted");
            return Ok(map);
        }
    }
    Err(ExtractionFailed)
}

/// Locate the first balanced `{...}` span
///
/// Closing braces seen before the first `{` are ignored.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;

    for (idx, ch) in text.char_indices() {
        match ch {
            '{' => {
                start.get_or_insert(idx);
                depth += 1;
            }
            '}' if start.is_some() => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}
