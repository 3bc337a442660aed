//! Expense approval recommendation
//!
//! Combines an expense claim, the optional OCR result for its receipt and the
//! company expense policy into one review prompt. The model answers with
//! `APPROVE`, `REJECT_CLEAR` or `REJECT_SUSPECTED`; when the call or the
//! parse fails the claim is flagged `REJECT_SUSPECTED` with zero confidence
//! so a person looks at it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::path::PathBuf;

use super::receipt::ReceiptError;
use crate::llm::{extract_object, OpenAiClient};

const REVIEW_TEMPERATURE: f32 = 0.3;
/// Confidence ceiling for answers the model should not have given
const NORMALIZED_CONFIDENCE_CAP: f64 = 0.5;
/// Rewritten verdicts above this confidence are lowered to the cap
const REWRITE_CAP_THRESHOLD: f64 = 0.6;

// ============================================================================
// Request
// ============================================================================

/// The claim as filed by the employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseData {
    pub receipt_date: Option<String>,
    pub merchant: Option<String>,
    pub amount: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// OCR fields relevant to the review; a subset of the extraction result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptSnapshot {
    pub extracted_date: Option<String>,
    pub extracted_merchant: Option<String>,
    pub extracted_amount: Option<i64>,
    pub extracted_category: Option<String>,
    pub extracted_description: Option<String>,
    pub confidence: Option<f64>,
}

/// Body of `POST /api/ai/receipt/recommend-approval`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub expense_data: ExpenseData,
    #[serde(default)]
    pub receipt_extraction: Option<ReceiptSnapshot>,
}

// ============================================================================
// Result
// ============================================================================

/// Review verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    /// Clear policy violation or mismatch
    RejectClear,
    /// Uncertain; needs a manual look
    RejectSuspected,
}

/// Review result returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecommendation {
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reason: String,
    pub risk_factors: Vec<String>,
    pub positive_factors: Vec<String>,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApprovalRecommendation {
    /// Verdict used when no usable model answer exists
    pub fn manual_review(model_name: &str, error: String, reason: &str, risk: &str) -> Self {
        Self {
            recommendation: Recommendation::RejectSuspected,
            confidence: 0.0,
            reason: reason.to_string(),
            risk_factors: vec![risk.to_string()],
            positive_factors: Vec::new(),
            model_name: model_name.to_string(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVerdict {
    recommendation: String,
    confidence: f64,
    reason: String,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    positive_factors: Vec<String>,
}

/// Parse a model answer, rewriting `REQUEST_MORE_INFO` to `REJECT_SUSPECTED`
pub fn parse_verdict(answer: &str, model_name: &str) -> Result<ApprovalRecommendation, ReceiptError> {
    let object = extract_object(answer).map_err(|e| ReceiptError::Parse(e.to_string()))?;
    let verdict: ModelVerdict = serde_json::from_value(Value::Object(object))
        .map_err(|e| ReceiptError::Parse(e.to_string()))?;

    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(ReceiptError::Invalid(format!(
            "confidence {} is outside [0, 1]",
            verdict.confidence
        )));
    }

    let (recommendation, confidence) = match verdict.recommendation.trim() {
        "APPROVE" => (Recommendation::Approve, verdict.confidence),
        "REJECT_CLEAR" => (Recommendation::RejectClear, verdict.confidence),
        "REJECT_SUSPECTED" => (Recommendation::RejectSuspected, verdict.confidence),
        "REQUEST_MORE_INFO" => {
            tracing::warn!("REQUEST_MORE_INFO rewritten to REJECT_SUSPECTED");
            (
                Recommendation::RejectSuspected,
                if verdict.confidence > REWRITE_CAP_THRESHOLD {
                    NORMALIZED_CONFIDENCE_CAP
                } else {
                    verdict.confidence
                },
            )
        }
        other => {
            return Err(ReceiptError::Invalid(format!("unknown recommendation {other:?}")));
        }
    };

    Ok(ApprovalRecommendation {
        recommendation,
        confidence,
        reason: verdict.reason,
        risk_factors: verdict.risk_factors,
        positive_factors: verdict.positive_factors,
        model_name: model_name.to_string(),
        error: None,
    })
}

// ============================================================================
// Prompt
// ============================================================================

/// `15000` → `15,000`
fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

/// Full review prompt
pub fn build_prompt(request: &ApprovalRequest, policy: &str) -> String {
    let expense = &request.expense_data;
    let mut prompt = String::from(
        "당신은 회사의 지출 결재를 검토하는 AI 에이전트입니다.\n\
         다음 지출 내역과 영수증 정보를 종합적으로 분석하여 승인/반려를 판단하세요.\n\n",
    );

    let _ = write!(
        prompt,
        "[지출 내역 정보]\n- 지출 일자: {}\n- 가맹점명: {}\n- 금액: {}원\n- 카테고리: {}\n- 상세내용: {}\n\n",
        or_na(&expense.receipt_date),
        or_na(&expense.merchant),
        group_thousands(expense.amount.unwrap_or(0)),
        or_na(&expense.category),
        or_na(&expense.description),
    );

    match &request.receipt_extraction {
        Some(receipt) => {
            let _ = write!(
                prompt,
                "[영수증 OCR 추출 결과]\n- 영수증 날짜: {}\n- 영수증 가맹점명: {}\n- 영수증 금액: {}원\n\
                 - 영수증 카테고리: {}\n- 영수증 상세내용: {}\n- OCR 신뢰도: {:.1}%\n\n",
                or_na(&receipt.extracted_date),
                or_na(&receipt.extracted_merchant),
                group_thousands(receipt.extracted_amount.unwrap_or(0)),
                or_na(&receipt.extracted_category),
                or_na(&receipt.extracted_description),
                receipt.confidence.unwrap_or(0.0) * 100.0,
            );
        }
        None => prompt.push_str(
            "[영수증 OCR 추출 결과]\n- 영수증 정보 없음 (영수증이 업로드되지 않았거나 OCR 처리가 완료되지 않았습니다)\n\n",
        ),
    }

    let policy = if policy.trim().is_empty() {
        "규정 문서를 불러올 수 없습니다. 아래 기본 판단 기준을 따릅니다."
    } else {
        policy.trim()
    };
    let _ = write!(prompt, "[회사 지출 규정]\n{policy}\n\n");

    prompt.push_str(REVIEW_GUIDE);
    prompt
}

const REVIEW_GUIDE: &str = r#"[판단 기준]
1. 정보 일치성: 금액은 정확히, 날짜는 같은 날이어야 합니다. 가맹점명은 약간의 차이를 허용합니다. 카테고리가 영수증 내용과 맞는지 확인하세요.
2. 비정상 패턴: 과도한 금액, 반복되는 동일 지출, 개인 용도로 보이는 지출, 영수증 없는 고액 지출.
3. 영수증 신뢰도: OCR 신뢰도 70% 미만이면 REJECT_SUSPECTED. 영수증과 지출 내역이 명백히 다르면 REJECT_CLEAR.
   영수증이 없어도 5만원 이하의 적절한 카테고리(교통비, 간단한 식비)는 APPROVE 가능(신뢰도 0.6~0.7).
   영수증 없이 10만원 이상이거나 카테고리가 의심스러우면 REJECT_SUSPECTED(신뢰도 0.4~0.6).
4. 회사 정책: 업무와 무관한 개인 지출은 반려합니다.

[판단 결과]
- APPROVE: 정보가 모두 일치하고 정상적인 업무 지출. 신뢰도 0.7 이상 권장.
- REJECT_CLEAR: 명백한 불일치, 개인 용도, 규정 위반. 신뢰도 0.7 이상 권장.
- REJECT_SUSPECTED: 불확실하거나 추가 검토가 필요한 경우. 신뢰도 0.3~0.6 권장.
- REQUEST_MORE_INFO는 절대 사용하지 마세요.

[출력 형식]
다음 키를 가진 JSON 객체 하나만 출력하세요.
{"recommendation": "APPROVE | REJECT_CLEAR | REJECT_SUSPECTED", "confidence": 0.0~1.0, "reason": "상세한 판단 근거", "riskFactors": ["위험 요소"], "positiveFactors": ["긍정 요소"]}
모든 문장은 한국어로 작성하세요."#;

// ============================================================================
// Service
// ============================================================================

/// Expense review service
#[derive(Debug, Clone)]
pub struct ApprovalService {
    client: OpenAiClient,
    policy_path: Option<PathBuf>,
}

impl ApprovalService {
    pub fn new(client: OpenAiClient, policy_path: Option<PathBuf>) -> Self {
        Self { client, policy_path }
    }

    /// Policy text, or empty when no readable policy is configured
    async fn load_policy(&self) -> String {
        let Some(path) = &self.policy_path else {
            tracing::warn!("No expense policy configured");
            return String::new();
        };

        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                tracing::debug!(path = %path.display(), bytes = text.len(), "Expense policy loaded");
                text
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Expense policy unavailable");
                String::new()
            }
        }
    }

    /// Review one claim; never fails
    pub async fn recommend(&self, request: &ApprovalRequest) -> ApprovalRecommendation {
        tracing::info!(has_receipt = request.receipt_extraction.is_some(), "Approval review requested");

        let policy = self.load_policy().await;
        let prompt = build_prompt(request, &policy);
        let model = self.client.model();

        let answer = match self.client.complete(&prompt, REVIEW_TEMPERATURE).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "Approval review call failed");
                return ApprovalRecommendation::manual_review(
                    model,
                    format!("분석 중 오류 발생: {err}"),
                    "AI 분석 중 오류가 발생했습니다. 수동으로 검토해주세요.",
                    "AI 분석 실패",
                );
            }
        };
        tracing::debug!(answer = %answer.chars().take(300).collect::<String>(), "Approval review answer");

        match parse_verdict(&answer, model) {
            Ok(verdict) => {
                tracing::info!(
                    recommendation = ?verdict.recommendation,
                    confidence = verdict.confidence,
                    "Approval review complete"
                );
                verdict
            }
            Err(err) => {
                tracing::error!(error = %err, "Approval review answer unusable");
                ApprovalRecommendation::manual_review(
                    model,
                    format!("응답 파싱 중 오류 발생: {err}"),
                    "AI 분석 결과를 파싱하는 중 오류가 발생했습니다. 수동으로 검토해주세요.",
                    "AI 응답 파싱 실패",
                )
            }
        }
    }
}
