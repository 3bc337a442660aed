//! Receipt OCR through a vision model
//!
//! The uploaded image is shrunk to at most 1024 px wide, re-encoded as JPEG
//! and sent with an extraction prompt. The answer must be a JSON object that
//! matches [`ReceiptExtraction`] exactly; anything else is reported as an
//! `{error}` outcome.

use image::imageops::FilterType;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Cursor;
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorInfo};
use crate::llm::{extract_object, LlmError, OpenAiClient};

/// Widest image sent to the vision model
pub const MAX_IMAGE_WIDTH: u32 = 1024;

// ============================================================================
// Errors
// ============================================================================

/// Errors from receipt OCR and expense review
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("Image could not be processed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model answer could not be parsed: {0}")]
    Parse(String),

    #[error("Model answer out of range: {0}")]
    Invalid(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ErrorInfo for ReceiptError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_recoverable(),
            Self::Parse(_) | Self::Invalid(_) | Self::Task(_) => true,
            Self::Image(_) => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Image(_) => "이미지를 처리할 수 없습니다".to_string(),
            Self::Llm(e) => e.localized_desc(),
            Self::Parse(_) | Self::Invalid(_) => "AI 응답을 해석할 수 없습니다".to_string(),
            Self::Task(_) => "작업 처리 중 오류가 발생했습니다".to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Image(_) | Self::Invalid(_) => ErrorCategory::Validation,
            Self::Llm(e) => e.category(),
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Task(_) => ErrorCategory::Other,
        }
    }
}

// ============================================================================
// Result types
// ============================================================================

/// Expense category (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    #[serde(rename = "식비")]
    Meals,
    #[serde(rename = "교통비")]
    Transport,
    #[serde(rename = "비품")]
    Supplies,
    #[serde(rename = "기타")]
    Other,
}

/// Fields read off a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptExtraction {
    pub extracted_merchant: String,
    /// Total in KRW
    pub extracted_amount: i64,
    /// `YYYY-MM-DD`, or `알 수 없음`
    pub extracted_date: String,
    pub extracted_category: ExpenseCategory,
    /// Purchased items, comma separated
    pub extracted_description: String,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f64,
    /// Every piece of text on the receipt
    pub extracted_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl ReceiptExtraction {
    /// Parse and validate a model answer
    pub fn from_model_answer(answer: &str) -> Result<Self, ReceiptError> {
        let object = extract_object(answer).map_err(|e| ReceiptError::Parse(e.to_string()))?;
        let extraction: Self = serde_json::from_value(Value::Object(object))
            .map_err(|e| ReceiptError::Parse(e.to_string()))?;

        if !(0.0..=1.0).contains(&extraction.confidence) {
            return Err(ReceiptError::Invalid(format!(
                "confidence {} is outside [0, 1]",
                extraction.confidence
            )));
        }
        Ok(extraction)
    }
}

/// Body of `POST /api/ai/receipt/extract`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReceiptOutcome {
    Extracted(ReceiptExtraction),
    Failed { error: String },
}

// ============================================================================
// Image preparation
// ============================================================================

/// Decode, shrink to [`MAX_IMAGE_WIDTH`] keeping the aspect ratio, re-encode as JPEG
pub fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>, ReceiptError> {
    let mut img = image::load_from_memory(bytes)?;

    if img.width() > MAX_IMAGE_WIDTH {
        let ratio = f64::from(MAX_IMAGE_WIDTH) / f64::from(img.width());
        let height = ((f64::from(img.height()) * ratio) as u32).max(1);
        img = img.resize_exact(MAX_IMAGE_WIDTH, height, FilterType::Triangle);
    }

    let mut jpeg = Vec::new();
    image::DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    Ok(jpeg)
}

// ============================================================================
// Service
// ============================================================================

const EXTRACTION_PROMPT: &str = r#"이 영수증 이미지를 정밀하게 분석하여 아래 정보를 JSON 객체 하나로만 출력하세요.

[추출 항목]
- extractedMerchant (문자열): 상호명, 매장명, 지점명을 모두 포함한 가맹점 이름. 예: "7-ELEVEN 강남제일점", "스타벅스 강남점"
- extractedAmount (정수): 총 결제 금액, 숫자만. 예: "15,000원" → 15000
- extractedDate (문자열): 결제일, YYYY-MM-DD 형식. 예: "2024.01.15" → "2024-01-15"
- extractedCategory (문자열): 식비, 교통비, 비품, 기타 중 하나
  * 식비: 음식점, 카페, 배달
  * 교통비: 택시, 버스, 지하철, 주유소
  * 비품: 문구점, 편의점, 마트
  * 기타: 그 밖의 경우
- extractedDescription (문자열): 구매한 모든 상품명을 쉼표로 구분. 수량과 금액은 제외. 예: "삼각김밥, 콜라, 라면"
- confidence (실수): 인식 신뢰도, 0.0 ~ 1.0
- extractedJson (문자열): 주소, 품목, 전화번호, 사업자번호를 포함한 영수증의 모든 텍스트를 원문 그대로

[규칙]
- 작은 글씨도 빠짐없이 읽고, 모호한 글자는 주변 맥락으로 추론하세요.
- 금액에서 콤마와 통화 기호를 제거하세요. 금액이 불명확하면 0.
- 날짜, 가맹점명, 상품명이 불명확하면 "알 수 없음".
- 카테고리는 반드시 식비, 교통비, 비품, 기타 중 하나만 사용하세요.

JSON 객체만 출력하세요."#;

/// Receipt OCR service
#[derive(Debug, Clone)]
pub struct ReceiptService {
    client: OpenAiClient,
}

impl ReceiptService {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Run OCR and fold every failure into [`ReceiptOutcome::Failed`]
    pub async fn analyze(&self, image: Vec<u8>) -> ReceiptOutcome {
        tracing::info!(bytes = image.len(), "Receipt OCR requested");

        let jpeg = match tokio::task::spawn_blocking(move || prepare_image(&image)).await {
            Ok(Ok(jpeg)) => jpeg,
            Ok(Err(err)) => return Self::failed("이미지 처리 중 오류 발생", &err),
            Err(err) => return Self::failed("이미지 처리 중 오류 발생", &ReceiptError::Task(err.to_string())),
        };
        tracing::debug!(bytes = jpeg.len(), "Receipt image prepared");

        match self.extract(&jpeg).await {
            Ok(extraction) => {
                tracing::info!(
                    merchant = %extraction.extracted_merchant,
                    amount = extraction.extracted_amount,
                    date = %extraction.extracted_date,
                    "Receipt extracted"
                );
                ReceiptOutcome::Extracted(extraction)
            }
            Err(err) => Self::failed("OpenAI 분석 중 오류 발생", &err),
        }
    }

    /// OCR an already prepared JPEG
    pub async fn extract(&self, jpeg: &[u8]) -> Result<ReceiptExtraction, ReceiptError> {
        let answer = self
            .client
            .complete_with_image(EXTRACTION_PROMPT, jpeg, 0.0)
            .await?;

        let mut extraction = ReceiptExtraction::from_model_answer(&answer)?;
        extraction.model_name = Some(self.client.model().to_string());
        Ok(extraction)
    }

    fn failed(context: &str, err: &ReceiptError) -> ReceiptOutcome {
        tracing::error!(error = %err, "{context}");
        ReceiptOutcome::Failed {
            error: format!("{context}: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    const ANSWER: &str = r#"```json
{
  "extractedMerchant": "스타벅스 강남점",
  "extractedAmount": 12500,
  "extractedDate": "2025-01-15",
  "extractedCategory": "식비",
  "extractedDescription": "아메리카노, 크로와상",
  "confidence": 0.93,
  "extractedJson": "스타벅스 강남점\n아메리카노 4,500"
}
```"#;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_parses_fenced_answer() {
        let extraction = ReceiptExtraction::from_model_answer(ANSWER).unwrap();
        assert_eq!(extraction.extracted_merchant, "스타벅스 강남점");
        assert_eq!(extraction.extracted_amount, 12500);
        assert_eq!(extraction.extracted_category, ExpenseCategory::Meals);
        assert!(extraction.model_name.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let answer = ANSWER.replace("0.93", "1.4");
        assert!(matches!(
            ReceiptExtraction::from_model_answer(&answer),
            Err(ReceiptError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_category() {
        let answer = ANSWER.replace("식비", "유흥비");
        assert!(matches!(
            ReceiptExtraction::from_model_answer(&answer),
            Err(ReceiptError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_prose() {
        assert!(ReceiptExtraction::from_model_answer("영수증을 읽을 수 없습니다").is_err());
    }

    #[test]
    fn test_wide_images_are_shrunk() {
        let jpeg = prepare_image(&png(2048, 1000)).unwrap();
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (1024, 500));
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_narrow_images_keep_size() {
        let jpeg = prepare_image(&png(640, 480)).unwrap();
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (640, 480));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(matches!(prepare_image(b"not an image"), Err(ReceiptError::Image(_))));
    }

    #[test]
    fn test_failed_outcome_serializes_as_error_object() {
        let outcome = ReceiptOutcome::Failed { error: "boom".into() };
        assert_eq!(serde_json::to_value(outcome).unwrap(), serde_json::json!({"error": "boom"}));
    }
}
