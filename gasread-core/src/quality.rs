//! Quality verdicts derived from a finished [`OcrResult`].

use crate::config::QualityConfig;
use crate::pipeline::OcrResult;
use serde::{Deserialize, Serialize};

/// Overall read quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Good,
    Low,
    Failed,
}

/// Primary verdict shown alongside a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub quality: QualityLevel,
    pub is_acceptable: bool,
    /// Advisory; nothing retries automatically
    pub should_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub confidence: f64,
}

/// Secondary diagnostic view that also weighs extraction completeness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Mean of the confidence, text and completeness sub-scores
    pub quality_score: f64,
    pub is_acceptable: bool,
    pub confidence: f64,
    pub metrics_found: usize,
    pub issues: Vec<String>,
}

/// Classify a result as failed, low or good
pub fn assess_quality(result: &OcrResult, config: &QualityConfig) -> QualityVerdict {
    let confidence = result.avg_confidence;

    if !result.success {
        return QualityVerdict {
            quality: QualityLevel::Failed,
            is_acceptable: false,
            should_retry: true,
            recommendation: Some(
                result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Could not read image.".to_string()),
            ),
            confidence,
        };
    }

    if confidence < config.low_confidence_threshold {
        return QualityVerdict {
            quality: QualityLevel::Low,
            is_acceptable: false,
            should_retry: true,
            recommendation: Some(low_confidence_message(confidence)),
            confidence,
        };
    }

    QualityVerdict {
        quality: QualityLevel::Good,
        is_acceptable: true,
        should_retry: false,
        recommendation: None,
        confidence,
    }
}

/// Score confidence, text presence and metric completeness together
pub fn quality_report(result: &OcrResult, config: &QualityConfig) -> QualityReport {
    let confidence = result.avg_confidence.clamp(0.0, 1.0);
    let has_text = !result.ocr_text.trim().is_empty();
    let metrics_found = result.key_metrics.len();
    let expected = config.expected_metrics.max(1);

    let text_score = if has_text { 1.0 } else { 0.0 };
    let metrics_score = (metrics_found as f64 / expected as f64).min(1.0);
    let quality_score = (confidence + text_score + metrics_score) / 3.0;

    let mut issues = Vec::new();
    if confidence < config.issue_confidence {
        issues.push(format!("Low OCR confidence ({:.0}%)", confidence * 100.0));
    }
    if !has_text {
        issues.push("No text extracted".to_string());
    }
    if metrics_found < expected {
        issues.push(format!(
            "Few metrics extracted ({metrics_found} of {expected} expected)"
        ));
    }

    QualityReport {
        quality_score,
        is_acceptable: quality_score >= config.acceptable_score,
        confidence,
        metrics_found,
        issues,
    }
}

pub(crate) fn low_confidence_message(confidence: f64) -> String {
    format!(
        "OCR confidence is low ({:.0}%). Please take a clearer photo with better lighting.",
        confidence * 100.0
    )
}
