//! Multi-pass selection.
//!
//! Every variant is recognized under every configured page segmentation
//! mode. Each pass is scored `10 × distinct metrics + avg_confidence`, so a
//! single extra metric outweighs any confidence difference. The highest
//! score wins and ties keep the earlier trial, unless the earlier trial read
//! no text at all and the later one did.

use crate::error::{OcrError, Result};
use crate::metrics::{extract_metrics, ExtractionResult};
use crate::ocr::{run_pass, split_lines, OcrPassResult, OcrProvider, PageSegmentationMode, PassConfig};
use crate::preprocess::PreprocessVariant;
use std::time::Instant;
use tracing::{debug, warn};

/// Weight of one extracted metric relative to the `[0, 1]` confidence
pub const METRIC_WEIGHT: f64 = 10.0;

/// Outcome of one trial, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub variant: String,
    pub psm: PageSegmentationMode,
    /// `None` when the engine failed on this trial
    pub score: Option<f64>,
    pub metrics: usize,
}

/// The winning pass and how it got there
#[derive(Debug, Clone)]
pub struct Selection {
    pub best: OcrPassResult,
    pub metrics: ExtractionResult,
    pub score: f64,
    /// Every trial in the order it ran
    pub trials: Vec<TrialSummary>,
    /// Set when every trial failed and the raw fallback produced the result
    pub fallback: bool,
}

/// Score of a pass given its extraction
pub fn score(metrics: &ExtractionResult, avg_confidence: f64) -> f64 {
    METRIC_WEIGHT * metrics.len() as f64 + avg_confidence
}

/// Run every variant under every mode and keep the best.
///
/// `variants` run in the order given, each under `modes` in order. When no
/// trial succeeds, one plain-text pass over the first variant is attempted
/// with confidence `0.0`; its failure is the only error returned.
pub fn select_best(
    provider: &dyn OcrProvider,
    variants: &[PreprocessVariant],
    modes: &[PageSegmentationMode],
    base: &PassConfig,
) -> Result<Selection> {
    let mut best: Option<(OcrPassResult, ExtractionResult, f64)> = None;
    let mut trials = Vec::with_capacity(variants.len() * modes.len());
    let mut last_error = None;

    for variant in variants {
        for &psm in modes {
            let pass = base.clone().with_psm(psm);
            match run_pass(provider, variant, &pass) {
                Ok(result) => {
                    let metrics = extract_metrics(&result.lines);
                    let pass_score = score(&metrics, result.avg_confidence);
                    debug!(
                        variant = %variant.kind,
                        psm = psm.to_psm_value(),
                        metrics = metrics.len(),
                        confidence = result.avg_confidence,
                        score = pass_score,
                        elapsed_ms = result.elapsed_ms,
                        "OCR pass finished"
                    );
                    trials.push(TrialSummary {
                        variant: variant.kind.to_string(),
                        psm,
                        score: Some(pass_score),
                        metrics: metrics.len(),
                    });

                    let better = best.as_ref().map_or(true, |(current, _, current_score)| {
                        pass_score > *current_score
                            || (pass_score == *current_score
                                && current.text.is_empty()
                                && !result.text.is_empty())
                    });
                    if better {
                        best = Some((result, metrics, pass_score));
                    }
                }
                Err(e) => {
                    warn!(variant = %variant.kind, psm = psm.to_psm_value(), "OCR pass failed: {e}");
                    trials.push(TrialSummary {
                        variant: variant.kind.to_string(),
                        psm,
                        score: None,
                        metrics: 0,
                    });
                    last_error = Some(e);
                }
            }
        }
    }

    if let Some((best, metrics, score)) = best {
        return Ok(Selection {
            best,
            metrics,
            score,
            trials,
            fallback: false,
        });
    }

    let Some(first) = variants.first() else {
        return Err(OcrError::Engine("no preprocessing variants to recognize".to_string()));
    };
    warn!(
        variant = %first.kind,
        last_error = ?last_error.as_ref().map(|e| e.to_string()),
        "All OCR passes failed, trying a raw pass"
    );
    let best = raw_pass(provider, first, base)?;
    let metrics = extract_metrics(&best.lines);
    let score = score(&metrics, best.avg_confidence);
    Ok(Selection {
        best,
        metrics,
        score,
        trials,
        fallback: true,
    })
}

/// Plain-text recognition with automatic segmentation and no confidence
fn raw_pass(
    provider: &dyn OcrProvider,
    variant: &PreprocessVariant,
    base: &PassConfig,
) -> Result<OcrPassResult> {
    let started = Instant::now();
    let pass = base.clone().with_psm(PageSegmentationMode::Auto);
    let text = provider.recognize_text(&variant.image, &pass)?;
    let text = text.trim().to_string();
    Ok(OcrPassResult {
        lines: split_lines(&text),
        text,
        blocks: Vec::new(),
        avg_confidence: 0.0,
        variant: variant.kind,
        psm: pass.psm,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}
