//! One engine invocation over one variant.

use super::{OcrProvider, PageSegmentationMode, PassConfig, RawWord, TextBlock};
use crate::error::Result;
use crate::preprocess::{PreprocessVariant, VariantKind};
use std::collections::BTreeMap;
use std::time::Instant;

/// Normalized output of a single pass
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPassResult {
    pub text: String,
    pub blocks: Vec<TextBlock>,
    /// Mean block confidence in `[0, 1]`; `0.0` without blocks
    pub avg_confidence: f64,
    pub lines: Vec<String>,
    pub variant: VariantKind,
    pub psm: PageSegmentationMode,
    pub elapsed_ms: u64,
}

/// Run `provider` once on `variant` with `pass`.
///
/// Tokens with empty text or non-positive confidence are dropped from the
/// text, the block list and the average. When nothing survives, the text
/// comes from the engine's plain-string output instead.
pub fn run_pass(
    provider: &dyn OcrProvider,
    variant: &PreprocessVariant,
    pass: &PassConfig,
) -> Result<OcrPassResult> {
    let started = Instant::now();
    let words = provider.recognize_words(&variant.image, pass)?;

    let kept: Vec<&RawWord> = words
        .iter()
        .filter(|w| w.confidence > 0.0 && !w.text.trim().is_empty())
        .collect();

    let blocks: Vec<TextBlock> = kept
        .iter()
        .map(|w| TextBlock {
            text: w.text.trim().to_string(),
            confidence: normalize_confidence(w.confidence),
            bbox: w.bbox,
        })
        .collect();

    let avg_confidence = if blocks.is_empty() {
        0.0
    } else {
        blocks.iter().map(|b| b.confidence).sum::<f64>() / blocks.len() as f64
    };

    let text = if kept.is_empty() {
        provider.recognize_text(&variant.image, pass)?
    } else {
        group_lines(&kept).join("\n")
    };
    let lines = split_lines(&text);

    Ok(OcrPassResult {
        text: text.trim().to_string(),
        blocks,
        avg_confidence,
        lines,
        variant: variant.kind,
        psm: pass.psm,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Engine scale (0-100) to `[0, 1]`
pub(crate) fn normalize_confidence(confidence: f32) -> f64 {
    (f64::from(confidence) / 100.0).clamp(0.0, 1.0)
}

/// Trimmed, non-empty lines of `text`
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn group_lines(words: &[&RawWord]) -> Vec<String> {
    let mut lines: BTreeMap<_, Vec<&str>> = BTreeMap::new();
    for word in words {
        lines.entry(word.line).or_default().push(word.text.trim());
    }
    lines.into_values().map(|tokens| tokens.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BoundingBox, LineKey, MockOcrProvider, MockResponse};
    use image::GrayImage;

    fn variant() -> PreprocessVariant {
        PreprocessVariant {
            kind: VariantKind::Clahe,
            image: GrayImage::new(32, 32),
            steps: vec!["grayscale"],
        }
    }

    fn word(text: &str, confidence: f32, line: u32) -> RawWord {
        RawWord {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(0, line * 20, 10, 10),
            line: LineKey {
                block: 1,
                paragraph: 1,
                line,
            },
        }
    }

    #[test]
    fn test_filters_unconfident_tokens() {
        let provider = MockOcrProvider::from_response(MockResponse::words(vec![
            word("pH", 95.0, 1),
            word("7.40", 85.0, 1),
            word("~", -1.0, 1),
            word("", 50.0, 2),
            word("Na", 0.0, 2),
            word("K", 60.0, 2),
        ]));

        let pass = run_pass(&provider, &variant(), &PassConfig::default()).unwrap();
        assert_eq!(pass.blocks.len(), 3);
        assert_eq!(pass.text, "pH 7.40\nK");
        assert_eq!(pass.lines, vec!["pH 7.40", "K"]);
        assert!((pass.avg_confidence - 0.8).abs() < 1e-9);
        assert_eq!(pass.variant, VariantKind::Clahe);
        assert_eq!(pass.psm, PageSegmentationMode::SingleColumn);
    }

    #[test]
    fn test_lines_follow_layout_numbering() {
        let mut second_block = word("Na", 90.0, 1);
        second_block.line.block = 2;
        let provider = MockOcrProvider::from_response(MockResponse::words(vec![
            second_block,
            word("pH", 90.0, 1),
            word("7.35", 90.0, 1),
        ]));
        let pass = run_pass(&provider, &variant(), &PassConfig::default()).unwrap();
        assert_eq!(pass.lines, vec!["pH 7.35", "Na"]);
    }

    #[test]
    fn test_plain_text_fallback() {
        let provider = MockOcrProvider::from_response(MockResponse::text_only("  pH 7.31\n\n  HCO3 22 \n"));
        let pass = run_pass(&provider, &variant(), &PassConfig::default()).unwrap();
        assert!(pass.blocks.is_empty());
        assert_eq!(pass.avg_confidence, 0.0);
        assert_eq!(pass.text, "pH 7.31\n\n  HCO3 22");
        assert_eq!(pass.lines, vec!["pH 7.31", "HCO3 22"]);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let provider = MockOcrProvider::from_response(MockResponse::failure("engine died"));
        assert!(run_pass(&provider, &variant(), &PassConfig::default()).is_err());
    }

    #[test]
    fn test_confidence_normalization_is_clamped() {
        assert!((normalize_confidence(96.0) - 0.96).abs() < 1e-6);
        assert_eq!(normalize_confidence(150.0), 1.0);
        assert_eq!(normalize_confidence(-3.0), 0.0);
    }
}
