use super::{BoundingBox, LineKey, OcrEngine, OcrProvider, PassConfig, RawWord};
use crate::error::{OcrError, Result};
use image::GrayImage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted output for one structured pass and its plain-text fallback
#[derive(Debug, Clone)]
pub struct MockResponse {
    words: std::result::Result<Vec<RawWord>, String>,
    text: std::result::Result<String, String>,
    panic: bool,
}

impl MockResponse {
    /// Each line becomes one engine line, split into words at whitespace,
    /// every word reported with `confidence` (0-100)
    pub fn lines(lines: &[&str], confidence: f32) -> Self {
        Self {
            words: Ok(words_from_lines(lines, confidence)),
            text: Ok(lines.join("\n")),
            panic: false,
        }
    }

    /// Explicit token list; the plain text is the tokens joined by spaces
    pub fn words(words: Vec<RawWord>) -> Self {
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            words: Ok(words),
            text: Ok(text),
            panic: false,
        }
    }

    /// No structured tokens, only plain text
    pub fn text_only(text: &str) -> Self {
        Self {
            words: Ok(Vec::new()),
            text: Ok(text.to_string()),
            panic: false,
        }
    }

    /// Both calls fail
    pub fn failure(message: &str) -> Self {
        Self {
            words: Err(message.to_string()),
            text: Err(message.to_string()),
            panic: false,
        }
    }

    /// Structured recognition fails, plain extraction still works
    pub fn structured_failure(message: &str, text: &str) -> Self {
        Self {
            words: Err(message.to_string()),
            text: Ok(text.to_string()),
            panic: false,
        }
    }

    /// The engine panics mid-pass
    pub fn panic() -> Self {
        Self {
            words: Err("panic".to_string()),
            text: Err("panic".to_string()),
            panic: true,
        }
    }
}

/// Mock OCR provider for testing and development.
///
/// Serves scripted responses in call order, then repeats the default
/// response. The plain-text call answers from the response served to the
/// latest structured call.
///
/// ```rust
/// use gasread::ocr::{MockOcrProvider, MockResponse, OcrProvider, PassConfig};
/// use image::GrayImage;
///
/// let provider = MockOcrProvider::new()
///     .with_script(vec![MockResponse::failure("blurred"), MockResponse::lines(&["Na 140"], 80.0)]);
/// let image = GrayImage::new(32, 32);
/// let pass = PassConfig::default();
///
/// assert!(provider.recognize_words(&image, &pass).is_err());
/// assert_eq!(provider.recognize_words(&image, &pass).unwrap().len(), 2);
/// ```
pub struct MockOcrProvider {
    default: MockResponse,
    script: Mutex<VecDeque<MockResponse>>,
    current: Mutex<Option<MockResponse>>,
    processing_delay: Duration,
    calls: AtomicUsize,
}

impl MockOcrProvider {
    /// A provider that reads a short blood-gas printout at 90 % confidence
    pub fn new() -> Self {
        Self::from_response(MockResponse::lines(
            &["pH 7.40", "pCO2 40 mmHg", "pO2 95 mmHg", "HCO3 24"],
            90.0,
        ))
    }

    /// Always answer with `lines` at `confidence` (0-100)
    pub fn with_lines(lines: &[&str], confidence: f32) -> Self {
        Self::from_response(MockResponse::lines(lines, confidence))
    }

    pub fn from_response(response: MockResponse) -> Self {
        Self {
            default: response,
            script: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            processing_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Responses served, in order, before falling back to the default
    pub fn with_script(self, script: Vec<MockResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..self
        }
    }

    /// Simulated engine latency per call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    /// Structured calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<MockResponse> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| OcrError::Engine(format!("Failed to acquire lock: {e}")))?;
        Ok(script.pop_front().unwrap_or_else(|| self.default.clone()))
    }

    fn simulate_work(&self) {
        if !self.processing_delay.is_zero() {
            std::thread::sleep(self.processing_delay);
        }
    }
}

impl Default for MockOcrProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrProvider for MockOcrProvider {
    fn recognize_words(&self, _image: &GrayImage, _pass: &PassConfig) -> Result<Vec<RawWord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_work();

        let response = self.next_response()?;
        if let Ok(mut current) = self.current.lock() {
            *current = Some(response.clone());
        }
        if response.panic {
            panic!("mock engine crashed");
        }
        response.words.map_err(OcrError::Engine)
    }

    fn recognize_text(&self, _image: &GrayImage, _pass: &PassConfig) -> Result<String> {
        let current = self
            .current
            .lock()
            .map_err(|e| OcrError::Engine(format!("Failed to acquire lock: {e}")))?
            .clone();
        let response = match current {
            Some(response) => response,
            None => self.next_response()?,
        };
        response.text.map_err(OcrError::Engine)
    }

    fn engine_name(&self) -> &str {
        "Mock OCR"
    }

    fn engine_type(&self) -> OcrEngine {
        OcrEngine::Mock
    }
}

fn words_from_lines(lines: &[&str], confidence: f32) -> Vec<RawWord> {
    let mut words = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let mut left = 10u32;
        for token in line.split_whitespace() {
            let width = 12 * token.chars().count() as u32;
            words.push(RawWord {
                text: token.to_string(),
                confidence,
                bbox: BoundingBox::new(left, 10 + 30 * line_idx as u32, width, 24),
                line: LineKey {
                    block: 1,
                    paragraph: 1,
                    line: line_idx as u32 + 1,
                },
            });
            left += width + 12;
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> GrayImage {
        GrayImage::new(16, 16)
    }

    #[test]
    fn test_mock_provider_default() {
        let provider = MockOcrProvider::new();
        let words = provider.recognize_words(&image(), &PassConfig::default()).unwrap();
        assert_eq!(words.len(), 10);
        assert!(words.iter().all(|w| w.confidence == 90.0));
        assert_eq!(words[0].text, "pH");
        assert_eq!(words.last().unwrap().line.line, 4);
        assert_eq!(provider.engine_name(), "Mock OCR");
        assert_eq!(provider.engine_type(), OcrEngine::Mock);
    }

    #[test]
    fn test_script_then_default() {
        let provider = MockOcrProvider::with_lines(&["K 4.1"], 70.0).with_script(vec![
            MockResponse::failure("first"),
            MockResponse::text_only("Na 140"),
        ]);
        let pass = PassConfig::default();

        assert!(provider.recognize_words(&image(), &pass).is_err());
        assert!(provider.recognize_text(&image(), &pass).is_err());

        assert!(provider.recognize_words(&image(), &pass).unwrap().is_empty());
        assert_eq!(provider.recognize_text(&image(), &pass).unwrap(), "Na 140");

        let words = provider.recognize_words(&image(), &pass).unwrap();
        assert_eq!(words[0].text, "K");
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_structured_failure_keeps_text() {
        let provider = MockOcrProvider::from_response(MockResponse::structured_failure(
            "tsv broken",
            "Cl 104",
        ));
        let pass = PassConfig::default();
        assert!(provider.recognize_words(&image(), &pass).is_err());
        assert_eq!(provider.recognize_text(&image(), &pass).unwrap(), "Cl 104");
    }

    #[test]
    fn test_word_boxes_advance() {
        let words = words_from_lines(&["ctHb 14.2 g/dL"], 85.0);
        assert_eq!(words.len(), 3);
        assert!(words[1].bbox.x > words[0].bbox.x);
        assert_eq!(words[0].bbox.width, 48);
    }

    #[test]
    #[should_panic(expected = "mock engine crashed")]
    fn test_panic_response() {
        let provider = MockOcrProvider::from_response(MockResponse::panic());
        let _ = provider.recognize_words(&image(), &PassConfig::default());
    }
}
