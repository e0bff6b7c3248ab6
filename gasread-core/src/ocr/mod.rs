//! Recognition engine abstraction.
//!
//! Every backend implements [`OcrProvider`] and returns raw engine tokens
//! ([`RawWord`]) with the engine's native 0-100 confidence scale. The
//! [`runner`] turns those tokens into a normalized [`OcrPassResult`].
//!
//! Backends shipped with the crate:
//!
//! - [`TesseractCliProvider`]: drives the `tesseract` binary, always built
//! - [`TesseractOcrProvider`]: in-process libtesseract, behind the `tesseract` feature
//! - [`MockOcrProvider`]: scripted output for tests and benchmarks
//!
//! # Example
//!
//! ```rust
//! use gasread::ocr::{MockOcrProvider, OcrProvider, PassConfig};
//! use image::GrayImage;
//!
//! let provider = MockOcrProvider::with_lines(&["pH 7.40", "pCO2 40 mmHg"], 91.0);
//! let image = GrayImage::new(64, 64);
//! let words = provider.recognize_words(&image, &PassConfig::default()).unwrap();
//! assert_eq!(words.len(), 5);
//! ```

mod mock;
pub mod runner;
mod tesseract_cli;
mod tesseract_provider;
pub(crate) mod tsv;

pub use mock::{MockOcrProvider, MockResponse};
pub use runner::{run_pass, split_lines, OcrPassResult};
pub use tesseract_cli::TesseractCliProvider;
pub use tesseract_provider::TesseractOcrProvider;

use crate::config::EngineConfig;
use crate::error::{OcrError, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Pixel rectangle of a recognized token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One recognized token with a normalized confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Always in `[0, 1]`, whatever the engine scale
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Position of a token in the engine's layout hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineKey {
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
}

/// Token exactly as the engine reported it
#[derive(Debug, Clone, PartialEq)]
pub struct RawWord {
    pub text: String,
    /// Engine-native confidence, 0-100. Non-positive means "not a word".
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub line: LineKey,
}

/// Supported recognition backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngine {
    /// Scripted provider used in tests
    Mock,
    /// `tesseract` command-line binary
    TesseractCli,
    /// In-process libtesseract
    Tesseract,
}

impl OcrEngine {
    pub fn name(&self) -> &'static str {
        match self {
            OcrEngine::Mock => "Mock OCR",
            OcrEngine::TesseractCli => "Tesseract (command line)",
            OcrEngine::Tesseract => "Tesseract",
        }
    }
}

impl std::fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Page Segmentation Mode for Tesseract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentationMode {
    /// Orientation and script detection (OSD) only
    OsdOnly = 0,
    /// Automatic page segmentation with OSD
    AutoOsd = 1,
    /// Automatic page segmentation, but no OSD, or OCR
    AutoOnly = 2,
    /// Fully automatic page segmentation, but no OSD
    Auto = 3,
    /// Assume a single column of text of variable sizes (default)
    SingleColumn = 4,
    /// Assume a single uniform block of vertically aligned text
    SingleBlockVertical = 5,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Treat the image as a single word
    SingleWord = 8,
    /// Treat the image as a single word in a circle
    CircleWord = 9,
    /// Treat the image as a single character
    SingleChar = 10,
    /// Sparse text. Find as much text as possible in no particular order
    SparseText = 11,
    /// Sparse text with OSD
    SparseTextOsd = 12,
    /// Raw line. Treat the image as a single text line, bypassing hacks
    RawLine = 13,
}

impl Default for PageSegmentationMode {
    fn default() -> Self {
        PageSegmentationMode::SingleColumn
    }
}

impl PageSegmentationMode {
    /// Convert to Tesseract PSM value
    pub fn to_psm_value(self) -> u8 {
        self as u8
    }

    pub fn from_psm_value(value: u8) -> Option<Self> {
        use PageSegmentationMode::*;
        let mode = match value {
            0 => OsdOnly,
            1 => AutoOsd,
            2 => AutoOnly,
            3 => Auto,
            4 => SingleColumn,
            5 => SingleBlockVertical,
            6 => SingleBlock,
            7 => SingleLine,
            8 => SingleWord,
            9 => CircleWord,
            10 => SingleChar,
            11 => SparseText,
            12 => SparseTextOsd,
            13 => RawLine,
            _ => return None,
        };
        Some(mode)
    }

    /// Whether the mode produces recognized text at all
    pub fn recognizes_text(self) -> bool {
        !matches!(
            self,
            PageSegmentationMode::OsdOnly | PageSegmentationMode::AutoOnly
        )
    }
}

/// OCR Engine Mode for Tesseract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineMode {
    /// Legacy engine only
    LegacyOnly = 0,
    /// Neural nets LSTM engine only
    LstmOnly = 1,
    /// Legacy + LSTM engines
    LegacyLstm = 2,
    /// Based on what is available
    Default = 3,
}

impl Default for OcrEngineMode {
    fn default() -> Self {
        OcrEngineMode::LstmOnly
    }
}

impl OcrEngineMode {
    /// Convert to Tesseract OEM value
    pub fn to_oem_value(self) -> u8 {
        self as u8
    }
}

/// Settings for a single engine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PassConfig {
    /// Tesseract language code (already normalized)
    pub language: String,
    pub psm: PageSegmentationMode,
    pub oem: OcrEngineMode,
    /// Restrict recognition to these characters
    pub char_whitelist: Option<String>,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            psm: PageSegmentationMode::default(),
            oem: OcrEngineMode::default(),
            char_whitelist: None,
        }
    }
}

impl PassConfig {
    /// Pass settings for `language` (any accepted alias) under `psm`
    pub fn new(engine: &EngineConfig, language: &str, psm: PageSegmentationMode) -> Self {
        Self {
            language: normalize_language(language),
            psm,
            oem: engine.engine_mode,
            char_whitelist: engine.char_whitelist.clone(),
        }
    }

    pub fn with_psm(mut self, psm: PageSegmentationMode) -> Self {
        self.psm = psm;
        self
    }
}

/// Map user-facing language names onto Tesseract codes.
///
/// Unknown values are assumed to already be Tesseract codes and pass through.
pub fn normalize_language(language: &str) -> String {
    let trimmed = language.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "en" | "english" => "eng".to_string(),
        "ar" | "arabic" => "ara".to_string(),
        "en+ar" | "ar+en" | "multilingual" => "eng+ara".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Recognition backend.
///
/// Implementations must be safe to share between worker threads; any
/// per-engine initialization happens lazily and at most once.
pub trait OcrProvider: Send + Sync {
    /// Run structured recognition and return every token the engine reports,
    /// including the ones it gave no confidence to
    fn recognize_words(&self, image: &GrayImage, pass: &PassConfig) -> Result<Vec<RawWord>>;

    /// Plain string extraction with the same settings as [`Self::recognize_words`]
    fn recognize_text(&self, image: &GrayImage, pass: &PassConfig) -> Result<String>;

    /// Name reported in results (e.g. `"tesseract_medical"`)
    fn engine_name(&self) -> &str;

    fn engine_type(&self) -> OcrEngine;

    /// Verify the backend can run; the default assumes it can
    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Encode a grayscale buffer as PNG for engines that take encoded input
pub(crate) fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| OcrError::Engine(format!("Failed to encode variant as PNG: {e}")))?;
    Ok(buffer.into_inner())
}
