//! In-process libtesseract backend.
//!
//! Requires the `tesseract` cargo feature and the tesseract/leptonica
//! development libraries:
//!
//! ```bash
//! sudo apt-get install libtesseract-dev libleptonica-dev clang
//! cargo build --features tesseract
//! ```
//!
//! Without the feature, [`TesseractOcrProvider::new`] reports the engine as
//! unavailable.

use super::{OcrEngine, OcrProvider, PassConfig, RawWord};
use crate::error::{OcrError, Result};
use image::GrayImage;

#[cfg(feature = "tesseract")]
use super::{encode_png, tsv, OcrEngineMode, PageSegmentationMode};
#[cfg(feature = "tesseract")]
use tesseract::Tesseract;
#[cfg(feature = "tesseract")]
use tracing::debug;

/// Tesseract OCR provider linked against libtesseract
pub struct TesseractOcrProvider {
    name: String,
}

#[cfg(feature = "tesseract")]
impl TesseractOcrProvider {
    /// Create the provider after checking that English data loads.
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::EngineUnavailable`] if libtesseract cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        Self::check_installation()?;
        Ok(Self {
            name: "tesseract_medical".to_string(),
        })
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check if Tesseract is available and properly installed
    pub fn check_installation() -> Result<()> {
        Tesseract::new(None, Some("eng"))
            .map(|_| ())
            .map_err(|e| OcrError::EngineUnavailable(format!("Tesseract not available: {e}")))
    }

    /// Initialize an engine for `pass` and recognize `image`.
    ///
    /// libtesseract handles are not shareable between threads, so every
    /// pass gets its own.
    fn recognize(image: &GrayImage, pass: &PassConfig) -> Result<Tesseract> {
        let png = encode_png(image)?;

        let mut tesseract = Tesseract::new_with_oem(None, Some(&pass.language), engine_mode(pass.oem))
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "Failed to initialize Tesseract for '{}': {e}",
                    pass.language
                ))
            })?;
        tesseract.set_page_seg_mode(segmentation_mode(pass.psm));

        if let Some(whitelist) = &pass.char_whitelist {
            tesseract = tesseract
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| OcrError::Configuration(format!("Failed to set whitelist: {e}")))?;
        }

        debug!(language = %pass.language, psm = pass.psm.to_psm_value(), "Running libtesseract");
        tesseract
            .set_image_from_mem(&png)
            .map_err(|e| OcrError::Engine(format!("Failed to set image: {e}")))?
            .recognize()
            .map_err(|e| OcrError::Engine(format!("Recognition failed: {e}")))
    }
}

#[cfg(feature = "tesseract")]
impl OcrProvider for TesseractOcrProvider {
    fn recognize_words(&self, image: &GrayImage, pass: &PassConfig) -> Result<Vec<RawWord>> {
        let mut tesseract = Self::recognize(image, pass)?;
        let output = tesseract
            .get_tsv_text(0)
            .map_err(|e| OcrError::Engine(format!("Failed to read TSV output: {e}")))?;
        Ok(tsv::parse_tsv(&output))
    }

    fn recognize_text(&self, image: &GrayImage, pass: &PassConfig) -> Result<String> {
        let mut tesseract = Self::recognize(image, pass)?;
        tesseract
            .get_text()
            .map_err(|e| OcrError::Engine(format!("Failed to extract text: {e}")))
    }

    fn engine_name(&self) -> &str {
        &self.name
    }

    fn engine_type(&self) -> OcrEngine {
        OcrEngine::Tesseract
    }

    fn check_availability(&self) -> Result<()> {
        Self::check_installation()
    }
}

#[cfg(feature = "tesseract")]
fn engine_mode(mode: OcrEngineMode) -> tesseract::OcrEngineMode {
    match mode {
        OcrEngineMode::LegacyOnly => tesseract::OcrEngineMode::TesseractOnly,
        OcrEngineMode::LstmOnly => tesseract::OcrEngineMode::LstmOnly,
        OcrEngineMode::LegacyLstm => tesseract::OcrEngineMode::TesseractLstmCombined,
        OcrEngineMode::Default => tesseract::OcrEngineMode::Default,
    }
}

#[cfg(feature = "tesseract")]
fn segmentation_mode(mode: PageSegmentationMode) -> tesseract::PageSegMode {
    use tesseract::PageSegMode::*;
    match mode {
        PageSegmentationMode::OsdOnly => PsmOsdOnly,
        PageSegmentationMode::AutoOsd => PsmAutoOsd,
        PageSegmentationMode::AutoOnly => PsmAutoOnly,
        PageSegmentationMode::Auto => PsmAuto,
        PageSegmentationMode::SingleColumn => PsmSingleColumn,
        PageSegmentationMode::SingleBlockVertical => PsmSingleBlockVertText,
        PageSegmentationMode::SingleBlock => PsmSingleBlock,
        PageSegmentationMode::SingleLine => PsmSingleLine,
        PageSegmentationMode::SingleWord => PsmSingleWord,
        PageSegmentationMode::CircleWord => PsmCircleWord,
        PageSegmentationMode::SingleChar => PsmSingleChar,
        PageSegmentationMode::SparseText => PsmSparseText,
        PageSegmentationMode::SparseTextOsd => PsmSparseTextOsd,
        PageSegmentationMode::RawLine => PsmRawLine,
    }
}

// Stub when the feature is not enabled
#[cfg(not(feature = "tesseract"))]
const NOT_ENABLED: &str =
    "Tesseract OCR provider not available. Enable the 'tesseract' feature.";

#[cfg(not(feature = "tesseract"))]
impl TesseractOcrProvider {
    pub fn new() -> Result<Self> {
        Err(OcrError::EngineUnavailable(NOT_ENABLED.to_string()))
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn check_installation() -> Result<()> {
        Err(OcrError::EngineUnavailable(NOT_ENABLED.to_string()))
    }
}

#[cfg(not(feature = "tesseract"))]
impl OcrProvider for TesseractOcrProvider {
    fn recognize_words(&self, _image: &GrayImage, _pass: &PassConfig) -> Result<Vec<RawWord>> {
        Err(OcrError::EngineUnavailable(NOT_ENABLED.to_string()))
    }

    fn recognize_text(&self, _image: &GrayImage, _pass: &PassConfig) -> Result<String> {
        Err(OcrError::EngineUnavailable(NOT_ENABLED.to_string()))
    }

    fn engine_name(&self) -> &str {
        &self.name
    }

    fn engine_type(&self) -> OcrEngine {
        OcrEngine::Tesseract
    }

    fn check_availability(&self) -> Result<()> {
        Self::check_installation()
    }
}
