//! The `perform_ocr` entry point.
//!
//! decode → preprocess → multi-pass selection → metric extraction, packed
//! into one flat [`OcrResult`]. Failures never escape as errors: they come
//! back as `success: false` with a user-facing `error_message`.

use crate::config::PipelineConfig;
use crate::decode::decode_image;
use crate::error::{OcrError, Result};
use crate::metrics::ExtractionResult;
use crate::ocr::{
    MockOcrProvider, OcrEngine, OcrProvider, PageSegmentationMode, PassConfig, TesseractCliProvider,
    TesseractOcrProvider, TextBlock,
};
use crate::preprocess::{Preprocessor, VariantKind};
use crate::quality::{assess_quality, quality_report, QualityReport, QualityVerdict};
use crate::selector::select_best;
use crate::worker::WorkerPool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

/// How hard to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Simple variant, first configured segmentation mode
    Fast,
    /// Every variant under every configured segmentation mode
    #[default]
    Enhanced,
}

impl OcrMode {
    pub fn name(&self) -> &'static str {
        match self {
            OcrMode::Fast => "fast",
            OcrMode::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OcrMode {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(OcrMode::Fast),
            "enhanced" | "" => Ok(OcrMode::Enhanced),
            other => Err(OcrError::Configuration(format!("unknown OCR mode '{other}'"))),
        }
    }
}

/// One image to read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRequest {
    /// Base64 image, optionally wrapped in a `data:` URL
    pub image: String,
    /// Language alias or Tesseract code
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub mode: OcrMode,
}

fn default_language() -> String {
    "en".to_string()
}

impl OcrRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            language: default_language(),
            mode: OcrMode::default(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_mode(mut self, mode: OcrMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Flat record returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub success: bool,
    pub ocr_text: String,
    pub blocks: Vec<TextBlock>,
    pub avg_confidence: f64,
    pub lines: Vec<String>,
    /// Only metrics that were found and range-checked
    pub key_metrics: ExtractionResult,
    pub error_message: Option<String>,
    /// Backend that produced the text
    pub engine: String,
    /// Winning preprocessing variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl OcrResult {
    /// An unsuccessful result carrying `message`
    pub fn failure(message: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            success: false,
            ocr_text: String::new(),
            blocks: Vec::new(),
            avg_confidence: 0.0,
            lines: Vec::new(),
            key_metrics: ExtractionResult::new(),
            error_message: Some(message.into()),
            engine: engine.into(),
            variant: None,
        }
    }
}

struct PipelineCore {
    provider: Arc<dyn OcrProvider>,
    preprocessor: Preprocessor,
    config: PipelineConfig,
}

/// Shared recognition pipeline.
///
/// Build one per process; it owns the worker pool and the engine backend,
/// both read-only after construction.
///
/// ```rust
/// use gasread::{OcrPipeline, OcrRequest, OcrMode, PipelineConfig};
/// use gasread::ocr::MockOcrProvider;
/// use std::sync::Arc;
///
/// let pipeline = OcrPipeline::new(
///     Arc::new(MockOcrProvider::new()),
///     PipelineConfig::default().with_workers(1),
/// ).unwrap();
///
/// // Not an image: the pipeline reports failure instead of erroring
/// let result = pipeline.perform_ocr_blocking(&OcrRequest::new("aGVsbG8=").with_mode(OcrMode::Fast));
/// assert!(!result.success);
/// assert!(result.error_message.is_some());
/// assert!(result.key_metrics.is_empty());
/// ```
pub struct OcrPipeline {
    core: Arc<PipelineCore>,
    pool: WorkerPool,
}

impl OcrPipeline {
    /// Pipeline over an already constructed backend
    pub fn new(provider: Arc<dyn OcrProvider>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers)?;
        let preprocessor = Preprocessor::new(config.preprocess.clone());
        info!(
            engine = provider.engine_name(),
            workers = pool.size(),
            "OCR pipeline ready"
        );

        Ok(Self {
            core: Arc::new(PipelineCore {
                provider,
                preprocessor,
                config,
            }),
            pool,
        })
    }

    /// Pipeline over one of the bundled backends
    pub fn with_engine(engine: OcrEngine, config: PipelineConfig) -> Result<Self> {
        let provider: Arc<dyn OcrProvider> = match engine {
            OcrEngine::Mock => Arc::new(MockOcrProvider::new()),
            OcrEngine::TesseractCli => Arc::new(TesseractCliProvider::from_config(&config.engine)),
            OcrEngine::Tesseract => Arc::new(
                TesseractOcrProvider::new()?.with_engine_name(config.engine.engine_name.clone()),
            ),
        };
        Self::new(provider, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.core.config
    }

    pub fn engine_name(&self) -> &str {
        self.core.provider.engine_name()
    }

    /// Verify the backend can run
    pub fn check_engine(&self) -> Result<()> {
        self.core.provider.check_availability()
    }

    /// Read one image on the worker pool.
    ///
    /// The calling executor is never blocked. Dropping the future abandons
    /// the result; the job itself runs to completion.
    pub async fn perform_ocr(&self, request: OcrRequest) -> OcrResult {
        let core = Arc::clone(&self.core);
        match self.pool.run(move || core.process(&request)).await {
            Ok(result) => result,
            Err(e) => {
                error!("OCR job failed: {e}");
                OcrResult::failure(e.user_message(), self.engine_name())
            }
        }
    }

    /// Read one image on the calling thread
    pub fn perform_ocr_blocking(&self, request: &OcrRequest) -> OcrResult {
        self.core.process(request)
    }

    /// Primary quality verdict under this pipeline's thresholds
    pub fn assess(&self, result: &OcrResult) -> QualityVerdict {
        assess_quality(result, &self.core.config.quality)
    }

    /// Secondary diagnostic view under this pipeline's thresholds
    pub fn report(&self, result: &OcrResult) -> QualityReport {
        quality_report(result, &self.core.config.quality)
    }
}

impl fmt::Debug for OcrPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrPipeline")
            .field("engine", &self.engine_name())
            .field("pool", &self.pool)
            .finish()
    }
}

impl PipelineCore {
    fn process(&self, request: &OcrRequest) -> OcrResult {
        let span = info_span!(
            "perform_ocr",
            mode = %request.mode,
            language = %request.language,
            size = request.image.len()
        );
        let _enter = span.enter();
        let started = Instant::now();
        let engine = self.provider.engine_name();

        let image = match decode_image(&request.image, &self.config.limits) {
            Ok(image) => image,
            Err(e) => {
                warn!("Rejected image: {e}");
                return OcrResult::failure(e.user_message(), engine);
            }
        };

        let (kinds, modes) = self.plan(request.mode);
        let variants = self.preprocessor.variants(&image, kinds);
        drop(image);

        let pass = PassConfig::new(&self.config.engine, &request.language, modes[0]);
        let selection = match select_best(self.provider.as_ref(), &variants, &modes, &pass) {
            Ok(selection) => selection,
            Err(e) => {
                error!(elapsed_ms = started.elapsed().as_millis() as u64, "OCR failed on every variant: {e}");
                return OcrResult::failure(e.user_message(), engine);
            }
        };

        let best = selection.best;
        if best.text.is_empty() {
            warn!(variant = %best.variant, "No text recognized");
            return OcrResult::failure(OcrError::EmptyResult.user_message(), engine);
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            metrics = selection.metrics.len(),
            confidence = best.avg_confidence,
            variant = %best.variant,
            fallback = selection.fallback,
            "OCR finished"
        );

        OcrResult {
            success: true,
            ocr_text: best.text,
            blocks: best.blocks,
            avg_confidence: best.avg_confidence,
            lines: best.lines,
            key_metrics: selection.metrics,
            error_message: None,
            engine: engine.to_string(),
            variant: Some(best.variant.to_string()),
        }
    }

    /// Variants and segmentation modes tried for `mode`
    fn plan(&self, mode: OcrMode) -> (&'static [VariantKind], Vec<PageSegmentationMode>) {
        let configured = &self.config.engine.page_segmentation_modes;
        match mode {
            OcrMode::Fast => (FAST_VARIANTS, vec![configured.first().copied().unwrap_or_default()]),
            OcrMode::Enhanced => (&VariantKind::ALL, configured.clone()),
        }
    }
}

const FAST_VARIANTS: &[VariantKind] = &[VariantKind::Simple];
