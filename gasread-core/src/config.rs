//! Pipeline configuration.
//!
//! Every section deserializes with `#[serde(default)]`, so a JSON file only
//! needs the keys it wants to override:
//!
//! ```json
//! {
//!   "engine": { "page_segmentation_modes": ["single_column", "single_block"] },
//!   "preprocess": { "binarize": true }
//! }
//! ```

use crate::error::{OcrError, Result};
use crate::ocr::{OcrEngineMode, PageSegmentationMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Sources whose longer side is below this get `small_scale`
    pub small_source_limit: u32,
    pub small_scale: f32,
    /// Sources whose longer side is below this get `medium_scale`
    pub medium_source_limit: u32,
    pub medium_scale: f32,
    /// Upscaling never pushes the longer side past this
    pub max_dimension: u32,

    /// CLAHE tile grid (tiles per axis)
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,

    pub bilateral_radius: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Radius of the median pass after bilateral smoothing (1 = 3x3)
    pub median_radius: u32,

    /// Rotate variants to undo detected skew
    pub deskew: bool,
    pub deskew_search_degrees: f32,
    pub deskew_step_degrees: f32,
    /// Smaller angles are left alone
    pub deskew_min_degrees: f32,
    /// Larger angles are not trusted
    pub deskew_max_degrees: f32,
    /// Longer side of the downscaled copy used for the angle search
    pub deskew_working_size: u32,

    /// Otsu/adaptive binarization on every variant
    pub binarize: bool,
    /// Close/open cleanup after binarization
    pub morphology: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            small_source_limit: 1000,
            small_scale: 2.0,
            medium_source_limit: 2000,
            medium_scale: 1.5,
            max_dimension: 3000,
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            bilateral_radius: 2,
            bilateral_sigma_color: 25.0,
            bilateral_sigma_space: 2.0,
            median_radius: 1,
            deskew: true,
            deskew_search_degrees: 15.0,
            deskew_step_degrees: 0.5,
            deskew_min_degrees: 0.5,
            deskew_max_degrees: 10.0,
            deskew_working_size: 800,
            binarize: false,
            morphology: false,
        }
    }
}

impl PreprocessConfig {
    pub fn with_deskew(mut self, enabled: bool) -> Self {
        self.deskew = enabled;
        self
    }

    pub fn with_binarize(mut self, enabled: bool) -> Self {
        self.binarize = enabled;
        self
    }

    pub fn with_morphology(mut self, enabled: bool) -> Self {
        self.morphology = enabled;
        self
    }

    pub fn with_clahe_clip_limit(mut self, clip_limit: f32) -> Self {
        self.clahe_clip_limit = clip_limit;
        self
    }
}

/// Recognition engine parameters shared by every pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Language used when a request does not name one
    pub default_language: String,
    /// Modes tried per variant in enhanced mode, in order
    pub page_segmentation_modes: Vec<PageSegmentationMode>,
    pub engine_mode: OcrEngineMode,
    pub char_whitelist: Option<String>,
    /// Executable used by the command-line backend
    pub tesseract_command: String,
    /// Engine name reported in results
    pub engine_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: "eng".to_string(),
            page_segmentation_modes: vec![PageSegmentationMode::SingleColumn],
            engine_mode: OcrEngineMode::LstmOnly,
            char_whitelist: None,
            tesseract_command: "tesseract".to_string(),
            engine_name: "tesseract_medical".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_page_segmentation_modes(mut self, modes: Vec<PageSegmentationMode>) -> Self {
        self.page_segmentation_modes = modes;
        self
    }

    pub fn with_char_whitelist(mut self, whitelist: impl Into<String>) -> Self {
        self.char_whitelist = Some(whitelist.into());
        self
    }

    pub fn with_tesseract_command(mut self, command: impl Into<String>) -> Self {
        self.tesseract_command = command.into();
        self
    }
}

/// Quality scoring thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Below this average confidence a result is "low"
    pub low_confidence_threshold: f64,
    /// Metric count that earns a full completeness sub-score
    pub expected_metrics: usize,
    /// Secondary-view score needed to be acceptable
    pub acceptable_score: f64,
    /// Secondary-view confidence below this is reported as an issue
    pub issue_confidence: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.6,
            expected_metrics: 3,
            acceptable_score: 0.5,
            issue_confidence: 0.5,
        }
    }
}

/// Input limits enforced by the decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageLimits {
    pub max_bytes: usize,
    pub min_dimension: u32,
    pub max_pixels: u64,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            min_dimension: 16,
            max_pixels: 40_000_000,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub engine: EngineConfig,
    pub quality: QualityConfig,
    pub limits: ImageLimits,
    /// Worker threads in the process-wide pool
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            engine: EngineConfig::default(),
            quality: QualityConfig::default(),
            limits: ImageLimits::default(),
            workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            OcrError::Configuration(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocess;
        if self.workers == 0 {
            return Err(config_error("workers must be at least 1"));
        }
        if p.small_scale < 1.0 || p.medium_scale < 1.0 {
            return Err(config_error("upscale factors must be >= 1.0"));
        }
        if p.small_source_limit > p.medium_source_limit {
            return Err(config_error(
                "small_source_limit must not exceed medium_source_limit",
            ));
        }
        if p.max_dimension == 0 {
            return Err(config_error("max_dimension must be positive"));
        }
        if p.clahe_tiles == 0 || p.clahe_clip_limit <= 0.0 {
            return Err(config_error("CLAHE needs at least one tile and a positive clip limit"));
        }
        if p.bilateral_sigma_color <= 0.0 || p.bilateral_sigma_space <= 0.0 {
            return Err(config_error("bilateral sigmas must be positive"));
        }
        if p.deskew_step_degrees <= 0.0 || p.deskew_search_degrees <= 0.0 {
            return Err(config_error("deskew search range and step must be positive"));
        }
        // The projection histogram grows with tan() of this angle
        if p.deskew_search_degrees > 45.0 {
            return Err(config_error("deskew_search_degrees must not exceed 45"));
        }
        if p.deskew_min_degrees > p.deskew_max_degrees {
            return Err(config_error("deskew_min_degrees must not exceed deskew_max_degrees"));
        }
        if self.engine.page_segmentation_modes.is_empty() {
            return Err(config_error("at least one page segmentation mode is required"));
        }
        if let Some(mode) = self
            .engine
            .page_segmentation_modes
            .iter()
            .find(|m| !m.recognizes_text())
        {
            return Err(config_error(&format!(
                "page segmentation mode {mode:?} does not recognize text"
            )));
        }
        if !(0.0..=1.0).contains(&self.quality.low_confidence_threshold)
            || !(0.0..=1.0).contains(&self.quality.acceptable_score)
        {
            return Err(config_error("quality thresholds must lie in [0, 1]"));
        }
        if self.limits.max_bytes == 0 || self.limits.max_pixels == 0 {
            return Err(config_error("image limits must be positive"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> OcrError {
    OcrError::Configuration(message.to_string())
}
