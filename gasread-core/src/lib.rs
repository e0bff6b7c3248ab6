//! # gasread
//!
//! Reads blood-gas analyzer printouts from photos: decodes the image, builds
//! several cleaned-up variants, recognizes each one, keeps the pass that
//! yields the most metrics, and extracts range-checked values.
//!
//! ## Features
//!
//! - **Preprocessing**: upscaling, CLAHE contrast enhancement, edge-preserving
//!   denoise, deskew, optional binarization
//! - **Multi-pass recognition**: every variant under every configured page
//!   segmentation mode, scored deterministically
//! - **Metric extraction**: a static bank of OCR-noise tolerant patterns for
//!   20 blood-gas, electrolyte and oximetry values with physiological range
//!   checks
//! - **Quality verdicts**: advisory retry hints for low-confidence reads
//! - **Pluggable engines**: `tesseract` command line (default), in-process
//!   libtesseract (`tesseract` feature) and a scripted mock
//!
//! ## Quick Start
//!
//! ```rust
//! use gasread::ocr::MockOcrProvider;
//! use gasread::{OcrPipeline, OcrRequest, PipelineConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> gasread::Result<()> {
//! let pipeline = OcrPipeline::new(
//!     Arc::new(MockOcrProvider::new()),
//!     PipelineConfig::default().with_workers(1),
//! )?;
//!
//! let result = pipeline.perform_ocr_blocking(&OcrRequest::new("not an image"));
//! let verdict = pipeline.assess(&result);
//! println!("{:?}: {:?}", verdict.quality, result.error_message);
//! # Ok(())
//! # }
//! ```
//!
//! Metric extraction works on plain text too:
//!
//! ```rust
//! use gasread::metrics::extract_from_text;
//!
//! let metrics = extract_from_text("pH(T) 7.318\npCcO(T) 25.9");
//! assert_eq!(metrics.get("pCO2"), Some(25.9));
//! ```
//!
//! ## Modules
//!
//! - [`decode`] - base64 / data URL decoding with size limits
//! - [`preprocess`] - variant generation
//! - [`ocr`] - engine trait, backends and the single-pass runner
//! - [`selector`] - multi-pass scoring
//! - [`metrics`] - the pattern bank and extractor
//! - [`quality`] - verdicts and diagnostic reports
//! - [`pipeline`] - the `perform_ocr` entry point
//! - [`worker`] - the bounded worker pool

pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod selector;
pub mod worker;

pub use config::{EngineConfig, ImageLimits, PipelineConfig, PreprocessConfig, QualityConfig};
pub use error::{OcrError, Result};
pub use metrics::{extract_from_text, extract_metrics, ExtractionResult};
pub use ocr::{OcrEngine, OcrProvider, PageSegmentationMode, TextBlock};
pub use pipeline::{OcrMode, OcrPipeline, OcrRequest, OcrResult};
pub use preprocess::VariantKind;
pub use quality::{assess_quality, quality_report, QualityLevel, QualityReport, QualityVerdict};

/// Current version of gasread
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
