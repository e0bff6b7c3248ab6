//! # gasread-api
//!
//! REST API server for the gasread blood-gas OCR pipeline
//!

mod api;
mod config;

pub use api::{
    analyze_image_offline, app, body_limit, health_check, perform_ocr, AnalyzeImageRequest,
    AnalyzeImageResponse, AppError, AppState, ErrorResponse, OcrApiRequest, OcrApiResponse,
};
pub use config::{ServerConfig, DEFAULT_ADDR};
