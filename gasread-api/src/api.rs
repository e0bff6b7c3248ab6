use axum::{
    extract::{DefaultBodyLimit, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use gasread::{
    ExtractionResult, OcrError, OcrMode, OcrPipeline, OcrRequest, OcrResult, QualityLevel,
    QualityVerdict,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<OcrPipeline>,
}

impl AppState {
    pub fn new(pipeline: OcrPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Request payload for the general OCR endpoint
#[derive(Debug, Deserialize)]
pub struct OcrApiRequest {
    /// Base64 image, optionally as a `data:` URL
    #[serde(default)]
    pub image_base64: String,
    /// Language alias or Tesseract code (defaults to "en")
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub mode: OcrMode,
}

fn default_language() -> String {
    "en".to_string()
}

/// Response for the general OCR endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrApiResponse {
    #[serde(flatten)]
    pub result: OcrResult,
    pub quality: QualityVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence_warning: Option<String>,
}

/// Request payload for the blood-gas endpoint
#[derive(Debug, Deserialize)]
pub struct AnalyzeImageRequest {
    #[serde(default)]
    pub image_base64: String,
}

/// Response for the blood-gas endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeImageResponse {
    pub success: bool,
    /// Extracted metrics; absent means not found
    pub values: ExtractionResult,
    pub raw_text: String,
    pub lines: Vec<String>,
    pub avg_confidence: f64,
    pub quality: QualityVerdict,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence_warning: Option<String>,
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// Application-specific error types for the API
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request itself is unusable
    #[error("{0}")]
    BadRequest(String),
    /// Pipeline errors outside a single read (configuration, engine setup)
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ocr(OcrError::EngineUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = match self {
            AppError::Ocr(e @ OcrError::EngineUnavailable(_)) => e.user_message(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Room for the JSON envelope and a data-URL prefix around the image
const BODY_OVERHEAD: usize = 64 * 1024;

/// Largest request body that can still carry an image of `max_bytes` as base64
pub fn body_limit(max_bytes: usize) -> usize {
    max_bytes.div_ceil(3).saturating_mul(4).saturating_add(BODY_OVERHEAD)
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let limit = body_limit(state.pipeline.config().limits.max_bytes);
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/ocr", post(perform_ocr))
        .route(
            "/api/blood-gas/analyze-image-offline",
            post(analyze_image_offline),
        )
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gasread API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// General OCR: full result record plus quality verdict
pub async fn perform_ocr(
    State(state): State<AppState>,
    Json(payload): Json<OcrApiRequest>,
) -> Result<Json<OcrApiResponse>, AppError> {
    let image = require_image(payload.image_base64)?;
    let request = OcrRequest::new(image)
        .with_language(payload.language)
        .with_mode(payload.mode);

    let result = state.pipeline.perform_ocr(request).await;
    let quality = state.pipeline.assess(&result);
    info!(
        success = result.success,
        metrics = result.key_metrics.len(),
        quality = ?quality.quality,
        "OCR request served"
    );

    Ok(Json(OcrApiResponse {
        low_confidence_warning: low_confidence_warning(&result, &quality),
        result,
        quality,
    }))
}

/// Blood-gas analysis of a printout photo, no network engines involved
pub async fn analyze_image_offline(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeImageRequest>,
) -> Result<Json<AnalyzeImageResponse>, AppError> {
    let image = require_image(payload.image_base64)?;
    let result = state
        .pipeline
        .perform_ocr(OcrRequest::new(image).with_mode(OcrMode::Enhanced))
        .await;
    let quality = state.pipeline.assess(&result);
    info!(
        success = result.success,
        values = result.key_metrics.len(),
        "Blood-gas image analyzed"
    );

    let low_confidence_warning = low_confidence_warning(&result, &quality);
    Ok(Json(AnalyzeImageResponse {
        success: result.success,
        values: result.key_metrics,
        raw_text: result.ocr_text,
        lines: result.lines,
        avg_confidence: result.avg_confidence,
        quality,
        engine: result.engine,
        error_message: result.error_message,
        low_confidence_warning,
    }))
}

fn require_image(image: String) -> Result<String, AppError> {
    if image.trim().is_empty() {
        return Err(AppError::BadRequest("Image is required".to_string()));
    }
    Ok(image)
}

fn low_confidence_warning(result: &OcrResult, quality: &QualityVerdict) -> Option<String> {
    if result.success && quality.quality == QualityLevel::Low {
        quality.recommendation.clone()
    } else {
        None
    }
}
