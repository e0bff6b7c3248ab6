use thiserror::Error;

/// Errors raised inside the OCR pipeline.
///
/// None of these cross the [`crate::OcrPipeline`] boundary: the orchestrator
/// folds every one of them into an [`crate::OcrResult`] with
/// `success == false`.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The transport payload is not a readable image
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// The recognition engine failed on a variant or configuration
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// Recognition ran but produced no usable text
    #[error("No text recognized")]
    EmptyResult,

    /// The backend is not installed or could not be initialized
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Message shown to the person holding the camera.
    pub fn user_message(&self) -> String {
        match self {
            OcrError::Decode(_) => {
                "Could not read image. Please ensure the image is valid.".to_string()
            }
            OcrError::EmptyResult | OcrError::Engine(_) => {
                "Could not read image. Try brighter lighting, steady hand, full text visible."
                    .to_string()
            }
            OcrError::EngineUnavailable(_) => {
                "OCR engine not available. Please contact support.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
