//! Transport payload to raster.

use crate::config::ImageLimits;
use crate::error::{OcrError, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

// Browsers and mail clients are inconsistent about trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Drop a `data:<mime>;base64,` prefix if there is one.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.find(',') {
        Some(idx) => &payload[idx + 1..],
        None => payload,
    }
}

/// Decode the base64 body of a payload, ignoring embedded whitespace.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let body: String = strip_data_url(payload)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if body.is_empty() {
        return Err(OcrError::Decode("empty image payload".to_string()));
    }

    LENIENT_BASE64
        .decode(body.as_bytes())
        .map_err(|e| OcrError::Decode(format!("invalid base64: {e}")))
}

/// Parse encoded image bytes, enforcing `limits`.
pub fn decode_bytes(bytes: &[u8], limits: &ImageLimits) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(OcrError::Decode("empty image payload".to_string()));
    }
    if bytes.len() > limits.max_bytes {
        return Err(OcrError::Decode(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            limits.max_bytes
        )));
    }

    // Header first: the size checks must not cost a full decode
    let (width, height) = reader(bytes)?
        .into_dimensions()
        .map_err(|e| OcrError::Decode(format!("unsupported or corrupt image: {e}")))?;

    if width < limits.min_dimension || height < limits.min_dimension {
        return Err(OcrError::Decode(format!(
            "image is {width}x{height}, minimum side is {} px",
            limits.min_dimension
        )));
    }
    if u64::from(width) * u64::from(height) > limits.max_pixels {
        return Err(OcrError::Decode(format!(
            "image is {width}x{height}, limit is {} pixels",
            limits.max_pixels
        )));
    }

    let mut decoder_limits = image::Limits::default();
    decoder_limits.max_image_width = Some(width);
    decoder_limits.max_image_height = Some(height);

    let mut reader = reader(bytes)?;
    reader.limits(decoder_limits);
    reader
        .decode()
        .map_err(|e| OcrError::Decode(format!("unsupported or corrupt image: {e}")))
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::Decode(format!("unreadable image header: {e}")))
}

/// Base64 (optionally data-URL) payload to raster.
pub fn decode_image(payload: &str, limits: &ImageLimits) -> Result<DynamicImage> {
    let bytes = decode_base64(payload)?;
    decode_bytes(&bytes, limits)
}
