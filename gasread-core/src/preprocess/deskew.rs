//! Skew estimation and correction.
//!
//! Dark pixels are projected onto the vertical axis along each candidate
//! angle. When the angle matches the text baseline, every text line collapses
//! into a few projection bins and the sum of squared bin counts peaks.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use tracing::debug;

/// Minimum share of dark pixels needed for an estimate
const MIN_INK_RATIO: f64 = 0.01;

/// Parameters of the angle search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskewParams {
    pub search_degrees: f32,
    pub step_degrees: f32,
    pub min_degrees: f32,
    pub max_degrees: f32,
    pub working_size: u32,
}

/// Estimate the text skew in degrees.
///
/// Positive angles mean lines descend to the right. Returns `None` when the
/// image has too little ink to judge.
pub fn estimate_skew(image: &GrayImage, params: &DeskewParams) -> Option<f32> {
    let working = working_copy(image, params.working_size);
    let (width, height) = working.dimensions();
    if width < 2 || height < 2 {
        return None;
    }

    let level = otsu_level(&working);
    let ink: Vec<(f32, f32)> = working
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] <= level)
        .map(|(x, y, _)| (x as f32, y as f32))
        .collect();

    let ratio = ink.len() as f64 / (width as f64 * height as f64);
    if ratio < MIN_INK_RATIO {
        debug!(ink_ratio = ratio, "Too little ink for skew estimate");
        return None;
    }

    let steps = (params.search_degrees / params.step_degrees).round() as i32;
    let max_shift = width as f32 * params.search_degrees.to_radians().tan();
    let offset = max_shift.ceil() as i64 + 1;
    let bins = height as usize + 2 * offset as usize + 1;

    let mut best_angle = 0.0f32;
    let mut best_score = 0u64;
    let mut histogram = vec![0u64; bins];

    for i in -steps..=steps {
        let angle = i as f32 * params.step_degrees;
        let slope = angle.to_radians().tan();

        histogram.iter_mut().for_each(|bin| *bin = 0);
        for &(x, y) in &ink {
            let row = (y - x * slope).round() as i64 + offset;
            if row >= 0 && (row as usize) < bins {
                histogram[row as usize] += 1;
            }
        }
        let score: u64 = histogram.iter().map(|&c| c * c).sum();

        if score > best_score || (score == best_score && angle.abs() < best_angle.abs()) {
            best_score = score;
            best_angle = angle;
        }
    }

    Some(best_angle)
}

/// Rotate `image` to undo the detected skew.
///
/// Returns the corrected image and the angle that was undone, or `None`
/// when the estimate is missing or outside `[min_degrees, max_degrees]`.
pub fn deskew(image: &GrayImage, params: &DeskewParams) -> Option<(GrayImage, f32)> {
    let angle = estimate_skew(image, params)?;
    let magnitude = angle.abs();
    if magnitude < params.min_degrees || magnitude > params.max_degrees {
        debug!(angle, "Skew outside correction band, leaving image as is");
        return None;
    }

    // rotate_about_center turns clockwise for positive theta
    let rotated = rotate_about_center(
        image,
        -angle.to_radians(),
        Interpolation::Bilinear,
        Luma([255]),
    );
    Some((rotated, angle))
}

fn working_copy(image: &GrayImage, max_side: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_side || max_side == 0 {
        return image.clone();
    }
    let scale = max_side as f32 / longest as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    imageops::resize(image, new_w, new_h, FilterType::Triangle)
}
