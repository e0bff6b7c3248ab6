//! Edge-preserving smoothing.

use image::{GrayImage, Luma};
use imageproc::filter::median_filter;

/// Bilateral filter over a `(2 * radius + 1)` square window.
///
/// Neighbours are weighted by distance (`sigma_space`, in pixels) and by
/// intensity difference (`sigma_color`, in gray levels), so flat regions are
/// smoothed while stroke edges survive. Window pixels outside the image are
/// skipped.
pub fn bilateral_filter(
    image: &GrayImage,
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let r = radius as i64;
    let side = (2 * radius + 1) as usize;

    let space_denominator = 2.0 * sigma_space * sigma_space;
    let mut space_weights = vec![0f32; side * side];
    for dy in -r..=r {
        for dx in -r..=r {
            let idx = ((dy + r) as usize) * side + (dx + r) as usize;
            space_weights[idx] = (-((dx * dx + dy * dy) as f32) / space_denominator).exp();
        }
    }

    let color_denominator = 2.0 * sigma_color * sigma_color;
    let color_weights: Vec<f32> = (0..256)
        .map(|diff| (-((diff * diff) as f32) / color_denominator).exp())
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let centre = image.get_pixel(x, y).0[0];
        let mut sum = 0f32;
        let mut weight_sum = 0f32;

        for dy in -r..=r {
            let ny = y as i64 + dy;
            if ny < 0 || ny >= height as i64 {
                continue;
            }
            for dx in -r..=r {
                let nx = x as i64 + dx;
                if nx < 0 || nx >= width as i64 {
                    continue;
                }
                let value = image.get_pixel(nx as u32, ny as u32).0[0];
                let weight = space_weights[((dy + r) as usize) * side + (dx + r) as usize]
                    * color_weights[centre.abs_diff(value) as usize];
                sum += value as f32 * weight;
                weight_sum += weight;
            }
        }

        if weight_sum > 0.0 {
            Luma([(sum / weight_sum).round().clamp(0.0, 255.0) as u8])
        } else {
            Luma([centre])
        }
    })
}

/// Bilateral smoothing followed by a light median pass
pub fn denoise(
    image: &GrayImage,
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
    median_radius: u32,
) -> GrayImage {
    let smoothed = bilateral_filter(image, radius, sigma_color, sigma_space);
    if median_radius == 0 {
        return smoothed;
    }
    median_filter(&smoothed, median_radius, median_radius)
}
