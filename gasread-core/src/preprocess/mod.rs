//! Image preprocessing.
//!
//! Turns one decoded image into up to three independent grayscale variants
//! that the selector recognizes and scores against each other:
//!
//! | variant    | steps                                        |
//! |------------|----------------------------------------------|
//! | `simple`   | grayscale                                    |
//! | `clahe`    | upscale, grayscale, CLAHE                    |
//! | `denoised` | grayscale, bilateral filter, median blur     |
//!
//! Deskew, binarization and stroke cleanup are then applied to every variant
//! according to [`PreprocessConfig`]. Every step produces a new buffer; the
//! decoded source is only ever borrowed.

pub mod binarize;
pub mod clahe;
pub mod denoise;
pub mod deskew;

use crate::config::PreprocessConfig;
use deskew::DeskewParams;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Named preprocessing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Simple,
    Clahe,
    Denoised,
}

impl VariantKind {
    /// Every variant in trial order
    pub const ALL: [VariantKind; 3] = [VariantKind::Simple, VariantKind::Clahe, VariantKind::Denoised];

    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::Simple => "simple",
            VariantKind::Clahe => "clahe",
            VariantKind::Denoised => "denoised",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One preprocessed, immutable rendition of the source image
#[derive(Debug, Clone)]
pub struct PreprocessVariant {
    pub kind: VariantKind,
    pub image: GrayImage,
    /// Steps applied, in order
    pub steps: Vec<&'static str>,
}

/// Builds variants from a decoded image
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Build the requested variants, in the order given
    pub fn variants(&self, source: &DynamicImage, kinds: &[VariantKind]) -> Vec<PreprocessVariant> {
        kinds.iter().map(|&kind| self.build(source, kind)).collect()
    }

    /// Build a single variant
    pub fn build(&self, source: &DynamicImage, kind: VariantKind) -> PreprocessVariant {
        let cfg = &self.config;
        let mut steps = vec!["grayscale"];
        let gray = source.to_luma8();

        let image = match kind {
            VariantKind::Simple => gray,
            VariantKind::Clahe => {
                let factor = upscale_factor(gray.width(), gray.height(), cfg);
                let scaled = if factor > 1.0 {
                    steps.push("upscale");
                    upscale(&gray, factor)
                } else {
                    gray
                };
                steps.push("clahe");
                clahe::clahe(&scaled, cfg.clahe_tiles, cfg.clahe_clip_limit)
            }
            VariantKind::Denoised => {
                steps.push("bilateral");
                if cfg.median_radius > 0 {
                    steps.push("median");
                }
                denoise::denoise(
                    &gray,
                    cfg.bilateral_radius,
                    cfg.bilateral_sigma_color,
                    cfg.bilateral_sigma_space,
                    cfg.median_radius,
                )
            }
        };

        let image = self.finish(image, &mut steps);
        debug!(variant = %kind, ?steps, width = image.width(), height = image.height(), "Built variant");

        PreprocessVariant { kind, image, steps }
    }

    /// Optional steps shared by every variant
    fn finish(&self, image: GrayImage, steps: &mut Vec<&'static str>) -> GrayImage {
        let cfg = &self.config;
        let mut image = image;

        if cfg.deskew {
            if let Some((rotated, angle)) = deskew::deskew(&image, &self.deskew_params()) {
                debug!(angle, "Deskewed variant");
                steps.push("deskew");
                image = rotated;
            }
        }

        if cfg.binarize {
            steps.push("binarize");
            image = binarize::binarize(&image);

            if cfg.morphology {
                steps.push("morphology");
                image = binarize::clean_strokes(&image);
            }
        }

        image
    }

    fn deskew_params(&self) -> DeskewParams {
        DeskewParams {
            search_degrees: self.config.deskew_search_degrees,
            step_degrees: self.config.deskew_step_degrees,
            min_degrees: self.config.deskew_min_degrees,
            max_degrees: self.config.deskew_max_degrees,
            working_size: self.config.deskew_working_size,
        }
    }
}

/// Upscale factor for a source of the given size.
///
/// Smaller sources get larger factors; the result never pushes the longer
/// side past `max_dimension` and is never below 1.
pub fn upscale_factor(width: u32, height: u32, config: &PreprocessConfig) -> f32 {
    let longest = width.max(height);
    if longest == 0 {
        return 1.0;
    }

    let tier = if longest < config.small_source_limit {
        config.small_scale
    } else if longest < config.medium_source_limit {
        config.medium_scale
    } else {
        1.0
    };

    let ceiling = config.max_dimension as f32 / longest as f32;
    tier.min(ceiling).max(1.0)
}

fn upscale(image: &GrayImage, factor: f32) -> GrayImage {
    let width = (image.width() as f32 * factor).round() as u32;
    let height = (image.height() as f32 * factor).round() as u32;
    imageops::resize(image, width, height, FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn source() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
            if (y % 25) < 4 && (20..280).contains(&x) {
                Rgb([20, 20, 20])
            } else {
                Rgb([235, 230, 225])
            }
        }))
    }

    #[test]
    fn test_upscale_factor_tiers() {
        let config = PreprocessConfig::default();
        assert_eq!(upscale_factor(640, 480, &config), 2.0);
        assert_eq!(upscale_factor(1200, 900, &config), 1.5);
        assert_eq!(upscale_factor(2400, 1800, &config), 1.0);
        // Never past the ceiling
        let capped = PreprocessConfig {
            max_dimension: 1500,
            ..Default::default()
        };
        let factor = upscale_factor(900, 600, &capped);
        assert!((factor - 1500.0 / 900.0).abs() < 1e-6);
        // Never below 1 even past the ceiling
        assert_eq!(upscale_factor(4000, 3000, &config), 1.0);
    }

    #[test]
    fn test_simple_variant_is_grayscale_copy() {
        let preprocessor = Preprocessor::new(PreprocessConfig::default().with_deskew(false));
        let src = source();
        let variant = preprocessor.build(&src, VariantKind::Simple);
        assert_eq!(variant.kind, VariantKind::Simple);
        assert_eq!(variant.steps, vec!["grayscale"]);
        assert_eq!(variant.image, src.to_luma8());
    }

    #[test]
    fn test_clahe_variant_upscales_small_sources() {
        let preprocessor = Preprocessor::new(PreprocessConfig::default().with_deskew(false));
        let variant = preprocessor.build(&source(), VariantKind::Clahe);
        assert_eq!(variant.image.dimensions(), (600, 400));
        assert_eq!(variant.steps, vec!["grayscale", "upscale", "clahe"]);
    }

    #[test]
    fn test_denoised_variant_steps() {
        let preprocessor = Preprocessor::new(PreprocessConfig::default().with_deskew(false));
        let variant = preprocessor.build(&source(), VariantKind::Denoised);
        assert_eq!(variant.steps, vec!["grayscale", "bilateral", "median"]);
        assert_eq!(variant.image.dimensions(), (300, 200));
    }

    #[test]
    fn test_variants_are_independent_of_source() {
        let preprocessor = Preprocessor::default();
        let src = source();
        let before = src.clone();
        let variants = preprocessor.variants(&src, &VariantKind::ALL);
        assert_eq!(variants.len(), 3);
        assert_eq!(src, before);
        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, VariantKind::ALL.to_vec());
    }

    #[test]
    fn test_binarize_and_morphology_steps() {
        let config = PreprocessConfig::default()
            .with_deskew(false)
            .with_binarize(true)
            .with_morphology(true);
        let variant = Preprocessor::new(config).build(&source(), VariantKind::Simple);
        assert_eq!(variant.steps, vec!["grayscale", "binarize", "morphology"]);
        assert!(variant.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_morphology_requires_binarize() {
        let config = PreprocessConfig::default().with_deskew(false).with_morphology(true);
        let variant = Preprocessor::new(config).build(&source(), VariantKind::Simple);
        assert!(!variant.steps.contains(&"morphology"));
    }

    #[test]
    fn test_straight_source_is_not_rotated() {
        let variant = Preprocessor::default().build(&source(), VariantKind::Simple);
        assert!(!variant.steps.contains(&"deskew"));
        assert_eq!(variant.image, source().to_luma8());
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(VariantKind::Simple.to_string(), "simple");
        assert_eq!(VariantKind::Clahe.name(), "clahe");
        assert_eq!(serde_json::to_string(&VariantKind::Denoised).unwrap(), "\"denoised\"");
    }
}
