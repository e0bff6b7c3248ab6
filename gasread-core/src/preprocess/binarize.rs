use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

/// Block radius for local thresholding, scaled to the image
pub fn block_radius(width: u32, height: u32) -> u32 {
    (width.min(height) / 40).max(7)
}

/// Otsu and adaptive thresholding; whichever leaves more white pixels wins.
///
/// Printouts are dark text on light paper, so the result with more
/// background is the one that did not swallow the page into ink.
pub fn binarize(image: &GrayImage) -> GrayImage {
    let global = global_threshold(image);
    let local = adaptive_threshold(image, block_radius(image.width(), image.height()));

    if white_pixels(&local) > white_pixels(&global) {
        local
    } else {
        global
    }
}

/// Otsu threshold; pixels at or below the level become ink
pub fn global_threshold(image: &GrayImage) -> GrayImage {
    threshold(image, otsu_level(image), ThresholdType::Binary)
}

/// Close then open the ink (3x3) to join broken strokes and drop speckles
pub fn clean_strokes(binary: &GrayImage) -> GrayImage {
    let ink = invert(binary);
    let closed = close(&ink, Norm::LInf, 1);
    let opened = open(&closed, Norm::LInf, 1);
    invert(&opened)
}

fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    image::imageops::invert(&mut out);
    out
}

fn white_pixels(image: &GrayImage) -> usize {
    image.pixels().filter(|p| p.0[0] > 127).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn text_page() -> GrayImage {
        GrayImage::from_fn(120, 80, |x, y| {
            if (20..24).contains(&y) && (10..110).contains(&x) {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    #[test]
    fn test_block_radius() {
        assert_eq!(block_radius(100, 100), 7);
        assert_eq!(block_radius(2000, 1200), 30);
    }

    #[test]
    fn test_binarize_is_two_level() {
        let out = binarize(&text_page());
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
        assert_eq!(out.get_pixel(50, 21).0[0], 0);
    }

    #[test]
    fn test_global_threshold_level_is_ink() {
        let page = text_page();
        let level = otsu_level(&page);
        let out = global_threshold(&page);

        for (source, binary) in page.pixels().zip(out.pixels()) {
            let expected = if source.0[0] > level { 255 } else { 0 };
            assert_eq!(binary.0[0], expected);
        }
        assert_eq!(out.get_pixel(50, 21).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn test_clean_strokes_drops_speckles() {
        let mut page = GrayImage::from_pixel(40, 40, Luma([255]));
        page.put_pixel(5, 5, Luma([0]));
        for y in 18..24 {
            for x in 8..32 {
                page.put_pixel(x, y, Luma([0]));
            }
        }

        let out = clean_strokes(&page);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
        assert_eq!(out.get_pixel(20, 20).0[0], 0);
    }

    #[test]
    fn test_clean_strokes_fills_gaps() {
        let mut page = GrayImage::from_pixel(40, 40, Luma([255]));
        for y in 15..25 {
            for x in 5..35 {
                if x != 20 {
                    page.put_pixel(x, y, Luma([0]));
                }
            }
        }
        let out = clean_strokes(&page);
        assert_eq!(out.get_pixel(20, 20).0[0], 0);
    }
}
