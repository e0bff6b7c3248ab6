//! Contrast Limited Adaptive Histogram Equalization.
//!
//! The image is split into a grid of tiles, each tile gets its own clipped
//! histogram equalization table, and every pixel is mapped through a
//! bilinear blend of the four nearest tile tables.

use image::{GrayImage, Luma};

/// Apply CLAHE with `tiles` tiles per axis and the given clip limit.
///
/// The clip limit is relative to a flat histogram: `2.0` lets any bin hold
/// at most twice the tile's average bin count before the excess is
/// redistributed.
pub fn clahe(image: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tile_w = width.div_ceil(tiles.clamp(1, width));
    let tile_h = height.div_ceil(tiles.clamp(1, height));
    // Recount so no tile is empty.
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut tables = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            tables.push(tile_table(image, x0, y0, x1, y1, clip_limit));
        }
    }

    let table = |tx: u32, ty: u32| &tables[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let value = image.get_pixel(x, y).0[0] as usize;

        let top = lerp(table(tx0, ty0)[value], table(tx1, ty0)[value], ax);
        let bottom = lerp(table(tx0, ty1)[value], table(tx1, ty1)[value], ax);
        let blended = top + (bottom - top) * ay;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Equalization table of one tile
fn tile_table(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let pixels = (x1 - x0) * (y1 - y0);

    let limit = ((clip_limit * pixels as f32 / 256.0).ceil() as u32).max(1);
    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (idx, bin) in histogram.iter_mut().enumerate() {
        *bin += share + u32::from(idx < remainder);
    }

    let mut table = [0f32; 256];
    let mut cumulative = 0u32;
    for (idx, &count) in histogram.iter().enumerate() {
        cumulative += count;
        table[idx] = cumulative as f32 * 255.0 / pixels as f32;
    }
    table
}

/// Tile indices surrounding `pos` and the weight of the second one
fn neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let centre = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    if centre <= 0.0 {
        return (0, 0, 0.0);
    }
    let first = (centre.floor() as u32).min(tiles - 1);
    let second = (first + 1).min(tiles - 1);
    let weight = if first == second {
        0.0
    } else {
        centre - first as f32
    };
    (first, second, weight)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
