//! Debug PNG output.
//!
//! Paints a block grid back into pixels, each quadrant taking its decision's
//! foreground or background color per the glyph mask. Development aid for
//! inspecting dither decisions without a terminal.

use image::RgbImage;
use quad_dither::block::quadrant_target;
use quad_dither::{BlockGrid, Palette};

/// Render the block grid to a 2W x 2H RGB image.
pub fn paint_block_grid(grid: &BlockGrid, palette: &Palette) -> RgbImage {
    let mut out = RgbImage::new(grid.width() as u32 * 2, grid.height() as u32 * 2);
    for by in 0..grid.height() {
        for bx in 0..grid.width() {
            let decision = grid.get(bx, by);
            for (i, (dy, dx)) in [(0, 0), (0, 1), (1, 0), (1, 1)].iter().enumerate() {
                let rgb = quadrant_target(decision, palette, i);
                out.put_pixel(
                    (bx * 2 + dx) as u32,
                    (by * 2 + dy) as u32,
                    image::Rgb([rgb.r, rgb.g, rgb.b]),
                );
            }
        }
    }
    out
}
