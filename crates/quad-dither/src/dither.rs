//! Block diffusion driver.
//!
//! Walks the prepared image in raster block order, asks the optimizer for
//! each block's decision, and spreads the residual error into pixels ahead
//! of the scan with a modified Floyd-Steinberg kernel. Error arithmetic is
//! signed throughout; a negative residual is exactly what compensates a
//! too-bright anchor further along the row, and clamping happens only when
//! a value is written back as a pixel.

use crate::block::{quadrant_target, ApproximateCache, BlockDecision, Optimizer};
use crate::color::Rgb;
use crate::error::RenderError;

/// Edge map intensity above which a pixel counts as an edge.
pub const EDGE_INTENSITY: u8 = 128;

/// Edge blocks diffuse half of their residual error.
const EDGE_DIFFUSION_FACTOR: f64 = 0.5;

/// Floyd-Steinberg neighbor offsets and weights: (dy, dx, weight/16).
const KERNEL: [(usize, isize, f64); 4] = [
    (0, 1, 7.0 / 16.0),
    (1, -1, 3.0 / 16.0),
    (1, 0, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

/// A W x H grid of block decisions, one per character cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGrid {
    decisions: Vec<BlockDecision>,
    width: usize,
    height: usize,
}

impl BlockGrid {
    /// Assemble a grid from raster-order decisions.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that `decisions.len() == width * height`.
    pub fn new(decisions: Vec<BlockDecision>, width: usize, height: usize) -> Self {
        debug_assert_eq!(
            decisions.len(),
            width * height,
            "decision count must match grid dimensions"
        );
        Self {
            decisions,
            width,
            height,
        }
    }

    /// Grid width in blocks (output columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in blocks (output rows).
    pub fn height(&self) -> usize {
        self.height
    }

    /// The decision for block (bx, by).
    pub fn get(&self, bx: usize, by: usize) -> &BlockDecision {
        &self.decisions[by * self.width + bx]
    }

    /// Mutable access for callers inserting mid-pipeline modifications
    /// between dithering and ANSI rendering.
    pub fn get_mut(&mut self, bx: usize, by: usize) -> &mut BlockDecision {
        &mut self.decisions[by * self.width + bx]
    }

    /// All decisions in raster order.
    pub fn decisions(&self) -> &[BlockDecision] {
        &self.decisions
    }
}

/// Quadrant pixel offsets within a block: TL, TR, BL, BR.
const QUADRANT_OFFSETS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Dither an image into a grid of block decisions.
///
/// `pixels` is the prepared image at exactly twice the block grid in each
/// dimension; it is mutated in place by error diffusion. `edges` is the
/// single-channel edge map of the same size. Returns the grid together
/// with the cache hit and miss counts of this pass.
pub fn dither_blocks(
    optimizer: &Optimizer<'_>,
    cache: &mut ApproximateCache,
    pixels: &mut [Rgb],
    edges: &[u8],
    width: usize,
    height: usize,
) -> Result<(BlockGrid, u64, u64), RenderError> {
    if width == 0
        || height == 0
        || width % 2 != 0
        || height % 2 != 0
        || pixels.len() != width * height
        || edges.len() != width * height
    {
        return Err(RenderError::BadDimensions { width, height });
    }

    let blocks_w = width / 2;
    let blocks_h = height / 2;
    let mut decisions = Vec::with_capacity(blocks_w * blocks_h);
    let mut hits = 0u64;
    let mut misses = 0u64;

    for by in 0..blocks_h {
        for bx in 0..blocks_w {
            let y0 = by * 2;
            let x0 = bx * 2;

            let mut block = [Rgb::default(); 4];
            let mut is_edge = false;
            for (i, (dy, dx)) in QUADRANT_OFFSETS.iter().enumerate() {
                let idx = (y0 + dy) * width + (x0 + dx);
                block[i] = pixels[idx];
                is_edge |= edges[idx] > EDGE_INTENSITY;
            }

            let (decision, hit) = optimizer.best_block(cache, &block, is_edge);
            if hit {
                hits += 1;
            } else {
                misses += 1;
            }

            diffuse_block(
                optimizer,
                &decision,
                pixels,
                width,
                height,
                x0,
                y0,
                is_edge,
            );
            decisions.push(decision);
        }
    }

    Ok((
        BlockGrid {
            decisions,
            width: blocks_w,
            height: blocks_h,
        },
        hits,
        misses,
    ))
}

/// Spread one block's residual error into not-yet-processed pixels.
#[allow(clippy::too_many_arguments)]
fn diffuse_block(
    optimizer: &Optimizer<'_>,
    decision: &BlockDecision,
    pixels: &mut [Rgb],
    width: usize,
    height: usize,
    x0: usize,
    y0: usize,
    is_edge: bool,
) {
    let palette = optimizer.palette();
    let edge_scale = if is_edge { EDGE_DIFFUSION_FACTOR } else { 1.0 };

    for (i, (dy, dx)) in QUADRANT_OFFSETS.iter().enumerate() {
        let py = y0 + dy;
        let px = x0 + dx;
        let target = quadrant_target(decision, palette, i);
        let error = pixels[py * width + px].signed_sub(target);

        for (ky, kx, weight) in KERNEL {
            let ny = py + ky;
            let nx = px as isize + kx;
            if ny >= height || nx < 0 || nx as usize >= width {
                continue;
            }
            let idx = ny * width + nx as usize;
            pixels[idx] = error.scaled(weight * edge_scale).apply_to(pixels[idx]);
        }
    }
}
