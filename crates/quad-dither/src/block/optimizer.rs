//! Per-block joint optimizer over (glyph, fg, bg).
//!
//! For one 2x2 block the optimizer picks the glyph and ordered color pair
//! minimizing total color error against the four source pixels. The search
//! consults the signature cache first; on a miss it scores candidate
//! triples, either exhaustively for small palettes or over KD-tree
//! candidates pruned from the block's anchors.

use std::collections::HashSet;

use crate::color::{ColorMethod, Rgb};
use crate::glyph::{self, quadrant_is_fg, FULL_BLOCK, GLYPH_COUNT, SPACE};
use crate::palette::Palette;

use super::cache::{ApproximateCache, CachedMatch};
use super::signature::Signature;

/// Edge blocks admit cached matches under a tighter bar.
const EDGE_THRESHOLD_FACTOR: f64 = 0.7;

/// Edge blocks weigh error at half strength.
const EDGE_ERROR_FACTOR: f64 = 0.5;

/// The optimizer's output for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDecision {
    /// Glyph index; also the quadrant mask.
    pub glyph: u8,
    /// Foreground palette index (into the palette's fg set).
    pub fg: u32,
    /// Background palette index (into the palette's bg set).
    pub bg: u32,
    /// Residual error of this decision against the block pixels.
    pub error: f64,
}

/// Search tuning and shared state for block optimization.
pub struct Optimizer<'a> {
    palette: &'a Palette,
    /// Candidate cap per KD query; 0 forces exhaustive search.
    kd_search: usize,
    /// Cache admissibility threshold.
    cache_threshold: f64,
    /// Distinct-color count at or below which search is exhaustive.
    small_palette: usize,
}

impl<'a> Optimizer<'a> {
    pub fn new(
        palette: &'a Palette,
        kd_search: usize,
        cache_threshold: f64,
        small_palette: usize,
    ) -> Self {
        Self {
            palette,
            kd_search,
            cache_threshold,
            small_palette,
        }
    }

    /// The palette this optimizer searches over.
    pub fn palette(&self) -> &Palette {
        self.palette
    }

    /// Best (glyph, fg, bg) for one block. Returns the decision and whether
    /// it was served from the cache.
    pub fn best_block(
        &self,
        cache: &mut ApproximateCache,
        pixels: &[Rgb; 4],
        is_edge: bool,
    ) -> (BlockDecision, bool) {
        let method = self.palette.method();
        let fg_set = self.palette.fg();
        let bg_set = self.palette.bg();

        // Anchor each pixel in both sets and pack the signature.
        let mut fg_anchor_idx = [0u32; 4];
        let mut bg_anchor_idx = [0u32; 4];
        let mut fg_anchors = [Rgb::default(); 4];
        let mut bg_anchors = [Rgb::default(); 4];
        for i in 0..4 {
            fg_anchor_idx[i] = fg_set.quantize(pixels[i], method);
            bg_anchor_idx[i] = bg_set.quantize(pixels[i], method);
            fg_anchors[i] = fg_set.color(fg_anchor_idx[i]).rgb;
            bg_anchors[i] = bg_set.color(bg_anchor_idx[i]).rgb;
        }
        let sig = Signature::pack(fg_anchors, bg_anchors);

        let threshold = if is_edge {
            self.cache_threshold * EDGE_THRESHOLD_FACTOR
        } else {
            self.cache_threshold
        };

        if let Some((m, err)) = cache.lookup(&sig, threshold, |m| {
            calculate_block_error(
                pixels,
                m.glyph,
                fg_set.color(m.fg).rgb,
                bg_set.color(m.bg).rgb,
                method,
                is_edge,
            )
        }) {
            return (
                BlockDecision {
                    glyph: m.glyph,
                    fg: m.fg,
                    bg: m.bg,
                    error: err,
                },
                true,
            );
        }

        let decision = self.search(
            pixels,
            is_edge,
            fg_anchor_idx,
            bg_anchor_idx,
            fg_anchors,
            bg_anchors,
        );
        cache.insert(
            sig,
            CachedMatch {
                glyph: decision.glyph,
                fg: decision.fg,
                bg: decision.bg,
            },
        );
        (decision, false)
    }

    fn search(
        &self,
        pixels: &[Rgb; 4],
        is_edge: bool,
        fg_anchor_idx: [u32; 4],
        bg_anchor_idx: [u32; 4],
        fg_anchors: [Rgb; 4],
        bg_anchors: [Rgb; 4],
    ) -> BlockDecision {
        let method = self.palette.method();
        let fg_set = self.palette.fg();
        let bg_set = self.palette.bg();

        // Uniform blocks collapse to a single anchor color. Exact matches
        // render as a painted background (space glyph); everything else as
        // a solid foreground block.
        let uniform_fg = fg_anchors.iter().all(|&c| c == fg_anchors[0]);
        let uniform_bg = bg_anchors.iter().all(|&c| c == bg_anchors[0]);
        if uniform_fg && uniform_bg && fg_anchors[0] == bg_anchors[0] {
            let exact = pixels.iter().all(|&p| p == fg_anchors[0]);
            let glyph = if exact { SPACE } else { FULL_BLOCK };
            let error = calculate_block_error(
                pixels,
                glyph,
                fg_anchors[0],
                bg_anchors[0],
                method,
                is_edge,
            );
            return BlockDecision {
                glyph,
                fg: fg_anchor_idx[0],
                bg: bg_anchor_idx[0],
                error,
            };
        }

        let exhaustive = self.palette.distinct_colors() <= self.small_palette
            || self.kd_search == 0;
        let (fg_candidates, bg_candidates) = if exhaustive {
            (
                (0..fg_set.len() as u32).collect::<Vec<_>>(),
                (0..bg_set.len() as u32).collect::<Vec<_>>(),
            )
        } else {
            (
                self.kd_candidates(&fg_anchors, true),
                self.kd_candidates(&bg_anchors, false),
            )
        };

        let mut best: Option<(BlockDecision, Rgb, Rgb)> = None;
        for glyph in 0..GLYPH_COUNT {
            for &fg in &fg_candidates {
                let fg_rgb = fg_set.color(fg).rgb;
                for &bg in &bg_candidates {
                    let bg_rgb = bg_set.color(bg).rgb;
                    if fg_rgb == bg_rgb {
                        continue;
                    }
                    let error =
                        calculate_block_error(pixels, glyph, fg_rgb, bg_rgb, method, is_edge);
                    let replace = match &best {
                        None => true,
                        Some((cur, cur_fg, cur_bg)) => {
                            // Ties resolve on the candidate fg color, then
                            // bg, then glyph, independent of candidate
                            // enumeration order.
                            error < cur.error
                                || (error == cur.error
                                    && (fg_rgb > *cur_fg
                                        || (fg_rgb == *cur_fg
                                            && (bg_rgb > *cur_bg
                                                || (bg_rgb == *cur_bg && glyph < cur.glyph)))))
                        }
                    };
                    if replace {
                        best = Some((BlockDecision { glyph, fg, bg, error }, fg_rgb, bg_rgb));
                    }
                }
            }
        }

        match best {
            Some((decision, _, _)) => decision,
            // Degenerate palette: one color in both sets. Paint it solid.
            None => {
                let error = calculate_block_error(
                    pixels,
                    SPACE,
                    fg_anchors[0],
                    bg_anchors[0],
                    method,
                    is_edge,
                );
                BlockDecision {
                    glyph: SPACE,
                    fg: fg_anchor_idx[0],
                    bg: bg_anchor_idx[0],
                    error,
                }
            }
        }
    }

    /// Union of the top-k KD candidates from each anchor, deduplicated,
    /// in query-then-rank order.
    fn kd_candidates(&self, anchors: &[Rgb; 4], fg: bool) -> Vec<u32> {
        let method = self.palette.method();
        let set = if fg { self.palette.fg() } else { self.palette.bg() };

        let mut seen: HashSet<u32> = HashSet::new();
        let mut out: Vec<u32> = Vec::new();
        for &anchor in anchors {
            for (rgb, _) in set.tree().k_nearest(anchor, self.kd_search, method) {
                if let Some(idx) = set.index_for(rgb) {
                    if seen.insert(idx) {
                        out.push(idx);
                    }
                }
            }
        }
        out
    }
}

/// Total color error of painting `pixels` with `glyph` in (fg, bg).
///
/// Quadrant targets come from a bit test on the glyph index; this is the
/// hot loop and must stay branch-free on the glyph table.
#[inline]
pub fn calculate_block_error(
    pixels: &[Rgb; 4],
    glyph: u8,
    fg: Rgb,
    bg: Rgb,
    method: &ColorMethod,
    is_edge: bool,
) -> f64 {
    let mut error = 0.0;
    for (i, &pixel) in pixels.iter().enumerate() {
        let target = if quadrant_is_fg(glyph, i) { fg } else { bg };
        error += method.distance(pixel, target);
    }
    if is_edge {
        error * EDGE_ERROR_FACTOR
    } else {
        error
    }
}

/// Resolve a decision's quadrant target color.
#[inline]
pub fn quadrant_target(decision: &BlockDecision, palette: &Palette, quadrant: usize) -> Rgb {
    if glyph::quadrant_is_fg(decision.glyph, quadrant) {
        palette.fg().color(decision.fg).rgb
    } else {
        palette.bg().color(decision.bg).rgb
    }
}
