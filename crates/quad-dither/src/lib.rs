//! quad-dither: 2x2 quadrant-block dithering for ANSI terminal art
//!
//! This library converts raster images into dense ANSI-escape-coded
//! terminal art. The prepared image is decomposed into non-overlapping
//! 2x2 pixel blocks; for each block a joint optimizer chooses one of the
//! 16 Unicode quadrant glyphs and an ordered (foreground, background)
//! palette color pair minimizing total color error against the four source
//! pixels. Residual error diffuses into unprocessed pixels with a modified
//! Floyd-Steinberg kernel, attenuated near detected edges.
//!
//! # Quick Start
//!
//! A [`Renderer`] owns the palette, its lookup artifacts, and the block
//! decision cache:
//!
//! ```
//! use quad_dither::{PreparedImage, RenderConfig, Renderer, Rgb};
//!
//! let json = br##"{
//!     "30": "#000000", "37": "#FFFFFF",
//!     "40": "#000000", "47": "#FFFFFF"
//! }"##;
//!
//! let mut renderer = Renderer::new(RenderConfig {
//!     width: 4,
//!     ..RenderConfig::default()
//! });
//! renderer.load_palette_json("bw", json).unwrap();
//!
//! let ansi = renderer
//!     .render_with_retry(1.0, |w, h| {
//!         Ok(PreparedImage {
//!             pixels: vec![Rgb::new(0, 0, 0); 4 * w * h],
//!             edges: vec![0; 4 * w * h],
//!             width: 2 * w,
//!             height: 2 * h,
//!         })
//!     })
//!     .unwrap();
//! assert!(ansi.ends_with("\x1b[0m\n"));
//! ```
//!
//! # Pipeline stages
//!
//! The stages compose but are callable separately, so a caller may rewrite
//! block decisions between dithering and emission:
//!
//! - [`Renderer::load_palette_json`] / [`Renderer::load_palette_file`]
//! - [`Renderer::dither_image`] producing a [`BlockGrid`]
//! - [`Renderer::render_ansi`] and [`Renderer::compress_ansi`]
//!
//! # Palettes
//!
//! Palette sources are flat JSON maps from terminal color codes to hex
//! colors. Ahead-of-time `.palette` containers built with
//! [`PaletteFile::build`] carry whole-cube lookup tables and KD-trees for
//! all built-in distance methods; direct JSON loads run in KD-tree
//! fallback mode (fast load, slow per-pixel lookups). Custom distance
//! methods plug in through [`ColorDistance`].

pub mod block;
pub mod color;
pub mod dither;
mod error;
pub mod glyph;
pub mod output;
pub mod palette;
mod renderer;


pub use block::{calculate_block_error, ApproximateCache, BlockDecision, CachedMatch, Optimizer, Signature};
pub use color::{ColorDistance, ColorMethod, Lab, Rgb, SignedRgb};
pub use dither::{dither_blocks, BlockGrid};
pub use error::RenderError;
pub use output::{compress_ansi, render_ansi};
pub use palette::{
    CodeClass, CubeTable, FormatError, KdTree, Palette, PaletteColor, PaletteError, PaletteFile,
    PaletteSet, PaletteSource, ParseColorError,
};
pub use renderer::{CacheStats, PreparedImage, RenderConfig, Renderer};
