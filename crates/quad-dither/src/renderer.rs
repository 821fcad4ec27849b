//! Renderer orchestration.
//!
//! A [`Renderer`] is one self-contained rendering context: configuration,
//! the loaded palette with its tables and trees, the block decision cache,
//! and hit/miss counters. Every operation is a method so independent
//! renderers can coexist; nothing in the crate holds process-global state.
//!
//! The pipeline stages (load palette, dither, render, compress) are exposed
//! separately so callers can modify the block grid between dithering and
//! emission. [`Renderer::render_with_retry`] composes them with the
//! shrink-to-fit loop around an externally supplied image preparer.

use std::path::Path;

use crate::block::{ApproximateCache, Optimizer};
use crate::color::{ColorMethod, Rgb};
use crate::dither::{dither_blocks, BlockGrid};
use crate::error::RenderError;
use crate::output;
use crate::palette::{FormatError, Palette, PaletteFile, PaletteSource};

/// Width floor for the shrink-to-fit retry loop.
const MIN_RENDER_WIDTH: usize = 10;

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output width in blocks (terminal columns).
    pub width: usize,
    /// Vertical compensation for character cell aspect.
    pub scale: f64,
    /// Cap on the compressed output length in bytes.
    pub max_chars: usize,
    /// Candidate cap per KD-tree query; 0 disables KD candidate mode.
    pub kd_search: usize,
    /// Cache admissibility threshold.
    pub cache_threshold: f64,
    /// Distinct-color count at or below which the optimizer searches
    /// exhaustively.
    pub small_palette: usize,
    /// Color distance method.
    pub method: ColorMethod,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 80,
            scale: 2.0,
            max_chars: 1 << 20,
            kd_search: 50,
            cache_threshold: 40.0,
            small_palette: 40,
            method: ColorMethod::Rgb,
        }
    }
}

/// Cache effectiveness counters for one renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Distinct signatures currently cached.
    pub signatures: usize,
}

/// A prepared image: pixels and edge map at twice the block grid size.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub pixels: Vec<Rgb>,
    pub edges: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

/// One independent rendering context.
pub struct Renderer {
    config: RenderConfig,
    palette: Option<Palette>,
    palette_key: Option<String>,
    cache: ApproximateCache,
    hits: u64,
    misses: u64,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            palette: None,
            palette_key: None,
            cache: ApproximateCache::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The loaded palette, if any.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Cache counters accumulated since the palette was loaded.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            signatures: self.cache.len(),
        }
    }

    /// Load a palette from JSON source bytes, in KD-tree mode.
    ///
    /// `key` identifies the palette; loading the key that is already live
    /// is a no-op that preserves the cache and counters. Loading a
    /// different key replaces the palette and invalidates both.
    pub fn load_palette_json(&mut self, key: &str, bytes: &[u8]) -> Result<(), RenderError> {
        if self.palette_key.as_deref() == Some(key) {
            tracing::debug!(key, "palette already loaded");
            return Ok(());
        }
        let source = PaletteSource::parse_json(bytes)?;
        let palette = Palette::from_source(&source, self.config.method.clone(), false)?;
        self.install(key, palette);
        Ok(())
    }

    /// Load a palette from a `.palette` container file.
    ///
    /// When the container lacks the configured method, falls back to a
    /// sibling `.json` source in KD-tree mode with a warning; without a
    /// sibling the container error surfaces.
    pub fn load_palette_file(&mut self, key: &str, path: &Path) -> Result<(), RenderError> {
        if self.palette_key.as_deref() == Some(key) {
            tracing::debug!(key, "palette already loaded");
            return Ok(());
        }

        let file = std::fs::File::open(path)?;
        let container = PaletteFile::read_from(std::io::BufReader::new(file))?;
        match container.palette_for(&self.config.method) {
            Ok(palette) => {
                self.install(key, palette);
                Ok(())
            }
            Err(FormatError::MethodMissing(name)) => {
                let sibling = path.with_extension("json");
                if sibling.exists() {
                    tracing::warn!(
                        method = %name,
                        container = %path.display(),
                        fallback = %sibling.display(),
                        "palette container lacks method; falling back to JSON in KD-tree mode"
                    );
                    let bytes = std::fs::read(&sibling)?;
                    let source = PaletteSource::parse_json(&bytes)?;
                    let palette =
                        Palette::from_source(&source, self.config.method.clone(), false)?;
                    self.install(key, palette);
                    Ok(())
                } else {
                    Err(FormatError::MethodMissing(name).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Install an already-built palette under a key.
    ///
    /// Escape hatch for custom-method palettes built by the caller.
    pub fn load_palette(&mut self, key: &str, palette: Palette) {
        if self.palette_key.as_deref() == Some(key) {
            return;
        }
        self.install(key, palette);
    }

    fn install(&mut self, key: &str, palette: Palette) {
        tracing::debug!(
            key,
            method = palette.method().name(),
            fg_colors = palette.fg().len(),
            bg_colors = palette.bg().len(),
            aliased = palette.sets_aliased(),
            tables = palette.fg().cube().is_some(),
            "palette installed"
        );
        self.palette = Some(palette);
        self.palette_key = Some(key.to_string());
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Dither a prepared image in place into a block grid.
    pub fn dither_image(
        &mut self,
        pixels: &mut [Rgb],
        edges: &[u8],
        width: usize,
        height: usize,
    ) -> Result<BlockGrid, RenderError> {
        let palette = self.palette.as_ref().ok_or(RenderError::NoPalette)?;
        let optimizer = Optimizer::new(
            palette,
            self.config.kd_search,
            self.config.cache_threshold,
            self.config.small_palette,
        );
        let (grid, hits, misses) =
            dither_blocks(&optimizer, &mut self.cache, pixels, edges, width, height)?;
        self.hits += hits;
        self.misses += misses;
        tracing::debug!(
            blocks = grid.decisions().len(),
            hits,
            misses,
            total_hits = self.hits,
            total_misses = self.misses,
            signatures = self.cache.len(),
            "dither pass complete"
        );
        Ok(grid)
    }

    /// Render a block grid to an uncompressed ANSI stream.
    pub fn render_ansi(&self, grid: &BlockGrid) -> Result<String, RenderError> {
        let palette = self.palette.as_ref().ok_or(RenderError::NoPalette)?;
        Ok(output::render_ansi(grid, palette))
    }

    /// Compress an ANSI stream.
    pub fn compress_ansi(&self, ansi: &str) -> Result<String, RenderError> {
        output::compress_ansi(ansi)
    }

    /// Full pipeline with the shrink-to-fit loop.
    ///
    /// `aspect` is the source image's width/height ratio; `prepare` is
    /// called with the block dimensions (w, h) and must return an image and
    /// edge map at (2w, 2h). When the compressed output exceeds the
    /// configured budget the width shrinks by two blocks and the pipeline
    /// reruns; under-floor widths fail with [`RenderError::TooLarge`].
    pub fn render_with_retry<F>(&mut self, aspect: f64, mut prepare: F) -> Result<String, RenderError>
    where
        F: FnMut(usize, usize) -> Result<PreparedImage, RenderError>,
    {
        let mut width = self.config.width;
        loop {
            let height = block_height(width, aspect, self.config.scale);
            let mut prepared = prepare(width, height)?;
            if prepared.width != width * 2 || prepared.height != height * 2 {
                return Err(RenderError::BadDimensions {
                    width: prepared.width,
                    height: prepared.height,
                });
            }

            let grid = self.dither_image(
                &mut prepared.pixels,
                &prepared.edges,
                prepared.width,
                prepared.height,
            )?;
            let ansi = self.render_ansi(&grid)?;
            let compressed = self.compress_ansi(&ansi)?;

            if compressed.len() <= self.config.max_chars {
                return Ok(compressed);
            }

            tracing::debug!(
                width,
                len = compressed.len(),
                max = self.config.max_chars,
                "compressed output over budget, shrinking"
            );
            width = width.saturating_sub(2);
            if width < MIN_RENDER_WIDTH {
                return Err(RenderError::TooLarge {
                    max_chars: self.config.max_chars,
                });
            }
        }
    }
}

/// Block grid height for a width, source aspect, and scale factor.
fn block_height(width: usize, aspect: f64, scale: f64) -> usize {
    ((width as f64 / aspect / scale).round() as usize).max(1)
}
