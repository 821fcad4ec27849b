//! Image preparation for the dithering pipeline.
//!
//! Decodes the source once, then produces (image, edge map) pairs at twice
//! the requested block grid on demand. The reference preparation: resize to
//! four times the block grid, Canny edge detection on the grayscale of
//! that, then downscale both to twice the block grid (the image with a mild
//! 3x3 sharpen on top). Keeping the decoded source cached makes the
//! shrink-to-fit retry loop cheap.

use std::path::Path;

use anyhow::Context as _;
use image::imageops::{self, FilterType};
use image::RgbImage;
use quad_dither::{PreparedImage, Rgb};

/// Canny thresholds for the edge map.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Mild 3x3 sharpen kernel applied after the final downscale.
const SHARPEN: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// A decoded source image ready to produce prepared frames.
pub struct ImagePreparer {
    source: RgbImage,
}

impl ImagePreparer {
    /// Decode an image file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let source = image::open(path)
            .with_context(|| format!("cannot read image {}", path.display()))?
            .to_rgb8();
        if source.width() == 0 || source.height() == 0 {
            anyhow::bail!("image {} is empty", path.display());
        }
        tracing::debug!(
            path = %path.display(),
            width = source.width(),
            height = source.height(),
            "decoded source image"
        );
        Ok(Self { source })
    }

    /// Width over height of the decoded source.
    pub fn aspect(&self) -> f64 {
        self.source.width() as f64 / self.source.height() as f64
    }

    /// Prepare pixels and edge map for a block grid of (w, h).
    pub fn prepare(&self, blocks_w: usize, blocks_h: usize) -> PreparedImage {
        let w2 = (blocks_w * 2) as u32;
        let h2 = (blocks_h * 2) as u32;
        let w4 = w2 * 2;
        let h4 = h2 * 2;

        let big = imageops::resize(&self.source, w4, h4, FilterType::Triangle);
        let gray = imageops::grayscale(&big);
        let edges_big = imageproc::edges::canny(&gray, CANNY_LOW, CANNY_HIGH);

        let small = imageops::resize(&big, w2, h2, FilterType::Triangle);
        let sharpened = imageops::filter3x3(&small, &SHARPEN);
        let edges_small = imageops::resize(&edges_big, w2, h2, FilterType::Triangle);

        let pixels: Vec<Rgb> = sharpened
            .pixels()
            .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
            .collect();
        let edges: Vec<u8> = edges_small.pixels().map(|p| p.0[0]).collect();

        PreparedImage {
            pixels,
            edges,
            width: w2 as usize,
            height: h2 as usize,
        }
    }
}
