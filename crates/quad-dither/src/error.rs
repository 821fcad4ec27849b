//! Crate-level error type for rendering operations.

use thiserror::Error;

use crate::palette::{FormatError, PaletteError};

/// Error raised by the renderer and its pipeline stages.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("palette error: {0}")]
    Palette(#[from] PaletteError),

    #[error("palette container error: {0}")]
    Format(#[from] FormatError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no palette loaded")]
    NoPalette,

    #[error(
        "image dimensions {width}x{height} invalid: both must be even, nonzero, \
         and match the pixel and edge buffers"
    )]
    BadDimensions { width: usize, height: usize },

    #[error("malformed ANSI stream: {0}")]
    Ansi(String),

    /// The compressed output cannot fit the character budget even at the
    /// minimum rendering width.
    #[error("image too large to fit within character limit")]
    TooLarge { max_chars: usize },
}
