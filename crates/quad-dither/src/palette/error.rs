//! Error types for palette loading and the binary container.

use thiserror::Error;

/// Error parsing a hex color string.
#[derive(Debug, Error)]
pub enum ParseColorError {
    /// Hex string has the wrong length (1 to 8 digits after stripping an
    /// optional leading `#`).
    #[error("invalid hex color length {0} (expected 1 to 8 digits)")]
    InvalidLength(usize),

    /// Invalid hexadecimal character.
    #[error("invalid hex character: {0}")]
    InvalidHex(#[from] std::num::ParseIntError),

    /// Parsed value exceeds the 24-bit RGB range.
    #[error("hex color {0:#x} exceeds the 24-bit range")]
    OutOfRange(u32),
}

/// Error loading or validating a palette source.
#[derive(Debug, Error)]
pub enum PaletteError {
    /// The source contained no entries for one of the code classes.
    #[error("palette has no {0} entries")]
    EmptyClass(&'static str),

    /// A set exceeds the 256 colors addressable by a 1-byte table entry.
    #[error("palette set has {0} distinct colors (maximum 256)")]
    TooManyColors(usize),

    /// A terminal code matched neither the foreground nor background
    /// prefix rules.
    #[error("unknown terminal code prefix: {0:?}")]
    UnknownCode(String),

    /// A color value failed to parse.
    #[error("invalid color for code {code:?}: {source}")]
    ParseColor {
        code: String,
        #[source]
        source: ParseColorError,
    },

    /// The JSON source document was malformed.
    #[error("malformed palette JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error reading or writing the binary `.palette` container.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a palette container (bad magic)")]
    BadMagic,

    #[error("unsupported palette container version {0}")]
    BadVersion(u16),

    #[error("container does not carry method {0:?}")]
    MethodMissing(String),

    #[error("invalid KD-tree node marker {0}")]
    BadNodeMarker(u8),

    #[error("invalid KD-tree split axis {0}")]
    BadAxis(u8),

    #[error("lookup table has {0} entries (expected 0 or 16777216)")]
    BadTableLength(u64),

    #[error("invalid UTF-8 in container string")]
    BadString(#[from] std::string::FromUtf8Error),

    #[error("palette data invalid: {0}")]
    Palette(#[from] PaletteError),
}
