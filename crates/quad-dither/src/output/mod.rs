//! ANSI output: escape emission and stream compression.

mod ansi;
mod compress;

pub use ansi::render_ansi;
pub use compress::compress_ansi;
