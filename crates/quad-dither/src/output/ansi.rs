//! ANSI escape sequence emitter.
//!
//! The emitter is deliberately naive: one SGR introduction per cell, reset
//! at every line end. Run-length folding and code elision live in the
//! compressor, which consumes this output.

use std::fmt::Write as _;

use crate::dither::BlockGrid;
use crate::glyph::glyph_char;
use crate::palette::Palette;

/// Render a block grid into an uncompressed ANSI stream.
///
/// Each cell becomes `ESC [ fg ; bg m glyph`, each row ends with
/// `ESC [ 0 m` and a newline.
pub fn render_ansi(grid: &BlockGrid, palette: &Palette) -> String {
    // 12 bytes per cell is a comfortable estimate for basic codes.
    let mut out = String::with_capacity(grid.width() * grid.height() * 12);
    for by in 0..grid.height() {
        for bx in 0..grid.width() {
            let d = grid.get(bx, by);
            let fg = &palette.fg().color(d.fg).code;
            let bg = &palette.bg().color(d.bg).code;
            let _ = write!(out, "\x1b[{fg};{bg}m{}", glyph_char(d.glyph));
        }
        out.push_str("\x1b[0m\n");
    }
    out
}
